//! Storage primitives backing the map graphs.

pub mod bucketed;
pub mod buffer;

pub use bucketed::{BucketKey, BucketedSet, Cursor, SetError, DEFAULT_BUCKETS};
pub use buffer::GrowableBuffer;
