//! Chained hash set over small unsigned keys.
//!
//! Keys are spread over a fixed number of buckets by `hash(key) % buckets`.
//! Each bucket is a vector of key slots; the most recently placed slot is the
//! front of the bucket. When an insert finds the set full (`len == buckets`)
//! the table doubles first: a complete new table is built by rehashing every
//! key, then swapped in.
//!
//! Enumeration uses explicit cursors (bucket index plus slot offset). Every
//! mutation bumps the set's version and a cursor from an older version is
//! rejected with [`SetError::StaleCursor`] instead of being followed.

use std::fmt;

/// Number of buckets a default set starts with.
pub const DEFAULT_BUCKETS: usize = 4;

/// A key that can be placed into a [`BucketedSet`].
///
/// The hash must be stable for the lifetime of the key; only the modulus
/// changes when the set grows.
pub trait BucketKey: Copy + Eq + fmt::Debug {
    fn bucket_hash(&self) -> usize;
}

macro_rules! impl_bucket_key {
    ($($t:ty),*) => {
        $(
            impl BucketKey for $t {
                #[inline]
                fn bucket_hash(&self) -> usize {
                    *self as usize
                }
            }
        )*
    };
}

impl_bucket_key!(u8, u16, u32, u64, usize);

/// Errors raised by contract violations on a [`BucketedSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetError {
    #[error("key {0} is not in the set")]
    MissingKey(String),

    #[error("cursor from version {cursor} used on set at version {current}")]
    StaleCursor { cursor: u64, current: u64 },

    #[error("cursor is already past the last key")]
    CursorAtEnd,
}

/// Position inside a [`BucketedSet`] enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    bucket: usize,
    slot: usize,
    version: u64,
}

/// A hash set of small unsigned keys with incremental doubling.
#[derive(Debug, Clone)]
pub struct BucketedSet<K> {
    buckets: Vec<Vec<K>>,
    len: usize,
    version: u64,
}

impl<K: BucketKey> BucketedSet<K> {
    /// Creates an empty set with [`DEFAULT_BUCKETS`] buckets.
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// Creates an empty set with the given number of buckets (at least one).
    pub fn with_buckets(count: usize) -> Self {
        BucketedSet {
            buckets: vec![Vec::new(); count.max(1)],
            len: 0,
            version: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Mutation counter; changes on every successful insert, remove, or resize.
    pub fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    fn bucket_of(&self, key: &K) -> usize {
        key.bucket_hash() % self.buckets.len()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.buckets[self.bucket_of(key)].contains(key)
    }

    /// Inserts `key`. Returns false, leaving the set untouched, if it was
    /// already present.
    ///
    /// A full set doubles before the insert is attempted.
    pub fn insert(&mut self, key: K) -> bool {
        if self.len == self.buckets.len() {
            self.grow();
        }
        let bucket = self.bucket_of(&key);
        if self.buckets[bucket].contains(&key) {
            return false;
        }
        self.buckets[bucket].push(key);
        self.len += 1;
        self.version += 1;
        true
    }

    /// Removes `key`. Callers are expected to check [`contains`](Self::contains)
    /// first; removing an absent key is a [`SetError::MissingKey`].
    pub fn remove(&mut self, key: &K) -> Result<(), SetError> {
        let bucket = self.bucket_of(key);
        let slots = &mut self.buckets[bucket];
        let pos = slots
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| SetError::MissingKey(format!("{:?}", key)))?;
        slots.remove(pos);
        self.len -= 1;
        self.version += 1;
        Ok(())
    }

    /// Doubles the bucket count and rehashes every key into the new table.
    fn grow(&mut self) {
        let new_count = self.buckets.len() * 2;
        let mut doubled: Vec<Vec<K>> = vec![Vec::new(); new_count];
        for key in self.keys() {
            doubled[key.bucket_hash() % new_count].push(key);
        }
        self.buckets = doubled;
        self.version += 1;
        log::trace!("bucketed set grew to {} buckets", new_count);
    }

    /// Iterates over all keys, bucket by bucket, each bucket front to back.
    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.buckets
            .iter()
            .flat_map(|slots| slots.iter().rev().copied())
    }

    fn first_filled_from(&self, bucket: usize) -> usize {
        (bucket..self.buckets.len())
            .find(|&b| !self.buckets[b].is_empty())
            .unwrap_or(self.buckets.len())
    }

    /// Returns a cursor at the first key, or the end cursor for an empty set.
    pub fn cursor(&self) -> Cursor {
        Cursor {
            bucket: self.first_filled_from(0),
            slot: 0,
            version: self.version,
        }
    }

    pub fn is_end(&self, cursor: &Cursor) -> bool {
        cursor.bucket >= self.buckets.len()
    }

    fn check(&self, cursor: &Cursor) -> Result<(), SetError> {
        if cursor.version != self.version {
            return Err(SetError::StaleCursor {
                cursor: cursor.version,
                current: self.version,
            });
        }
        if self.is_end(cursor) {
            return Err(SetError::CursorAtEnd);
        }
        Ok(())
    }

    /// Returns the key under `cursor`.
    pub fn key_at(&self, cursor: &Cursor) -> Result<K, SetError> {
        self.check(cursor)?;
        let slots = &self.buckets[cursor.bucket];
        Ok(slots[slots.len() - 1 - cursor.slot])
    }

    /// Returns the cursor following `cursor`.
    pub fn advance(&self, cursor: &Cursor) -> Result<Cursor, SetError> {
        self.check(cursor)?;
        let mut next = *cursor;
        next.slot += 1;
        if next.slot >= self.buckets[next.bucket].len() {
            next.bucket = self.first_filled_from(next.bucket + 1);
            next.slot = 0;
        }
        Ok(next)
    }
}

impl<K: BucketKey> Default for BucketedSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
