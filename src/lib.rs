//! Borderlink game library.
//!
//! A two-player territory game played on two devices that each hold a full
//! copy of the board and reconcile it over a slow serial-style link after
//! every turn. Exposes the storage primitives, map graphs, board rules, link
//! protocol, automated players, and the match simulator used by the binaries
//! and integration tests.

pub mod autoplay;
pub mod board;
pub mod collections;
pub mod config;
pub mod engine;
pub mod graph;
pub mod link;
pub mod simulate;
