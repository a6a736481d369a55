//! Snapshot encoding/decoding for persistence
//!
//! This module provides the on-disk encoding of the store: a single JSON
//! object mapping each key to its base64-encoded value.

pub mod snapshot;

pub use snapshot::{decode, encode, SnapshotError};
