//! Storage seam for the wallet database.
//!
//! Wallet code reaches its database only through [`KeyValueStore`], a
//! column-addressed byte store. The crate ships the seam, the
//! [`Column`] registry and an in-memory reference backend; persistent
//! engines belong to the embedding application.

use std::fmt;
use std::sync::Arc;

pub mod batch;
pub mod memory;

pub use batch::{WriteBatch, WriteKey, WriteOp, WriteValue};

#[derive(Debug)]
pub enum StoreError {
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Logical key spaces of the wallet database. `as_str` values name the
/// on-disk partitions and must never change once written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    BlockHeader,
    HeightIndex,
    Meta,
    ApiState,
    TxQueue,
}

impl Column {
    pub const ALL: [Column; 5] = [
        Column::BlockHeader,
        Column::HeightIndex,
        Column::Meta,
        Column::ApiState,
        Column::TxQueue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Column::BlockHeader => "block_header",
            Column::HeightIndex => "height_index",
            Column::Meta => "meta",
            Column::ApiState => "api_state",
            Column::TxQueue => "tx_queue",
        }
    }
}

pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Column-addressed byte store.
///
/// `scan_prefix` must return rows in ascending key order; the
/// transaction queue and height index rely on it.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;
    fn put(&self, column: Column, key: &[u8], value: &[u8]) -> Result<(), StoreError>;
    fn delete(&self, column: Column, key: &[u8]) -> Result<(), StoreError>;
    fn scan_prefix(&self, column: Column, prefix: &[u8]) -> Result<ScanResult, StoreError>;
    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, column: Column, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.as_ref().get(column, key)
    }

    fn put(&self, column: Column, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.as_ref().put(column, key, value)
    }

    fn delete(&self, column: Column, key: &[u8]) -> Result<(), StoreError> {
        self.as_ref().delete(column, key)
    }

    fn scan_prefix(&self, column: Column, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        self.as_ref().scan_prefix(column, prefix)
    }

    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.as_ref().write_batch(batch)
    }
}
