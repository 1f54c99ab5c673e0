//! Keyed access to persisted chain records.
//!
//! Headers are stored by hash with a height index pointing back at them;
//! the tip reference and the bootstrap checkpoint live under fixed meta
//! keys. All writes go through a [`WriteBatch`] so callers control
//! atomicity.

use std::sync::Arc;

use spvkit_consensus::Hash256;
use spvkit_primitives::block::ChainedHeader;
use spvkit_primitives::encoding::{decode, encode};
use spvkit_storage::{Column, KeyValueStore, StoreError, WriteBatch};

const META_TIP_KEY: &[u8] = b"tip";
const META_CHECKPOINT_KEY: &[u8] = b"checkpoint";

pub struct ChainIndex<S> {
    store: Arc<S>,
}

impl<S: KeyValueStore> ChainIndex<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn header(&self, hash: &Hash256) -> Result<Option<ChainedHeader>, StoreError> {
        self.store
            .get(Column::BlockHeader, hash)?
            .as_deref()
            .map(decode_record)
            .transpose()
    }

    pub fn header_at(&self, height: u32) -> Result<Option<ChainedHeader>, StoreError> {
        match self.stored_hash(Column::HeightIndex, &height_key(height))? {
            Some(hash) => self.header(&hash),
            None => Ok(None),
        }
    }

    pub fn put_header(&self, batch: &mut WriteBatch, header: &ChainedHeader) {
        batch.put(Column::BlockHeader, header.hash, encode(header));
        batch.put(Column::HeightIndex, height_key(header.height), header.hash);
    }

    pub fn set_tip(&self, batch: &mut WriteBatch, hash: &Hash256) {
        batch.put(Column::Meta, META_TIP_KEY, *hash);
    }

    pub fn tip(&self) -> Result<Option<ChainedHeader>, StoreError> {
        match self.stored_hash(Column::Meta, META_TIP_KEY)? {
            Some(hash) => self.header(&hash),
            None => Ok(None),
        }
    }

    pub fn set_checkpoint(&self, batch: &mut WriteBatch, checkpoint: &ChainedHeader) {
        batch.put(Column::Meta, META_CHECKPOINT_KEY, encode(checkpoint));
    }

    pub fn checkpoint(&self) -> Result<Option<ChainedHeader>, StoreError> {
        self.store
            .get(Column::Meta, META_CHECKPOINT_KEY)?
            .as_deref()
            .map(decode_record)
            .transpose()
    }

    pub fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        self.store.write_batch(batch)
    }

    fn stored_hash(&self, column: Column, key: &[u8]) -> Result<Option<Hash256>, StoreError> {
        self.store
            .get(column, key)?
            .map(|bytes| hash_from_bytes(&bytes))
            .transpose()
    }
}

/// Big-endian so the height index scans in chain order.
pub fn height_key(height: u32) -> [u8; 4] {
    height.to_be_bytes()
}

fn decode_record(bytes: &[u8]) -> Result<ChainedHeader, StoreError> {
    decode(bytes).map_err(|err| StoreError::Backend(err.to_string()))
}

fn hash_from_bytes(bytes: &[u8]) -> Result<Hash256, StoreError> {
    Hash256::try_from(bytes).map_err(|_| StoreError::Backend("invalid hash length".into()))
}
