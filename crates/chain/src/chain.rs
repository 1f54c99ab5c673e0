//! Append-only chain of validated headers.
//!
//! The chain grows strictly from its tip; a candidate that does not name
//! the tip as its parent is rejected before any rule runs. Reorganization
//! is out of scope for a checkpoint-anchored SPV chain, so nothing below
//! the tip is ever rewritten.

use std::sync::Arc;

use spvkit_consensus::Hash256;
use spvkit_log::{log_debug, log_info, log_warn};
use spvkit_pow::validation::{BlockValidatorSet, HeaderLookup, ValidatorError};
use spvkit_primitives::block::{BlockHeader, ChainedHeader};
use spvkit_storage::{KeyValueStore, StoreError, WriteBatch};

use crate::index::ChainIndex;

#[derive(Debug)]
pub enum ChainError {
    Store(StoreError),
    Validation(ValidatorError),
    InvalidHeader(&'static str),
    CorruptIndex(&'static str),
}

impl std::fmt::Display for ChainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainError::Store(err) => write!(f, "{err}"),
            ChainError::Validation(err) => write!(f, "{err}"),
            ChainError::InvalidHeader(message) => write!(f, "{message}"),
            ChainError::CorruptIndex(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ChainError {}

impl From<StoreError> for ChainError {
    fn from(err: StoreError) -> Self {
        ChainError::Store(err)
    }
}

impl From<ValidatorError> for ChainError {
    fn from(err: ValidatorError) -> Self {
        ChainError::Validation(err)
    }
}

pub struct HeaderChain<S> {
    index: ChainIndex<S>,
    validators: BlockValidatorSet,
    tip: ChainedHeader,
}

impl<S: KeyValueStore> HeaderChain<S> {
    /// Opens the chain, seeding an empty store with the checkpoint. A
    /// store that was already bootstrapped keeps its original checkpoint
    /// and tip; the passed checkpoint is ignored so reopening a wallet
    /// under a different sync mode cannot truncate its history.
    pub fn bootstrap(
        store: Arc<S>,
        validators: BlockValidatorSet,
        checkpoint: ChainedHeader,
    ) -> Result<Self, ChainError> {
        let index = ChainIndex::new(store);

        if let Some(stored) = index.checkpoint()? {
            let tip = index
                .tip()?
                .ok_or(ChainError::CorruptIndex("bootstrapped chain has no tip"))?;
            if stored.hash != checkpoint.hash {
                log_debug!(
                    "keeping stored checkpoint at height {}, ignoring height {}",
                    stored.height,
                    checkpoint.height
                );
            }
            log_info!("opened header chain at height {}", tip.height);
            return Ok(Self {
                index,
                validators,
                tip,
            });
        }

        let mut batch = WriteBatch::new();
        index.put_header(&mut batch, &checkpoint);
        index.set_checkpoint(&mut batch, &checkpoint);
        index.set_tip(&mut batch, &checkpoint.hash);
        index.commit(&batch)?;
        log_info!("bootstrapped header chain at height {}", checkpoint.height);

        Ok(Self {
            index,
            validators,
            tip: checkpoint,
        })
    }

    pub fn tip(&self) -> &ChainedHeader {
        &self.tip
    }

    /// Validates one header against the tip and commits it.
    pub fn accept(&mut self, header: BlockHeader) -> Result<ChainedHeader, ChainError> {
        let chained = self.chain_to(&self.tip.clone(), header, &[])?;

        let mut batch = WriteBatch::new();
        self.index.put_header(&mut batch, &chained);
        self.index.set_tip(&mut batch, &chained.hash);
        self.index.commit(&batch)?;
        self.tip = chained.clone();
        log_debug!("accepted header at height {}", chained.height);
        Ok(chained)
    }

    /// Validates a run of headers and commits them in one batch. The
    /// whole run is rejected if any member fails, leaving the store
    /// untouched.
    pub fn accept_batch(
        &mut self,
        headers: Vec<BlockHeader>,
    ) -> Result<Vec<ChainedHeader>, ChainError> {
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let mut batch = WriteBatch::new();
        batch.reserve(headers.len() * 2 + 1);
        let mut accepted: Vec<ChainedHeader> = Vec::with_capacity(headers.len());
        let mut tip = self.tip.clone();

        for header in headers {
            let chained = self.chain_to(&tip, header, &accepted)?;
            self.index.put_header(&mut batch, &chained);
            accepted.push(chained.clone());
            tip = chained;
        }

        self.index.set_tip(&mut batch, &tip.hash);
        self.index.commit(&batch)?;
        self.tip = tip;
        log_info!(
            "accepted {} headers, tip now at height {}",
            accepted.len(),
            self.tip.height
        );
        Ok(accepted)
    }

    fn chain_to(
        &self,
        previous: &ChainedHeader,
        header: BlockHeader,
        pending: &[ChainedHeader],
    ) -> Result<ChainedHeader, ChainError> {
        if header.prev_block != previous.hash {
            return Err(ChainError::InvalidHeader(
                "header does not extend the chain tip",
            ));
        }

        let lookup = PendingLookup {
            index: &self.index,
            pending,
        };
        if let Err(err) = self.validators.validate(&header, previous, &lookup) {
            log_warn!("rejected header at height {}: {err}", previous.height + 1);
            return Err(ChainError::Validation(err));
        }

        Ok(previous.child(header))
    }
}

impl<S: KeyValueStore> HeaderLookup for HeaderChain<S> {
    fn header_at(&self, height: u32) -> Option<ChainedHeader> {
        self.index.header_at(height).ok().flatten()
    }

    fn header(&self, hash: &Hash256) -> Option<ChainedHeader> {
        self.index.header(hash).ok().flatten()
    }
}

/// Ancestor lookup that sees headers staged in the current batch before
/// falling back to committed records.
struct PendingLookup<'a, S> {
    index: &'a ChainIndex<S>,
    pending: &'a [ChainedHeader],
}

impl<S: KeyValueStore> HeaderLookup for PendingLookup<'_, S> {
    fn header_at(&self, height: u32) -> Option<ChainedHeader> {
        if let Some(found) = self.pending.iter().find(|h| h.height == height) {
            return Some(found.clone());
        }
        self.index.header_at(height).ok().flatten()
    }

    fn header(&self, hash: &Hash256) -> Option<ChainedHeader> {
        if let Some(found) = self.pending.iter().find(|h| &h.hash == hash) {
            return Some(found.clone());
        }
        self.index.header(hash).ok().flatten()
    }
}
