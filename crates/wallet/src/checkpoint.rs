//! Trusted sync anchors.
//!
//! A checkpoint is a header whose ancestry is taken on faith, bounding
//! how far back header validation ever reaches. Resolution picks
//! between the baked anchors and a previously stored one; a wallet that
//! already advanced past a checkpoint must never be handed an earlier
//! one again.

use std::fmt;
use std::sync::Arc;

use spvkit_chain::ChainIndex;
use spvkit_consensus::{bytes_from_hex, checkpoint_data, NetworkParams};
use spvkit_primitives::{decode, ChainedHeader, DecodeError};
use spvkit_storage::{KeyValueStore, StoreError};

use crate::sync::SyncMode;

#[derive(Debug)]
pub enum CheckpointError {
    Decode(DecodeError),
    InvalidData(&'static str),
    Store(StoreError),
}

impl fmt::Display for CheckpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointError::Decode(err) => write!(f, "{err}"),
            CheckpointError::InvalidData(msg) => write!(f, "{msg}"),
            CheckpointError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for CheckpointError {}

impl From<DecodeError> for CheckpointError {
    fn from(err: DecodeError) -> Self {
        CheckpointError::Decode(err)
    }
}

impl From<StoreError> for CheckpointError {
    fn from(err: StoreError) -> Self {
        CheckpointError::Store(err)
    }
}

/// A (height, header) pair the session treats as validated history's
/// origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub node: ChainedHeader,
}

impl Checkpoint {
    /// Parses a baked record: height as little-endian u32 followed by
    /// the 80-byte serialized header.
    pub fn parse(record: &str) -> Result<Self, CheckpointError> {
        let bytes = bytes_from_hex(record)
            .map_err(|_| CheckpointError::InvalidData("checkpoint record is not valid hex"))?;
        let node = decode::<ChainedHeader>(&bytes)?;
        Ok(Self { node })
    }

    pub fn height(&self) -> u32 {
        self.node.height
    }
}

/// Decides where validated history begins for this session.
///
/// A fresh wallet and networks without API history always anchor at the
/// latest baked record. A checkpoint persisted by a prior session wins
/// over either baked record so progress never regresses. Otherwise full
/// peer sync starts from the conservative early anchor while API-backed
/// modes start near the present.
pub fn resolve_checkpoint<S: KeyValueStore>(
    params: &NetworkParams,
    sync_mode: SyncMode,
    store: &Arc<S>,
) -> Result<Checkpoint, CheckpointError> {
    let data = checkpoint_data(params.network);

    if sync_mode == SyncMode::NewWallet || !params.syncable_from_api {
        return Checkpoint::parse(data.latest);
    }

    let index = ChainIndex::new(Arc::clone(store));
    if let Some(node) = index.checkpoint()? {
        return Ok(Checkpoint { node });
    }

    match sync_mode {
        SyncMode::Full => Checkpoint::parse(data.early),
        _ => Checkpoint::parse(data.latest),
    }
}
