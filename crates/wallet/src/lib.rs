//! SPV wallet composition.
//!
//! Everything below the network layer: checkpoint and history-provider
//! resolution per network and sync mode, API restore state, the
//! background transaction queue, and the builder that wires them with
//! the header chain into a [`Wallet`].

pub mod api;
pub mod builder;
pub mod checkpoint;
pub mod processor;
pub mod sync;

pub use api::{
    resolve_provider, ApiTransactionItem, ApiTransactionProvider, BlockHashFetcher,
    BlockHashSource, BlockchairProvider, ProviderConfig, ProviderError,
};
pub use builder::{
    clear, database_file_name, BuildError, Wallet, WalletBuilder, WalletConfig,
};
pub use checkpoint::{resolve_checkpoint, Checkpoint, CheckpointError};
pub use processor::{TransactionHandler, TransactionProcessor};
pub use sync::{ApiSyncStateManager, Purpose, SyncMode};
