//! Wallet assembly.
//!
//! The composition root: at construction the network and sync mode pick
//! a checkpoint and a history provider, the per-network rule set is
//! assembled, and everything is wired over one storage handle. The
//! resulting [`Wallet`] never re-resolves any of it; switching sync
//! mode means constructing a new wallet against a new database.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spvkit_chain::{ChainError, HeaderChain};
use spvkit_consensus::{network_params, Network, NetworkParams};
use spvkit_log::log_info;
use spvkit_pow::validation::{validator_set, BlockValidatorSet, ValidatorError};
use spvkit_primitives::block::{BlockHeader, ChainedHeader};
use spvkit_storage::{KeyValueStore, StoreError};

use crate::api::{resolve_provider, ProviderConfig};
use crate::checkpoint::{resolve_checkpoint, Checkpoint, CheckpointError};
use crate::processor::{TransactionHandler, TransactionProcessor};
use crate::sync::{ApiSyncStateManager, Purpose, SyncMode};

fn default_confirmations() -> u32 {
    6
}

fn default_peer_size() -> u32 {
    10
}

/// Construction-time wallet settings. The identifier fields are baked
/// into the database name, so changing any of them addresses a
/// different database.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WalletConfig {
    pub wallet_id: String,
    #[serde(with = "network_label")]
    pub network: Network,
    pub purpose: Purpose,
    pub sync_mode: SyncMode,
    #[serde(default = "default_confirmations")]
    pub confirmations_threshold: u32,
    #[serde(default = "default_peer_size")]
    pub peer_size: u32,
}

impl WalletConfig {
    pub fn new(
        wallet_id: impl Into<String>,
        network: Network,
        purpose: Purpose,
        sync_mode: SyncMode,
    ) -> Self {
        Self {
            wallet_id: wallet_id.into(),
            network,
            purpose,
            sync_mode,
            confirmations_threshold: default_confirmations(),
            peer_size: default_peer_size(),
        }
    }

    pub fn database_file_name(&self) -> String {
        database_file_name(&self.wallet_id, self.network, self.purpose, self.sync_mode)
    }
}

mod network_label {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use spvkit_consensus::Network;

    pub fn serialize<S: Serializer>(
        network: &Network,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(network.as_str())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Network, D::Error> {
        let label = String::deserialize(deserializer)?;
        Network::parse(&label).ok_or_else(|| D::Error::custom(format!("unknown network {label}")))
    }
}

/// Database name for one wallet; every segment is a stable identifier.
pub fn database_file_name(
    wallet_id: &str,
    network: Network,
    purpose: Purpose,
    sync_mode: SyncMode,
) -> String {
    format!(
        "{}-{}-{}-{}",
        wallet_id,
        network.as_str(),
        purpose.as_str(),
        sync_mode.as_str()
    )
}

#[derive(Debug)]
pub enum BuildError {
    MissingField(&'static str),
    Checkpoint(CheckpointError),
    Chain(ChainError),
    Validator(ValidatorError),
    Store(StoreError),
    Io(std::io::Error),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::MissingField(field) => write!(f, "wallet builder is missing {field}"),
            BuildError::Checkpoint(err) => write!(f, "{err}"),
            BuildError::Chain(err) => write!(f, "{err}"),
            BuildError::Validator(err) => write!(f, "{err}"),
            BuildError::Store(err) => write!(f, "{err}"),
            BuildError::Io(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for BuildError {}

impl From<CheckpointError> for BuildError {
    fn from(err: CheckpointError) -> Self {
        BuildError::Checkpoint(err)
    }
}

impl From<ChainError> for BuildError {
    fn from(err: ChainError) -> Self {
        BuildError::Chain(err)
    }
}

impl From<ValidatorError> for BuildError {
    fn from(err: ValidatorError) -> Self {
        BuildError::Validator(err)
    }
}

impl From<StoreError> for BuildError {
    fn from(err: StoreError) -> Self {
        BuildError::Store(err)
    }
}

impl From<std::io::Error> for BuildError {
    fn from(err: std::io::Error) -> Self {
        BuildError::Io(err)
    }
}

/// Step-by-step assembly for callers that resolved the pieces
/// themselves. [`Wallet::new`] drives it from a [`WalletConfig`].
pub struct WalletBuilder<S> {
    config: Option<WalletConfig>,
    store: Option<Arc<S>>,
    params: Option<NetworkParams>,
    validators: Option<BlockValidatorSet>,
    checkpoint: Option<Checkpoint>,
    provider: Option<ProviderConfig>,
    handler: Option<Arc<dyn TransactionHandler>>,
}

impl<S> Default for WalletBuilder<S> {
    fn default() -> Self {
        Self {
            config: None,
            store: None,
            params: None,
            validators: None,
            checkpoint: None,
            provider: None,
            handler: None,
        }
    }
}

impl<S: KeyValueStore + 'static> WalletBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: WalletConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn store(mut self, store: Arc<S>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn params(mut self, params: NetworkParams) -> Self {
        self.params = Some(params);
        self
    }

    pub fn validators(mut self, validators: BlockValidatorSet) -> Self {
        self.validators = Some(validators);
        self
    }

    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn provider(mut self, provider: ProviderConfig) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn handler(mut self, handler: Arc<dyn TransactionHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<Wallet<S>, BuildError> {
        let config = self.config.ok_or(BuildError::MissingField("config"))?;
        let store = self.store.ok_or(BuildError::MissingField("store"))?;
        let params = self.params.ok_or(BuildError::MissingField("network params"))?;
        let validators = self
            .validators
            .ok_or(BuildError::MissingField("validator set"))?;
        let checkpoint = self.checkpoint.ok_or(BuildError::MissingField("checkpoint"))?;
        let handler = self
            .handler
            .ok_or(BuildError::MissingField("transaction handler"))?;

        let chain = HeaderChain::bootstrap(Arc::clone(&store), validators, checkpoint.node.clone())?;
        let sync_state = ApiSyncStateManager::new(Arc::clone(&store), &params, config.sync_mode);
        let processor = TransactionProcessor::start(Arc::clone(&store), handler)?;

        match &self.provider {
            Some(provider) => log_info!(
                "wallet {} using {} history provider",
                config.wallet_id,
                provider.label()
            ),
            None => log_info!("wallet {} syncing from peers only", config.wallet_id),
        }

        Ok(Wallet {
            config,
            params,
            checkpoint,
            chain,
            provider: self.provider,
            sync_state,
            processor,
        })
    }
}

/// A fully wired SPV wallet.
///
/// Headers flow in through [`Wallet::accept_header`] under the
/// single-writer contract; raw transactions flow through
/// [`Wallet::submit_transaction`] into the background queue.
pub struct Wallet<S> {
    config: WalletConfig,
    params: NetworkParams,
    checkpoint: Checkpoint,
    chain: HeaderChain<S>,
    provider: Option<ProviderConfig>,
    sync_state: ApiSyncStateManager<S>,
    processor: TransactionProcessor<S>,
}

impl<S> fmt::Debug for Wallet<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("config", &self.config)
            .field("checkpoint", &self.checkpoint)
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore + 'static> Wallet<S> {
    /// Resolves checkpoint, provider and validation rules for `config`
    /// and assembles the wallet over `store`.
    pub fn new(
        config: WalletConfig,
        store: Arc<S>,
        handler: Arc<dyn TransactionHandler>,
    ) -> Result<Self, BuildError> {
        let params = network_params(config.network);
        let checkpoint = resolve_checkpoint(&params, config.sync_mode, &store)?;
        let validators = validator_set(&params)?;
        let provider = resolve_provider(&params, config.sync_mode, checkpoint.height());

        let mut builder = WalletBuilder::new()
            .config(config)
            .store(store)
            .params(params)
            .validators(validators)
            .checkpoint(checkpoint)
            .handler(handler);
        if let Some(provider) = provider {
            builder = builder.provider(provider);
        }
        builder.build()
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    /// The anchor resolved at construction, not the stored one a later
    /// session might see.
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn chain(&self) -> &HeaderChain<S> {
        &self.chain
    }

    pub fn provider(&self) -> Option<&ProviderConfig> {
        self.provider.as_ref()
    }

    pub fn sync_state(&self) -> &ApiSyncStateManager<S> {
        &self.sync_state
    }

    pub fn database_file_name(&self) -> String {
        self.config.database_file_name()
    }

    /// Validates one header against the tip and appends it.
    pub fn accept_header(&mut self, header: BlockHeader) -> Result<ChainedHeader, ChainError> {
        self.chain.accept(header)
    }

    /// Validates and appends a linked run of headers in one commit.
    pub fn accept_headers(
        &mut self,
        headers: Vec<BlockHeader>,
    ) -> Result<Vec<ChainedHeader>, ChainError> {
        self.chain.accept_batch(headers)
    }

    /// Queues a raw transaction for background processing.
    pub fn submit_transaction(&self, payload: Vec<u8>) -> Result<(), StoreError> {
        self.processor.submit(payload)
    }

    /// Number of queued transactions not yet processed.
    pub fn pending_transactions(&self) -> Result<usize, StoreError> {
        self.processor.pending()
    }
}

/// Removes per-wallet databases under `data_dir`, keeping the wallets
/// whose ids are listed in `except`. Entries that do not parse as
/// wallet database names are left alone.
pub fn clear(data_dir: &Path, except: &[&str]) -> Result<(), BuildError> {
    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(BuildError::Io(err)),
    };

    for entry in entries {
        let entry = entry.map_err(BuildError::Io)?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let Some(wallet_id) = database_wallet_id(name) else {
            continue;
        };
        if except.contains(&wallet_id) {
            continue;
        }

        let path = entry.path();
        log_info!("clearing wallet database {}", path.display());
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        if let Err(err) = removed {
            if err.kind() != ErrorKind::NotFound {
                return Err(BuildError::Io(err));
            }
        }
    }

    Ok(())
}

/// Extracts the wallet id from a database name shaped
/// `{walletId}-{network}-{purpose}-{syncMode}`, tolerating a trailing
/// file extension. Wallet ids may contain dashes, so the name is parsed
/// from the right.
fn database_wallet_id(name: &str) -> Option<&str> {
    let mut parts = name.rsplitn(4, '-');
    let sync_mode = parts.next()?;
    let sync_mode = sync_mode
        .split_once('.')
        .map_or(sync_mode, |(stem, _)| stem);
    let purpose = parts.next()?;
    let network = parts.next()?;
    let wallet_id = parts.next()?;

    SyncMode::parse(sync_mode)?;
    Purpose::parse(purpose)?;
    Network::parse(network)?;
    (!wallet_id.is_empty()).then_some(wallet_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spvkit_storage::memory::MemoryStore;

    #[test]
    fn database_name_embeds_every_identifier() {
        assert_eq!(
            database_file_name("wallet-1", Network::Testnet, Purpose::Bip84, SyncMode::Blockchair),
            "wallet-1-testNet-bip84-blockchair"
        );

        let config = WalletConfig::new("w", Network::Mainnet, Purpose::Bip44, SyncMode::NewWallet);
        assert_eq!(config.database_file_name(), "w-mainNet-bip44-newWallet");
    }

    #[test]
    fn database_wallet_id_parses_from_the_right() {
        assert_eq!(database_wallet_id("w1-mainNet-bip84-api"), Some("w1"));
        assert_eq!(
            database_wallet_id("my-main-wallet-testNet-bip44-full"),
            Some("my-main-wallet")
        );
        assert_eq!(
            database_wallet_id("w1-regTest-bip86-newWallet.sqlite"),
            Some("w1")
        );

        assert_eq!(database_wallet_id("notes.txt"), None);
        assert_eq!(database_wallet_id("w1-backup"), None);
        assert_eq!(database_wallet_id("w1-mainNet-bip84-fast"), None);
        assert_eq!(database_wallet_id("-mainNet-bip84-api"), None);
    }

    #[test]
    fn config_defaults_apply_when_fields_are_missing() {
        let config: WalletConfig = serde_json::from_str(
            r#"{"wallet_id":"w1","network":"testNet","purpose":"bip49","sync_mode":"full"}"#,
        )
        .expect("deserialize");

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.purpose, Purpose::Bip49);
        assert_eq!(config.sync_mode, SyncMode::Full);
        assert_eq!(config.confirmations_threshold, 6);
        assert_eq!(config.peer_size, 10);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = WalletConfig::new("w2", Network::Regtest, Purpose::Bip86, SyncMode::Api);
        let json = serde_json::to_string(&config).expect("serialize");
        assert!(json.contains("\"regTest\""));

        let back: WalletConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.wallet_id, config.wallet_id);
        assert_eq!(back.network, config.network);
        assert_eq!(back.purpose, config.purpose);
        assert_eq!(back.sync_mode, config.sync_mode);
    }

    #[test]
    fn builder_rejects_missing_pieces() {
        let builder: WalletBuilder<MemoryStore> = WalletBuilder::new();
        let err = builder.build().expect_err("no config");
        assert!(matches!(err, BuildError::MissingField("config")));

        let config = WalletConfig::new("w", Network::Regtest, Purpose::Bip84, SyncMode::Full);
        let builder: WalletBuilder<MemoryStore> = WalletBuilder::new().config(config);
        let err = builder.build().expect_err("no store");
        assert!(matches!(err, BuildError::MissingField("store")));
    }
}
