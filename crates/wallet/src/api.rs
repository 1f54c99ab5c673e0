//! Remote history backends and their per-network selection.
//!
//! Only the selection logic, the endpoint descriptors and the
//! hash-routing/merge behavior live here. The HTTP transport behind
//! each endpoint is the surrounding application's concern; it plugs in
//! through the [`ApiTransactionProvider`] and [`BlockHashSource`]
//! seams.

use std::collections::HashMap;
use std::fmt;

use spvkit_consensus::{Hash256, Network, NetworkParams};

use crate::sync::SyncMode;

pub const HS_MAINNET_URL: &str = "https://api.blocksdecoded.com/v1/blockchains/bitcoin";
pub const BLOCKCHAIN_COM_URL: &str = "https://blockchain.info";
pub const BCOIN_TESTNET_URL: &str = "https://btc-testnet.horizontalsystems.xyz/api";

#[derive(Debug)]
pub enum ProviderError {
    Source(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Source(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Source of height to block-hash lookups backing a remote restore.
pub trait BlockHashSource: Send + Sync {
    fn hashes(&self, heights: &[u32]) -> Result<HashMap<u32, Hash256>, ProviderError>;
}

/// Routes hash lookups around the checkpoint: heights at or below it
/// are served by the primary source, later ones by the explorer.
pub struct BlockHashFetcher<P, E> {
    primary: P,
    explorer: E,
    checkpoint_height: u32,
}

impl<P, E> BlockHashFetcher<P, E> {
    pub fn new(primary: P, explorer: E, checkpoint_height: u32) -> Self {
        Self {
            primary,
            explorer,
            checkpoint_height,
        }
    }
}

impl<P: BlockHashSource, E: BlockHashSource> BlockHashSource for BlockHashFetcher<P, E> {
    fn hashes(&self, heights: &[u32]) -> Result<HashMap<u32, Hash256>, ProviderError> {
        let (primary, explorer): (Vec<u32>, Vec<u32>) = heights
            .iter()
            .partition(|height| **height <= self.checkpoint_height);

        let mut merged = HashMap::with_capacity(heights.len());
        if !primary.is_empty() {
            merged.extend(self.primary.hashes(&primary)?);
        }
        if !explorer.is_empty() {
            merged.extend(self.explorer.hashes(&explorer)?);
        }
        Ok(merged)
    }
}

/// One confirmed block an explorer reported wallet activity in. The
/// hash is absent when the explorer indexes by height only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiTransactionItem {
    pub block_height: u32,
    pub block_hash: Option<Hash256>,
    pub addresses: Vec<String>,
}

/// Pre-checkpoint history lookups over one concrete explorer.
pub trait ApiTransactionProvider: Send + Sync {
    fn transactions(
        &self,
        addresses: &[String],
        stop_height: Option<u32>,
    ) -> Result<Vec<ApiTransactionItem>, ProviderError>;
}

/// Aggregator provider: resolves block hashes for raw height-only items
/// through the checkpoint-routed fetcher. Items whose hash cannot be
/// resolved are dropped rather than surfaced half-filled.
pub struct BlockchairProvider<T, F> {
    source: T,
    hash_fetcher: F,
}

impl<T, F> BlockchairProvider<T, F> {
    pub fn new(source: T, hash_fetcher: F) -> Self {
        Self {
            source,
            hash_fetcher,
        }
    }
}

impl<T, F> ApiTransactionProvider for BlockchairProvider<T, F>
where
    T: ApiTransactionProvider,
    F: BlockHashSource,
{
    fn transactions(
        &self,
        addresses: &[String],
        stop_height: Option<u32>,
    ) -> Result<Vec<ApiTransactionItem>, ProviderError> {
        let items = self.source.transactions(addresses, stop_height)?;

        let mut heights: Vec<u32> = items
            .iter()
            .filter(|item| item.block_hash.is_none())
            .map(|item| item.block_height)
            .collect();
        heights.sort_unstable();
        heights.dedup();

        let hashes = if heights.is_empty() {
            HashMap::new()
        } else {
            self.hash_fetcher.hashes(&heights)?
        };

        Ok(items
            .into_iter()
            .filter_map(|mut item| {
                if item.block_hash.is_none() {
                    item.block_hash = hashes.get(&item.block_height).copied();
                }
                item.block_hash.is_some().then_some(item)
            })
            .collect())
    }
}

/// Which remote backend a wallet should construct, with its fixed
/// endpoints. Selected once at construction and immutable after.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderConfig {
    /// blockchain.info history with plain primary hash lookups.
    BlockchainCom {
        url: &'static str,
        hash_source_url: &'static str,
    },
    /// Blockchair aggregator; hash lookups route around the checkpoint.
    Blockchair {
        chain_id: &'static str,
        hash_source_url: &'static str,
        checkpoint_height: u32,
    },
    /// Fixed bcoin-style endpoint.
    BCoin { url: &'static str },
}

impl ProviderConfig {
    pub fn label(&self) -> &'static str {
        match self {
            ProviderConfig::BlockchainCom { .. } => "blockchainCom",
            ProviderConfig::Blockchair { .. } => "blockchair",
            ProviderConfig::BCoin { .. } => "bCoin",
        }
    }
}

/// Picks the history backend for `(network, sync mode)`. regtest runs
/// peer-only and gets none.
pub fn resolve_provider(
    params: &NetworkParams,
    sync_mode: SyncMode,
    checkpoint_height: u32,
) -> Option<ProviderConfig> {
    match params.network {
        Network::Mainnet => Some(match sync_mode {
            SyncMode::Blockchair => ProviderConfig::Blockchair {
                chain_id: params.blockchair_chain_id,
                hash_source_url: HS_MAINNET_URL,
                checkpoint_height,
            },
            _ => ProviderConfig::BlockchainCom {
                url: BLOCKCHAIN_COM_URL,
                hash_source_url: HS_MAINNET_URL,
            },
        }),
        Network::Testnet => Some(ProviderConfig::BCoin {
            url: BCOIN_TESTNET_URL,
        }),
        Network::Regtest => None,
    }
}
