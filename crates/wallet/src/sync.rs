//! Sync strategy and derivation purpose identifiers.
//!
//! Both enums serialize to the exact strings embedded in per-wallet
//! database filenames, so the mappings here must never change once a
//! wallet has been created.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spvkit_consensus::NetworkParams;
use spvkit_storage::{Column, KeyValueStore, StoreError};

/// How the wallet acquires history it did not watch being built.
///
/// `Full` replays headers from an early checkpoint over peer sync;
/// the API variants restore pre-checkpoint transactions from a remote
/// explorer and only validate headers from a recent checkpoint on;
/// `NewWallet` has no history to restore at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncMode {
    Full,
    Api,
    Blockchair,
    NewWallet,
}

impl SyncMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncMode::Full => "full",
            SyncMode::Api => "api",
            SyncMode::Blockchair => "blockchair",
            SyncMode::NewWallet => "newWallet",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full" => Some(SyncMode::Full),
            "api" => Some(SyncMode::Api),
            "blockchair" => Some(SyncMode::Blockchair),
            "newWallet" => Some(SyncMode::NewWallet),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// BIP derivation purpose; decides the address form the wallet hands out.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Purpose {
    Bip44,
    Bip49,
    Bip84,
    Bip86,
}

impl Purpose {
    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Bip44 => "bip44",
            Purpose::Bip49 => "bip49",
            Purpose::Bip84 => "bip84",
            Purpose::Bip86 => "bip86",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bip44" => Some(Purpose::Bip44),
            "bip49" => Some(Purpose::Bip49),
            "bip84" => Some(Purpose::Bip84),
            "bip86" => Some(Purpose::Bip86),
            _ => None,
        }
    }

    /// BIP44 and BIP49 wallets show base58check addresses; the native
    /// segwit purposes encode with bech32.
    pub fn uses_bech32(self) -> bool {
        matches!(self, Purpose::Bip84 | Purpose::Bip86)
    }
}

impl std::fmt::Display for Purpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

const RESTORE_STATE_KEY: &[u8] = b"api_restore_complete";

/// Tracks whether the one-shot remote restore already ran for this
/// wallet. The flag lives in the wallet database so a restart does not
/// repeat the restore.
pub struct ApiSyncStateManager<S> {
    store: Arc<S>,
    restore_from_api: bool,
}

impl<S: KeyValueStore> ApiSyncStateManager<S> {
    pub fn new(store: Arc<S>, params: &NetworkParams, sync_mode: SyncMode) -> Self {
        let restore_from_api = params.syncable_from_api && sync_mode != SyncMode::Full;
        Self {
            store,
            restore_from_api,
        }
    }

    /// Whether this wallet restores pre-checkpoint history remotely at
    /// all. Fixed at construction.
    pub fn restore_from_api(&self) -> bool {
        self.restore_from_api
    }

    pub fn restored(&self) -> Result<bool, StoreError> {
        let value = self.store.get(Column::ApiState, RESTORE_STATE_KEY)?;
        Ok(value.map(|bytes| bytes.first() == Some(&1)).unwrap_or(false))
    }

    pub fn set_restored(&self, restored: bool) -> Result<(), StoreError> {
        self.store
            .put(Column::ApiState, RESTORE_STATE_KEY, &[u8::from(restored)])
    }

    /// True while a remote restore is still owed before peer sync starts.
    pub fn restore_pending(&self) -> Result<bool, StoreError> {
        if !self.restore_from_api {
            return Ok(false);
        }
        Ok(!self.restored()?)
    }
}
