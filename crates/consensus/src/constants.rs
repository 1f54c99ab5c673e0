//! Chain constants shared by every supported network.

/// Satoshis per bitcoin.
pub const COIN: i64 = 100_000_000;

/// Number of blocks in one difficulty retarget interval (network rule).
pub const HEIGHT_INTERVAL: u32 = 2_016;

/// Expected seconds between blocks (network rule).
pub const TARGET_SPACING: u32 = 600;

/// Seconds one retarget interval is expected to take.
pub const TARGET_TIMESPAN: u32 = HEIGHT_INTERVAL * TARGET_SPACING;

/// Compact encoding of the proof-of-work limit on mainnet and testnet3.
pub const MAX_TARGET_BITS: u32 = 0x1d00_ffff;

/// Regtest runs essentially without proof of work; its limit sits just
/// under the compact sign bit.
pub const REGTEST_MAX_TARGET_BITS: u32 = 0x207f_ffff;

/// Current network protocol version for P2P messages.
pub const PROTOCOL_VERSION: i32 = 70_015;

/// Outputs below the fee implied by this rate (satoshis per kB) are
/// treated as dust by relay policy.
pub const DUST_RELAY_TX_FEE: i64 = 3_000;
