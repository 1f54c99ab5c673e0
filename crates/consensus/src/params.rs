//! Network parameter definitions.

use crate::constants::{
    DUST_RELAY_TX_FEE, HEIGHT_INTERVAL, MAX_TARGET_BITS, PROTOCOL_VERSION, REGTEST_MAX_TARGET_BITS,
    TARGET_SPACING, TARGET_TIMESPAN,
};

/// A 256-bit hash stored in little-endian (wire) byte order.
pub type Hash256 = [u8; 32];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    /// Stable identifier used in database filenames and log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainNet",
            Network::Testnet => "testNet",
            Network::Regtest => "regTest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "mainNet" => Some(Network::Mainnet),
            "testNet" => Some(Network::Testnet),
            "regTest" => Some(Network::Regtest),
            _ => None,
        }
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum HexError {
    InvalidLength,
    InvalidHex,
}

/// Parses a displayed block hash into internal little-endian order.
///
/// Accepts an optional 0x prefix and left-pads short input, so "0x1"
/// is the hash with numeric value one.
pub fn hash256_from_hex(input: &str) -> Result<Hash256, HexError> {
    let hex = input.trim();
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    if hex.is_empty() || hex.len() > 64 {
        return Err(HexError::InvalidLength);
    }

    let mut nibbles = [0u8; 64];
    let pad = 64 - hex.len();
    for (slot, ch) in nibbles[pad..].iter_mut().zip(hex.chars()) {
        *slot = ch.to_digit(16).ok_or(HexError::InvalidHex)? as u8;
    }

    let mut bytes = [0u8; 32];
    for (i, byte) in bytes.iter_mut().enumerate() {
        *byte = nibbles[2 * i] << 4 | nibbles[2 * i + 1];
    }
    bytes.reverse();
    Ok(bytes)
}

/// Decodes plain hex into bytes, without the byte-order reversal that
/// [`hash256_from_hex`] applies to displayed hashes.
pub fn bytes_from_hex(input: &str) -> Result<Vec<u8>, HexError> {
    let hex = input.trim().as_bytes();
    if hex.len() % 2 == 1 {
        return Err(HexError::InvalidLength);
    }

    hex.chunks_exact(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16).ok_or(HexError::InvalidHex)?;
            let lo = (pair[1] as char).to_digit(16).ok_or(HexError::InvalidHex)?;
            Ok((hi << 4 | lo) as u8)
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct NetworkParams {
    pub network: Network,
    pub message_start: [u8; 4],
    pub default_port: u16,
    pub protocol_version: i32,
    pub genesis_hash: Hash256,
    pub genesis_time: u32,
    pub pubkey_hash_prefix: u8,
    pub script_hash_prefix: u8,
    pub wif_prefix: u8,
    pub bech32_hrp: &'static str,
    pub xpub_version: u32,
    pub xprv_version: u32,
    pub coin_type: u32,
    pub height_interval: u32,
    pub target_spacing: u32,
    pub target_timespan: u32,
    pub max_target_bits: u32,
    pub allow_min_difficulty_blocks: bool,
    pub syncable_from_api: bool,
    pub blockchair_chain_id: &'static str,
    pub dns_seeds: &'static [&'static str],
    pub dust_relay_tx_fee: i64,
}

impl NetworkParams {
    /// True when a block at `height` opens a new retarget interval.
    pub fn is_retarget_height(&self, height: u32) -> bool {
        height % self.height_interval == 0
    }
}

pub fn network_params(network: Network) -> NetworkParams {
    match network {
        Network::Mainnet => mainnet_params(),
        Network::Testnet => testnet_params(),
        Network::Regtest => regtest_params(),
    }
}

fn mainnet_params() -> NetworkParams {
    NetworkParams {
        network: Network::Mainnet,
        message_start: [0xf9, 0xbe, 0xb4, 0xd9],
        default_port: 8_333,
        protocol_version: PROTOCOL_VERSION,
        genesis_hash: hash256_from_hex(
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
        )
        .expect("mainnet genesis hash"),
        genesis_time: 1_231_006_505,
        pubkey_hash_prefix: 0x00,
        script_hash_prefix: 0x05,
        wif_prefix: 0x80,
        bech32_hrp: "bc",
        xpub_version: 0x0488_b21e,
        xprv_version: 0x0488_ade4,
        coin_type: 0,
        height_interval: HEIGHT_INTERVAL,
        target_spacing: TARGET_SPACING,
        target_timespan: TARGET_TIMESPAN,
        max_target_bits: MAX_TARGET_BITS,
        allow_min_difficulty_blocks: false,
        syncable_from_api: true,
        blockchair_chain_id: "bitcoin",
        dns_seeds: &MAINNET_DNS_SEEDS,
        dust_relay_tx_fee: DUST_RELAY_TX_FEE,
    }
}

fn testnet_params() -> NetworkParams {
    NetworkParams {
        network: Network::Testnet,
        message_start: [0x0b, 0x11, 0x09, 0x07],
        default_port: 18_333,
        protocol_version: PROTOCOL_VERSION,
        genesis_hash: hash256_from_hex(
            "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f4943",
        )
        .expect("testnet genesis hash"),
        genesis_time: 1_296_688_602,
        pubkey_hash_prefix: 0x6f,
        script_hash_prefix: 0xc4,
        wif_prefix: 0xef,
        bech32_hrp: "tb",
        xpub_version: 0x0435_87cf,
        xprv_version: 0x0435_8394,
        coin_type: 1,
        height_interval: HEIGHT_INTERVAL,
        target_spacing: TARGET_SPACING,
        target_timespan: TARGET_TIMESPAN,
        max_target_bits: MAX_TARGET_BITS,
        allow_min_difficulty_blocks: true,
        syncable_from_api: true,
        blockchair_chain_id: "bitcoin/testnet",
        dns_seeds: &TESTNET_DNS_SEEDS,
        dust_relay_tx_fee: DUST_RELAY_TX_FEE,
    }
}

fn regtest_params() -> NetworkParams {
    NetworkParams {
        network: Network::Regtest,
        message_start: [0xfa, 0xbf, 0xb5, 0xda],
        default_port: 18_444,
        protocol_version: PROTOCOL_VERSION,
        genesis_hash: hash256_from_hex(
            "0f9188f13cb7b2c71f2a335e3a4fc328bf5beb436012afca590b1a11466e2206",
        )
        .expect("regtest genesis hash"),
        genesis_time: 1_296_688_602,
        pubkey_hash_prefix: 0x6f,
        script_hash_prefix: 0xc4,
        wif_prefix: 0xef,
        bech32_hrp: "bcrt",
        xpub_version: 0x0435_87cf,
        xprv_version: 0x0435_8394,
        coin_type: 1,
        height_interval: HEIGHT_INTERVAL,
        target_spacing: TARGET_SPACING,
        target_timespan: TARGET_TIMESPAN,
        max_target_bits: REGTEST_MAX_TARGET_BITS,
        allow_min_difficulty_blocks: true,
        syncable_from_api: false,
        blockchair_chain_id: "",
        dns_seeds: &REGTEST_DNS_SEEDS,
        dust_relay_tx_fee: DUST_RELAY_TX_FEE,
    }
}

static MAINNET_DNS_SEEDS: [&str; 6] = [
    "seed.bitcoin.sipa.be",
    "dnsseed.bluematt.me",
    "dnsseed.bitcoin.dashjr.org",
    "seed.bitcoinstats.com",
    "seed.bitnodes.io",
    "seed.bitcoin.jonasschnelli.ch",
];

static TESTNET_DNS_SEEDS: [&str; 5] = [
    "testnet-seed.bitcoin.petertodd.org",
    "testnet-seed.bitcoin.jonasschnelli.ch",
    "testnet-seed.bluematt.me",
    "testnet-seed.bitcoin.schildbach.de",
    "bitcoin-testnet.bloqseeds.net",
];

static REGTEST_DNS_SEEDS: [&str; 1] = ["btc-regtest.horizontalsystems.xyz"];
