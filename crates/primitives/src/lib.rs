//! Core header types, consensus serialization, and address encoding.

pub mod address;
pub mod block;
pub mod encoding;
pub mod hash;

pub use address::{
    address_to_script_pubkey, p2pkh_address, p2sh_address, p2tr_address, p2wpkh_address,
    p2wsh_address, script_pubkey_to_address, secret_key_to_wif, wif_to_secret_key, AddressError,
};
pub use block::{BlockHeader, ChainedHeader, HEADER_SIZE};
pub use encoding::{decode, encode, Decodable, DecodeError, Decoder, Encodable, Encoder};
pub use hash::{hash160, sha256, sha256d};
