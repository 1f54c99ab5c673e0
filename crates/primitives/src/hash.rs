use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use spvkit_consensus::Hash256;

pub fn sha256(data: &[u8]) -> Hash256 {
    Sha256::digest(data).into()
}

/// Double SHA-256, the block and transaction id hash.
pub fn sha256d(data: &[u8]) -> Hash256 {
    Sha256::digest(Sha256::digest(data)).into()
}

/// RIPEMD-160 over SHA-256, the address payload hash.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}
