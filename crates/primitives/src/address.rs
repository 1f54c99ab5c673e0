//! Bitcoin address forms.
//!
//! Base58check for legacy outputs, bech32/bech32m for segwit, and WIF
//! for raw secret keys. Version bytes and the HRP come from
//! `NetworkParams`, so every function takes the network explicitly.

use bech32::{Fe32, Hrp};
use spvkit_consensus::NetworkParams;

use crate::hash::sha256d;

const OP_DUP: u8 = 0x76;
const OP_EQUAL: u8 = 0x87;
const OP_EQUALVERIFY: u8 = 0x88;
const OP_HASH160: u8 = 0xa9;
const OP_CHECKSIG: u8 = 0xac;
const OP_1: u8 = 0x51;
const OP_16: u8 = 0x60;

#[derive(Debug)]
pub enum AddressError {
    InvalidLength,
    InvalidCharacter,
    InvalidChecksum,
    UnknownPrefix,
    InvalidWitnessProgram,
}

pub fn p2pkh_address(key_hash: &[u8; 20], params: &NetworkParams) -> String {
    encode_base58check(params.pubkey_hash_prefix, key_hash)
}

pub fn p2sh_address(script_hash: &[u8; 20], params: &NetworkParams) -> String {
    encode_base58check(params.script_hash_prefix, script_hash)
}

pub fn p2wpkh_address(key_hash: &[u8; 20], params: &NetworkParams) -> Result<String, AddressError> {
    segwit_encode(Fe32::Q, key_hash, params)
}

pub fn p2wsh_address(
    script_hash: &[u8; 32],
    params: &NetworkParams,
) -> Result<String, AddressError> {
    segwit_encode(Fe32::Q, script_hash, params)
}

pub fn p2tr_address(output_key: &[u8; 32], params: &NetworkParams) -> Result<String, AddressError> {
    segwit_encode(Fe32::P, output_key, params)
}

pub fn address_to_script_pubkey(
    address: &str,
    params: &NetworkParams,
) -> Result<Vec<u8>, AddressError> {
    if let Ok((hrp, version, program)) = bech32::segwit::decode(address) {
        if hrp != expected_hrp(params)? {
            return Err(AddressError::UnknownPrefix);
        }
        return Ok(witness_script(version.to_u8(), &program));
    }

    let (prefix, hash) = decode_base58check(address)?;
    if hash.len() != 20 {
        return Err(AddressError::InvalidLength);
    }
    if prefix == params.pubkey_hash_prefix {
        Ok(p2pkh_script(&hash))
    } else if prefix == params.script_hash_prefix {
        Ok(p2sh_script(&hash))
    } else {
        Err(AddressError::UnknownPrefix)
    }
}

pub fn script_pubkey_to_address(script: &[u8], params: &NetworkParams) -> Option<String> {
    if let Some(hash) = p2pkh_hash(script) {
        return Some(encode_base58check(params.pubkey_hash_prefix, hash));
    }
    if let Some(hash) = p2sh_hash(script) {
        return Some(encode_base58check(params.script_hash_prefix, hash));
    }
    let (version, program) = witness_parts(script)?;
    segwit_encode(Fe32::try_from(version).ok()?, program, params).ok()
}

pub fn secret_key_to_wif(secret: &[u8; 32], params: &NetworkParams, compressed: bool) -> String {
    let mut body = secret.to_vec();
    if compressed {
        body.push(0x01);
    }
    encode_base58check(params.wif_prefix, &body)
}

pub fn wif_to_secret_key(
    wif: &str,
    params: &NetworkParams,
) -> Result<([u8; 32], bool), AddressError> {
    let (prefix, body) = decode_base58check(wif)?;
    if prefix != params.wif_prefix {
        return Err(AddressError::UnknownPrefix);
    }
    let compressed = match body.len() {
        32 => false,
        33 if body[32] == 0x01 => true,
        _ => return Err(AddressError::InvalidLength),
    };
    let mut secret = [0u8; 32];
    secret.copy_from_slice(&body[..32]);
    Ok((secret, compressed))
}

fn expected_hrp(params: &NetworkParams) -> Result<Hrp, AddressError> {
    Hrp::parse(params.bech32_hrp).map_err(|_| AddressError::UnknownPrefix)
}

fn segwit_encode(
    version: Fe32,
    program: &[u8],
    params: &NetworkParams,
) -> Result<String, AddressError> {
    bech32::segwit::encode(expected_hrp(params)?, version, program)
        .map_err(|_| AddressError::InvalidWitnessProgram)
}

fn p2pkh_script(hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_DUP, OP_HASH160, 0x14];
    script.extend_from_slice(hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

fn p2sh_script(hash: &[u8]) -> Vec<u8> {
    let mut script = vec![OP_HASH160, 0x14];
    script.extend_from_slice(hash);
    script.push(OP_EQUAL);
    script
}

fn witness_script(version: u8, program: &[u8]) -> Vec<u8> {
    let opcode = match version {
        0 => 0x00,
        v => OP_1 + v - 1,
    };
    let mut script = vec![opcode, program.len() as u8];
    script.extend_from_slice(program);
    script
}

fn p2pkh_hash(script: &[u8]) -> Option<&[u8; 20]> {
    match script {
        [OP_DUP, OP_HASH160, 0x14, hash @ .., OP_EQUALVERIFY, OP_CHECKSIG] => hash.try_into().ok(),
        _ => None,
    }
}

fn p2sh_hash(script: &[u8]) -> Option<&[u8; 20]> {
    match script {
        [OP_HASH160, 0x14, hash @ .., OP_EQUAL] => hash.try_into().ok(),
        _ => None,
    }
}

fn witness_parts(script: &[u8]) -> Option<(u8, &[u8])> {
    let [opcode, push_len, program @ ..] = script else {
        return None;
    };
    let version = match *opcode {
        0x00 => 0,
        op @ OP_1..=OP_16 => op - OP_1 + 1,
        _ => return None,
    };
    if program.len() != *push_len as usize || !(2..=40).contains(&program.len()) {
        return None;
    }
    Some((version, program))
}

fn encode_base58check(prefix: u8, body: &[u8]) -> String {
    let mut payload = Vec::with_capacity(1 + body.len() + 4);
    payload.push(prefix);
    payload.extend_from_slice(body);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    base58_encode(&payload)
}

/// Decodes, verifies the trailing checksum, and splits off the leading
/// version byte.
fn decode_base58check(input: &str) -> Result<(u8, Vec<u8>), AddressError> {
    let mut bytes = base58_decode(input)?;
    if bytes.len() < 5 {
        return Err(AddressError::InvalidLength);
    }
    let body_len = bytes.len() - 4;
    if bytes[body_len..] != checksum(&bytes[..body_len]) {
        return Err(AddressError::InvalidChecksum);
    }
    bytes.truncate(body_len);
    let prefix = bytes.remove(0);
    Ok((prefix, bytes))
}

fn checksum(payload: &[u8]) -> [u8; 4] {
    let digest = sha256d(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

const BASE58_ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

fn base58_encode(data: &[u8]) -> String {
    // Base-58 digits, least significant first.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in data {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out: String = data.iter().take_while(|b| **b == 0).map(|_| '1').collect();
    for &digit in digits.iter().rev() {
        out.push(BASE58_ALPHABET[digit as usize] as char);
    }
    out
}

fn base58_decode(input: &str) -> Result<Vec<u8>, AddressError> {
    if input.is_empty() {
        return Err(AddressError::InvalidLength);
    }

    // Bytes of the decoded integer, least significant first.
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for ch in input.bytes() {
        let mut carry = base58_digit(ch).ok_or(AddressError::InvalidCharacter)? as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    for _ in input.bytes().take_while(|b| *b == b'1') {
        bytes.push(0);
    }
    bytes.reverse();
    Ok(bytes)
}

fn base58_digit(byte: u8) -> Option<u8> {
    // The alphabet drops 0, O, I, and l, leaving six contiguous runs.
    let value = match byte {
        b'1'..=b'9' => byte - b'1',
        b'A'..=b'H' => byte - b'A' + 9,
        b'J'..=b'N' => byte - b'J' + 17,
        b'P'..=b'Z' => byte - b'P' + 22,
        b'a'..=b'k' => byte - b'a' + 33,
        b'm'..=b'z' => byte - b'm' + 44,
        _ => return None,
    };
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base58_digit_agrees_with_alphabet() {
        for (index, byte) in BASE58_ALPHABET.iter().enumerate() {
            assert_eq!(base58_digit(*byte), Some(index as u8));
        }
        for byte in [b'0', b'O', b'I', b'l', b'-', b' '] {
            assert_eq!(base58_digit(byte), None);
        }
    }

    #[test]
    fn base58_preserves_leading_zeros() {
        let data = [0x00, 0x00, 0x01, 0x3a];
        let encoded = base58_encode(&data);
        assert!(encoded.starts_with("11"));
        assert_eq!(base58_decode(&encoded).unwrap(), data);
    }
}
