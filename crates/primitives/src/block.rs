//! Block header and chained-header types.

use spvkit_consensus::Hash256;

use crate::encoding::{encode, Decodable, DecodeError, Decoder, Encodable, Encoder};
use crate::hash::sha256d;

/// Serialized size of a block header on the wire.
pub const HEADER_SIZE: usize = 80;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: Hash256,
    pub merkle_root: Hash256,
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash256 {
        sha256d(&encode(self))
    }
}

impl Encodable for BlockHeader {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_i32_le(self.version);
        encoder.write_hash_le(&self.prev_block);
        encoder.write_hash_le(&self.merkle_root);
        encoder.write_u32_le(self.time);
        encoder.write_u32_le(self.bits);
        encoder.write_u32_le(self.nonce);
    }
}

impl Decodable for BlockHeader {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        Ok(Self {
            version: decoder.read_i32_le()?,
            prev_block: decoder.read_hash_le()?,
            merkle_root: decoder.read_hash_le()?,
            time: decoder.read_u32_le()?,
            bits: decoder.read_u32_le()?,
            nonce: decoder.read_u32_le()?,
        })
    }
}

/// A header joined to its resolved position in the chain.
///
/// Heights are derived, never assigned: anchors come from
/// [`ChainedHeader::new`] and everything above them flows through
/// [`ChainedHeader::child`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainedHeader {
    pub header: BlockHeader,
    pub height: u32,
    pub hash: Hash256,
}

impl ChainedHeader {
    pub fn new(header: BlockHeader, height: u32) -> Self {
        let hash = header.hash();
        Self {
            header,
            height,
            hash,
        }
    }

    /// Chains `header` directly on top of `self`.
    pub fn child(&self, header: BlockHeader) -> Self {
        Self::new(header, self.height + 1)
    }

    pub fn time(&self) -> u32 {
        self.header.time
    }

    pub fn bits(&self) -> u32 {
        self.header.bits
    }
}

impl Encodable for ChainedHeader {
    fn consensus_encode(&self, encoder: &mut Encoder) {
        encoder.write_u32_le(self.height);
        self.header.consensus_encode(encoder);
    }
}

impl Decodable for ChainedHeader {
    fn consensus_decode(decoder: &mut Decoder) -> Result<Self, DecodeError> {
        let height = decoder.read_u32_le()?;
        let header = BlockHeader::consensus_decode(decoder)?;
        Ok(Self::new(header, height))
    }
}
