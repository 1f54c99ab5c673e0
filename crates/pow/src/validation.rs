//! Header validation rules and their composition into network rule sets.
//!
//! Individual rules implement [`BlockValidator`]. Position-dependent rules
//! additionally implement [`ChainedValidator`] so a [`BlockValidatorChain`]
//! can route each header to the first rule that claims it. A
//! [`BlockValidatorSet`] runs every member against every header and stops
//! at the first rejection.

use primitive_types::{U256, U512};
use spvkit_consensus::{Hash256, NetworkParams};
use spvkit_primitives::block::{BlockHeader, ChainedHeader};

use crate::difficulty::{compact_to_u256, u256_to_compact, CompactError};

/// Timestamp after which testnet permits min-difficulty blocks when a
/// block arrives more than twice the target spacing after its parent.
const TESTNET_DIFF_DATE: u32 = 1_329_264_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorError {
    /// The compact bits field itself is malformed.
    InvalidDifficultyBits,
    /// The header hash does not meet its own target, or the target is
    /// out of the network's range.
    InvalidProofOfWork,
    /// The bits field disagrees with the difficulty the chain requires
    /// at this position.
    InvalidBits,
    /// Validation needed an ancestor the chain could not supply.
    NoPreviousHeaderFound,
}

impl std::fmt::Display for ValidatorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidatorError::InvalidDifficultyBits => write!(f, "malformed difficulty bits"),
            ValidatorError::InvalidProofOfWork => write!(f, "hash does not satisfy proof of work"),
            ValidatorError::InvalidBits => write!(f, "difficulty bits do not match expected value"),
            ValidatorError::NoPreviousHeaderFound => write!(f, "required ancestor header not found"),
        }
    }
}

impl std::error::Error for ValidatorError {}

impl From<CompactError> for ValidatorError {
    fn from(_: CompactError) -> Self {
        ValidatorError::InvalidDifficultyBits
    }
}

/// Read access to the validated chain a candidate header extends.
pub trait HeaderLookup {
    fn header_at(&self, height: u32) -> Option<ChainedHeader>;
    fn header(&self, hash: &Hash256) -> Option<ChainedHeader>;
}

/// A single validation rule applied to a candidate header.
pub trait BlockValidator: Send + Sync {
    fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError>;
}

/// A rule that only applies at certain chain positions.
pub trait ChainedValidator: BlockValidator {
    fn is_applicable(&self, header: &BlockHeader, previous: &ChainedHeader) -> bool;
}

/// Checks that the header hash satisfies its own declared target and
/// that the target lies within the network's allowed range.
pub struct ProofOfWorkValidator {
    max_target: U256,
}

impl ProofOfWorkValidator {
    pub fn new(max_target_bits: u32) -> Result<Self, ValidatorError> {
        Ok(Self {
            max_target: compact_to_u256(max_target_bits)?,
        })
    }
}

impl BlockValidator for ProofOfWorkValidator {
    fn validate(
        &self,
        header: &BlockHeader,
        _previous: &ChainedHeader,
        _chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        let target = compact_to_u256(header.bits)?;
        if target.is_zero() || target > self.max_target {
            return Err(ValidatorError::InvalidProofOfWork);
        }
        let hash = U256::from_little_endian(&header.hash());
        if hash > target {
            return Err(ValidatorError::InvalidProofOfWork);
        }
        Ok(())
    }
}

/// Recomputes the target at each retarget boundary from the timespan the
/// previous interval actually took.
pub struct LegacyDifficultyAdjustmentValidator {
    height_interval: u32,
    target_timespan: u32,
    max_target_bits: u32,
}

impl LegacyDifficultyAdjustmentValidator {
    pub fn new(params: &NetworkParams) -> Self {
        Self {
            height_interval: params.height_interval,
            target_timespan: params.target_timespan,
            max_target_bits: params.max_target_bits,
        }
    }

    fn expected_bits(
        &self,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<u32, ValidatorError> {
        let candidate_height = previous.height + 1;
        let first_height = candidate_height
            .checked_sub(self.height_interval)
            .ok_or(ValidatorError::NoPreviousHeaderFound)?;
        let first = chain
            .header_at(first_height)
            .ok_or(ValidatorError::NoPreviousHeaderFound)?;

        let elapsed = previous
            .time()
            .saturating_sub(first.time())
            .clamp(self.target_timespan / 4, self.target_timespan * 4);

        let previous_target = compact_to_u256(previous.bits())?;
        let max_target = compact_to_u256(self.max_target_bits)?;

        // Multiply before dividing so the interim value keeps full
        // precision; the product can exceed 256 bits near the cap.
        let wide = previous_target.full_mul(U256::from(elapsed)) / U512::from(self.target_timespan);
        let mut next_target = U256::try_from(wide).unwrap_or(max_target);
        if next_target > max_target {
            next_target = max_target;
        }

        Ok(u256_to_compact(next_target))
    }
}

impl BlockValidator for LegacyDifficultyAdjustmentValidator {
    fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        if header.bits != self.expected_bits(previous, chain)? {
            return Err(ValidatorError::InvalidBits);
        }
        Ok(())
    }
}

impl ChainedValidator for LegacyDifficultyAdjustmentValidator {
    fn is_applicable(&self, _header: &BlockHeader, previous: &ChainedHeader) -> bool {
        (previous.height + 1) % self.height_interval == 0
    }
}

/// Requires the bits field to carry over unchanged from the previous
/// header. Applies everywhere, so it belongs last in a chain.
pub struct BitsValidator;

impl BlockValidator for BitsValidator {
    fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        _chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        if header.bits != previous.bits() {
            return Err(ValidatorError::InvalidBits);
        }
        Ok(())
    }
}

impl ChainedValidator for BitsValidator {
    fn is_applicable(&self, _header: &BlockHeader, _previous: &ChainedHeader) -> bool {
        true
    }
}

/// Testnet's min-difficulty exception. A header arriving more than twice
/// the target spacing after its parent may use the maximum target; any
/// other header must continue the last real difficulty, found by walking
/// back past min-difficulty blocks to the previous retarget boundary.
pub struct LegacyTestNetDifficultyValidator {
    height_interval: u32,
    target_spacing: u32,
    max_target_bits: u32,
}

impl LegacyTestNetDifficultyValidator {
    pub fn new(params: &NetworkParams) -> Self {
        Self {
            height_interval: params.height_interval,
            target_spacing: params.target_spacing,
            max_target_bits: params.max_target_bits,
        }
    }
}

impl BlockValidator for LegacyTestNetDifficultyValidator {
    fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        let expected = if header.time > previous.time() + 2 * self.target_spacing {
            self.max_target_bits
        } else {
            let mut cursor = previous.clone();
            while cursor.height % self.height_interval != 0 && cursor.bits() == self.max_target_bits
            {
                cursor = chain
                    .header(&cursor.header.prev_block)
                    .ok_or(ValidatorError::NoPreviousHeaderFound)?;
            }
            cursor.bits()
        };

        if header.bits != expected {
            return Err(ValidatorError::InvalidBits);
        }
        Ok(())
    }
}

impl ChainedValidator for LegacyTestNetDifficultyValidator {
    fn is_applicable(&self, header: &BlockHeader, _previous: &ChainedHeader) -> bool {
        header.time > TESTNET_DIFF_DATE
    }
}

/// Routes each header to the first member rule that claims its position.
/// A header no member claims passes vacuously.
#[derive(Default)]
pub struct BlockValidatorChain {
    validators: Vec<Box<dyn ChainedValidator>>,
}

impl BlockValidatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, validator: Box<dyn ChainedValidator>) {
        self.validators.push(validator);
    }
}

impl BlockValidator for BlockValidatorChain {
    fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        if let Some(validator) = self
            .validators
            .iter()
            .find(|validator| validator.is_applicable(header, previous))
        {
            validator.validate(header, previous, chain)?;
        }
        Ok(())
    }
}

/// Runs every member rule in insertion order, stopping at the first
/// rejection.
#[derive(Default)]
pub struct BlockValidatorSet {
    validators: Vec<Box<dyn BlockValidator>>,
}

impl BlockValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, validator: Box<dyn BlockValidator>) {
        self.validators.push(validator);
    }

    pub fn validate(
        &self,
        header: &BlockHeader,
        previous: &ChainedHeader,
        chain: &dyn HeaderLookup,
    ) -> Result<(), ValidatorError> {
        for validator in &self.validators {
            validator.validate(header, previous, chain)?;
        }
        Ok(())
    }
}

/// Assembles the rule set a network enforces on incoming headers: proof
/// of work on every header, then the difficulty transition rule for the
/// header's position.
pub fn validator_set(params: &NetworkParams) -> Result<BlockValidatorSet, ValidatorError> {
    let mut transitions = BlockValidatorChain::new();
    transitions.add(Box::new(LegacyDifficultyAdjustmentValidator::new(params)));
    if params.allow_min_difficulty_blocks {
        transitions.add(Box::new(LegacyTestNetDifficultyValidator::new(params)));
    } else {
        transitions.add(Box::new(BitsValidator));
    }

    let mut set = BlockValidatorSet::new();
    set.add(Box::new(ProofOfWorkValidator::new(params.max_target_bits)?));
    set.add(Box::new(transitions));
    Ok(set)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use spvkit_consensus::constants::{MAX_TARGET_BITS, TARGET_TIMESPAN};
    use spvkit_consensus::{hash256_from_hex, network_params, Network};

    use super::*;

    #[derive(Default)]
    struct MemoryChain {
        headers: Vec<ChainedHeader>,
    }

    impl MemoryChain {
        fn insert(&mut self, header: ChainedHeader) {
            self.headers.push(header);
        }
    }

    impl HeaderLookup for MemoryChain {
        fn header_at(&self, height: u32) -> Option<ChainedHeader> {
            self.headers.iter().find(|h| h.height == height).cloned()
        }

        fn header(&self, hash: &Hash256) -> Option<ChainedHeader> {
            self.headers.iter().find(|h| &h.hash == hash).cloned()
        }
    }

    fn header(prev_block: Hash256, time: u32, bits: u32) -> BlockHeader {
        BlockHeader {
            version: 2,
            prev_block,
            merkle_root: [0u8; 32],
            time,
            bits,
            nonce: 0,
        }
    }

    fn mainnet_genesis_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block: [0u8; 32],
            merkle_root: hash256_from_hex(
                "4a5e1e4baab89f3a32518a88c31bc87f618f76673e2cc77ab2127b7afdeda33b",
            )
            .expect("genesis merkle root"),
            time: 1_231_006_505,
            bits: 0x1d00_ffff,
            nonce: 2_083_236_893,
        }
    }

    fn mainnet_block_1_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block: hash256_from_hex(
                "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f",
            )
            .expect("genesis hash"),
            merkle_root: hash256_from_hex(
                "0e3e2357e806b6cdb1f70b54c3a3a17b6714ee1f0e68bebb44a74b1efd512098",
            )
            .expect("block 1 merkle root"),
            time: 1_231_469_665,
            bits: 0x1d00_ffff,
            nonce: 2_573_394_689,
        }
    }

    #[test]
    fn proof_of_work_accepts_real_header() {
        let validator = ProofOfWorkValidator::new(MAX_TARGET_BITS).expect("limit bits");
        let previous = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 0);
        let chain = MemoryChain::default();

        assert_eq!(
            validator.validate(&mainnet_genesis_header(), &previous, &chain),
            Ok(())
        );
    }

    #[test]
    fn proof_of_work_rejects_insufficient_hash() {
        let validator = ProofOfWorkValidator::new(MAX_TARGET_BITS).expect("limit bits");
        let previous = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 0);
        let chain = MemoryChain::default();

        // Target of one; no real header hash can meet it.
        let candidate = header([1u8; 32], 1_600_000_000, 0x0101_0000);
        assert_eq!(
            validator.validate(&candidate, &previous, &chain),
            Err(ValidatorError::InvalidProofOfWork)
        );
    }

    #[test]
    fn proof_of_work_rejects_target_outside_limit() {
        let validator = ProofOfWorkValidator::new(MAX_TARGET_BITS).expect("limit bits");
        let previous = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 0);
        let chain = MemoryChain::default();

        let easy = header([1u8; 32], 1_600_000_000, 0x207f_ffff);
        assert_eq!(
            validator.validate(&easy, &previous, &chain),
            Err(ValidatorError::InvalidProofOfWork)
        );

        let zero = header([1u8; 32], 1_600_000_000, 0);
        assert_eq!(
            validator.validate(&zero, &previous, &chain),
            Err(ValidatorError::InvalidProofOfWork)
        );
    }

    #[test]
    fn proof_of_work_rejects_malformed_bits() {
        let validator = ProofOfWorkValidator::new(MAX_TARGET_BITS).expect("limit bits");
        let previous = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 0);
        let chain = MemoryChain::default();

        let negative = header([1u8; 32], 1_600_000_000, 0x0180_3456);
        assert_eq!(
            validator.validate(&negative, &previous, &chain),
            Err(ValidatorError::InvalidDifficultyBits)
        );
        assert!(ProofOfWorkValidator::new(0x0180_3456).is_err());
    }

    fn retarget_interval(
        first_time: u32,
        previous_time: u32,
        bits: u32,
    ) -> (MemoryChain, ChainedHeader) {
        let first = ChainedHeader::new(header([0u8; 32], first_time, bits), 0);
        let previous = ChainedHeader::new(header([1u8; 32], previous_time, bits), 2015);
        let mut chain = MemoryChain::default();
        chain.insert(first.clone());
        chain.insert(previous.clone());
        (chain, previous)
    }

    #[test]
    fn retarget_applies_only_on_boundaries() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let candidate = header([1u8; 32], 1_600_000_000, MAX_TARGET_BITS);

        let boundary = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 2015);
        assert!(validator.is_applicable(&candidate, &boundary));

        let off_boundary = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 2016);
        assert!(!validator.is_applicable(&candidate, &off_boundary));
    }

    #[test]
    fn retarget_keeps_bits_when_interval_ran_on_schedule() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let t0 = 1_600_000_000;
        let (chain, previous) = retarget_interval(t0, t0 + TARGET_TIMESPAN, MAX_TARGET_BITS);

        let good = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(validator.validate(&good, &previous, &chain), Ok(()));

        let bad = header(previous.hash, previous.time() + 600, 0x1c3f_ffc0);
        assert_eq!(
            validator.validate(&bad, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );
    }

    #[test]
    fn retarget_clamps_fast_intervals_to_quarter_timespan() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let t0 = 1_600_000_000;
        // An eighth of the timespan, clamped up to a quarter.
        let (chain, previous) = retarget_interval(t0, t0 + TARGET_TIMESPAN / 8, MAX_TARGET_BITS);

        let good = header(previous.hash, previous.time() + 600, 0x1c3f_ffc0);
        assert_eq!(validator.validate(&good, &previous, &chain), Ok(()));

        let unchanged = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            validator.validate(&unchanged, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );
    }

    #[test]
    fn retarget_halves_target_for_half_timespan() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let t0 = 1_600_000_000;
        let (chain, previous) = retarget_interval(t0, t0 + TARGET_TIMESPAN / 2, 0x1c3f_ffc0);

        let good = header(previous.hash, previous.time() + 600, 0x1c1f_ffe0);
        assert_eq!(validator.validate(&good, &previous, &chain), Ok(()));
    }

    #[test]
    fn retarget_caps_new_target_at_network_maximum() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let t0 = 1_600_000_000;
        // Ten timespans, clamped down to four; the raw result would
        // exceed the maximum target.
        let (chain, previous) = retarget_interval(t0, t0 + 10 * TARGET_TIMESPAN, MAX_TARGET_BITS);

        let good = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(validator.validate(&good, &previous, &chain), Ok(()));
    }

    #[test]
    fn retarget_matches_first_historical_adjustment() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);

        // Interval 30240..=32255; block 32256 dropped bits to 0x1d00d86a.
        let first = ChainedHeader::new(header([0u8; 32], 1_261_130_161, MAX_TARGET_BITS), 30_240);
        let previous = ChainedHeader::new(header([1u8; 32], 1_262_152_739, MAX_TARGET_BITS), 32_255);
        let mut chain = MemoryChain::default();
        chain.insert(first);
        chain.insert(previous.clone());

        let good = header(previous.hash, previous.time() + 600, 0x1d00_d86a);
        assert_eq!(validator.validate(&good, &previous, &chain), Ok(()));

        let stale = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            validator.validate(&stale, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );
    }

    #[test]
    fn retarget_needs_interval_start_header() {
        let params = network_params(Network::Mainnet);
        let validator = LegacyDifficultyAdjustmentValidator::new(&params);
        let previous = ChainedHeader::new(header([1u8; 32], 1_600_000_000, MAX_TARGET_BITS), 2015);
        let chain = MemoryChain::default();

        let candidate = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            validator.validate(&candidate, &previous, &chain),
            Err(ValidatorError::NoPreviousHeaderFound)
        );
    }

    #[test]
    fn bits_validator_requires_carryover() {
        let previous = ChainedHeader::new(header([0u8; 32], 1_600_000_000, 0x1d00_d86a), 10);
        let chain = MemoryChain::default();

        let same = header(previous.hash, previous.time() + 600, 0x1d00_d86a);
        assert_eq!(BitsValidator.validate(&same, &previous, &chain), Ok(()));

        let drifted = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            BitsValidator.validate(&drifted, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );
        assert!(BitsValidator.is_applicable(&same, &previous));
    }

    #[test]
    fn testnet_rule_applies_after_activation_date() {
        let params = network_params(Network::Testnet);
        let validator = LegacyTestNetDifficultyValidator::new(&params);
        let previous = ChainedHeader::new(header([0u8; 32], 0, MAX_TARGET_BITS), 0);

        let old = header(previous.hash, 1_329_264_000, MAX_TARGET_BITS);
        assert!(!validator.is_applicable(&old, &previous));

        let new = header(previous.hash, 1_329_264_001, MAX_TARGET_BITS);
        assert!(validator.is_applicable(&new, &previous));
    }

    #[test]
    fn testnet_gap_block_must_use_maximum_target() {
        let params = network_params(Network::Testnet);
        let validator = LegacyTestNetDifficultyValidator::new(&params);
        let previous = ChainedHeader::new(header([0u8; 32], 1_660_000_000, 0x1c3f_ffc0), 4034);
        let chain = MemoryChain::default();

        // More than twice the spacing since the parent.
        let relaxed = header(previous.hash, previous.time() + 1201, MAX_TARGET_BITS);
        assert_eq!(validator.validate(&relaxed, &previous, &chain), Ok(()));

        let continued = header(previous.hash, previous.time() + 1201, 0x1c3f_ffc0);
        assert_eq!(
            validator.validate(&continued, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );
    }

    #[test]
    fn testnet_walks_back_to_last_real_difficulty() {
        let params = network_params(Network::Testnet);
        let validator = LegacyTestNetDifficultyValidator::new(&params);
        let t0 = 1_660_000_000;

        let anchor = ChainedHeader::new(header([9u8; 32], t0, 0x1c3f_ffc0), 4032);
        let relaxed_1 = anchor.child(header(anchor.hash, t0 + 2000, MAX_TARGET_BITS));
        let relaxed_2 = relaxed_1.child(header(relaxed_1.hash, t0 + 4000, MAX_TARGET_BITS));
        let mut chain = MemoryChain::default();
        chain.insert(anchor);
        chain.insert(relaxed_1);
        chain.insert(relaxed_2.clone());

        // Back on schedule; the gap exception no longer applies.
        let good = header(relaxed_2.hash, relaxed_2.time() + 600, 0x1c3f_ffc0);
        assert_eq!(validator.validate(&good, &relaxed_2, &chain), Ok(()));

        let still_relaxed = header(relaxed_2.hash, relaxed_2.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            validator.validate(&still_relaxed, &relaxed_2, &chain),
            Err(ValidatorError::InvalidBits)
        );
    }

    #[test]
    fn testnet_gap_boundary_is_exclusive() {
        let params = network_params(Network::Testnet);
        let validator = LegacyTestNetDifficultyValidator::new(&params);
        let previous = ChainedHeader::new(header([0u8; 32], 1_660_000_000, 0x1c3f_ffc0), 4034);
        let chain = MemoryChain::default();

        // Exactly twice the spacing; still the continuation rule, and the
        // parent carries real difficulty so no walk is needed.
        let candidate = header(previous.hash, previous.time() + 1200, 0x1c3f_ffc0);
        assert_eq!(validator.validate(&candidate, &previous, &chain), Ok(()));
    }

    #[test]
    fn testnet_walk_fails_without_ancestors() {
        let params = network_params(Network::Testnet);
        let validator = LegacyTestNetDifficultyValidator::new(&params);
        let previous = ChainedHeader::new(header([7u8; 32], 1_660_000_000, MAX_TARGET_BITS), 50);
        let chain = MemoryChain::default();

        let candidate = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            validator.validate(&candidate, &previous, &chain),
            Err(ValidatorError::NoPreviousHeaderFound)
        );
    }

    #[test]
    fn chain_routes_to_first_applicable_rule() {
        let params = network_params(Network::Mainnet);
        let mut transitions = BlockValidatorChain::new();
        transitions.add(Box::new(LegacyDifficultyAdjustmentValidator::new(&params)));
        transitions.add(Box::new(BitsValidator));

        let t0 = 1_600_000_000;
        let (chain, previous) = retarget_interval(t0, t0 + TARGET_TIMESPAN / 8, MAX_TARGET_BITS);

        // Carrying bits over would satisfy the carryover rule, but the
        // boundary belongs to the retarget rule alone.
        let carried = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        assert_eq!(
            transitions.validate(&carried, &previous, &chain),
            Err(ValidatorError::InvalidBits)
        );

        let retargeted = header(previous.hash, previous.time() + 600, 0x1c3f_ffc0);
        assert_eq!(transitions.validate(&retargeted, &previous, &chain), Ok(()));

        // Off the boundary the carryover rule takes over.
        let mid = ChainedHeader::new(header([2u8; 32], t0, MAX_TARGET_BITS), 2016);
        let continued = header(mid.hash, t0 + 600, MAX_TARGET_BITS);
        assert_eq!(transitions.validate(&continued, &mid, &chain), Ok(()));
    }

    #[test]
    fn empty_chain_accepts_everything() {
        let transitions = BlockValidatorChain::new();
        let previous = ChainedHeader::new(header([0u8; 32], 1_600_000_000, MAX_TARGET_BITS), 7);
        let candidate = header(previous.hash, previous.time() + 600, 0x1c3f_ffc0);

        assert_eq!(
            transitions.validate(&candidate, &previous, &MemoryChain::default()),
            Ok(())
        );
    }

    struct RecordingValidator {
        calls: Arc<AtomicUsize>,
        outcome: Result<(), ValidatorError>,
    }

    impl BlockValidator for RecordingValidator {
        fn validate(
            &self,
            _header: &BlockHeader,
            _previous: &ChainedHeader,
            _chain: &dyn HeaderLookup,
        ) -> Result<(), ValidatorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome
        }
    }

    #[test]
    fn set_runs_every_rule_and_stops_on_first_rejection() {
        let first_calls = Arc::new(AtomicUsize::new(0));
        let second_calls = Arc::new(AtomicUsize::new(0));

        let mut set = BlockValidatorSet::new();
        set.add(Box::new(RecordingValidator {
            calls: Arc::clone(&first_calls),
            outcome: Ok(()),
        }));
        set.add(Box::new(RecordingValidator {
            calls: Arc::clone(&second_calls),
            outcome: Ok(()),
        }));

        let previous = ChainedHeader::new(header([0u8; 32], 1_600_000_000, MAX_TARGET_BITS), 0);
        let candidate = header(previous.hash, previous.time() + 600, MAX_TARGET_BITS);
        let chain = MemoryChain::default();

        assert_eq!(set.validate(&candidate, &previous, &chain), Ok(()));
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);

        let blocked = Arc::new(AtomicUsize::new(0));
        let mut rejecting = BlockValidatorSet::new();
        rejecting.add(Box::new(RecordingValidator {
            calls: Arc::new(AtomicUsize::new(0)),
            outcome: Err(ValidatorError::InvalidProofOfWork),
        }));
        rejecting.add(Box::new(RecordingValidator {
            calls: Arc::clone(&blocked),
            outcome: Ok(()),
        }));

        assert_eq!(
            rejecting.validate(&candidate, &previous, &chain),
            Err(ValidatorError::InvalidProofOfWork)
        );
        assert_eq!(blocked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn network_rule_sets_assemble() {
        for network in [Network::Mainnet, Network::Testnet, Network::Regtest] {
            assert!(validator_set(&network_params(network)).is_ok());
        }
    }

    #[test]
    fn mainnet_rules_accept_real_early_block() {
        let params = network_params(Network::Mainnet);
        let set = validator_set(&params).expect("rule set");

        let genesis = ChainedHeader::new(mainnet_genesis_header(), 0);
        let chain = MemoryChain::default();

        assert_eq!(
            set.validate(&mainnet_block_1_header(), &genesis, &chain),
            Ok(())
        );
    }

    #[test]
    fn mainnet_rules_check_proof_of_work_first() {
        let params = network_params(Network::Mainnet);
        let set = validator_set(&params).expect("rule set");

        let genesis = ChainedHeader::new(mainnet_genesis_header(), 0);
        let chain = MemoryChain::default();

        // Carries bits over correctly but cannot satisfy its own target.
        let mut forged = mainnet_block_1_header();
        forged.nonce = 7;
        assert_eq!(
            set.validate(&forged, &genesis, &chain),
            Err(ValidatorError::InvalidProofOfWork)
        );
    }
}
