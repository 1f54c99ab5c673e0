//! Proof-of-work checks and difficulty transition rules.

pub mod difficulty;
pub mod validation;
