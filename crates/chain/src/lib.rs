//! Validated header chain over the storage seam.

pub mod chain;
pub mod index;

pub use chain::{ChainError, HeaderChain};
pub use index::ChainIndex;
