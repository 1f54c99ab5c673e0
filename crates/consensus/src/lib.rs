//! Network constants, parameters, and baked sync checkpoints.

pub mod checkpoints;
pub mod constants;
pub mod params;

pub use checkpoints::{checkpoint_data, CheckpointData};
pub use params::{
    bytes_from_hex, hash256_from_hex, network_params, Hash256, HexError, Network, NetworkParams,
};
