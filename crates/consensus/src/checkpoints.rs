//! Baked sync checkpoints.
//!
//! Each record is the hex encoding of `height (u32, little-endian)`
//! followed by the 80-byte serialized block header at that height. The
//! `early` record anchors conservative full peer sync; the `latest`
//! record anchors API-assisted restores close to the present. Records
//! sit on retarget interval boundaries so difficulty validation never
//! needs headers older than the anchor.

use crate::params::Network;

#[derive(Clone, Copy, Debug)]
pub struct CheckpointData {
    pub early: &'static str,
    pub latest: &'static str,
}

pub fn checkpoint_data(network: Network) -> CheckpointData {
    match network {
        Network::Mainnet => CheckpointData {
            early: MAINNET_EARLY,
            latest: MAINNET_LATEST,
        },
        Network::Testnet => CheckpointData {
            early: TESTNET_EARLY,
            latest: TESTNET_LATEST,
        },
        Network::Regtest => CheckpointData {
            early: REGTEST_GENESIS,
            latest: REGTEST_GENESIS,
        },
    }
}

/// Height 403200, opened 2016-03-29.
const MAINNET_EARLY: &str = "00270600000000206e181ea803da63dd45629ed57b45b3c544ec0c19026d190000000000000000008424aa206642888ad0f0608fc853f74445d0b91097a9e990b1ce72da2634fda744f6fa569fb906188e98f234";

/// Height 844704, opened 2024-05-21.
const MAINNET_LATEST: &str = "a0e30c0000000020ecce95bc7d6262c2def0171f4cbe0bc588f00701ce6c01000000000000000000586d3d9386787f33dfd48bf90662630796b625123d1986fae5aacfd523009a1bf8bd4c6619420317e12c77d5";

/// Height 2318400, opened 2022-07-01.
const TESTNET_EARLY: &str = "4060230000000020d737c40cd4c9688733b3a282fb6bae842d01450c28f10f52069a2400000000008f7454d3f1e68c885cd9a8a186b71866df8905f523acb70c5eafd814961023170039be62ffff001d2238f2fd";

/// Height 2874816, opened 2024-06-12.
const TESTNET_LATEST: &str = "c0dd2b00000000204e8349c8954d54ee8157a9a2b241a84c650f70e0031779d40a39ce01000000001d023dd729dae93e50a21d45cfb07d0fa1b157412047e95d71c371ddab05842800e56866ffff001d05d1e26f";

/// Regtest has no meaningful history to skip; both anchors are genesis.
const REGTEST_GENESIS: &str = "000000000100000000000000000000000000000000000000000000000000000000000000000000003ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4adae5494dffff7f2002000000";
