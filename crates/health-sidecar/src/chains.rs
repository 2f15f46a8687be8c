//! Built-in oracle endpoints for chains the sidecar has been deployed with.
//!
//! Used only when no remote endpoints are configured explicitly.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub remote_endpoints: &'static [&'static str],
    /// Block number method when the chain does not speak `eth_blockNumber`.
    pub evm_method: Option<&'static str>,
}

pub const PRESETS: &[ChainPreset] = &[
    ChainPreset {
        id: "0005",
        name: "FUSE Mainnet",
        remote_endpoints: &["https://rpc.fuse.io/"],
        evm_method: None,
    },
    ChainPreset {
        id: "0009",
        name: "Polygon Mainnet",
        remote_endpoints: &[
            "https://polygon-rpc.com/",
            "https://rpc-mainnet.matic.network/",
            "https://matic-mainnet.chainstacklabs.com/",
        ],
        evm_method: None,
    },
    ChainPreset {
        id: "0021",
        name: "Ethereum Mainnet",
        remote_endpoints: &["https://eth-rpc.gateway.pokt.network"],
        evm_method: None,
    },
    ChainPreset {
        id: "0027",
        name: "Gnosis - xDai",
        remote_endpoints: &["https://rpc.gnosischain.com/", "https://xdai.poanetwork.dev/"],
        evm_method: None,
    },
    ChainPreset {
        id: "0040",
        name: "Harmony Shard 0",
        remote_endpoints: &["https://rpc.s0.t.hmny.io"],
        evm_method: Some("hmyv2_blockNumber"),
    },
];

pub fn preset(chain_id: &str) -> Option<&'static ChainPreset> {
    PRESETS.iter().find(|preset| preset.id == chain_id)
}
