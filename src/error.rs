// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Error taxonomy. Configuration and topology-construction errors are surfaced to the
//! caller with a precise description and propagate as a non-zero exit; everything that
//! happens during simulation (drops, TTL expiry, link failure) is absorbed into counters.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse YAML at {path:?}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("unsupported topology.type {0:?}: only \"ai-factory-su\" is supported")]
    UnsupportedTopology(String),
    #[error("unsupported scenario.name {0:?}")]
    UnsupportedScenario(String),
    #[error("unrecognized routing mode {0:?}: expected one of ecmp, hash, adaptive, adapt")]
    UnrecognizedRoutingMode(String),
    #[error("rack_balanced allocation requires uniform rack sizes, found racks of sizes {sizes:?}")]
    NonUniformRacks { sizes: Vec<usize> },
    #[error("invalid configuration field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("link {link} already has two connected endpoints")]
    LinkAlreadyConnected { link: String },
    #[error("mixed_scenario requires an even number of hosts, got {0}")]
    OddHostCount(usize),
    #[error("expected equal split between jobs: {a} vs {b}")]
    UnequalSplit { a: usize, b: usize },
    #[error("pp_dp requires exactly 4 stages, got {0}")]
    WrongStageCount(usize),
    #[error("all stages must have equal node counts: {0:?}")]
    UnequalStageSizes(Vec<usize>),
    #[error("pp_dp participant count must be divisible by 4, got {0}")]
    NotDivisibleByFour(usize),
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
