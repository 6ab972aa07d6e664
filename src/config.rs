// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! YAML configuration document: one set of structs mirroring the recognized sections and
//! keys exactly, loaded with `deny_unknown_fields` so a typo surfaces immediately.

use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::node::RoutingMode;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub file_debug: bool,
    #[serde(default)]
    pub message_verbose: bool,
    #[serde(default)]
    pub verbose_route: bool,
    #[serde(default)]
    pub visualize: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    pub mode: String,
    #[serde(default)]
    pub ecmp_flowlet_n_packets: u32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BandwidthConfig {
    pub server_to_leaf: f64,
    pub leaf_to_spine: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinksConfig {
    pub failure_percent: f64,
    pub bandwidth_bps: BandwidthConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AiFactorySuConfig {
    pub leaves: u32,
    pub spines: u32,
    pub servers_per_leaf: u32,
    pub server_parallel_links: u32,
    pub leaf_to_spine_parallel_links: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub max_path: u32,
    pub mtu: u32,
    pub ttl: u32,
    #[serde(default)]
    pub seed: u64,
    pub routing: RoutingConfig,
    pub links: LinksConfig,
    pub ai_factory_su: AiFactorySuConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub params: serde_yaml::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    pub run: RunConfig,
    pub topology: TopologyConfig,
    pub scenario: ScenarioConfig,
}

impl RootConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: RootConfig = serde_yaml::from_str(&text).map_err(|source| ConfigError::Yaml {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.topology.kind != "ai-factory-su" {
            return Err(ConfigError::UnsupportedTopology(self.topology.kind.clone()));
        }
        if RoutingMode::parse(&self.topology.routing.mode).is_none() {
            return Err(ConfigError::UnrecognizedRoutingMode(self.topology.routing.mode.clone()));
        }
        match self.scenario.name.as_str() {
            "ai-factory-su-workload1-dp-heavy" | "ai-factory-su-mixed_scenario" => {}
            other => return Err(ConfigError::UnsupportedScenario(other.to_string())),
        }
        Ok(())
    }
}
