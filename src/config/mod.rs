// src/config/mod.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::annotation::connection::{AddressSource, ConnectionPolicy, DEFAULT_ADDRESS_VARS, NSP_COUNT};
use crate::annotation::relay::{MAX_RELAY_TIMEOUT, MIN_RELAY_TIMEOUT};

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub nsp: NspConfig,
    pub relay: RelayConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NspConfig {
    /// Environment variables holding the NSP addresses, NSP-1 first.
    pub address_vars: [String; NSP_COUNT],
    pub connection_policy: ConnectionPolicy,
}

impl NspConfig {
    pub fn address_source(&self) -> AddressSource {
        AddressSource::env(self.address_vars.clone())
    }
}

impl Default for NspConfig {
    fn default() -> Self {
        Self {
            address_vars: DEFAULT_ADDRESS_VARS.map(String::from),
            connection_policy: ConnectionPolicy::KeepPartial,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct RelayConfig {
    pub url: String,
    pub timeout_ms: u64, // clamped to 50..=1000
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
            .clamp(MIN_RELAY_TIMEOUT, MAX_RELAY_TIMEOUT)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:5000".to_string(),
            timeout_ms: 1000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Nsp,
    Relay,
    Disabled, // comments switched off for this run
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub backend: BackendKind,
    pub task: String,
    pub ledger_path: PathBuf,
    pub event_log: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Nsp,
            task: "InstrWM".to_string(),
            ledger_path: PathBuf::from("../patientData/neuralLogs/sub-000_log.csv"),
            event_log: None,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file: {}", e))?;

    serde_yaml::from_str(&config_str)
        .map_err(|e| format!("Failed to parse config file: {}", e))
}

pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<(), String> {
    let yaml = serde_yaml::to_string(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    fs::write(path, yaml)
        .map_err(|e| format!("Failed to write config file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml::from_str(
            "relay:\n  url: http://relay.local:8000\nsession:\n  backend: relay\n  task: Training\n",
        )
        .unwrap();

        assert_eq!(config.relay.url, "http://relay.local:8000");
        assert_eq!(config.relay.timeout_ms, 1000);
        assert_eq!(config.session.backend, BackendKind::Relay);
        assert_eq!(config.session.task, "Training");
        assert_eq!(config.nsp.address_vars, ["NSP1_IP", "NSP2_IP"]);
        assert_eq!(config.nsp.connection_policy, ConnectionPolicy::KeepPartial);
    }

    #[test]
    fn relay_timeout_never_exceeds_a_second() {
        let relay = RelayConfig {
            timeout_ms: 5000,
            ..RelayConfig::default()
        };
        assert_eq!(relay.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn zero_relay_timeout_is_raised_to_the_floor() {
        let relay: RelayConfig = serde_yaml::from_str("timeout_ms: 0\n").unwrap();
        assert_eq!(relay.timeout(), Duration::from_millis(50));
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("annotator.yaml");

        let mut config = Config::default();
        config.nsp.connection_policy = ConnectionPolicy::FailTogether;
        config.session.event_log = Some(PathBuf::from("logs/events.tsv"));
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.nsp.connection_policy, ConnectionPolicy::FailTogether);
        assert_eq!(loaded.session.event_log, Some(PathBuf::from("logs/events.tsv")));
    }

    #[test]
    fn unreadable_config_reports_why() {
        let err = load_config("/definitely/not/here.yaml").unwrap_err();
        assert!(err.starts_with("Failed to read config file"));
    }
}
