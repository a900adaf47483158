use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::p2p::liveness;

use std::time::Duration;

// For explanation, see issue: https://github.com/serde-rs/serde/issues/368
fn default_listener_ip() -> String {
    "127.0.0.1:1234".to_string()
}
fn default_heartbeat_interval_ms() -> u64 {
    liveness::HEARTBEAT_INTERVAL.as_millis() as u64
}
fn default_timeout_interval_ms() -> u64 {
    liveness::TIMEOUT_INTERVAL.as_millis() as u64
}
fn default_rtt_average_num() -> usize {
    liveness::RTT_AVERAGE_NUM
}
fn default_request_timeout_ms() -> u64 {
    1000
}
fn default_handshake_timeout_ms() -> u64 {
    500
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_listener_ip")]
    pub listener_ip: String,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    #[serde(default = "default_timeout_interval_ms")]
    pub timeout_interval_ms: u64,
    /// Number of recent round-trip samples averaged into the latency estimate.
    #[serde(default = "default_rtt_average_num")]
    pub rtt_average_num: usize,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    /// Logs every envelope at `info` level.
    #[serde(default)]
    pub debug: bool,
    /// Forward only: application messages addressed to this instance are refused.
    #[serde(default)]
    pub relay_only: bool,
    /// Start heartbeats for every peer as soon as its connection is registered.
    #[serde(default = "default_true")]
    pub track_on_connect: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            listener_ip: default_listener_ip(),
            bootstrap_peers: vec![],
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            timeout_interval_ms: default_timeout_interval_ms(),
            rtt_average_num: default_rtt_average_num(),
            request_timeout_ms: default_request_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            debug: false,
            relay_only: false,
            track_on_connect: true,
        }
    }
}

/// The timing constants of the liveness tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LivenessSettings {
    pub heartbeat_interval: Duration,
    pub timeout_interval: Duration,
    pub rtt_average_num: usize,
}

impl Default for LivenessSettings {
    fn default() -> Self {
        LivenessSettings {
            heartbeat_interval: liveness::HEARTBEAT_INTERVAL,
            timeout_interval: liveness::TIMEOUT_INTERVAL,
            rtt_average_num: liveness::RTT_AVERAGE_NUM,
        }
    }
}

const ENV_PREFIX: &str = "RELAY";

impl Settings {
    /// Loads settings from the defaults, an optional file and `RELAY_*` environment variables,
    /// in increasing order of precedence.
    pub fn new(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path));
        }
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("bootstrap_peers"),
            )
            .build()?
            .try_deserialize()
    }

    pub fn liveness(&self) -> LivenessSettings {
        LivenessSettings {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            timeout_interval: Duration::from_millis(self.timeout_interval_ms),
            rtt_average_num: self.rtt_average_num.max(1),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn defaults_match_liveness_constants() {
        let settings = Settings::default();
        assert_eq!(settings.liveness(), LivenessSettings::default());
        assert_eq!(settings.liveness().timeout_interval, Duration::from_millis(2500));
        assert_eq!(settings.liveness().heartbeat_interval, Duration::from_millis(250));
        assert_eq!(settings.liveness().rtt_average_num, 10);
        assert!(settings.track_on_connect);
        assert!(!settings.debug);
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let name = format!("relay-settings-{}.json", rand::random::<u32>());
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        let contents = br#"{
            "listener_ip": "127.0.0.1:4000",
            "bootstrap_peers": ["127.0.0.1:4001"],
            "heartbeat_interval_ms": 100,
            "relay_only": true
        }"#;
        file.write_all(contents).unwrap();

        let settings = Settings::new(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(settings.listener_ip, "127.0.0.1:4000");
        assert_eq!(settings.bootstrap_peers, vec!["127.0.0.1:4001".to_string()]);
        assert_eq!(settings.liveness().heartbeat_interval, Duration::from_millis(100));
        assert_eq!(settings.timeout_interval_ms, 2500);
        assert!(settings.relay_only);
    }
}
