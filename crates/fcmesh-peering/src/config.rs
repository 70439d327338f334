//! Controller tuning, loadable from TOML.

use serde::Deserialize;

use crate::peer::Millis;

/// Timing constants of the peer lifecycle, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tuning {
    /// Silence after which a peer is regarded as unresponsive.
    #[serde(default = "default_unresponsive_after")]
    pub unresponsive_after_ms: Millis,

    /// Silence after which a peer is "lazy" and should be pinged.
    #[serde(default = "default_ping_after")]
    pub ping_after_ms: Millis,

    /// Period of the ping tick.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: Millis,

    /// How long to wait for a switch-ping response.
    #[serde(default = "default_ping_timeout")]
    pub ping_timeout_ms: Millis,

    /// Silence after which an unresponsive *incoming* peer is forgotten
    /// entirely.
    #[serde(default = "default_forget_after")]
    pub forget_after_ms: Millis,

    /// Period of the beacon tick.
    #[serde(default = "default_beacon_interval")]
    pub beacon_interval_ms: Millis,
}

fn default_unresponsive_after() -> Millis {
    20 * 1024
}

fn default_ping_after() -> Millis {
    3 * 1024
}

fn default_ping_interval() -> Millis {
    1024
}

fn default_ping_timeout() -> Millis {
    2 * 1024
}

fn default_forget_after() -> Millis {
    256 * 1024
}

fn default_beacon_interval() -> Millis {
    32_768
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            unresponsive_after_ms: default_unresponsive_after(),
            ping_after_ms: default_ping_after(),
            ping_interval_ms: default_ping_interval(),
            ping_timeout_ms: default_ping_timeout(),
            forget_after_ms: default_forget_after(),
            beacon_interval_ms: default_beacon_interval(),
        }
    }
}

impl Tuning {
    /// Parse a `[peering]`-style TOML table.
    pub fn parse(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }
}
