use serde::{Deserialize, Serialize};

use crate::ids::{BackendId, GatewayId, StageId};

/// A named upstream service of a gateway. Its per-stage wiring lives in
/// [`BackendConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Backend {
    pub id: BackendId,
    pub gateway_id: GatewayId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            Self::Http => 80,
            Self::Https => 443,
        }
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadBalance {
    #[default]
    RoundRobin,
    WeightedRoundRobin,
}

impl LoadBalance {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RoundRobin => "roundrobin",
            Self::WeightedRoundRobin => "weighted_roundrobin",
        }
    }
}

/// One upstream host. `host` may contain `{env.NAME}` placeholders and an
/// optional `:port` suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendHost {
    #[serde(default)]
    pub scheme: Scheme,
    pub host: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    100
}

/// How a backend is wired for one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend_id: BackendId,
    pub stage_id: StageId,
    #[serde(default)]
    pub hosts: Vec<BackendHost>,
    #[serde(default)]
    pub loadbalance: LoadBalance,
    /// Upstream timeout in seconds, applied to connect/send/read.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    60
}

/// Split a rendered `host[:port]` into its parts.
///
/// Returns a human-readable reason when the host is malformed.
pub fn parse_host_port(raw: &str) -> Result<(String, Option<u16>), String> {
    if raw.is_empty() {
        return Err("host is empty".into());
    }
    if raw.contains("://") || raw.contains('/') {
        return Err("host must not contain a scheme or path".into());
    }
    let (host, port) = match raw.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| format!("port {port:?} is not a number in 1..=65535"))?;
            if port == 0 {
                return Err("port 0 is not allowed".into());
            }
            (host, Some(port))
        }
        None => (raw, None),
    };
    if host.is_empty() {
        return Err("host is empty".into());
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    {
        return Err(format!("host {host:?} contains invalid characters"));
    }
    Ok((host.to_owned(), port))
}
