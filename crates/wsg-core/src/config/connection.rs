//! Per-connection configuration

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wsg_protocol::{Role, DEFAULT_MAX_PAYLOAD_SIZE};

use super::{load_config, save_config};
use crate::error::ConfigError;

/// Configuration for a single WebSocket connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Which side of the connection we are; decides masking
    pub role: Role,

    /// Largest frame payload accepted from the peer
    pub max_payload_size: usize,

    /// Frames that may be queued for the writer before `write_and_flush`
    /// starts waiting for room
    pub outbound_capacity: usize,

    /// How long a single frame write may wait on the transport
    #[serde(rename = "write_timeout_ms", with = "duration_millis")]
    pub write_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            role: Role::Server,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            outbound_capacity: 64,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ConnectionConfig {
    /// Default configuration for the given role
    pub fn for_role(role: Role) -> Self {
        Self {
            role,
            ..Self::default()
        }
    }

    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate, then write as TOML, creating parent directories
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        save_config(path, self)
    }

    /// Reject values a connection cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_payload_size == 0 {
            return Err(ConfigError::Invalid(
                "max_payload_size must be greater than 0".into(),
            ));
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "outbound_capacity must be greater than 0".into(),
            ));
        }
        if self.write_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "write_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

// Duration as whole milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
