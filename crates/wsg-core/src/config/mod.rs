//! Configuration management for ws-guard

mod connection;

pub use connection::ConnectionConfig;

use crate::error::ConfigError;
use std::io::ErrorKind;
use std::path::Path;

/// Parse a TOML file into `T`
pub fn load_config<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
        _ => ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    Ok(toml::from_str(&content)?)
}

/// Write `config` as TOML, creating parent directories
pub fn save_config<T: serde::Serialize>(path: &Path, config: &T) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::Invalid(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    std::fs::write(path, content)
        .map_err(|e| ConfigError::Invalid(format!("Failed to write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wsg_protocol::Role;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ws-guard.toml");

        let config = ConnectionConfig {
            role: Role::Client,
            max_payload_size: 1024,
            outbound_capacity: 8,
            write_timeout: Duration::from_millis(1500),
        };
        config.save(&path).unwrap();

        let loaded = ConnectionConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");
        let result = ConnectionConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::NotFound(p)) if p == path));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "role = \"peer\"").unwrap();
        let result = ConnectionConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_zero_payload_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "max_payload_size = 0").unwrap();
        let result = ConnectionConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
