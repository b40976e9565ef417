//! Settings file support.
//!
//! All settings live in one JSON document. Every section and every field is
//! optional; anything left out keeps its default.
//!
//! ```json
//! { "link": { "token_timeout_ms": 500 }, "device": { "strategy": "random" } }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::DeviceConfig;
use crate::link::LinkConfig;
use crate::simulate::SimConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub link: LinkConfig,
    pub device: DeviceConfig,
    pub sim: SimConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub fn parse_settings(text: &str) -> Result<Settings, serde_json::Error> {
    serde_json::from_str(text)
}

/// Reads settings from a JSON file.
pub fn load_settings(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings = parse_settings(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("settings loaded from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autoplay::Strategy;
    use std::io::Write;

    #[test]
    fn empty_document_is_all_defaults() {
        assert_eq!(parse_settings("{}").unwrap(), Settings::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let s = parse_settings(
            r#"{
                "link": { "token_timeout_ms": 500, "handshake_attempts": 8 },
                "device": { "strategy": "random" },
                "sim": { "games": 3, "map": "maps/duel.map" }
            }"#,
        )
        .unwrap();
        assert_eq!(s.link.token_timeout_ms, 500);
        assert_eq!(s.link.handshake_attempts, Some(8));
        assert_eq!(s.link.ready_attempts, None);
        assert_eq!(s.device.strategy, Strategy::Random);
        assert_eq!(s.device.max_turns, DeviceConfig::default().max_turns);
        assert_eq!(s.sim.games, 3);
        assert_eq!(s.sim.map, Some(PathBuf::from("maps/duel.map")));
        assert_eq!(s.sim.threads, SimConfig::default().threads);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"device": {{"seed": 77}}}}"#).unwrap();
        let s = load_settings(file.path()).unwrap();
        assert_eq!(s.device.seed, 77);
    }

    #[test]
    fn errors_name_the_file() {
        let err = load_settings("/nonexistent/borderlink.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/borderlink.json"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(load_settings(file.path()), Err(ConfigError::Parse { .. })));
    }
}
