use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default tolerance window, matching `cue_monitor::RANGE_FACTOR`.
fn default_tolerance() -> u64 {
    crate::cue_monitor::RANGE_FACTOR
}

/// Default networking lookahead: fetch five seconds ahead of the cue.
fn default_networking_ahead() -> u64 {
    5_000
}

/// Configuration surface consumed by the core for one playback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Content timestamps (ms) at which ad breaks begin, ascending.
    #[serde(default)]
    pub cue_points: Vec<u64>,
    /// How far ahead of a cue point to start the metadata fetch (ms).
    #[serde(default = "default_networking_ahead")]
    pub networking_ahead_millis: u64,
    /// Half-width of the progress matching window (ms).
    #[serde(default = "default_tolerance")]
    pub tolerance_window_millis: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            cue_points: Vec::new(),
            networking_ahead_millis: default_networking_ahead(),
            tolerance_window_millis: default_tolerance(),
        }
    }
}

impl SessionConfig {
    /// Check the invariants the scheduler relies on. Called before a config
    /// is handed to a session; violations are rejected, never corrected.
    pub fn validate(&self) -> Result<(), String> {
        for pair in self.cue_points.windows(2) {
            if pair[1] <= pair[0] {
                return Err(format!(
                    "cue_points must be strictly ascending: {} followed by {}",
                    pair[0], pair[1]
                ));
            }
        }
        Ok(())
    }

    /// Load a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let data = fs::read_to_string(path)
            .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
        let config: SessionConfig = serde_json::from_str(&data)
            .map_err(|e| format!("Invalid config '{}': {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Persist to JSON.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::default();
        assert!(config.cue_points.is_empty());
        assert_eq!(config.networking_ahead_millis, 5_000);
        assert_eq!(config.tolerance_window_millis, 1_500);
    }

    #[test]
    fn defaults_fill_missing_json_fields() {
        let config: SessionConfig = serde_json::from_str(r#"{"cue_points":[1000]}"#).unwrap();
        assert_eq!(config.cue_points, vec![1_000]);
        assert_eq!(config.networking_ahead_millis, 5_000);
        assert_eq!(config.tolerance_window_millis, 1_500);
    }

    #[test]
    fn validate_rejects_unsorted() {
        let config = SessionConfig {
            cue_points: vec![10_000, 5_000],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_duplicates() {
        let config = SessionConfig {
            cue_points: vec![5_000, 5_000],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let config = SessionConfig {
            cue_points: vec![10_000, 60_000, 120_000],
            networking_ahead_millis: 2_000,
            tolerance_window_millis: 1_000,
        };
        config.save(&path).unwrap();
        let loaded = SessionConfig::load(&path).unwrap();
        assert_eq!(loaded.cue_points, config.cue_points);
        assert_eq!(loaded.networking_ahead_millis, 2_000);
        assert_eq!(loaded.tolerance_window_millis, 1_000);
    }

    #[test]
    fn load_rejects_invalid_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"cue_points":[9000, 3000]}"#).unwrap();
        assert!(SessionConfig::load(&path).is_err());
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(SessionConfig::load(Path::new("__nope__.json")).is_err());
    }
}
