use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::paths::{APP_DIR, SETTINGS_FILE};
use crate::constants::title::DEFAULT_MIN_SEGMENT_LENGTH;
use crate::slow_mover::MoverSettings;

/// User settings, persisted as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where spot files live; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    // Cursor movement
    #[serde(default)]
    pub slow_move_enabled: bool,
    /// Maximum pixels per axis per tick
    #[serde(default = "default_slow_move_distance")]
    pub slow_move_distance: u32,
    #[serde(default = "default_slow_move_tick_ms")]
    pub slow_move_tick_ms: u64,
    #[serde(default = "default_click_hold_ms")]
    pub click_hold_ms: u64,
    #[serde(default = "default_drag_release_delay_ms")]
    pub drag_release_delay_ms: u64,

    // Pattern suggestions
    #[serde(default = "default_min_segment_length")]
    pub min_segment_length: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_slow_move_distance() -> u32 {
    200
}

fn default_slow_move_tick_ms() -> u64 {
    16
}

fn default_click_hold_ms() -> u64 {
    16
}

fn default_drag_release_delay_ms() -> u64 {
    50
}

fn default_min_segment_length() -> usize {
    DEFAULT_MIN_SEGMENT_LENGTH
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: None,
            slow_move_enabled: false,
            slow_move_distance: default_slow_move_distance(),
            slow_move_tick_ms: default_slow_move_tick_ms(),
            click_hold_ms: default_click_hold_ms(),
            drag_release_delay_ms: default_drag_release_delay_ms(),
            min_segment_length: default_min_segment_length(),
        }
    }
}

impl Settings {
    pub fn path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(APP_DIR);
        path.push(SETTINGS_FILE);
        path
    }

    /// Load from `path` (or the default location), creating the file with
    /// defaults on first run
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::path);

        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, creating default");
            let settings = Settings::default();
            settings.save_to(&path)?;
            return Ok(settings);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        let mut settings: Settings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse JSON from {:?}", path))?;
        settings.validate_and_clamp();

        info!(path = %path.display(), "Loaded settings");
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize settings to JSON")?;
        fs::write(path, json).with_context(|| format!("Failed to write settings to {:?}", path))?;
        info!(path = %path.display(), "Saved settings");
        Ok(())
    }

    /// Configured data dir, else the platform data dir
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push(APP_DIR);
            path
        })
    }

    pub fn mover_settings(&self) -> MoverSettings {
        MoverSettings {
            max_step: self.slow_move_distance,
            tick: Duration::from_millis(self.slow_move_tick_ms),
            click_hold: self.click_hold(),
        }
    }

    pub fn click_hold(&self) -> Duration {
        Duration::from_millis(self.click_hold_ms)
    }

    pub fn drag_release_delay(&self) -> Duration {
        Duration::from_millis(self.drag_release_delay_ms)
    }

    /// Clamp loaded values into their supported ranges
    fn validate_and_clamp(&mut self) {
        use crate::constants::validation::*;

        if self.slow_move_distance < MIN_SLOW_MOVE_DISTANCE {
            warn!(slow_move_distance = self.slow_move_distance, using = default_slow_move_distance(), "slow_move_distance below minimum, using default");
            self.slow_move_distance = default_slow_move_distance();
        } else if self.slow_move_distance > MAX_SLOW_MOVE_DISTANCE {
            warn!(slow_move_distance = self.slow_move_distance, max = MAX_SLOW_MOVE_DISTANCE, "slow_move_distance exceeds maximum, clamping");
            self.slow_move_distance = MAX_SLOW_MOVE_DISTANCE;
        }

        if self.slow_move_tick_ms < MIN_TICK_MS {
            warn!(slow_move_tick_ms = self.slow_move_tick_ms, min = MIN_TICK_MS, "slow_move_tick_ms below minimum, clamping");
            self.slow_move_tick_ms = MIN_TICK_MS;
        } else if self.slow_move_tick_ms > MAX_TICK_MS {
            warn!(slow_move_tick_ms = self.slow_move_tick_ms, max = MAX_TICK_MS, "slow_move_tick_ms exceeds maximum, clamping");
            self.slow_move_tick_ms = MAX_TICK_MS;
        }

        if self.click_hold_ms > MAX_CLICK_HOLD_MS {
            warn!(click_hold_ms = self.click_hold_ms, max = MAX_CLICK_HOLD_MS, "click_hold_ms exceeds maximum, clamping");
            self.click_hold_ms = MAX_CLICK_HOLD_MS;
        }

        if self.drag_release_delay_ms > MAX_DRAG_RELEASE_DELAY_MS {
            warn!(drag_release_delay_ms = self.drag_release_delay_ms, max = MAX_DRAG_RELEASE_DELAY_MS, "drag_release_delay_ms exceeds maximum, clamping");
            self.drag_release_delay_ms = MAX_DRAG_RELEASE_DELAY_MS;
        }

        if self.min_segment_length < MIN_SEGMENT_LENGTH {
            warn!(min_segment_length = self.min_segment_length, min = MIN_SEGMENT_LENGTH, "min_segment_length below minimum, clamping");
            self.min_segment_length = MIN_SEGMENT_LENGTH;
        } else if self.min_segment_length > MAX_SEGMENT_LENGTH {
            warn!(min_segment_length = self.min_segment_length, max = MAX_SEGMENT_LENGTH, "min_segment_length exceeds maximum, clamping");
            self.min_segment_length = MAX_SEGMENT_LENGTH;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.is_file());
        assert_eq!(Settings::load(Some(&path)).unwrap(), settings);
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"slow_move_enabled": true, "data_dir": "/tmp/spots"}"#).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert!(settings.slow_move_enabled);
        assert_eq!(settings.slow_move_distance, 200);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.resolved_data_dir(), PathBuf::from("/tmp/spots"));
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{"slow_move_distance": 0, "slow_move_tick_ms": 99999, "click_hold_ms": 5000,
                "drag_release_delay_ms": 60000, "min_segment_length": 0}"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.slow_move_distance, 200);
        assert_eq!(settings.slow_move_tick_ms, 1_000);
        assert_eq!(settings.click_hold_ms, 1_000);
        assert_eq!(settings.drag_release_delay_ms, 5_000);
        assert_eq!(settings.min_segment_length, 1);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ nope").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_mover_settings_durations() {
        let settings = Settings {
            slow_move_distance: 50,
            slow_move_tick_ms: 10,
            click_hold_ms: 20,
            ..Settings::default()
        };
        let mover = settings.mover_settings();
        assert_eq!(mover.max_step, 50);
        assert_eq!(mover.tick, Duration::from_millis(10));
        assert_eq!(mover.click_hold, Duration::from_millis(20));
    }
}
