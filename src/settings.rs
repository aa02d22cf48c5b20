//! Client settings with persistence
//!
//! Settings are saved to `~/.config/tessera/settings.toml`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tessera_core::TimeConfig;
use tessera_game::{CharacterAssets, LocomotionConfig, MovementConfig};
use tessera_world::ChunkConfig;
use tracing::{info, warn};

/// All client settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client: ClientSettings,
    pub time: TimeConfig,
    pub chunks: ChunkConfig,
    pub character: CharacterAssets,
    pub locomotion: LocomotionConfig,
    pub movement: MovementConfig,
}

impl Settings {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tessera"))
    }

    /// Get the settings file path
    fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("settings.toml"))
    }

    /// Load settings from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            warn!("Could not determine config directory");
            return Self::default();
        };

        if !path.exists() {
            info!("No settings file found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse settings: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Whether a settings file is already on disk
    pub fn exists() -> bool {
        Self::settings_path().is_some_and(|p| p.exists())
    }

    /// Save settings to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::settings_path() else {
            anyhow::bail!("Could not determine config directory");
        };
        self.save_to(&path)
    }

    fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// Settings for the headless client binary itself
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Default log level; `RUST_LOG` overrides it
    pub log_level: String,
    /// Directory that asset paths are resolved against
    pub asset_root: PathBuf,
    /// Fetch assets over HTTP from this base URL instead of disk
    pub asset_url: Option<String>,
    /// JSON content manifest; the built-in chunk set is used when absent
    pub manifest: Option<PathBuf>,
    /// How long the scripted session runs, in simulated seconds
    pub run_seconds: f32,
    /// Load the chunks around the spawn point before the first tick
    pub preload_chunks: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            asset_root: PathBuf::from("assets"),
            asset_url: None,
            manifest: None,
            run_seconds: 12.0,
            preload_chunks: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings = Settings::parse(
            r#"
            [client]
            run_seconds = 3.0

            [chunks]
            load_radius = 4
            unload_radius = 6
            "#,
        )
        .unwrap();
        assert_eq!(settings.client.run_seconds, 3.0);
        assert_eq!(settings.client.log_level, "info");
        assert_eq!(settings.chunks.load_radius, 4);
        assert_eq!(settings.chunks.chunk_size, 64.0);
        assert_eq!(settings.movement, MovementConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(Settings::parse("[client\nrun_seconds = ").is_err());
    }

    #[test]
    fn saved_file_loads_back() {
        let dir = std::env::temp_dir().join(format!("tessera-settings-{}", std::process::id()));
        let path = dir.join("nested").join("settings.toml");

        let mut settings = Settings::default();
        settings.client.run_seconds = 7.5;
        settings.chunks.load_radius = 3;
        settings.save_to(&path).unwrap();

        let loaded = Settings::parse(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.client.run_seconds, 7.5);
        assert_eq!(loaded.chunks.load_radius, 3);
        assert_eq!(loaded.movement, settings.movement);

        fs::remove_dir_all(&dir).unwrap();
    }
}
