use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::font::LoadOptions;
use crate::render::TextureLimits;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub font: FontSettings,
    #[serde(default)]
    pub texture: TextureLimits,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FontSettings {
    /// Single character drawn for characters a font lacks.
    pub replacement: Option<String>,
}

impl Config {
    /// Loads the user config file, falling back to defaults on any problem.
    pub fn load() -> Self {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Config::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Config::default();
        }

        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read config file {}: {}", path.display(), e);
                return Config::default();
            }
        };

        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to parse config file {}: {}", path.display(), e);
                Config::default()
            }
        }
    }

    pub fn load_options(&self) -> LoadOptions {
        let replacement = self.font.replacement.as_deref().and_then(|s| {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => {
                    log::warn!("Ignoring replacement '{}': expected a single character", s);
                    None
                }
            }
        });
        LoadOptions { replacement }
    }

    /// Texture limits, with invalid settings replaced by the defaults.
    pub fn texture_limits(&self) -> TextureLimits {
        match self.texture.validate() {
            Ok(()) => self.texture,
            Err(e) => {
                log::warn!("Ignoring texture limits: {}", e);
                TextureLimits::default()
            }
        }
    }
}

fn config_file_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join("dsfont").join("config.toml"))
}
