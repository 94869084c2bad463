use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::ThemeManager;

/// Contents of `theme.toml`: the last theme picked with `t`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub theme: Option<String>,
}

pub struct ThemeLoader {
    config_path: PathBuf,
}

impl ThemeLoader {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("flowscope")
            .join("theme.toml")
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<ThemeConfig> {
        if !self.config_path.exists() {
            return Ok(ThemeConfig::default());
        }

        let contents = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read theme file {:?}", self.config_path))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse theme file {:?}", self.config_path))
    }

    pub fn save_theme_name(&self, theme_name: &str) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let config = ThemeConfig {
            theme: Some(theme_name.to_string()),
        };
        let contents = toml::to_string_pretty(&config).context("Failed to serialize theme")?;

        fs::write(&self.config_path, contents)
            .with_context(|| format!("Failed to write theme file {:?}", self.config_path))
    }

    /// The saved theme takes precedence over `configured`, the `tui.theme`
    /// setting.
    pub fn initialize_theme_manager(&self, configured: &str) -> ThemeManager {
        let mut manager = ThemeManager::new();

        let saved = match self.load() {
            Ok(config) => config.theme,
            Err(e) => {
                tracing::warn!("{:#}", e);
                None
            }
        };

        let wanted = saved.as_deref().unwrap_or(configured);
        if !manager.set_theme_by_name(wanted) {
            tracing::warn!(
                "Theme '{}' not found, using '{}'",
                wanted,
                manager.current_theme_name()
            );
        }

        manager
    }
}

impl Default for ThemeLoader {
    fn default() -> Self {
        Self::new()
    }
}
