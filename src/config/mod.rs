//! Configuration management for axiom-bg
//!
//! This module handles loading, parsing, and validating the background
//! configuration from TOML files. Command line arguments take precedence
//! over anything set here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::background::BackgroundSettings;
use crate::color::{parse_color, parse_color_or_black, Rgba16};
use crate::layer::DEFAULT_NAMESPACE;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/axiom/background.toml";

/// Main configuration struct containing all axiom-bg settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AxiomBgConfig {
    /// What to paint and how the surface identifies itself
    #[serde(default)]
    pub background: BackgroundConfig,

    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackgroundConfig {
    /// Background color (hex: #RRGGBB); opaque black when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    /// Layer surface namespace reported to the compositor
    #[serde(default = "BackgroundConfig::default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeneralConfig {
    /// Enable debug logging
    #[serde(default)]
    pub debug: bool,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            color: None,
            namespace: Self::default_namespace(),
        }
    }
}

impl BackgroundConfig {
    fn default_namespace() -> String {
        DEFAULT_NAMESPACE.to_string()
    }
}

/// Expand ~ to the home directory
pub fn expand_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            Ok(Path::new(&home).join(rest))
        }
        Err(_) => Ok(path.to_path_buf()),
    }
}

impl AxiomBgConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(path)?;

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: AxiomBgConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Like [`AxiomBgConfig::load`], but a missing file yields the defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let expanded_path = expand_path(&path)?;
        if !expanded_path.exists() {
            return Ok(Self::default());
        }
        Self::load(expanded_path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.background.namespace.trim().is_empty() {
            anyhow::bail!("Invalid namespace: must not be empty");
        }

        if let Some(color) = &self.background.color {
            parse_color(color).with_context(|| format!("Invalid background color: {}", color))?;
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }

    /// Resolve the run settings. A color given on the command line wins over
    /// the configured one; malformed input logs an error and paints black.
    pub fn settings(&self, cli_color: Option<&str>) -> BackgroundSettings {
        let color = match cli_color.or(self.background.color.as_deref()) {
            Some(input) => parse_color_or_black(input),
            None => Rgba16::BLACK,
        };

        BackgroundSettings {
            color,
            namespace: self.background.namespace.clone(),
        }
    }
}
