use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::ConfigError;

/// Smallest compressed input buffer that still holds the longest MPEG audio frame
pub const MIN_INPUT_BUFFER_SIZE: usize = 4096;

/// Decoder configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    /// Size of the compressed-byte buffer the session refills from the byte source
    pub input_buffer_size: usize,
    /// Count frames with a header-only pass when headers carry no exact length
    pub forward_scan: bool,
    /// Consecutive recoverable desyncs tolerated before the stream is treated as broken
    pub max_consecutive_errors: u32,
    pub log_level: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            input_buffer_size: 16 * 1024,
            forward_scan: true,
            max_consecutive_errors: 64,
            log_level: "warn".to_string(),
        }
    }
}

impl DecoderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.input_buffer_size < MIN_INPUT_BUFFER_SIZE {
            return Err(format!(
                "input_buffer_size {} is below the minimum of {} bytes",
                self.input_buffer_size, MIN_INPUT_BUFFER_SIZE
            ));
        }
        if self.max_consecutive_errors == 0 {
            return Err("max_consecutive_errors must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration manager for loading and saving settings
pub struct ConfigManager {
    config: DecoderConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path()?;
        let config = Self::load_config(&config_path).unwrap_or_default();

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Manager bound to an explicit file instead of the per-user location
    pub fn with_path(config_path: PathBuf) -> Result<Self, ConfigError> {
        let config = Self::load_config(&config_path)?;
        Ok(Self {
            config,
            config_path,
        })
    }

    pub fn get_config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn update_config<F>(&mut self, updater: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut DecoderConfig),
    {
        updater(&mut self.config);
        self.save_config()
    }

    pub fn set_input_buffer_size(&mut self, size: usize) -> Result<(), ConfigError> {
        self.config.input_buffer_size = size.max(MIN_INPUT_BUFFER_SIZE);
        self.save_config()
    }

    pub fn set_forward_scan(&mut self, enabled: bool) -> Result<(), ConfigError> {
        self.config.forward_scan = enabled;
        self.save_config()
    }

    pub fn set_log_level(&mut self, level: String) -> Result<(), ConfigError> {
        self.config.log_level = level;
        self.save_config()
    }

    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.config = DecoderConfig::default();
        self.save_config()
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::home_dir()
            .ok_or(ConfigError::ConfigDirNotFound)?
            .join(".config")
            .join("gapless-decoder");

        std::fs::create_dir_all(&config_dir)?;

        Ok(config_dir.join("config.toml"))
    }

    fn load_config(path: &Path) -> Result<DecoderConfig, ConfigError> {
        if !path.exists() {
            return Ok(DecoderConfig::default());
        }

        let config_content = std::fs::read_to_string(path)?;
        let config: DecoderConfig = toml::from_str(&config_content)?;

        Ok(config)
    }

    fn save_config(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let config_content = toml::to_string_pretty(&self.config)?;
        std::fs::write(&self.config_path, config_content)?;

        Ok(())
    }
}
