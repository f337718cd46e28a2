//! Engine configuration.
//!
//! Everything the real-time side needs to size its buffers up front lives
//! here: the audio format, the worst-case delay time, and the channel
//! capacities. All allocation happens at construction and schedule-compile
//! time against these numbers, never on the audio thread.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML.
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A field holds a value the engine cannot run with.
    #[error("invalid config: {field}: {reason}")]
    InvalidValue {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Fixed parameters of an engine instance.
///
/// # TOML Format
///
/// ```toml
/// sample_rate = 48000
/// block_size = 256
/// max_delay_secs = 10.0
/// command_capacity = 256
/// feedback_capacity = 64
/// ```
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Frames per processing block.
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Longest delay time a delay node can be asked for, in seconds. Sizes
    /// every delay ring buffer.
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f32,

    /// Capacity of the editor→engine command channel.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Capacity of the engine→editor feedback channel.
    #[serde(default = "default_feedback_capacity")]
    pub feedback_capacity: usize,
}

fn default_sample_rate() -> u32 {
    48_000
}

fn default_block_size() -> usize {
    256
}

fn default_max_delay_secs() -> f32 {
    10.0
}

fn default_command_capacity() -> usize {
    256
}

fn default_feedback_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_rate: default_sample_rate(),
            block_size: default_block_size(),
            max_delay_secs: default_max_delay_secs(),
            command_capacity: default_command_capacity(),
            feedback_capacity: default_feedback_capacity(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a config from a TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Check that the engine can actually run with these values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::invalid("sample_rate", "must be positive"));
        }
        if self.block_size == 0 {
            return Err(ConfigError::invalid("block_size", "must be positive"));
        }
        if !self.max_delay_secs.is_finite() || self.max_delay_secs <= 0.0 {
            return Err(ConfigError::invalid(
                "max_delay_secs",
                format!("must be positive and finite, got {}", self.max_delay_secs),
            ));
        }
        if self.command_capacity == 0 {
            return Err(ConfigError::invalid("command_capacity", "must be positive"));
        }
        if self.feedback_capacity == 0 {
            return Err(ConfigError::invalid(
                "feedback_capacity",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Ring buffer capacity for one delay node, in frames.
    ///
    /// `max_delay_secs` worth of signal plus one block of headroom, so a
    /// block can be written ahead of reads without ever overtaking a read
    /// position at the maximum delay.
    pub fn delay_ring_capacity(&self) -> usize {
        (self.max_delay_secs as f64 * f64::from(self.sample_rate)).ceil() as usize
            + self.block_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.block_size, 256);
    }

    #[test]
    fn test_partial_document_overrides() {
        let config = EngineConfig::from_toml_str("sample_rate = 44100\nblock_size = 128\n")
            .unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.block_size, 128);
        assert_eq!(config.max_delay_secs, 10.0);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let err = EngineConfig::from_toml_str("block_size = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "block_size",
                ..
            }
        ));
    }

    #[test]
    fn test_negative_delay_rejected() {
        let err = EngineConfig::from_toml_str("max_delay_secs = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = EngineConfig::from_toml_str("sample_rate = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn test_delay_ring_capacity_includes_block_headroom() {
        let config = EngineConfig {
            sample_rate: 48_000,
            block_size: 256,
            max_delay_secs: 10.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.delay_ring_capacity(), 480_256);
    }
}
