//! # Codec Configuration
//!
//! Tuning loaded once at startup from a TOML file.
//!
//! ```toml
//! [pool]
//! min_buffer_size = 16
//! max_free_buffers = 1024
//!
//! [decompression]
//! max_attempts = 8
//! initial_ratio = 4
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::Path;

use ashwire_core::PoolConfig;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default number of decode attempts before giving up on a compressed span.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 8;

/// Default guess of decompressed size as a multiple of compressed size.
pub const DEFAULT_INITIAL_RATIO: usize = 4;

/// Complete codec configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Buffer pool sizing.
    pub pool: PoolConfig,
    /// Envelope decompression sizing.
    pub decompression: DecompressionConfig,
}

/// How the envelope sizes decompression targets when the true length is
/// not on the wire.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DecompressionConfig {
    /// Attempts (each doubling the output buffer) before `BufferTooSmall`.
    pub max_attempts: u32,
    /// First output guess is `compressed_len * initial_ratio`.
    pub initial_ratio: usize,
}

impl DecompressionConfig {
    /// First output-size guess for a compressed span of `compressed_len`.
    #[inline]
    #[must_use]
    pub fn initial_guess(&self, compressed_len: usize) -> usize {
        compressed_len.saturating_mul(self.initial_ratio.max(1))
    }
}

impl Default for DecompressionConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_ratio: DEFAULT_INITIAL_RATIO,
        }
    }
}

impl CodecConfig {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] if the text is not valid TOML or a value has
    /// the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`]
    /// if it is not a valid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), ?config, "loaded codec config");
        Ok(config)
    }
}
