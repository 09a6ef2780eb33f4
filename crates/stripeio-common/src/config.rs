//! Configuration types for StripeIO
//!
//! Configuration is read from a TOML file. Every field has a default so a
//! partial file, or no file at all, yields a usable configuration.

use crate::error::{Error, Result};
use crate::types::CodeParams;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration for StripeIO tools
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Code shape and arithmetic backend
    #[serde(default)]
    pub code: CodeConfig,
    /// Dataset and erasure simulation
    #[serde(default)]
    pub workload: WorkloadConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Erasure code configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeConfig {
    /// Number of source fragments (k)
    #[serde(default = "default_data_fragments")]
    pub data_fragments: usize,
    /// Number of parity fragments (p)
    #[serde(default = "default_parity_fragments")]
    pub parity_fragments: usize,
    /// GF(256) backend name ("auto", "split", "product")
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            data_fragments: default_data_fragments(),
            parity_fragments: default_parity_fragments(),
            backend: default_backend(),
        }
    }
}

/// Workload configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Size of one fragment page in bytes
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Total amount of source data in bytes
    #[serde(default = "default_dataset_size")]
    pub dataset_size: u64,
    /// Fragment indices to erase, in recovery order
    #[serde(default)]
    pub erasures: Vec<usize>,
    /// Seed for data fill and random parameter selection
    #[serde(default)]
    pub seed: Option<u64>,
    /// Dispatch pages across worker threads
    #[serde(default)]
    pub parallel: bool,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            dataset_size: default_dataset_size(),
            erasures: Vec::new(),
            seed: None,
            parallel: false,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_data_fragments() -> usize {
    10
}

const fn default_parity_fragments() -> usize {
    4
}

fn default_backend() -> String {
    "auto".to_string()
}

const fn default_page_size() -> usize {
    4096
}

const fn default_dataset_size() -> u64 {
    40 * 1024 * 1024 // 40 MiB, whole stripes of 4 KiB pages for every k up to 10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    /// Returns [`Error::Deserialization`] if the text is not valid TOML or
    /// does not match the schema.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Load a configuration file, falling back to defaults if it does not exist
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Validated code parameters
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] for out-of-range `k`/`p`.
    pub fn code_params(&self) -> Result<CodeParams> {
        CodeParams::new(self.code.data_fragments, self.code.parity_fragments)
    }

    /// Check the workload against the code shape
    ///
    /// The dataset must split into whole pages of `k` fragments.
    ///
    /// # Errors
    /// Returns [`Error::Configuration`] describing the first problem found.
    pub fn validate(&self) -> Result<CodeParams> {
        let params = self.code_params()?;
        let page_size = self.workload.page_size;
        if page_size == 0 {
            return Err(Error::configuration("page_size must be > 0"));
        }
        let stripe = (page_size as u64)
            .checked_mul(params.data_fragments() as u64)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "page_size {page_size} * k {} overflows",
                    params.data_fragments()
                ))
            })?;
        if self.workload.dataset_size == 0 || self.workload.dataset_size % stripe != 0 {
            return Err(Error::configuration(format!(
                "dataset_size {} is not a non-zero multiple of page_size * k = {}",
                self.workload.dataset_size, stripe
            )));
        }
        Ok(params)
    }

    /// Number of pages in the configured dataset
    #[must_use]
    pub fn page_count(&self) -> u64 {
        (self.workload.page_size as u64)
            .checked_mul(self.code.data_fragments as u64)
            .and_then(|stripe| self.workload.dataset_size.checked_div(stripe))
            .unwrap_or(0)
    }
}

/// Parse a human-readable size string (e.g. "4096", "4K", "2M", "3G") into bytes
///
/// # Errors
/// Returns [`Error::InvalidArgument`] for malformed input or overflow.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let (num, multiplier) = if let Some(n) = s.strip_suffix(['G', 'g']) {
        (n, 1024 * 1024 * 1024)
    } else if let Some(n) = s.strip_suffix(['M', 'm']) {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix(['K', 'k']) {
        (n, 1024)
    } else {
        (s, 1)
    };
    let value: u64 = num
        .trim()
        .parse()
        .map_err(|_| Error::invalid_argument(format!("invalid size: '{s}'")))?;
    value
        .checked_mul(multiplier)
        .ok_or_else(|| Error::invalid_argument(format!("size overflows: '{s}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.code.data_fragments, 10);
        assert_eq!(config.code.parity_fragments, 4);
        assert_eq!(config.code.backend, "auto");
        assert_eq!(config.workload.page_size, 4096);
        assert!(config.workload.erasures.is_empty());
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = Config::from_toml_str(
            r#"
            [code]
            data_fragments = 8
            parity_fragments = 2

            [workload]
            erasures = [3, 9]
            seed = 42
            "#,
        )
        .unwrap();

        assert_eq!(config.code_params().unwrap(), CodeParams::EC_8_2);
        assert_eq!(config.code.backend, "auto");
        assert_eq!(config.workload.erasures, vec![3, 9]);
        assert_eq!(config.workload.seed, Some(42));
        assert_eq!(config.workload.page_size, 4096);
        assert_eq!(config.page_count(), 40 * 1024 * 1024 / (4096 * 8));
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::from_toml_str("[code]\ndata_fragments = \"many\"\n").unwrap_err();
        assert!(matches!(err, Error::Deserialization(_)));
    }

    #[test]
    fn test_default_dataset_fits_small_codes() {
        for k in 1..=10 {
            let mut config = Config::default();
            config.code.data_fragments = k;
            config.code.parity_fragments = 2;
            assert!(config.validate().is_ok(), "k = {k}");
        }
        assert_eq!(Config::default().page_count(), 1024);
    }

    #[test]
    fn test_validate_rejects_overflowing_stripe() {
        let mut config = Config::default();
        config.workload.page_size = 1 << 56;
        config.code.data_fragments = 200;
        config.code.parity_fragments = 4;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));
        assert_eq!(config.page_count(), 0);
    }

    #[test]
    fn test_validate_dataset_alignment() {
        let mut config = Config::default();
        config.code.data_fragments = 3;
        config.workload.dataset_size = 4096 * 4;
        assert!(matches!(config.validate(), Err(Error::Configuration(_))));

        config.workload.dataset_size = 4096 * 3 * 5;
        assert!(config.validate().is_ok());
        assert_eq!(config.page_count(), 5);

        config.workload.page_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_code() {
        let mut config = Config::default();
        config.code.parity_fragments = 0;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("/nonexistent/stripeio/ec.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("4096").unwrap(), 4096);
        assert_eq!(parse_size("4K").unwrap(), 4096);
        assert_eq!(parse_size("2M").unwrap(), 2 * 1024 * 1024);
        assert_eq!(parse_size("3G").unwrap(), 3 * 1024 * 1024 * 1024);
        assert!(parse_size("lots").is_err());
        assert!(parse_size("99999999999999G").is_err());
    }
}
