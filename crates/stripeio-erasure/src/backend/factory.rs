//! Backend factory for creating GF(256) backends
//!
//! Provides backend selection by name or automatically.

use super::{BackendCapabilities, GfBackend, ProductBackend, SplitBackend};
use std::sync::Arc;

/// Backend type selection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BackendType {
    /// 32-byte nibble tables (ISA-L layout)
    Split,
    /// 256-byte product rows
    Product,
    /// Auto-select the best available backend
    #[default]
    Auto,
}

impl BackendType {
    /// Get the backend type name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Product => "product",
            Self::Auto => "auto",
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "split" | "nibble" => Ok(Self::Split),
            "product" | "table" => Ok(Self::Product),
            "auto" | "" => Ok(Self::Auto),
            _ => Err(format!("unknown backend type: {}", s)),
        }
    }
}

/// Factory for creating GF(256) backends
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend of the requested type
    ///
    /// # Returns
    /// Arc-wrapped backend implementing `GfBackend`, shareable across threads
    pub fn create(backend_type: BackendType) -> Arc<dyn GfBackend> {
        let backend_type = match backend_type {
            BackendType::Auto => Self::detect_best_backend(),
            other => other,
        };

        match backend_type {
            BackendType::Product => Arc::new(ProductBackend),
            BackendType::Split | BackendType::Auto => Arc::new(SplitBackend),
        }
    }

    /// Detect the best available backend for this platform
    ///
    /// Always the split backend: its tables are an eighth the size of
    /// product rows.
    pub const fn detect_best_backend() -> BackendType {
        BackendType::Split
    }

    /// Get capabilities of all available backends
    pub fn available_backends() -> Vec<BackendCapabilities> {
        vec![SplitBackend.capabilities(), ProductBackend.capabilities()]
    }
}
