//! StripeIO Common - Shared types and utilities
//!
//! This crate provides the code parameters, error definitions, checksums
//! and configuration used across all StripeIO components.

pub mod checksum;
pub mod config;
pub mod error;
pub mod types;

pub use checksum::{Checksum, ChecksumCalculator};
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
