//! Core types for StripeIO
//!
//! This module defines the code parameters shared by the erasure coding
//! library and the tools built on top of it.

use crate::error::{Error, Result};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Largest number of fragments (k + p) a GF(2^8) Cauchy code supports
pub const MAX_FRAGMENTS: usize = 255;

/// Largest number of source fragments (k)
pub const MAX_SOURCE_FRAGMENTS: usize = 255;

/// Role of a fragment within a stripe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
pub enum FragmentKind {
    /// Unmodified copy of source data (index < k)
    #[display("source")]
    Source,
    /// Computed parity (index >= k)
    #[display("parity")]
    Parity,
}

/// Parameters of a systematic erasure code
///
/// `k` source fragments are extended with `p` parity fragments. Any `k` of
/// the `m = k + p` fragments are enough to rebuild the rest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawCodeParams", into = "RawCodeParams")]
pub struct CodeParams {
    data_fragments: u8,
    parity_fragments: u8,
}

impl CodeParams {
    /// Create validated code parameters
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] when `k < 1`, `p < 1`,
    /// `k > 255` or `k + p > 255`.
    pub fn new(data_fragments: usize, parity_fragments: usize) -> Result<Self> {
        let total = data_fragments.saturating_add(parity_fragments);
        if data_fragments < 1
            || parity_fragments < 1
            || data_fragments > MAX_SOURCE_FRAGMENTS
            || total > MAX_FRAGMENTS
        {
            return Err(Error::invalid_argument(format!(
                "invalid code parameters m={total}, k={data_fragments}, p={parity_fragments}: \
                 need 1 <= k, 1 <= p, k + p <= {MAX_FRAGMENTS}"
            )));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self {
            data_fragments: data_fragments as u8,
            parity_fragments: parity_fragments as u8,
        })
    }

    /// Number of source fragments (k)
    #[must_use]
    pub const fn data_fragments(&self) -> usize {
        self.data_fragments as usize
    }

    /// Number of parity fragments (p)
    #[must_use]
    pub const fn parity_fragments(&self) -> usize {
        self.parity_fragments as usize
    }

    /// Total number of fragments (m = k + p)
    #[must_use]
    pub const fn total_fragments(&self) -> usize {
        self.data_fragments as usize + self.parity_fragments as usize
    }

    /// Kind of the fragment at `index`, or `None` when out of range
    #[must_use]
    pub const fn kind_of(&self, index: usize) -> Option<FragmentKind> {
        if index < self.data_fragments() {
            Some(FragmentKind::Source)
        } else if index < self.total_fragments() {
            Some(FragmentKind::Parity)
        } else {
            None
        }
    }

    /// Storage efficiency (k / m)
    #[must_use]
    pub fn efficiency(&self) -> f64 {
        f64::from(self.data_fragments)
            / (f64::from(self.data_fragments) + f64::from(self.parity_fragments))
    }

    /// 8+2, the layout of the classic 4 KiB page example
    pub const EC_8_2: Self = Self {
        data_fragments: 8,
        parity_fragments: 2,
    };

    /// 10+4, the default layout
    pub const EC_10_4: Self = Self {
        data_fragments: 10,
        parity_fragments: 4,
    };

    /// 4+4 mirror-strength layout
    pub const EC_4_4: Self = Self {
        data_fragments: 4,
        parity_fragments: 4,
    };
}

impl Default for CodeParams {
    fn default() -> Self {
        Self::EC_10_4
    }
}

impl std::fmt::Display for CodeParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "(m,k,p)=({},{},{})",
            self.total_fragments(),
            self.data_fragments,
            self.parity_fragments
        )
    }
}

/// Unvalidated wire form of [`CodeParams`]
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
struct RawCodeParams {
    data_fragments: usize,
    parity_fragments: usize,
}

impl TryFrom<RawCodeParams> for CodeParams {
    type Error = Error;

    fn try_from(raw: RawCodeParams) -> Result<Self> {
        Self::new(raw.data_fragments, raw.parity_fragments)
    }
}

impl From<CodeParams> for RawCodeParams {
    fn from(params: CodeParams) -> Self {
        Self {
            data_fragments: params.data_fragments(),
            parity_fragments: params.parity_fragments(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_params_valid() {
        let params = CodeParams::new(8, 2).unwrap();
        assert_eq!(params.data_fragments(), 8);
        assert_eq!(params.parity_fragments(), 2);
        assert_eq!(params.total_fragments(), 10);
        assert_eq!(params, CodeParams::EC_8_2);
        assert!((params.efficiency() - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_code_params_bounds() {
        assert!(CodeParams::new(1, 1).is_ok());
        assert!(CodeParams::new(254, 1).is_ok());
        assert!(CodeParams::new(1, 254).is_ok());

        assert!(CodeParams::new(0, 2).is_err());
        assert!(CodeParams::new(4, 0).is_err());
        assert!(CodeParams::new(255, 1).is_err());
        assert!(CodeParams::new(200, 56).is_err());
        assert!(CodeParams::new(usize::MAX, usize::MAX).is_err());
    }

    #[test]
    fn test_code_params_kind_of() {
        let params = CodeParams::new(4, 2).unwrap();
        assert_eq!(params.kind_of(0), Some(FragmentKind::Source));
        assert_eq!(params.kind_of(3), Some(FragmentKind::Source));
        assert_eq!(params.kind_of(4), Some(FragmentKind::Parity));
        assert_eq!(params.kind_of(5), Some(FragmentKind::Parity));
        assert_eq!(params.kind_of(6), None);
    }

    #[test]
    fn test_code_params_display() {
        assert_eq!(CodeParams::EC_8_2.to_string(), "(m,k,p)=(10,8,2)");
        assert_eq!(FragmentKind::Parity.to_string(), "parity");
    }

    #[test]
    fn test_code_params_deserialize_validates() {
        #[derive(Deserialize)]
        struct Wrapper {
            code: CodeParams,
        }

        let ok: Wrapper = toml::from_str("[code]\ndata_fragments = 4\nparity_fragments = 4\n")
            .unwrap();
        assert_eq!(ok.code, CodeParams::EC_4_4);

        let bad = toml::from_str::<Wrapper>("[code]\ndata_fragments = 250\nparity_fragments = 9\n");
        assert!(bad.is_err());
    }
}
