//! StripeIO Erasure Coding - Systematic Cauchy Reed-Solomon over GF(2^8)
//!
//! This crate provides:
//! - GF(2^8) arithmetic on the ISA-L field (polynomial 0x11d)
//! - Systematic Cauchy encode matrices for any `1 <= k <= m <= 255`
//! - Decode matrix construction for up to `p` erased fragments
//! - Pluggable backends that compile and apply coefficient matrices
//!
//! # Layers
//!
//! - [`gf`], [`matrix`], [`cauchy`], [`decode`]: pure matrix construction
//! - [`backend`]: table compilation and bulk multiply-accumulate
//! - [`codec`]: paged encode, recovery and verification on top of both
//!
//! # Example
//!
//! ```
//! use stripeio_erasure::{ErasureCodec, BackendType};
//! use stripeio_common::CodeParams;
//!
//! let params = CodeParams::new(8, 2).unwrap();
//! let codec = ErasureCodec::with_backend(params, BackendType::Split);
//!
//! let page_size = 4096;
//! let data = vec![0xa5u8; 8 * page_size];
//! let mut parity = vec![0u8; 2 * page_size];
//! codec.encode_pages(&data, &mut parity, page_size).unwrap();
//!
//! // Lose source fragment 3 and parity fragment 9
//! let plan = codec.plan_recovery(&[3, 9]).unwrap();
//! assert_eq!(plan.decode_index, vec![0, 1, 2, 4, 5, 6, 7, 8]);
//! let recovered = codec.recover_pages(&plan, &data, &parity, page_size).unwrap();
//! assert_eq!(recovered.fragment_page(0, 0), &data[3 * page_size..4 * page_size]);
//! ```

pub mod backend;
pub mod cauchy;
pub mod codec;
pub mod decode;
pub mod fragment;
pub mod gf;
pub mod matrix;

// Re-exports from codec
pub use codec::{
    ErasureCodec, ErasureError, FragmentCheck, RecoveredPages, VerificationReport,
};
pub use decode::{DecodePlan, ErasureSet, build_decode_matrix};
pub use fragment::Fragment;
pub use matrix::Matrix;

// Re-exports from backend for convenience
pub use backend::{
    BackendCapabilities, BackendFactory, BackendType, CoefficientCompiler, CoefficientTable,
    GfBackend, LinearApplier, ProductBackend, SplitBackend,
};

/// Prelude for common imports
pub mod prelude {
    pub use super::{
        BackendFactory, BackendType, DecodePlan, ErasureCodec, ErasureError, ErasureSet,
        Fragment, GfBackend, Matrix,
    };
}
