//! GF(256) backend abstraction
//!
//! The coding core only builds matrices. Turning a coefficient matrix into
//! something that can be applied to bulk buffers, and applying it, is the job
//! of a backend. Backends are reached through two capability traits so they
//! can be substituted without touching matrix construction:
//!
//! - [`CoefficientCompiler`]: expand a coefficient matrix into an opaque
//!   [`CoefficientTable`]
//! - [`LinearApplier`]: compute `destinations = table × sources` over GF(256)
//!
//! # Backends
//!
//! - `split` (default): ISA-L style low/high nibble product tables, 32 bytes
//!   per coefficient
//! - `product`: one full 256-byte product row per coefficient

pub mod factory;
pub mod product;
pub mod split;

use crate::ErasureError;
use crate::matrix::Matrix;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, ErasureError>;

/// Capabilities of a GF(256) backend
#[derive(Clone, Debug, Default)]
pub struct BackendCapabilities {
    /// Backend name for identification
    pub name: &'static str,
    /// Table bytes generated per matrix coefficient
    pub table_bytes_per_coefficient: usize,
    /// Uses SIMD instructions
    pub supports_simd: bool,
}

/// Precomputed expansion of a coefficient matrix
///
/// The byte layout is private to the backend that produced it. A table is
/// immutable once compiled and may be shared across threads.
#[derive(Clone, Debug)]
pub struct CoefficientTable {
    backend: &'static str,
    rows: usize,
    cols: usize,
    bytes: Vec<u8>,
}

impl CoefficientTable {
    /// Wrap backend-specific table bytes
    #[must_use]
    pub const fn new(backend: &'static str, rows: usize, cols: usize, bytes: Vec<u8>) -> Self {
        Self {
            backend,
            rows,
            cols,
            bytes,
        }
    }

    /// Name of the backend that compiled this table
    #[must_use]
    pub const fn backend(&self) -> &'static str {
        self.backend
    }

    /// Number of output rows (destinations)
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of input columns (sources)
    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Raw table bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Compile a coefficient matrix into a backend table
pub trait CoefficientCompiler {
    /// Expand `coefficients` (`rows × cols`) into a table for [`LinearApplier::apply`]
    fn compile(&self, coefficients: &Matrix) -> CoefficientTable;
}

/// Apply a compiled table to bulk buffers
pub trait LinearApplier {
    /// Compute `dests[r] = ⊕_j table[r][j] · sources[j]` byte-wise
    ///
    /// Destinations are overwritten. `sources.len()` must equal the table's
    /// columns, `dests.len()` its rows, and every buffer must share one length.
    ///
    /// # Errors
    /// Returns an error for a foreign table or mismatched buffers.
    fn apply(
        &self,
        table: &CoefficientTable,
        sources: &[&[u8]],
        dests: &mut [&mut [u8]],
    ) -> BackendResult<()>;
}

/// A complete GF(256) backend
pub trait GfBackend: CoefficientCompiler + LinearApplier + Send + Sync {
    /// Get backend capabilities
    fn capabilities(&self) -> BackendCapabilities;

    /// Backend name
    fn name(&self) -> &'static str {
        self.capabilities().name
    }
}

/// Shared argument checks for [`LinearApplier::apply`]
///
/// Returns the common buffer length.
pub(crate) fn check_apply(
    backend: &'static str,
    table: &CoefficientTable,
    sources: &[&[u8]],
    dests: &[&mut [u8]],
) -> BackendResult<usize> {
    if table.backend() != backend {
        return Err(ErasureError::BackendMismatch {
            expected: backend,
            actual: table.backend(),
        });
    }
    if sources.len() != table.cols() || dests.len() != table.rows() {
        return Err(ErasureError::DimensionMismatch(format!(
            "table is {}x{}, got {} sources and {} destinations",
            table.rows(),
            table.cols(),
            sources.len(),
            dests.len()
        )));
    }
    let len = sources
        .first()
        .map(|s| s.len())
        .or_else(|| dests.first().map(|d| d.len()))
        .unwrap_or(0);
    for (index, s) in sources.iter().enumerate() {
        if s.len() != len {
            return Err(ErasureError::FragmentSizeMismatch {
                index,
                expected: len,
                actual: s.len(),
            });
        }
    }
    for (row, d) in dests.iter().enumerate() {
        if d.len() != len {
            return Err(ErasureError::FragmentSizeMismatch {
                index: sources.len() + row,
                expected: len,
                actual: d.len(),
            });
        }
    }
    Ok(len)
}

// Re-exports
pub use factory::{BackendFactory, BackendType};
pub use product::ProductBackend;
pub use split::SplitBackend;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gf;
    use rand::{RngCore, SeedableRng, rngs::StdRng};

    /// Straightforward byte-by-byte reference
    fn reference_apply(m: &Matrix, sources: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let len = sources.first().map_or(0, Vec::len);
        (0..m.rows())
            .map(|r| {
                (0..len)
                    .map(|b| {
                        m.row(r)
                            .iter()
                            .zip(sources)
                            .fold(0u8, |acc, (&c, s)| acc ^ gf::mul(c, s[b]))
                    })
                    .collect()
            })
            .collect()
    }

    fn random_case(rng: &mut StdRng, rows: usize, cols: usize, len: usize) -> (Matrix, Vec<Vec<u8>>) {
        let mut coeffs = vec![0u8; rows * cols];
        rng.fill_bytes(&mut coeffs);
        let m = Matrix::from_vec(rows, cols, coeffs).unwrap();
        let sources = (0..cols)
            .map(|_| {
                let mut s = vec![0u8; len];
                rng.fill_bytes(&mut s);
                s
            })
            .collect();
        (m, sources)
    }

    fn run(backend: &dyn GfBackend, m: &Matrix, sources: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let len = sources.first().map_or(0, Vec::len);
        let table = backend.compile(m);
        let src_refs: Vec<&[u8]> = sources.iter().map(Vec::as_slice).collect();
        // Pre-fill with garbage: apply must overwrite, not accumulate
        let mut out: Vec<Vec<u8>> = (0..m.rows()).map(|_| vec![0xa5u8; len]).collect();
        let mut dst_refs: Vec<&mut [u8]> = out.iter_mut().map(Vec::as_mut_slice).collect();
        backend.apply(&table, &src_refs, &mut dst_refs).unwrap();
        out
    }

    #[test]
    fn test_backends_match_reference() {
        let mut rng = StdRng::seed_from_u64(42);
        let backends: [&dyn GfBackend; 2] = [&SplitBackend, &ProductBackend];
        for (rows, cols, len) in [(1, 1, 1), (2, 8, 4096), (4, 4, 333), (3, 17, 64)] {
            let (m, sources) = random_case(&mut rng, rows, cols, len);
            let expected = reference_apply(&m, &sources);
            for backend in backends {
                assert_eq!(run(backend, &m, &sources), expected, "{}", backend.name());
            }
        }
    }

    #[test]
    fn test_identity_copies() {
        let mut rng = StdRng::seed_from_u64(1);
        let (_, sources) = random_case(&mut rng, 3, 3, 128);
        let out = run(&SplitBackend, &Matrix::identity(3), &sources);
        assert_eq!(out, sources);
    }

    #[test]
    fn test_foreign_table_rejected() {
        let m = Matrix::identity(1);
        let table = ProductBackend.compile(&m);
        let src = [0u8; 8];
        let mut dst = [0u8; 8];
        let err = SplitBackend
            .apply(&table, &[&src[..]], &mut [&mut dst[..]])
            .unwrap_err();
        assert!(matches!(err, ErasureError::BackendMismatch { .. }));
    }

    #[test]
    fn test_buffer_checks() {
        let m = Matrix::identity(2);
        let table = SplitBackend.compile(&m);
        let a = [0u8; 8];
        let b = [0u8; 4];
        let mut d0 = [0u8; 8];
        let mut d1 = [0u8; 8];

        let err = SplitBackend
            .apply(&table, &[&a[..]], &mut [&mut d0[..], &mut d1[..]])
            .unwrap_err();
        assert!(matches!(err, ErasureError::DimensionMismatch(_)));

        let err = SplitBackend
            .apply(&table, &[&a[..], &b[..]], &mut [&mut d0[..], &mut d1[..]])
            .unwrap_err();
        assert!(matches!(
            err,
            ErasureError::FragmentSizeMismatch {
                index: 1,
                expected: 8,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_empty_table() {
        // Zero destinations is a no-op
        let m = Matrix::zeros(0, 3);
        let table = SplitBackend.compile(&m);
        let s = [1u8; 4];
        SplitBackend
            .apply(&table, &[&s[..], &s[..], &s[..]], &mut [])
            .unwrap();
    }
}
