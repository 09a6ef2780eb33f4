//! Split-nibble table backend
//!
//! Each coefficient `c` expands to 32 bytes: `c·x` for the 16 low-nibble
//! values `x` followed by `c·(x << 4)` for the 16 high-nibble values. A
//! product is then `lo[b & 0x0f] ^ hi[b >> 4]`. This is the table layout
//! ISA-L's `ec_init_tables` produces for its vectorised kernels.

use super::{
    BackendCapabilities, BackendResult, CoefficientCompiler, CoefficientTable, GfBackend,
    LinearApplier, check_apply,
};
use crate::gf;
use crate::matrix::Matrix;

const NAME: &str = "split";
const BYTES_PER_COEFFICIENT: usize = 32;

/// Portable backend using 32-byte nibble tables
#[derive(Clone, Copy, Debug, Default)]
pub struct SplitBackend;

impl CoefficientCompiler for SplitBackend {
    fn compile(&self, coefficients: &Matrix) -> CoefficientTable {
        let mut bytes =
            Vec::with_capacity(coefficients.rows() * coefficients.cols() * BYTES_PER_COEFFICIENT);
        for row in coefficients.iter_rows() {
            for &c in row {
                for x in 0..16u8 {
                    bytes.push(gf::mul(c, x));
                }
                for x in 0..16u8 {
                    bytes.push(gf::mul(c, x << 4));
                }
            }
        }
        CoefficientTable::new(NAME, coefficients.rows(), coefficients.cols(), bytes)
    }
}

impl LinearApplier for SplitBackend {
    fn apply(
        &self,
        table: &CoefficientTable,
        sources: &[&[u8]],
        dests: &mut [&mut [u8]],
    ) -> BackendResult<()> {
        check_apply(NAME, table, sources, dests)?;
        let cols = table.cols();

        for (r, dst) in dests.iter_mut().enumerate() {
            if cols == 0 {
                dst.fill(0);
                continue;
            }
            for (j, src) in sources.iter().enumerate() {
                let offset = (r * cols + j) * BYTES_PER_COEFFICIENT;
                let (lo, hi) = table.bytes()[offset..offset + BYTES_PER_COEFFICIENT].split_at(16);
                if j == 0 {
                    for (d, &s) in dst.iter_mut().zip(src.iter()) {
                        *d = lo[(s & 0x0f) as usize] ^ hi[(s >> 4) as usize];
                    }
                } else {
                    for (d, &s) in dst.iter_mut().zip(src.iter()) {
                        *d ^= lo[(s & 0x0f) as usize] ^ hi[(s >> 4) as usize];
                    }
                }
            }
        }

        Ok(())
    }
}

impl GfBackend for SplitBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: NAME,
            table_bytes_per_coefficient: BYTES_PER_COEFFICIENT,
            supports_simd: false,
        }
    }
}
