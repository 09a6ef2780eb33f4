//! Full product table backend
//!
//! Each coefficient `c` expands to a 256-byte row holding `c·x` for every
//! byte `x`, so a product is a single lookup. Tables are eight times larger
//! than the split layout.

use super::{
    BackendCapabilities, BackendResult, CoefficientCompiler, CoefficientTable, GfBackend,
    LinearApplier, check_apply,
};
use crate::gf;
use crate::matrix::Matrix;

const NAME: &str = "product";
const BYTES_PER_COEFFICIENT: usize = 256;

/// Portable backend using one 256-byte product row per coefficient
#[derive(Clone, Copy, Debug, Default)]
pub struct ProductBackend;

impl CoefficientCompiler for ProductBackend {
    fn compile(&self, coefficients: &Matrix) -> CoefficientTable {
        let mut bytes =
            Vec::with_capacity(coefficients.rows() * coefficients.cols() * BYTES_PER_COEFFICIENT);
        for &c in coefficients.as_bytes() {
            bytes.extend((0..=255u8).map(|x| gf::mul(c, x)));
        }
        CoefficientTable::new(NAME, coefficients.rows(), coefficients.cols(), bytes)
    }
}

impl LinearApplier for ProductBackend {
    fn apply(
        &self,
        table: &CoefficientTable,
        sources: &[&[u8]],
        dests: &mut [&mut [u8]],
    ) -> BackendResult<()> {
        check_apply(NAME, table, sources, dests)?;
        let cols = table.cols();

        for (r, dst) in dests.iter_mut().enumerate() {
            dst.fill(0);
            for (j, src) in sources.iter().enumerate() {
                let offset = (r * cols + j) * BYTES_PER_COEFFICIENT;
                let products = &table.bytes()[offset..offset + BYTES_PER_COEFFICIENT];
                for (d, &s) in dst.iter_mut().zip(src.iter()) {
                    *d ^= products[s as usize];
                }
            }
        }

        Ok(())
    }
}

impl GfBackend for ProductBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            name: NAME,
            table_bytes_per_coefficient: BYTES_PER_COEFFICIENT,
            supports_simd: false,
        }
    }
}
