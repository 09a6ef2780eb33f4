//! Systematic Cauchy encode matrix
//!
//! The `m × k` encode matrix stacks the `k × k` identity on top of a
//! `p × k` Cauchy block. Parity row `i` (for `k <= i < m`) and column `j`
//! hold `1 / (x_i + y_j)` with `x_i = i` and `y_j = j`. Because `{k..m}` and
//! `{0..k}` are disjoint, every denominator is non-zero and every square
//! sub-matrix of the Cauchy block is non-singular, so any `k` rows of the
//! encode matrix form an invertible matrix.

use crate::ErasureError;
use crate::gf;
use crate::matrix::Matrix;
use stripeio_common::{CodeParams, MAX_FRAGMENTS};
use tracing::debug;

/// Build the `m × k` systematic Cauchy encode matrix for `params`
#[must_use]
pub fn build_encode_matrix(params: &CodeParams) -> Matrix {
    fill_encode_matrix(params.total_fragments(), params.data_fragments())
}

/// Build the encode matrix from raw dimensions
///
/// # Errors
/// Returns [`ErasureError::InvalidConfig`] unless `1 <= k <= m <= 255`.
pub fn build_encode_matrix_dims(m: usize, k: usize) -> Result<Matrix, ErasureError> {
    if k == 0 || k > m || m > MAX_FRAGMENTS {
        return Err(ErasureError::InvalidConfig(format!(
            "encode matrix needs 1 <= k <= m <= {MAX_FRAGMENTS}, got m={m}, k={k}"
        )));
    }
    Ok(fill_encode_matrix(m, k))
}

fn fill_encode_matrix(m: usize, k: usize) -> Matrix {
    let mut matrix = Matrix::zeros(m, k);
    for i in 0..k {
        matrix.set(i, i, 1);
    }
    for i in k..m {
        for j in 0..k {
            // i > j, so i ^ j != 0; both fit in a byte since m <= 255
            #[allow(clippy::cast_possible_truncation)]
            matrix.set(i, j, gf::inv((i ^ j) as u8));
        }
    }
    debug!(m, k, "built systematic Cauchy encode matrix");
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::index::sample;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    /// Visit every k-subset of 0..m in lexicographic order
    fn for_each_subset(m: usize, k: usize, mut f: impl FnMut(&[usize])) {
        let mut idx: Vec<usize> = (0..k).collect();
        loop {
            f(&idx);
            let mut i = k;
            while i > 0 && idx[i - 1] == m - k + i - 1 {
                i -= 1;
            }
            if i == 0 {
                return;
            }
            idx[i - 1] += 1;
            for j in i..k {
                idx[j] = idx[j - 1] + 1;
            }
        }
    }

    #[test]
    fn test_systematic_rows() {
        for (m, k) in [(2, 1), (10, 8), (8, 4), (255, 200), (255, 1), (255, 254)] {
            let matrix = build_encode_matrix_dims(m, k).unwrap();
            assert_eq!(matrix.rows(), m);
            assert_eq!(matrix.cols(), k);
            assert!(matrix.sub_matrix(0..k).unwrap().is_identity());
        }
    }

    #[test]
    fn test_parity_entries_nonzero() {
        let matrix = build_encode_matrix(&CodeParams::new(100, 155).unwrap());
        for i in 100..255 {
            assert!(matrix.row(i).iter().all(|&v| v != 0), "row {i}");
        }
    }

    #[test]
    fn test_matches_isal_cauchy1() {
        // First parity row for k=2: 1/(2^0), 1/(2^1)
        let matrix = build_encode_matrix(&CodeParams::new(2, 1).unwrap());
        assert_eq!(matrix.row(2), &[gf::inv(2), gf::inv(3)]);
        assert_eq!(matrix.get(2, 0), 0x8e);
    }

    #[test]
    fn test_dims_validation() {
        assert!(build_encode_matrix_dims(0, 0).is_err());
        assert!(build_encode_matrix_dims(4, 5).is_err());
        assert!(build_encode_matrix_dims(256, 4).is_err());
        assert!(build_encode_matrix_dims(4, 4).is_ok());
    }

    #[test]
    fn test_every_k_subset_invertible_small() {
        for m in 2..=9 {
            for k in 1..m {
                let matrix = build_encode_matrix_dims(m, k).unwrap();
                for_each_subset(m, k, |rows| {
                    let sub = matrix.select_rows(rows).unwrap();
                    assert!(sub.invert().is_ok(), "m={m} k={k} rows={rows:?}");
                });
            }
        }
    }

    #[test]
    fn test_random_k_subsets_invertible_large() {
        let mut rng = StdRng::seed_from_u64(255);
        for _ in 0..40 {
            let k = rng.gen_range(1..=64);
            let p = rng.gen_range(1..=(255 - k).min(64));
            let m = k + p;
            let matrix = build_encode_matrix_dims(m, k).unwrap();
            let mut rows = sample(&mut rng, m, k).into_vec();
            rows.sort_unstable();
            let sub = matrix.select_rows(&rows).unwrap();
            assert!(sub.invert().is_ok(), "m={m} k={k} rows={rows:?}");
        }
    }

    #[test]
    fn test_field_bound_parity_only_subset() {
        // k parity rows alone, at the field bound
        let matrix = build_encode_matrix_dims(255, 127).unwrap();
        let rows: Vec<usize> = (128..255).collect();
        assert_eq!(rows.len(), 127);
        assert!(matrix.select_rows(&rows).unwrap().invert().is_ok());
    }
}
