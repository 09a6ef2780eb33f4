//! Coding matrices over GF(2^8)
//!
//! A [`Matrix`] is an owned, row-major `rows × cols` array of field elements.
//! The encode, decode and inverse matrices of the code are all instances of
//! this type; none of them share storage.

use crate::ErasureError;
use crate::gf;
use std::fmt;
use std::ops::Range;

/// Row-major matrix of GF(2^8) elements
#[derive(Clone, PartialEq, Eq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<u8>,
}

impl Matrix {
    /// All-zero matrix
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0u8; rows * cols],
        }
    }

    /// `n × n` identity
    #[must_use]
    pub fn identity(n: usize) -> Self {
        let mut matrix = Self::zeros(n, n);
        for i in 0..n {
            matrix.data[i * n + i] = 1;
        }
        matrix
    }

    /// Build from a flat row-major buffer
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if `data.len() != rows * cols`.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<u8>) -> Result<Self, ErasureError> {
        if data.len() != rows * cols {
            return Err(ErasureError::DimensionMismatch(format!(
                "{rows}x{cols} matrix needs {} elements, got {}",
                rows * cols,
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from a list of equally long rows
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] for ragged input.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, ErasureError> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(ErasureError::DimensionMismatch(format!(
                    "row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Flat row-major contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Element at (`row`, `col`)
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col]
    }

    /// Set the element at (`row`, `col`)
    ///
    /// # Panics
    /// Panics if the position is out of bounds.
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        assert!(row < self.rows && col < self.cols, "index out of bounds");
        self.data[row * self.cols + col] = value;
    }

    /// Borrow row `i`
    ///
    /// # Panics
    /// Panics if `i >= rows`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[u8] {
        assert!(i < self.rows, "row {i} out of bounds ({} rows)", self.rows);
        &self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Mutably borrow row `i`
    ///
    /// # Panics
    /// Panics if `i >= rows`.
    pub fn row_mut(&mut self, i: usize) -> &mut [u8] {
        assert!(i < self.rows, "row {i} out of bounds ({} rows)", self.rows);
        &mut self.data[i * self.cols..(i + 1) * self.cols]
    }

    /// Iterate over rows
    pub fn iter_rows(&self) -> impl Iterator<Item = &[u8]> {
        // chunks_exact(0) panics; a zero-column matrix still has `rows` empty rows
        (0..self.rows).map(move |i| &self.data[i * self.cols..(i + 1) * self.cols])
    }

    /// Copy a contiguous band of rows
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if the range exceeds the matrix.
    pub fn sub_matrix(&self, rows: Range<usize>) -> Result<Self, ErasureError> {
        if rows.start > rows.end || rows.end > self.rows {
            return Err(ErasureError::DimensionMismatch(format!(
                "row range {rows:?} outside {} rows",
                self.rows
            )));
        }
        let data = self.data[rows.start * self.cols..rows.end * self.cols].to_vec();
        Ok(Self {
            rows: rows.len(),
            cols: self.cols,
            data,
        })
    }

    /// Gather the given rows, in the given order, into a new matrix
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if an index is out of range.
    pub fn select_rows(&self, indices: &[usize]) -> Result<Self, ErasureError> {
        let mut data = Vec::with_capacity(indices.len() * self.cols);
        for &i in indices {
            if i >= self.rows {
                return Err(ErasureError::DimensionMismatch(format!(
                    "row {i} outside {} rows",
                    self.rows
                )));
            }
            data.extend_from_slice(self.row(i));
        }
        Ok(Self {
            rows: indices.len(),
            cols: self.cols,
            data,
        })
    }

    /// Matrix product `self × other`
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if `self.cols != other.rows`.
    pub fn mul(&self, other: &Self) -> Result<Self, ErasureError> {
        if self.cols != other.rows {
            return Err(ErasureError::DimensionMismatch(format!(
                "cannot multiply {}x{} by {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        let mut out = Self::zeros(self.rows, other.cols);
        for r in 0..self.rows {
            for (i, &a) in self.row(r).iter().enumerate() {
                if a == 0 {
                    continue;
                }
                let src = other.row(i);
                for (dst, &b) in out.row_mut(r).iter_mut().zip(src) {
                    *dst ^= gf::mul(a, b);
                }
            }
        }
        Ok(out)
    }

    /// Multiply a row vector by this matrix: `out[j] = ⊕_i gf_mul(self[i][j], v[i])`
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if `v.len() != rows`.
    pub fn left_mul_vec(&self, v: &[u8]) -> Result<Vec<u8>, ErasureError> {
        if v.len() != self.rows {
            return Err(ErasureError::DimensionMismatch(format!(
                "vector of length {} against {} rows",
                v.len(),
                self.rows
            )));
        }
        let mut out = vec![0u8; self.cols];
        for (j, slot) in out.iter_mut().enumerate() {
            let mut s = 0u8;
            for (i, &vi) in v.iter().enumerate() {
                s ^= gf::mul(self.data[i * self.cols + j], vi);
            }
            *slot = s;
        }
        Ok(out)
    }

    /// Invert a square matrix by Gauss-Jordan elimination
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] for a non-square matrix and
    /// [`ErasureError::SingularMatrix`] if no inverse exists.
    pub fn invert(&self) -> Result<Self, ErasureError> {
        if self.rows != self.cols {
            return Err(ErasureError::DimensionMismatch(format!(
                "cannot invert non-square {}x{} matrix",
                self.rows, self.cols
            )));
        }
        let n = self.rows;
        let mut work = self.clone();
        let mut out = Self::identity(n);

        for col in 0..n {
            let pivot = (col..n)
                .find(|&r| work.get(r, col) != 0)
                .ok_or(ErasureError::SingularMatrix)?;
            if pivot != col {
                work.swap_rows(pivot, col);
                out.swap_rows(pivot, col);
            }

            let scale = gf::inv(work.get(col, col));
            for j in 0..n {
                work.data[col * n + j] = gf::mul(work.data[col * n + j], scale);
                out.data[col * n + j] = gf::mul(out.data[col * n + j], scale);
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = work.get(r, col);
                if factor == 0 {
                    continue;
                }
                for j in 0..n {
                    work.data[r * n + j] ^= gf::mul(factor, work.data[col * n + j]);
                    out.data[r * n + j] ^= gf::mul(factor, out.data[col * n + j]);
                }
            }
        }

        Ok(out)
    }

    /// Whether this is a square identity matrix
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rows == self.cols
            && self
                .iter_rows()
                .enumerate()
                .all(|(i, row)| row.iter().enumerate().all(|(j, &v)| v == u8::from(i == j)))
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.data.split_at_mut(hi * self.cols);
        head[lo * self.cols..(lo + 1) * self.cols].swap_with_slice(&mut tail[..self.cols]);
    }
}

impl fmt::Debug for Matrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix {}x{} [", self.rows, self.cols)?;
        for row in self.iter_rows() {
            write!(f, " ")?;
            for v in row {
                write!(f, " {v:02x}")?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    #[test]
    fn test_identity() {
        let id = Matrix::identity(4);
        assert!(id.is_identity());
        assert_eq!(id.get(2, 2), 1);
        assert_eq!(id.get(2, 3), 0);
        assert!(!Matrix::zeros(2, 3).is_identity());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let ok = Matrix::from_rows(&[vec![1, 2], vec![3, 4]]).unwrap();
        assert_eq!(ok.row(1), &[3, 4]);

        let err = Matrix::from_rows(&[vec![1, 2], vec![3]]).unwrap_err();
        assert!(matches!(err, ErasureError::DimensionMismatch(_)));
        assert!(Matrix::from_vec(2, 2, vec![1, 2, 3]).is_err());
    }

    #[test]
    fn test_select_and_sub_matrix() {
        let m = Matrix::from_rows(&[[1u8, 2], [3, 4], [5, 6]]).unwrap();
        let picked = m.select_rows(&[2, 0]).unwrap();
        assert_eq!(picked.as_bytes(), &[5, 6, 1, 2]);

        let band = m.sub_matrix(1..3).unwrap();
        assert_eq!(band.rows(), 2);
        assert_eq!(band.as_bytes(), &[3, 4, 5, 6]);

        assert!(m.select_rows(&[3]).is_err());
        assert!(m.sub_matrix(2..4).is_err());
    }

    #[test]
    fn test_invert_known() {
        let m = Matrix::from_rows(&[[1u8, 2, 3], [4, 5, 6], [7, 8, 10]]).unwrap();
        let inv = m.invert().unwrap();
        assert!(m.mul(&inv).unwrap().is_identity());
        assert!(inv.mul(&m).unwrap().is_identity());
    }

    #[test]
    fn test_invert_requires_pivoting() {
        // Zero in the leading position forces a row swap
        let m = Matrix::from_rows(&[[0u8, 1], [1, 0]]).unwrap();
        let inv = m.invert().unwrap();
        assert_eq!(inv, m);
    }

    #[test]
    fn test_invert_singular() {
        let m = Matrix::from_rows(&[[1u8, 2], [2, 4]]).unwrap();
        assert!(matches!(m.invert(), Err(ErasureError::SingularMatrix)));

        let zero = Matrix::zeros(3, 3);
        assert!(matches!(zero.invert(), Err(ErasureError::SingularMatrix)));

        let wide = Matrix::zeros(2, 3);
        assert!(matches!(
            wide.invert(),
            Err(ErasureError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_invert_random() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut inverted = 0;
        for _ in 0..50 {
            let n = rng.gen_range(1..=16);
            let data: Vec<u8> = (0..n * n).map(|_| rng.r#gen()).collect();
            let m = Matrix::from_vec(n, n, data).unwrap();
            if let Ok(inv) = m.invert() {
                assert!(m.mul(&inv).unwrap().is_identity());
                inverted += 1;
            }
        }
        assert!(inverted > 0);
    }

    #[test]
    fn test_left_mul_vec_matches_mul() {
        let m = Matrix::from_rows(&[[1u8, 2, 3], [4, 5, 6]]).unwrap();
        let v = [7u8, 9];
        let as_matrix = Matrix::from_rows(&[v]).unwrap().mul(&m).unwrap();
        assert_eq!(m.left_mul_vec(&v).unwrap(), as_matrix.row(0));
        assert!(m.left_mul_vec(&[1]).is_err());
    }
}
