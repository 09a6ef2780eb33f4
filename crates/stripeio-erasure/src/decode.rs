//! Recovery matrix construction
//!
//! Given the encode matrix and the list of erased fragments, this module
//! derives the `nerrs × k` decode matrix together with the ordered list of
//! surviving fragments (`decode_index`) that feed it. Row `i` of the decode
//! matrix regenerates `erasures[i]` from the survivors in `decode_index` order.

use crate::ErasureError;
use crate::matrix::Matrix;
use stripeio_common::CodeParams;
use tracing::debug;

/// Validated, ordered set of erased fragment indices
///
/// Input order is preserved: downstream consumers map decode-matrix row `i`
/// back to `indices()[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErasureSet {
    indices: Vec<usize>,
    total_fragments: usize,
}

impl ErasureSet {
    /// Validate an erasure list against the code parameters
    ///
    /// # Errors
    /// - [`ErasureError::TooManyErasures`] if more than `p` indices are given
    /// - [`ErasureError::ErasureOutOfRange`] for an index `>= m`
    /// - [`ErasureError::DuplicateErasure`] for a repeated index
    pub fn new(indices: impl Into<Vec<usize>>, params: &CodeParams) -> Result<Self, ErasureError> {
        let indices = indices.into();
        let m = params.total_fragments();
        let p = params.parity_fragments();

        if indices.len() > p {
            return Err(ErasureError::TooManyErasures {
                erasures: indices.len(),
                parity: p,
            });
        }

        let mut seen = vec![false; m];
        for &index in &indices {
            if index >= m {
                return Err(ErasureError::ErasureOutOfRange { index, total: m });
            }
            if seen[index] {
                return Err(ErasureError::DuplicateErasure { index });
            }
            seen[index] = true;
        }

        Ok(Self {
            indices,
            total_fragments: m,
        })
    }

    /// No erasures
    #[must_use]
    pub const fn empty(params: &CodeParams) -> Self {
        Self {
            indices: Vec::new(),
            total_fragments: params.total_fragments(),
        }
    }

    /// Erased indices in input order
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Number of erasures (`nerrs`)
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Whether fragment `index` is erased
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Total fragment count (m) this set was validated against
    #[must_use]
    pub const fn total_fragments(&self) -> usize {
        self.total_fragments
    }
}

/// Everything needed to regenerate a set of erased fragments
#[derive(Clone, Debug)]
pub struct DecodePlan {
    /// `nerrs × k`; row `i` rebuilds `erasures.indices()[i]`
    pub decode_matrix: Matrix,
    /// The `k` surviving fragment indices, ascending, in the order the
    /// decode matrix consumes them
    pub decode_index: Vec<usize>,
    /// The erasures this plan recovers
    pub erasures: ErasureSet,
    /// How many erasures are source fragments (index < k)
    pub source_erasures: usize,
}

impl DecodePlan {
    /// Number of fragments this plan regenerates
    #[must_use]
    pub fn nerrs(&self) -> usize {
        self.erasures.len()
    }

    /// Number of source fragments (k) the plan reads
    #[must_use]
    pub fn survivors(&self) -> usize {
        self.decode_index.len()
    }
}

/// Build the decode matrix for `erasures` from the `m × k` encode matrix
///
/// # Errors
/// - [`ErasureError::DimensionMismatch`] if the encode matrix does not match
///   the dimensions the erasure set was validated against
/// - [`ErasureError::InsufficientFragments`] if fewer than `k` fragments survive
/// - [`ErasureError::SingularMatrix`] if the survivor matrix cannot be inverted
pub fn build_decode_matrix(
    encode_matrix: &Matrix,
    erasures: &ErasureSet,
) -> Result<DecodePlan, ErasureError> {
    let m = encode_matrix.rows();
    let k = encode_matrix.cols();

    if m != erasures.total_fragments() || k == 0 || k > m {
        return Err(ErasureError::DimensionMismatch(format!(
            "encode matrix is {m}x{k}, erasure set expects {} fragments",
            erasures.total_fragments()
        )));
    }

    let mut in_error = vec![false; m];
    let mut source_erasures = 0;
    for &e in erasures.indices() {
        if e < k {
            source_erasures += 1;
        }
        in_error[e] = true;
    }

    // First k surviving fragments, in ascending index order
    let decode_index: Vec<usize> = (0..m).filter(|&r| !in_error[r]).take(k).collect();
    if decode_index.len() < k {
        return Err(ErasureError::InsufficientFragments {
            available: decode_index.len(),
            required: k,
        });
    }

    let survivor_matrix = encode_matrix.select_rows(&decode_index)?;
    let invert_matrix = survivor_matrix.invert()?;

    let mut decode_matrix = Matrix::zeros(erasures.len(), k);
    for (row, &e) in erasures.indices().iter().enumerate() {
        if e < k {
            // Lost source: its recovery row is the inverse row at its position
            decode_matrix.row_mut(row).copy_from_slice(invert_matrix.row(e));
        } else {
            // Lost parity: original encode row times the inverse
            let coefficients = invert_matrix.left_mul_vec(encode_matrix.row(e))?;
            decode_matrix.row_mut(row).copy_from_slice(&coefficients);
        }
    }

    debug!(
        nerrs = erasures.len(),
        source_erasures,
        decode_index = ?decode_index,
        "built decode matrix"
    );

    Ok(DecodePlan {
        decode_matrix,
        decode_index,
        erasures: erasures.clone(),
        source_erasures,
    })
}
