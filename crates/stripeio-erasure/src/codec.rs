//! Cauchy Reed-Solomon encoder/decoder
//!
//! [`ErasureCodec`] drives the bulk work: it owns the encode matrix and the
//! compiled parity table, walks paged datasets, plans recoveries and checks
//! recovered fragments against the originals.
//!
//! # Paged API
//!
//! ```
//! use stripeio_erasure::ErasureCodec;
//! use stripeio_common::CodeParams;
//!
//! let codec = ErasureCodec::new(CodeParams::new(4, 2).unwrap());
//! let page_size = 64;
//! let data = vec![7u8; 4 * page_size * 3];
//! let mut parity = vec![0u8; 2 * page_size * 3];
//! assert_eq!(codec.encode_pages(&data, &mut parity, page_size).unwrap(), 3);
//!
//! let plan = codec.plan_recovery(&[1, 5]).unwrap();
//! let recovered = codec.recover_pages(&plan, &data, &parity, page_size).unwrap();
//! let report = codec.verify_pages(&plan, &recovered, &data, &parity).unwrap();
//! assert!(report.passed());
//! ```
//!
//! # Object API
//!
//! ```
//! use stripeio_erasure::ErasureCodec;
//! use stripeio_common::CodeParams;
//!
//! let codec = ErasureCodec::new(CodeParams::new(4, 2).unwrap());
//! let data = b"Hello, World!";
//! let fragments = codec.encode(data).unwrap();
//! let mut slots: Vec<_> = fragments.into_iter().map(Some).collect();
//! slots[0] = None;
//! assert_eq!(codec.decode(&mut slots, data.len()).unwrap(), data);
//! ```

use crate::backend::{BackendFactory, BackendType, CoefficientTable, GfBackend};
use crate::cauchy::build_encode_matrix;
use crate::decode::{DecodePlan, ErasureSet, build_decode_matrix};
use crate::fragment::Fragment;
use crate::matrix::Matrix;
use bytes::Bytes;
use std::sync::Arc;
use stripeio_common::{CodeParams, Error as CommonError, FragmentKind};
use thiserror::Error;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Errors specific to erasure coding operations
#[derive(Debug, Error)]
pub enum ErasureError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("number of erasures ({erasures}) exceeds power of code (p = {parity})")]
    TooManyErasures { erasures: usize, parity: usize },

    #[error("fragment {index} not in range (m = {total})")]
    ErasureOutOfRange { index: usize, total: usize },

    #[error("fragment {index} listed more than once in erasure set")]
    DuplicateErasure { index: usize },

    #[error("survivor matrix is singular")]
    SingularMatrix,

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("fragment {index} has size {actual}, expected {expected}")]
    FragmentSizeMismatch {
        index: usize,
        expected: usize,
        actual: usize,
    },

    #[error("fragment {index} required for recovery is missing")]
    MissingFragment { index: usize },

    #[error("insufficient fragments: have {available}, need {required}")]
    InsufficientFragments { available: usize, required: usize },

    #[error("table compiled by `{actual}` backend applied with `{expected}`")]
    BackendMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("recovered fragment {index} differs from original at byte {offset} (failed: {failed:?})")]
    RecoveryMismatch {
        index: usize,
        offset: usize,
        failed: Vec<usize>,
    },
}

impl ErasureError {
    /// Whether the caller supplied bad parameters (detected before matrix work)
    #[must_use]
    pub const fn is_parameter_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig(_)
                | Self::TooManyErasures { .. }
                | Self::ErasureOutOfRange { .. }
                | Self::DuplicateErasure { .. }
        )
    }
}

impl From<ErasureError> for CommonError {
    fn from(e: ErasureError) -> Self {
        match e {
            ErasureError::InsufficientFragments {
                available,
                required,
            } => Self::InsufficientFragments {
                available,
                required,
            },
            ErasureError::RecoveryMismatch { index, .. } => Self::DataCorruption { index },
            e if e.is_parameter_error() => Self::InvalidArgument(e.to_string()),
            e => Self::ErasureCoding(e.to_string()),
        }
    }
}

/// Outcome of checking one recovered fragment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentCheck {
    /// Erased fragment index
    pub index: usize,
    /// Source or parity
    pub kind: FragmentKind,
    /// Offset of the first differing byte, `None` if identical
    pub mismatch_offset: Option<usize>,
}

impl FragmentCheck {
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.mismatch_offset.is_none()
    }
}

/// Per-fragment verification results, in erasure order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub checks: Vec<FragmentCheck>,
}

impl VerificationReport {
    /// True when every recovered fragment matched its original
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(FragmentCheck::passed)
    }

    /// Indices of fragments that did not match
    #[must_use]
    pub fn failed_indices(&self) -> Vec<usize> {
        self.checks
            .iter()
            .filter(|c| !c.passed())
            .map(|c| c.index)
            .collect()
    }

    /// Turn the report into an error if any fragment mismatched
    ///
    /// # Errors
    /// Returns [`ErasureError::RecoveryMismatch`] naming the first failing
    /// fragment and listing all failing indices.
    pub fn into_result(self) -> Result<(), ErasureError> {
        let failed = self.failed_indices();
        match self.checks.into_iter().find(|c| !c.passed()) {
            Some(FragmentCheck {
                index,
                mismatch_offset: Some(offset),
                ..
            }) => Err(ErasureError::RecoveryMismatch {
                index,
                offset,
                failed,
            }),
            _ => Ok(()),
        }
    }
}

/// Fragments regenerated for every page of a dataset
///
/// Layout is page-major: page `i` holds `nerrs` consecutive `page_size`
/// slices, one per erasure in plan order.
#[derive(Clone, Debug)]
pub struct RecoveredPages {
    erasures: Vec<usize>,
    page_size: usize,
    pages: usize,
    bytes: Vec<u8>,
}

impl RecoveredPages {
    /// Erased indices, in the order their pages are stored
    #[must_use]
    pub fn erasures(&self) -> &[usize] {
        &self.erasures
    }

    #[must_use]
    pub const fn pages(&self) -> usize {
        self.pages
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Recovered page `page` of the erasure at position `position`
    ///
    /// # Panics
    /// Panics if `position` or `page` is out of range.
    #[must_use]
    pub fn fragment_page(&self, position: usize, page: usize) -> &[u8] {
        assert!(position < self.erasures.len() && page < self.pages);
        let start = (page * self.erasures.len() + position) * self.page_size;
        &self.bytes[start..start + self.page_size]
    }

    /// All pages of one recovered fragment, concatenated
    #[must_use]
    pub fn fragment(&self, position: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pages * self.page_size);
        for page in 0..self.pages {
            out.extend_from_slice(self.fragment_page(position, page));
        }
        out
    }

    /// Total recovered bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Systematic Cauchy Reed-Solomon codec
///
/// Holds the encode matrix and its compiled parity table. Both are built once
/// and never mutated, so one codec can serve any number of threads.
pub struct ErasureCodec {
    params: CodeParams,
    encode_matrix: Matrix,
    parity_table: CoefficientTable,
    backend: Arc<dyn GfBackend>,
}

impl ErasureCodec {
    /// Create a codec using the automatically selected backend
    #[must_use]
    pub fn new(params: CodeParams) -> Self {
        Self::with_backend(params, BackendType::Auto)
    }

    /// Create a codec from raw `k`/`p`
    ///
    /// # Errors
    /// Returns [`ErasureError::InvalidConfig`] for out-of-range parameters.
    pub fn from_dims(data_fragments: usize, parity_fragments: usize) -> Result<Self, ErasureError> {
        let params = CodeParams::new(data_fragments, parity_fragments)
            .map_err(|e| ErasureError::InvalidConfig(e.to_string()))?;
        Ok(Self::new(params))
    }

    /// Create a codec on a specific backend type
    #[must_use]
    pub fn with_backend(params: CodeParams, backend_type: BackendType) -> Self {
        Self::with_gf_backend(params, BackendFactory::create(backend_type))
    }

    /// Create a codec on a caller-supplied backend
    #[must_use]
    pub fn with_gf_backend(params: CodeParams, backend: Arc<dyn GfBackend>) -> Self {
        let encode_matrix = build_encode_matrix(&params);
        let parity_rows = encode_matrix
            .sub_matrix(params.data_fragments()..params.total_fragments())
            .unwrap_or_else(|_| Matrix::zeros(0, params.data_fragments()));
        let parity_table = backend.compile(&parity_rows);
        debug!(%params, backend = backend.name(), "created erasure codec");
        Self {
            params,
            encode_matrix,
            parity_table,
            backend,
        }
    }

    /// Get the code parameters
    #[must_use]
    pub const fn params(&self) -> CodeParams {
        self.params
    }

    /// The `m × k` encode matrix
    #[must_use]
    pub const fn encode_matrix(&self) -> &Matrix {
        &self.encode_matrix
    }

    /// Name of the GF(256) backend in use
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Get the number of source fragments (k)
    #[must_use]
    pub const fn data_fragments(&self) -> usize {
        self.params.data_fragments()
    }

    /// Get the number of parity fragments (p)
    #[must_use]
    pub const fn parity_fragments(&self) -> usize {
        self.params.parity_fragments()
    }

    /// Get the total number of fragments (m)
    #[must_use]
    pub const fn total_fragments(&self) -> usize {
        self.params.total_fragments()
    }

    /// Compute the `p` parity slices of one page from its `k` source slices
    ///
    /// # Errors
    /// Returns an error for wrong buffer counts or unequal buffer lengths.
    pub fn encode_page(
        &self,
        sources: &[&[u8]],
        parity: &mut [&mut [u8]],
    ) -> Result<(), ErasureError> {
        if sources.len() != self.data_fragments() {
            return Err(ErasureError::DimensionMismatch(format!(
                "expected {} source fragments, got {}",
                self.data_fragments(),
                sources.len()
            )));
        }
        if parity.len() != self.parity_fragments() {
            return Err(ErasureError::DimensionMismatch(format!(
                "expected {} parity fragments, got {}",
                self.parity_fragments(),
                parity.len()
            )));
        }
        self.backend.apply(&self.parity_table, sources, parity)
    }

    /// Encode every page of a dataset
    ///
    /// `data` holds `pages × k × page_size` bytes, page-major: page `i` is
    /// `k` consecutive `page_size` source slices. `parity` receives
    /// `pages × p × page_size` bytes in the same arrangement. Returns the
    /// number of pages encoded.
    ///
    /// # Errors
    /// Returns an error if the buffers do not divide into whole pages.
    pub fn encode_pages(
        &self,
        data: &[u8],
        parity: &mut [u8],
        page_size: usize,
    ) -> Result<usize, ErasureError> {
        let pages = self.page_count(data.len(), parity.len(), page_size)?;
        if pages == 0 {
            return Ok(0);
        }
        let source_stride = self.data_fragments() * page_size;
        let parity_stride = self.parity_fragments() * page_size;

        for (src_page, parity_page) in data
            .chunks_exact(source_stride)
            .zip(parity.chunks_exact_mut(parity_stride))
        {
            self.encode_one(src_page, parity_page, page_size)?;
        }

        debug!(pages, page_size, "encoded pages");
        Ok(pages)
    }

    /// Parallel [`encode_pages`](Self::encode_pages): one rayon task per page
    ///
    /// # Errors
    /// Same as [`encode_pages`](Self::encode_pages).
    #[cfg(feature = "parallel")]
    pub fn encode_pages_par(
        &self,
        data: &[u8],
        parity: &mut [u8],
        page_size: usize,
    ) -> Result<usize, ErasureError> {
        let pages = self.page_count(data.len(), parity.len(), page_size)?;
        if pages == 0 {
            return Ok(0);
        }
        let source_stride = self.data_fragments() * page_size;
        let parity_stride = self.parity_fragments() * page_size;

        data.par_chunks_exact(source_stride)
            .zip(parity.par_chunks_exact_mut(parity_stride))
            .try_for_each(|(src_page, parity_page)| {
                self.encode_one(src_page, parity_page, page_size)
            })?;

        debug!(pages, page_size, "encoded pages in parallel");
        Ok(pages)
    }

    /// Validate an erasure list and build its decode plan
    ///
    /// Parameter checks run before any matrix is touched.
    ///
    /// # Errors
    /// Parameter errors for bad erasure lists, or
    /// [`ErasureError::SingularMatrix`] if the survivors cannot be inverted.
    pub fn plan_recovery(&self, erasures: &[usize]) -> Result<DecodePlan, ErasureError> {
        let set = ErasureSet::new(erasures, &self.params)?;
        self.plan_recovery_set(&set)
    }

    /// Build the decode plan for an already validated erasure set
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if the set was validated
    /// against different parameters, or [`ErasureError::SingularMatrix`].
    pub fn plan_recovery_set(&self, erasures: &ErasureSet) -> Result<DecodePlan, ErasureError> {
        if erasures.total_fragments() != self.total_fragments() {
            return Err(ErasureError::DimensionMismatch(format!(
                "erasure set for {} fragments does not fit {}",
                erasures.total_fragments(),
                self.params
            )));
        }
        build_decode_matrix(&self.encode_matrix, erasures)
    }

    /// Compile the decode matrix of `plan` for this codec's backend
    ///
    /// # Errors
    /// Returns [`ErasureError::DimensionMismatch`] if the plan was built for
    /// different code parameters.
    pub fn compile_recovery(&self, plan: &DecodePlan) -> Result<CoefficientTable, ErasureError> {
        if plan.decode_matrix.cols() != self.data_fragments()
            || plan.erasures.total_fragments() != self.total_fragments()
            || plan.decode_index.len() != self.data_fragments()
        {
            return Err(ErasureError::DimensionMismatch(format!(
                "plan for {} fragments does not fit {}",
                plan.erasures.total_fragments(),
                self.params
            )));
        }
        Ok(self.backend.compile(&plan.decode_matrix))
    }

    /// Regenerate the erased fragments of one page
    ///
    /// `fragments` has one slot per fragment index (`m` slots); erased slots
    /// may be `None`. Only the survivors named by `plan.decode_index` are
    /// read. Returns one buffer per erasure, in plan order.
    ///
    /// # Errors
    /// Returns an error if a needed survivor is missing or sizes disagree.
    pub fn recover(
        &self,
        plan: &DecodePlan,
        fragments: &[Option<&[u8]>],
    ) -> Result<Vec<Vec<u8>>, ErasureError> {
        if plan.nerrs() == 0 {
            return Ok(Vec::new());
        }
        self.check_slots(fragments)?;
        let first = plan.decode_index[0];
        let size = fragments[first]
            .map(<[u8]>::len)
            .ok_or(ErasureError::MissingFragment { index: first })?;

        let table = self.compile_recovery(plan)?;
        let mut out = vec![vec![0u8; size]; plan.nerrs()];
        let mut dests: Vec<&mut [u8]> = out.iter_mut().map(Vec::as_mut_slice).collect();
        self.recover_into(plan, &table, fragments, &mut dests)?;

        debug!(nerrs = plan.nerrs(), size, "recovered fragments");
        Ok(out)
    }

    /// Regenerate the erased fragments for every page of a dataset
    ///
    /// Erased fragments are never read from `data`/`parity`.
    ///
    /// # Errors
    /// Returns an error if the buffers do not divide into whole pages or the
    /// plan does not match this codec.
    pub fn recover_pages(
        &self,
        plan: &DecodePlan,
        data: &[u8],
        parity: &[u8],
        page_size: usize,
    ) -> Result<RecoveredPages, ErasureError> {
        let pages = self.page_count(data.len(), parity.len(), page_size)?;
        let nerrs = plan.nerrs();
        let mut bytes = vec![0u8; pages * nerrs * page_size];

        if nerrs > 0 && pages > 0 {
            let table = self.compile_recovery(plan)?;
            for (page, out_page) in bytes.chunks_exact_mut(nerrs * page_size).enumerate() {
                self.recover_one(plan, &table, data, parity, page_size, page, out_page)?;
            }
        }

        debug!(pages, nerrs, "recovered pages");
        Ok(RecoveredPages {
            erasures: plan.erasures.indices().to_vec(),
            page_size,
            pages,
            bytes,
        })
    }

    /// Parallel [`recover_pages`](Self::recover_pages): one rayon task per page
    ///
    /// # Errors
    /// Same as [`recover_pages`](Self::recover_pages).
    #[cfg(feature = "parallel")]
    pub fn recover_pages_par(
        &self,
        plan: &DecodePlan,
        data: &[u8],
        parity: &[u8],
        page_size: usize,
    ) -> Result<RecoveredPages, ErasureError> {
        let pages = self.page_count(data.len(), parity.len(), page_size)?;
        let nerrs = plan.nerrs();
        let mut bytes = vec![0u8; pages * nerrs * page_size];

        if nerrs > 0 && pages > 0 {
            let table = self.compile_recovery(plan)?;
            bytes
                .par_chunks_exact_mut(nerrs * page_size)
                .enumerate()
                .try_for_each(|(page, out_page)| {
                    self.recover_one(plan, &table, data, parity, page_size, page, out_page)
                })?;
        }

        debug!(pages, nerrs, "recovered pages in parallel");
        Ok(RecoveredPages {
            erasures: plan.erasures.indices().to_vec(),
            page_size,
            pages,
            bytes,
        })
    }

    /// Compare recovered pages against the original dataset, per erased index
    ///
    /// # Errors
    /// Returns an error if `recovered` does not match the dataset shape.
    pub fn verify_pages(
        &self,
        plan: &DecodePlan,
        recovered: &RecoveredPages,
        data: &[u8],
        parity: &[u8],
    ) -> Result<VerificationReport, ErasureError> {
        let page_size = recovered.page_size();
        let pages = self.page_count(data.len(), parity.len(), page_size)?;
        if pages != recovered.pages() || recovered.erasures() != plan.erasures.indices() {
            return Err(ErasureError::DimensionMismatch(format!(
                "recovered {} pages of {:?}, dataset has {} pages of {:?}",
                recovered.pages(),
                recovered.erasures(),
                pages,
                plan.erasures.indices()
            )));
        }

        let checks = plan
            .erasures
            .indices()
            .iter()
            .enumerate()
            .map(|(position, &index)| {
                let mismatch_offset = (0..pages).find_map(|page| {
                    let got = recovered.fragment_page(position, page);
                    let want = self.fragment_page(data, parity, page_size, page, index);
                    first_difference(got, want).map(|offset| page * page_size + offset)
                });
                self.check_for(index, mismatch_offset)
            })
            .collect();

        Ok(VerificationReport { checks })
    }

    /// Compare single-page recovery output against the original fragments
    ///
    /// `originals` holds all `m` original fragments of the page.
    ///
    /// # Errors
    /// Returns an error if the buffer counts do not match the plan.
    pub fn verify_recovery(
        &self,
        plan: &DecodePlan,
        recovered: &[Vec<u8>],
        originals: &[&[u8]],
    ) -> Result<VerificationReport, ErasureError> {
        if recovered.len() != plan.nerrs() || originals.len() != self.total_fragments() {
            return Err(ErasureError::DimensionMismatch(format!(
                "{} recovered / {} originals for {} erasures of {} fragments",
                recovered.len(),
                originals.len(),
                plan.nerrs(),
                self.total_fragments()
            )));
        }

        let checks = plan
            .erasures
            .indices()
            .iter()
            .zip(recovered)
            .map(|(&index, got)| {
                let mismatch_offset = first_difference(got, originals[index]);
                self.check_for(index, mismatch_offset)
            })
            .collect();

        Ok(VerificationReport { checks })
    }

    /// Encode data into k source fragments and p parity fragments
    ///
    /// The input is zero-padded to a multiple of k and split into k equal
    /// fragments. Returns all m fragments in index order.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub fn encode(&self, data: &[u8]) -> Result<Vec<Fragment>, ErasureError> {
        let k = self.data_fragments();
        let p = self.parity_fragments();
        let fragment_size = data.len().div_ceil(k).max(1);

        let mut padded = vec![0u8; fragment_size * k];
        padded[..data.len()].copy_from_slice(data);
        let mut parity = vec![0u8; fragment_size * p];
        self.encode_pages(&padded, &mut parity, fragment_size)?;

        let padded = Bytes::from(padded);
        let parity = Bytes::from(parity);
        let mut fragments = Vec::with_capacity(k + p);
        for i in 0..k {
            let range = i * fragment_size..(i + 1) * fragment_size;
            fragments.push(Fragment::source(i, padded.slice(range)));
        }
        for i in 0..p {
            let range = i * fragment_size..(i + 1) * fragment_size;
            fragments.push(Fragment::parity(k + i, parity.slice(range)));
        }
        Ok(fragments)
    }

    /// Decode fragments back to the original data
    ///
    /// `fragments` has one slot per index; `None` marks a lost fragment.
    /// Fragments that fail their checksum or sit in the wrong slot are
    /// treated as lost. Missing fragments are regenerated in place, then the
    /// source fragments are concatenated and truncated to `original_size`.
    ///
    /// # Errors
    /// Returns [`ErasureError::InsufficientFragments`] if fewer than k
    /// fragments survive.
    pub fn decode(
        &self,
        fragments: &mut [Option<Fragment>],
        original_size: usize,
    ) -> Result<Vec<u8>, ErasureError> {
        let k = self.data_fragments();
        self.check_slots(fragments)?;

        for (i, slot) in fragments.iter_mut().enumerate() {
            let bad = slot.as_ref().is_some_and(|f| f.index != i || !f.verify());
            if bad {
                warn!(index = i, "discarding corrupt fragment");
                *slot = None;
            }
        }

        let missing: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.is_none().then_some(i))
            .collect();
        let available = fragments.len() - missing.len();
        if available < k {
            return Err(ErasureError::InsufficientFragments {
                available,
                required: k,
            });
        }

        let size = fragments
            .iter()
            .flatten()
            .map(Fragment::size)
            .next()
            .unwrap_or(0);
        for f in fragments.iter().flatten() {
            if f.size() != size {
                return Err(ErasureError::FragmentSizeMismatch {
                    index: f.index,
                    expected: size,
                    actual: f.size(),
                });
            }
        }

        if !missing.is_empty() {
            let plan = self.plan_recovery(&missing)?;
            let recovered = {
                let refs: Vec<Option<&[u8]>> = fragments
                    .iter()
                    .map(|f| f.as_ref().map(|f| f.data.as_ref()))
                    .collect();
                self.recover(&plan, &refs)?
            };
            for (&index, data) in missing.iter().zip(recovered) {
                let kind = if index < k {
                    FragmentKind::Source
                } else {
                    FragmentKind::Parity
                };
                fragments[index] = Some(Fragment::new(index, kind, Bytes::from(data)));
            }
        }

        let mut output = Vec::with_capacity(k * size);
        for fragment in fragments.iter().take(k).flatten() {
            output.extend_from_slice(&fragment.data);
        }
        output.truncate(original_size);
        Ok(output)
    }

    /// Verify that parity fragments are consistent with source fragments
    ///
    /// Re-encodes the source fragments and compares with the stored parity.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub fn verify(&self, fragments: &[Fragment]) -> Result<bool, ErasureError> {
        let k = self.data_fragments();
        if fragments.len() != self.total_fragments() {
            return Ok(false);
        }
        let Some(size) = fragments.first().map(Fragment::size) else {
            return Ok(false);
        };
        if fragments.iter().any(|f| f.size() != size) {
            return Ok(false);
        }

        let sources: Vec<&[u8]> = fragments[..k].iter().map(|f| f.data.as_ref()).collect();
        let mut parity = vec![vec![0u8; size]; self.parity_fragments()];
        {
            let mut dests: Vec<&mut [u8]> = parity.iter_mut().map(Vec::as_mut_slice).collect();
            self.encode_page(&sources, &mut dests)?;
        }

        Ok(parity
            .iter()
            .zip(&fragments[k..])
            .all(|(expected, f)| expected.as_slice() == f.data.as_ref()))
    }

    fn encode_one(
        &self,
        src_page: &[u8],
        parity_page: &mut [u8],
        page_size: usize,
    ) -> Result<(), ErasureError> {
        let sources: Vec<&[u8]> = src_page.chunks_exact(page_size).collect();
        let mut dests: Vec<&mut [u8]> = parity_page.chunks_exact_mut(page_size).collect();
        self.encode_page(&sources, &mut dests)
    }

    #[allow(clippy::too_many_arguments)]
    fn recover_one(
        &self,
        plan: &DecodePlan,
        table: &CoefficientTable,
        data: &[u8],
        parity: &[u8],
        page_size: usize,
        page: usize,
        out_page: &mut [u8],
    ) -> Result<(), ErasureError> {
        let fragments: Vec<Option<&[u8]>> = (0..self.total_fragments())
            .map(|index| {
                (!plan.erasures.contains(index))
                    .then(|| self.fragment_page(data, parity, page_size, page, index))
            })
            .collect();
        let mut dests: Vec<&mut [u8]> = out_page.chunks_exact_mut(page_size).collect();
        self.recover_into(plan, table, &fragments, &mut dests)
    }

    fn recover_into(
        &self,
        plan: &DecodePlan,
        table: &CoefficientTable,
        fragments: &[Option<&[u8]>],
        dests: &mut [&mut [u8]],
    ) -> Result<(), ErasureError> {
        let sources = plan
            .decode_index
            .iter()
            .map(|&index| fragments[index].ok_or(ErasureError::MissingFragment { index }))
            .collect::<Result<Vec<&[u8]>, _>>()?;
        self.backend.apply(table, &sources, dests)
    }

    /// Page `page` of fragment `index` within a page-major dataset
    fn fragment_page<'a>(
        &self,
        data: &'a [u8],
        parity: &'a [u8],
        page_size: usize,
        page: usize,
        index: usize,
    ) -> &'a [u8] {
        let k = self.data_fragments();
        let (region, slot) = if index < k {
            (data, page * k + index)
        } else {
            (parity, page * self.parity_fragments() + (index - k))
        };
        &region[slot * page_size..(slot + 1) * page_size]
    }

    fn page_count(
        &self,
        data_len: usize,
        parity_len: usize,
        page_size: usize,
    ) -> Result<usize, ErasureError> {
        if page_size == 0 {
            return Err(ErasureError::InvalidConfig("page_size must be > 0".into()));
        }
        let source_stride = self.data_fragments().checked_mul(page_size).ok_or_else(|| {
            ErasureError::InvalidConfig(format!(
                "k * page_size overflows for page_size {page_size}"
            ))
        })?;
        if data_len % source_stride != 0 {
            return Err(ErasureError::DimensionMismatch(format!(
                "data length {data_len} is not a multiple of k * page_size = {source_stride}"
            )));
        }
        let pages = data_len / source_stride;
        let expected_parity = pages
            .checked_mul(self.parity_fragments())
            .and_then(|n| n.checked_mul(page_size))
            .ok_or_else(|| {
                ErasureError::InvalidConfig(format!("parity region for {pages} pages overflows"))
            })?;
        if parity_len != expected_parity {
            return Err(ErasureError::DimensionMismatch(format!(
                "parity length {parity_len}, expected {expected_parity} for {pages} pages"
            )));
        }
        Ok(pages)
    }

    fn check_slots<T>(&self, fragments: &[T]) -> Result<(), ErasureError> {
        if fragments.len() != self.total_fragments() {
            return Err(ErasureError::DimensionMismatch(format!(
                "expected {} fragment slots, got {}",
                self.total_fragments(),
                fragments.len()
            )));
        }
        Ok(())
    }

    fn check_for(&self, index: usize, mismatch_offset: Option<usize>) -> FragmentCheck {
        let kind = self.params.kind_of(index).unwrap_or(FragmentKind::Parity);
        if let Some(offset) = mismatch_offset {
            warn!(index, offset, %kind, "recovered fragment does not match original");
        }
        FragmentCheck {
            index,
            kind,
            mismatch_offset,
        }
    }
}

impl Default for ErasureCodec {
    fn default() -> Self {
        Self::new(CodeParams::default())
    }
}

fn first_difference(a: &[u8], b: &[u8]) -> Option<usize> {
    if a.len() != b.len() {
        return Some(a.len().min(b.len()));
    }
    a.iter().zip(b).position(|(x, y)| x != y)
}
