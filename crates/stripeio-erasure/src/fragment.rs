//! Fragment type for erasure coded data

use bytes::Bytes;
use stripeio_common::{Checksum, FragmentKind};

/// A single source or parity fragment
#[derive(Clone, Debug)]
pub struct Fragment {
    /// Position in the stripe, `0..m`
    pub index: usize,
    /// Source (index < k) or parity
    pub kind: FragmentKind,
    /// The fragment data
    pub data: Bytes,
    /// Checksum for integrity verification
    pub checksum: Checksum,
}

impl Fragment {
    /// Create a new fragment
    #[must_use]
    pub fn new(index: usize, kind: FragmentKind, data: Bytes) -> Self {
        let checksum = Checksum::compute(&data);
        Self {
            index,
            kind,
            data,
            checksum,
        }
    }

    /// Create a source fragment
    #[must_use]
    pub fn source(index: usize, data: Bytes) -> Self {
        Self::new(index, FragmentKind::Source, data)
    }

    /// Create a parity fragment
    #[must_use]
    pub fn parity(index: usize, data: Bytes) -> Self {
        Self::new(index, FragmentKind::Parity, data)
    }

    /// Whether this is a parity fragment
    #[must_use]
    pub fn is_parity(&self) -> bool {
        self.kind == FragmentKind::Parity
    }

    /// Verify the fragment's checksum
    #[must_use]
    pub fn verify(&self) -> bool {
        self.checksum.verify(&self.data)
    }

    /// Get the size of the fragment data
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
