//! Fragment and dataset checksums
//!
//! A [`Checksum`] pairs CRC32C (checked on every fragment read) with
//! xxHash64 (a second, independent digest for comparing whole datasets).

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::{Xxh64, xxh64};

/// Digest of one byte region
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub crc32c: u32,
    pub xxhash64: u64,
}

impl Checksum {
    /// Digest a region in one call
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self {
            crc32c: crc32c::crc32c(data),
            xxhash64: xxh64(data, 0),
        }
    }

    /// Check `data` against the CRC32C half
    #[must_use]
    pub fn verify(&self, data: &[u8]) -> bool {
        crc32c::crc32c(data) == self.crc32c
    }

    /// `crc32c:xxhash64` in hex
    #[must_use]
    pub fn short_hex(&self) -> String {
        format!("{:08x}:{:016x}", self.crc32c, self.xxhash64)
    }
}

/// Incremental [`Checksum`] over a region fed in pieces
///
/// Feeding a region page by page yields the same digest as
/// [`Checksum::compute`] over the whole region.
pub struct ChecksumCalculator {
    crc32c: u32,
    xxhash: Xxh64,
}

impl ChecksumCalculator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            crc32c: 0,
            xxhash: Xxh64::new(0),
        }
    }

    /// Feed the next piece of the region
    pub fn update(&mut self, data: &[u8]) {
        self.crc32c = crc32c::crc32c_append(self.crc32c, data);
        self.xxhash.update(data);
    }

    #[must_use]
    pub fn finalize(self) -> Checksum {
        Checksum {
            crc32c: self.crc32c,
            xxhash64: self.xxhash.digest(),
        }
    }
}

impl Default for ChecksumCalculator {
    fn default() -> Self {
        Self::new()
    }
}
