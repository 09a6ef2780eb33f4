//! Encode, simulated loss, recovery and verification of one dataset

use anyhow::{Result, bail};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use std::fmt;
use std::time::Instant;
use stripeio_common::{Checksum, ChecksumCalculator, CodeParams};
use stripeio_erasure::{BackendType, ErasureCodec, VerificationReport};
use tracing::{debug, error, info};

/// Fully resolved run parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunPlan {
    pub params: CodeParams,
    pub backend: BackendType,
    pub page_size: usize,
    pub dataset_size: usize,
    pub erasures: Vec<usize>,
    pub parallel: bool,
    pub fill_seed: u64,
}

impl RunPlan {
    /// Source bytes per page across all `k` fragments, `None` on overflow
    pub fn stripe_size(&self) -> Option<usize> {
        self.page_size.checked_mul(self.params.data_fragments())
    }

    /// Number of pages in the dataset
    pub fn pages(&self) -> usize {
        self.stripe_size()
            .and_then(|stripe| self.dataset_size.checked_div(stripe))
            .unwrap_or(0)
    }
}

/// Outcome of a run, printed as text or JSON
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub data_fragments: usize,
    pub parity_fragments: usize,
    pub total_fragments: usize,
    pub backend: &'static str,
    pub page_size: usize,
    pub pages: usize,
    pub dataset_bytes: usize,
    pub parallel: bool,
    pub fill_seed: u64,
    pub data_checksum: String,
    pub encode_ms: f64,
    pub encode_mb_per_s: f64,
    pub erasures: Vec<usize>,
    pub recover_ms: Option<f64>,
    pub failed: Vec<usize>,
}

impl RunSummary {
    /// True unless some recovered fragment differed from its original
    pub fn passed(&self) -> bool {
        self.failed.is_empty()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stripeio-ec:")?;
        writeln!(
            f,
            " encode (m,k,p)=({},{},{}) page_size={} backend={}",
            self.total_fragments,
            self.data_fragments,
            self.parity_fragments,
            self.page_size,
            self.backend
        )?;
        writeln!(
            f,
            "encoding time = {:.02} ms, speed: {:.02} MB/s ({} pages)",
            self.encode_ms, self.encode_mb_per_s, self.pages
        )?;
        match self.recover_ms {
            None => write!(f, " no erasures, recovery skipped"),
            Some(ms) => {
                writeln!(f, " recover {} fragments {:?}", self.erasures.len(), self.erasures)?;
                writeln!(f, " recovery time = {ms:.02} ms")?;
                if self.passed() {
                    write!(f, " done all: Pass")
                } else {
                    write!(f, " Fail on fragments {:?}", self.failed)
                }
            }
        }
    }
}

/// Execute a run: fill, encode every page, then recover and verify
///
/// Verification failures are reported in the summary, not as an error.
///
/// # Errors
/// Returns an error for invalid erasure lists or dataset geometry.
pub fn execute(plan: &RunPlan) -> Result<RunSummary> {
    let k = plan.params.data_fragments();
    let p = plan.params.parity_fragments();
    let Some(stripe) = plan.stripe_size() else {
        bail!("page_size {} * k {} overflows", plan.page_size, k);
    };
    let pages = plan.pages();
    if pages == 0 || plan.dataset_size % stripe != 0 {
        bail!(
            "dataset size {} is not a non-zero multiple of page_size * k = {stripe}",
            plan.dataset_size
        );
    }

    let codec = ErasureCodec::with_backend(plan.params, plan.backend);
    info!(
        params = %plan.params,
        backend = codec.backend_name(),
        page_size = plan.page_size,
        pages,
        "starting run"
    );

    let mut data = vec![0u8; plan.dataset_size];
    StdRng::seed_from_u64(plan.fill_seed).fill_bytes(&mut data);
    let before = digest(&data, stripe);
    let Some(parity_len) = pages.checked_mul(p).and_then(|n| n.checked_mul(plan.page_size)) else {
        bail!("parity region for {pages} pages of {p} fragments overflows");
    };
    let mut parity = vec![0u8; parity_len];

    let start = Instant::now();
    if plan.parallel {
        codec.encode_pages_par(&data, &mut parity, plan.page_size)?;
    } else {
        codec.encode_pages(&data, &mut parity, plan.page_size)?;
    }
    let encode_secs = start.elapsed().as_secs_f64();
    if digest(&data, stripe) != before {
        bail!("source region changed during encode");
    }

    #[allow(clippy::cast_precision_loss)]
    let encode_mb_per_s = if encode_secs > 0.0 {
        plan.dataset_size as f64 / (1024.0 * 1024.0) / encode_secs
    } else {
        0.0
    };
    info!(
        encode_ms = encode_secs * 1e3,
        mb_per_s = encode_mb_per_s,
        "encoded dataset"
    );

    let mut summary = RunSummary {
        data_fragments: k,
        parity_fragments: p,
        total_fragments: plan.params.total_fragments(),
        backend: codec.backend_name(),
        page_size: plan.page_size,
        pages,
        dataset_bytes: plan.dataset_size,
        parallel: plan.parallel,
        fill_seed: plan.fill_seed,
        data_checksum: before.short_hex(),
        encode_ms: encode_secs * 1e3,
        encode_mb_per_s,
        erasures: plan.erasures.clone(),
        recover_ms: None,
        failed: Vec::new(),
    };

    if plan.erasures.is_empty() {
        info!("no erasures, skipping recovery");
        return Ok(summary);
    }

    let recovery = codec.plan_recovery(&plan.erasures)?;
    debug!(decode_index = ?recovery.decode_index, "decode plan ready");

    let start = Instant::now();
    let recovered = if plan.parallel {
        codec.recover_pages_par(&recovery, &data, &parity, plan.page_size)?
    } else {
        codec.recover_pages(&recovery, &data, &parity, plan.page_size)?
    };
    summary.recover_ms = Some(start.elapsed().as_secs_f64() * 1e3);

    let report = codec.verify_pages(&recovery, &recovered, &data, &parity)?;
    summary.failed = log_report(&report);
    Ok(summary)
}

/// Digest the dataset one stripe at a time
fn digest(data: &[u8], stripe: usize) -> Checksum {
    let mut calc = ChecksumCalculator::new();
    for page in data.chunks(stripe) {
        calc.update(page);
    }
    calc.finalize()
}

fn log_report(report: &VerificationReport) -> Vec<usize> {
    for check in &report.checks {
        match check.mismatch_offset {
            None => debug!(index = check.index, kind = %check.kind, "fragment recovered"),
            Some(offset) => error!(
                index = check.index,
                kind = %check.kind,
                offset,
                "recovered fragment differs from original"
            ),
        }
    }
    report.failed_indices()
}
