//! StripeIO EC - Cauchy Reed-Solomon encode/recover driver
//!
//! Fills a dataset with random bytes, encodes every page into parity,
//! simulates lost fragments and checks that recovery reproduces them.
//!
//! ```text
//! # 4 KiB pages
//! stripeio-ec -k 8 -p 2 -l 4096 -e 3 -e 9
//! # 2 MiB pages
//! stripeio-ec -k 8 -p 2 -l 2M
//! ```

mod run;
mod simulate;

use anyhow::{Context, Result, bail};
use clap::Parser;
use rand::{SeedableRng, rngs::StdRng};
use run::{RunPlan, execute};
use std::path::PathBuf;
use stripeio_common::Config;
use stripeio_common::config::parse_size;
use stripeio_erasure::BackendType;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stripeio-ec")]
#[command(about = "Cauchy Reed-Solomon encode/recover driver")]
#[command(version)]
struct Args {
    /// Number of source fragments (k)
    #[arg(short = 'k', long = "source-fragments")]
    data_fragments: Option<usize>,

    /// Number of parity fragments (p)
    #[arg(short = 'p', long = "parity-fragments")]
    parity_fragments: Option<usize>,

    /// Length of one fragment page, e.g. 4096 or 2M
    #[arg(short = 'l', long, value_parser = parse_size_arg)]
    page_size: Option<u64>,

    /// Simulate erasure of this fragment index (zero based, repeatable)
    #[arg(short = 'e', long = "erasure")]
    erasures: Vec<usize>,

    /// Pick random (k, p) and erasures with this seed
    #[arg(short = 'r', long = "random")]
    seed: Option<u64>,

    /// Configuration file path
    #[arg(short, long, default_value = "stripeio.toml", env = "STRIPEIO_CONFIG")]
    config: PathBuf,

    /// Total source data to encode, e.g. 40M or 3G
    #[arg(long, value_parser = parse_size_arg)]
    dataset_size: Option<u64>,

    /// GF(256) backend (auto, split, product)
    #[arg(long)]
    backend: Option<BackendType>,

    /// Encode and recover pages on all cores
    #[arg(long)]
    parallel: bool,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Log level
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_size_arg(s: &str) -> std::result::Result<u64, String> {
    parse_size(s).map_err(|e| e.to_string())
}

/// Merge CLI args into the file configuration (CLI takes precedence)
fn merge_args(args: &Args, mut config: Config) -> Config {
    if let Some(k) = args.data_fragments {
        config.code.data_fragments = k;
    }
    if let Some(p) = args.parity_fragments {
        config.code.parity_fragments = p;
    }
    if let Some(backend) = args.backend {
        config.code.backend = backend.to_string();
    }
    if let Some(page_size) = args.page_size {
        config.workload.page_size = usize::try_from(page_size).unwrap_or(usize::MAX);
    }
    if let Some(dataset_size) = args.dataset_size {
        config.workload.dataset_size = dataset_size;
    }
    if !args.erasures.is_empty() {
        config.workload.erasures.clone_from(&args.erasures);
    }
    if args.seed.is_some() {
        config.workload.seed = args.seed;
    }
    if args.parallel {
        config.workload.parallel = true;
    }
    if let Some(level) = &args.log_level {
        config.logging.level.clone_from(level);
    }
    config
}

/// Resolve the configuration into a concrete run
///
/// With a seed, `(k, p)` and the erasures are drawn from it and the dataset
/// is rounded down to whole stripes of the drawn `k` (at least one). Without
/// a seed and without erasures, `p` distinct erasures are drawn from
/// `fill_seed`.
fn resolve_plan(mut config: Config, fill_seed: u64) -> Result<RunPlan> {
    let backend: BackendType = config
        .code
        .backend
        .parse()
        .map_err(anyhow::Error::msg)?;

    if let Some(seed) = config.workload.seed {
        let mut rng = StdRng::seed_from_u64(seed);
        let code = simulate::random_code(&mut rng)?;
        if !config.workload.erasures.is_empty() {
            warn!("random mode chooses its own erasures; ignoring the given list");
        }
        config.code.data_fragments = code.params.data_fragments();
        config.code.parity_fragments = code.params.parity_fragments();
        config.workload.erasures = code.erasures;

        let stripe = (config.workload.page_size as u64)
            .checked_mul(config.code.data_fragments as u64)
            .filter(|&stripe| stripe > 0);
        if let Some(stripe) = stripe {
            let whole = (config.workload.dataset_size / stripe).max(1);
            config.workload.dataset_size = whole
                .checked_mul(stripe)
                .context("dataset size overflows after rounding to whole stripes")?;
        }
    }

    let params = config.validate()?;

    let erasures = if config.workload.seed.is_none() && config.workload.erasures.is_empty() {
        let mut rng = StdRng::seed_from_u64(fill_seed);
        simulate::random_erasures(&mut rng, &params)
    } else {
        config.workload.erasures.clone()
    };

    let dataset_size = usize::try_from(config.workload.dataset_size)
        .context("dataset size does not fit in memory")?;

    Ok(RunPlan {
        params,
        backend,
        page_size: config.workload.page_size,
        dataset_size,
        erasures,
        parallel: config.workload.parallel,
        fill_seed: config.workload.seed.unwrap_or(fill_seed),
    })
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load config file if it exists
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config {}", args.config.display()))?;
    let config = merge_args(&args, config);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Config file: {}", args.config.display());

    let fill_seed = rand::random::<u64>();
    let plan = resolve_plan(config, fill_seed)?;
    let summary = execute(&plan)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    if !summary.passed() {
        bail!("recovery verification failed for fragments {:?}", summary.failed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("stripeio-ec").chain(argv.iter().copied()))
    }

    fn small(config: Config) -> Config {
        let mut config = config;
        // Whole stripes for both k = 4 and k = 10
        config.workload.dataset_size = 4 * 81920;
        config
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = args(&[
            "-k", "8", "-p", "2", "-l", "4K", "-e", "3", "-e", "9", "--backend", "product",
            "--dataset-size", "1M", "--parallel",
        ]);
        let config = merge_args(&args, Config::default());
        assert_eq!(config.code.data_fragments, 8);
        assert_eq!(config.code.parity_fragments, 2);
        assert_eq!(config.code.backend, "product");
        assert_eq!(config.workload.page_size, 4096);
        assert_eq!(config.workload.dataset_size, 1024 * 1024);
        assert_eq!(config.workload.erasures, vec![3, 9]);
        assert!(config.workload.parallel);

        let plan = resolve_plan(config, 0).unwrap();
        assert_eq!(plan.erasures, vec![3, 9]);
        assert_eq!(plan.backend, BackendType::Product);
        assert_eq!(plan.pages(), 32);
    }

    #[test]
    fn test_default_config_resolves() {
        let plan = resolve_plan(merge_args(&args(&[]), Config::default()), 3).unwrap();
        assert_eq!(plan.params.data_fragments(), 10);
        assert_eq!(plan.params.parity_fragments(), 4);
        assert_eq!(plan.erasures.len(), 4);
        assert_eq!(plan.pages(), 1024);
    }

    #[test]
    fn test_rejects_overflowing_page_size() {
        // 2^60 * 200 does not fit in u64
        let argv = ["-k", "200", "-p", "4", "-l", "1152921504606846976"];
        let config = merge_args(&args(&argv), Config::default());
        let err = resolve_plan(config, 0).unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
    }

    #[test]
    fn test_default_simulates_p_distinct_erasures() {
        let config = merge_args(&args(&[]), small(Config::default()));
        let plan = resolve_plan(config, 5).unwrap();
        assert_eq!(plan.params.data_fragments(), 10);
        let mut erasures = plan.erasures.clone();
        erasures.sort_unstable();
        erasures.dedup();
        assert_eq!(erasures.len(), 4);
        assert_eq!(plan.fill_seed, 5);
    }

    #[test]
    fn test_random_mode_is_reproducible() {
        let config = merge_args(&args(&["-r", "17"]), small(Config::default()));
        let a = resolve_plan(config.clone(), 1).unwrap();
        let b = resolve_plan(config, 2).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fill_seed, 17);
        assert!(a.erasures.len() <= a.params.parity_fragments());
        let stripe = a.page_size * a.params.data_fragments();
        assert_eq!(a.dataset_size % stripe, 0);
        assert!(a.dataset_size >= stripe);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        let config = merge_args(&args(&["-k", "0"]), small(Config::default()));
        assert!(resolve_plan(config, 0).is_err());

        let config = merge_args(&args(&["-k", "200", "-p", "60"]), small(Config::default()));
        assert!(resolve_plan(config, 0).is_err());

        // Not a multiple of 3 * 4096
        let config = merge_args(&args(&["-k", "3", "-p", "1"]), small(Config::default()));
        assert!(resolve_plan(config, 0).is_err());
    }

    #[test]
    fn test_rejects_unknown_backend() {
        let mut config = small(Config::default());
        config.code.backend = "isal".into();
        assert!(resolve_plan(config, 0).is_err());
        assert!(Args::try_parse_from(["stripeio-ec", "--backend", "isal"]).is_err());
    }

    #[test]
    fn test_end_to_end_small_run() {
        let config = merge_args(
            &args(&["-k", "4", "-p", "4", "-e", "4", "-e", "5", "-e", "6", "-e", "7"]),
            small(Config::default()),
        );
        let plan = resolve_plan(config, 9).unwrap();
        let summary = execute(&plan).unwrap();
        assert!(summary.passed());
        assert_eq!(summary.pages, 20);
    }
}
