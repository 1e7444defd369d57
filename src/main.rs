//! sigpat command-line miner
//!
//! Reads a transaction file and a label file, mines significant itemsets
//! and writes `<prefix>.significant`, `<prefix>.pvalues` and
//! `<prefix>.summary`.
//!
//! Run with: cargo run --release -- transactions.dat labels.dat out \
//!     --min-support 10 --delta 0.05 --epsilon 1.0

use clap::{ArgAction, Parser};
use sigpat::{
    Dataset, FileSink, Miner, MinerConfig, MiningMode, MiningSummary, PvalueStrategy, SigpatError,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for the significant itemset miner
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// File with one whitespace-separated transaction per line
    transactions_file: String,

    /// File with one '0'/'1' label character per transaction
    labels_file: String,

    /// Prefix of the output files
    output_prefix: String,

    /// Minimum support count (theta)
    #[arg(long)]
    min_support: u64,

    /// Corrected significance threshold (delta)
    #[arg(long)]
    delta: f64,

    /// Frequency accuracy (epsilon) for the confidence-interval shortcut
    #[arg(long)]
    epsilon: f64,

    /// Enumeration mode: "frequent", "closed" or "maximal"
    #[arg(long, default_value = sigpat::config::DEFAULT_MODE)]
    mode: String,

    /// P-value strategy: "fast", "bounds-enum", "ci-only" or "naive"
    #[arg(long, default_value = "fast")]
    strategy: String,

    /// Disable the p-value memo cache
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Also write the summary as <prefix>.summary.json
    #[arg(long, default_value_t = false)]
    json_summary: bool,

    /// Increase output verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            info!(
                "  ✓ {} significant patterns out of {} tested",
                summary.significant_patterns, summary.tested_patterns
            );
            info!(
                "  ✓ Results written to {}.significant / .pvalues / .summary",
                cli.output_prefix
            );
        }
        Err(e) => {
            error!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn run(cli: &Cli) -> Result<MiningSummary, SigpatError> {
    let mut config = MinerConfig::new(cli.min_support, cli.delta, cli.epsilon);
    config.mode = parse_mode(&cli.mode)?;
    config.strategy = parse_strategy(&cli.strategy)?;
    config.use_cache = !cli.no_cache;

    let dataset = Dataset::load(&cli.transactions_file, &cli.labels_file)?;

    let mut sink = FileSink::create(&cli.output_prefix)?;
    let summary = Miner::new(config).run(&dataset, &mut sink)?;
    sink.finish()?;
    sigpat::write_summary(&cli.output_prefix, &summary, cli.json_summary)?;
    Ok(summary)
}

fn parse_mode(mode: &str) -> Result<MiningMode, SigpatError> {
    match mode {
        "frequent" => Ok(MiningMode::Frequent),
        "closed" => Ok(MiningMode::Closed),
        "maximal" => Ok(MiningMode::Maximal),
        other => Err(SigpatError::InvalidInput(format!(
            "unknown mode {:?} (expected frequent, closed or maximal)",
            other
        ))),
    }
}

fn parse_strategy(strategy: &str) -> Result<PvalueStrategy, SigpatError> {
    match strategy {
        "fast" => Ok(PvalueStrategy::FastTailed),
        "bounds-enum" => Ok(PvalueStrategy::BoundsPlusEnum),
        "ci-only" => Ok(PvalueStrategy::ConfidenceIntervalOnly),
        "naive" => Ok(PvalueStrategy::Naive),
        other => Err(SigpatError::InvalidInput(format!(
            "unknown strategy {:?} (expected fast, bounds-enum, ci-only or naive)",
            other
        ))),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info,sigpat=info",
        1 => "debug,sigpat=debug",
        _ => "sigpat=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    use tracing_tree::HierarchicalLayer;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            HierarchicalLayer::new(2)
                .with_targets(false)
                .with_bracketed_fields(true),
        )
        .init();
}
