//! # Main — CLI Entry Point
//!
//! Routes subcommands to the period certifier, the generator test vectors,
//! the Pratt certificate builder and the modulus search. Shared concerns
//! handled here: `.env` loading, logging setup and the rayon thread pool.
//!
//! ## Subcommands
//!
//! - `period --width W`: certify `m = (2^W)^2 + 2^W − 1` and the combined period.
//! - `variant --kind 16|64`: certify an implemented generator.
//! - `vectors`: golden test vectors of both generators.
//! - `certify`: build and independently verify a Pratt certificate.
//! - `search`: scan offsets for safe-prime moduli `a·b² − 1`.
//!
//! ## Global Options
//!
//! - `--json`: machine-readable output on stdout.
//! - `--threads` / `XKISS_THREADS`: rayon pool size (default: all cores).
//!
//! Logs go to stderr; `LOG_FORMAT=json` switches them to JSON lines and
//! `RUST_LOG` sets the filter (default `info`).

mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rug::Integer;
use tracing_subscriber::EnvFilter;

use xkiss_awc::pratt::{DEFAULT_MAX_DEPTH, DEFAULT_SEED, DEFAULT_TRUSTED_BITS, DEFAULT_WITNESS_ATTEMPTS};
use xkiss_awc::progress::REPORT_INTERVAL;
use xkiss_awc::search::{DEFAULT_CHUNK, DEFAULT_COUNT, DEFAULT_RADIX_BITS, DEFAULT_START};
use xkiss_awc::Variant;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(
    name = "xkiss-awc",
    version,
    about = "Combined xorshift/AWC/Weyl generators with certified periods"
)]
struct Cli {
    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true, env = "XKISS_THREADS")]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    /// 128-bit MWC modulus (2^64 − 10^16 − 69888)·2^64 − 1
    Mwc128,
}

#[derive(Subcommand)]
enum Commands {
    /// Certify the AWC modulus and combined period for word width W
    Period {
        /// Word width in bits (1..=64)
        #[arg(long, default_value_t = 16)]
        width: u32,
    },
    /// Certify the period of an implemented generator variant
    Variant {
        /// Generator variant: 16 or 64
        #[arg(long, default_value = "16")]
        kind: Variant,
    },
    /// Print golden test vectors of both generators
    Vectors {
        /// Packed 32-bit outputs drawn from the 16-bit generator
        #[arg(long, default_value_t = 10_000)]
        steps16: u64,
        /// Steps of the 64-bit generator
        #[arg(long, default_value_t = 1_000_000)]
        steps64: u64,
    },
    /// Build and verify a Pratt primality certificate
    Certify {
        /// Number to certify (decimal)
        #[arg(long, value_parser = parse_integer, conflicts_with = "preset")]
        n: Option<Integer>,
        /// Named constant to certify (default when --n is absent)
        #[arg(long, value_enum)]
        preset: Option<Preset>,
        /// Values below 2^bits are accepted by the probable-prime test
        #[arg(long, env = "XKISS_TRUSTED_BITS", default_value_t = DEFAULT_TRUSTED_BITS)]
        trusted_bits: u32,
        /// Random witness draws per node before giving up
        #[arg(long, env = "XKISS_MAX_ATTEMPTS", default_value_t = DEFAULT_WITNESS_ATTEMPTS)]
        max_attempts: u32,
        /// Maximum certificate depth
        #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
        max_depth: u32,
        /// Seed of the witness generator
        #[arg(long, env = "XKISS_WITNESS_SEED", default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
    /// Search offsets i for safe-prime moduli (b - i)·b^2 - 1
    Search {
        /// First offset
        #[arg(long, default_value_t = DEFAULT_START)]
        start: u64,
        /// Number of offsets to scan
        #[arg(long, default_value_t = DEFAULT_COUNT)]
        count: u64,
        /// Offsets per parallel work unit
        #[arg(long, env = "XKISS_CHUNK", default_value_t = DEFAULT_CHUNK)]
        chunk: u64,
        /// Stop reporting after this many candidates
        #[arg(long)]
        limit: Option<usize>,
        /// Radix b = 2^bits
        #[arg(long, default_value_t = DEFAULT_RADIX_BITS)]
        radix_bits: u32,
        /// Seconds between progress log lines
        #[arg(long, default_value_t = REPORT_INTERVAL.as_secs())]
        report_secs: u64,
    },
}

fn parse_integer(s: &str) -> std::result::Result<Integer, String> {
    Integer::parse(s.trim())
        .map(Integer::from)
        .map_err(|e| format!("invalid integer {:?}: {}", s, e))
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    // Initialize structured logging: LOG_FORMAT=json for log shippers, human-readable otherwise
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);

    match &cli.command {
        Commands::Period { width } => cli::run_period(&cli, *width),
        Commands::Variant { kind } => cli::run_variant(&cli, *kind),
        Commands::Vectors { steps16, steps64 } => cli::run_vectors(&cli, *steps16, *steps64),
        Commands::Certify { .. } => cli::run_certify(&cli),
        Commands::Search { .. } => cli::run_search(&cli),
    }
}
