//! # CLI Execution Functions
//!
//! Extracted from `main.rs` to keep the entry point slim. Each function runs
//! one subcommand and prints either the text report or JSON to stdout.

use std::time::Duration;

use anyhow::{Context, Result};
use rug::Integer;
use serde_json::json;
use tracing::{info, warn};
use xkiss_awc::pratt::{self, PrattBuilder};
use xkiss_awc::progress::Progress;
use xkiss_awc::search;
use xkiss_awc::{certify_period, certify_variant, CombinedGenerator, PeriodReport, Variant, Xkiss16Awc, Xkiss64Awc};

use super::{Cli, Commands, Preset};

// ── Period Reports ──────────────────────────────────────────────

pub fn run_period(cli: &Cli, width: u32) -> Result<()> {
    let report = certify_period(width).with_context(|| format!("certifying width {}", width))?;
    print_report(cli, &report)
}

pub fn run_variant(cli: &Cli, variant: Variant) -> Result<()> {
    let report = certify_variant(variant).with_context(|| format!("certifying {}", variant))?;
    print_report(cli, &report)
}

fn print_report(cli: &Cli, report: &PeriodReport) -> Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("{}", report);
    }
    Ok(())
}

// ── Test Vectors ────────────────────────────────────────────────

pub fn run_vectors(cli: &Cli, steps16: u64, steps64: u64) -> Result<()> {
    let mut g16 = Xkiss16Awc::default();
    let mut packed = 0u32;
    for _ in 0..steps16 {
        packed = g16.next_pair();
    }
    let mut g64 = Xkiss64Awc::default();
    let out64 = g64.advance(steps64).unwrap_or(0);

    if cli.json {
        let v = json!({
            "xkiss16": { "steps": steps16, "output": format!("0x{:08x}", packed) },
            "xkiss64": { "steps": steps64, "output": format!("0x{:016x}", out64) },
        });
        println!("{}", serde_json::to_string_pretty(&v)?);
    } else {
        println!("{} after {} pairs: 0x{:08x}", Variant::Xkiss16, steps16, packed);
        println!("{} after {} steps: 0x{:016x}", Variant::Xkiss64, steps64, out64);
    }
    Ok(())
}

// ── Certificates ────────────────────────────────────────────────

pub fn run_certify(cli: &Cli) -> Result<()> {
    let Commands::Certify {
        n,
        preset,
        trusted_bits,
        max_attempts,
        max_depth,
        seed,
    } = &cli.command
    else {
        anyhow::bail!("run_certify called for another subcommand")
    };

    let n = match (n, preset) {
        (Some(n), _) => n.clone(),
        (None, Some(Preset::Mwc128)) | (None, None) => pratt::mwc128_modulus(),
    };
    info!(n = %n, bits = n.significant_bits(), "building certificate");

    let builder = PrattBuilder::new()
        .trusted_bits(*trusted_bits)
        .max_witness_attempts(*max_attempts)
        .max_depth(*max_depth)
        .seed(*seed);
    let cert = builder
        .build(&n)
        .with_context(|| format!("building certificate for {}", n))?;
    cert.verify_with(builder.trusted_threshold_bits())
        .context("certificate failed independent verification")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&cert)?);
    } else {
        print!("{}", cert);
        println!(
            "verified: {} nodes, depth {}",
            cert.node_count(),
            cert.depth()
        );
    }
    Ok(())
}

// ── Modulus Search ──────────────────────────────────────────────

pub fn run_search(cli: &Cli) -> Result<()> {
    let Commands::Search {
        start,
        count,
        chunk,
        limit,
        radix_bits,
        report_secs,
    } = &cli.command
    else {
        anyhow::bail!("run_search called for another subcommand")
    };

    let b = Integer::from(1u32) << *radix_bits;
    info!(
        cores = rayon::current_num_threads(),
        radix_bits,
        start,
        count,
        "starting modulus search"
    );

    let progress = Progress::new();
    let reporter = progress.start_reporter(Duration::from_secs((*report_secs).max(1)));
    let result = search::search_parallel(&b, &Integer::from(*start), *count, *chunk, Some(&progress));
    progress.stop();
    if reporter.join().is_err() {
        warn!("progress reporter panicked");
    }
    progress.print_status();

    let mut found = result.context("modulus search failed")?;
    if let Some(l) = limit {
        found.truncate(*l);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&found)?);
    } else {
        for c in &found {
            println!("{}", c);
        }
    }
    Ok(())
}

// ── Rayon Configuration ─────────────────────────────────────────

/// Size the global rayon pool. `None` or `0` leaves rayon's default of one
/// worker per logical core.
pub fn configure_rayon(threads: Option<usize>) {
    let Some(n) = threads.filter(|&n| n > 0) else {
        return;
    };
    match rayon::ThreadPoolBuilder::new().num_threads(n).build_global() {
        Ok(()) => info!(threads = n, "rayon pool sized"),
        Err(e) => warn!(error = %e, "rayon pool already initialized"),
    }
}
