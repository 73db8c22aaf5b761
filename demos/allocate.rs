//! Four platforms → posterior summaries → budget split.
//!
//! Run with:
//!   cargo run --example allocate
//!   RUST_LOG=budgetmux=debug cargo run --example allocate

use budgetmux::{simulate_batch, PlatformInput, ScoreConfig, SimulationConfig};
use std::collections::BTreeMap;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 24h aggregates per platform: CPM in USD with its CV, rates with absolute std.
    let inputs: BTreeMap<String, PlatformInput> = [
        ("Google", 8.0, 0.25, 0.018, 0.006, 0.040, 0.015),
        ("Meta", 6.5, 0.30, 0.012, 0.004, 0.030, 0.010),
        ("TikTok", 4.0, 0.45, 0.010, 0.005, 0.015, 0.008),
        ("LinkedIn", 30.0, 0.20, 0.006, 0.002, 0.060, 0.020),
    ]
    .into_iter()
    .map(|(name, cpm_mean, cpm_cv, ctr_mean, ctr_std, cvr_mean, cvr_std)| {
        (
            name.to_string(),
            PlatformInput {
                cpm_mean,
                cpm_cv,
                ctr_mean,
                ctr_std,
                cvr_mean,
                cvr_std,
            },
        )
    })
    .collect();

    let report = match simulate_batch(&inputs, &SimulationConfig::default()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("simulation failed: {e}");
            std::process::exit(1);
        }
    };
    for (name, e) in &report.failures {
        eprintln!("skipping {name}: {e}");
    }

    println!("=== Metric summaries ===");
    for (name, s) in &report.summaries {
        println!("{name}:");
        for (label, m) in [("CPM", s.cpm), ("CTR", s.ctr), ("CVR", s.cvr)] {
            println!(
                "  {label}: p10={:.4} p50={:.4} p90={:.4} certainty={:.1}%",
                m.p10, m.p50, m.p90, m.certainty_pct
            );
        }
    }

    let alloc = match report.allocate(&ScoreConfig::default()) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("allocation failed: {e}");
            std::process::exit(1);
        }
    };

    println!("\n=== Budget allocation ===");
    println!("{alloc}");

    println!("\n=== Detail ===");
    for (name, d) in &alloc.details {
        println!("{name}:");
        println!("  cost per conversion:     ${:.2}", d.cost_per_conversion);
        println!("  overall conversion rate: {:.3}%", d.overall_conversion_rate * 100.0);
        println!("  average certainty:       {:.1}%", d.avg_certainty);
        println!("  composite score:         {:.2}", d.composite_score);
    }
}
