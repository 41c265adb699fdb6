//! rfma-runner: batch RFM-A scoring over a directory of CSV tables.
//!
//! Usage:
//!   rfma-runner --data-dir ./data --as-of 2024-06-30
//!   rfma-runner --data-dir ./data --config rfma.json --counts counts.json

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use rfma_core::{
    store::{write_results, write_segment_counts},
    AnalysisResult, FlatFileStore, RfmaConfig, RfmaEngine,
};

/// Score and segment patients from patients.csv, transactions.csv and adherence.csv
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the input CSV tables
    #[arg(short, long, default_value = "./data")]
    data_dir: String,

    /// Optional JSON model configuration; defaults are used when omitted
    #[arg(short, long)]
    config: Option<String>,

    /// Evaluation date for recency (YYYY-MM-DD); defaults to today
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// Output path for the final result table
    #[arg(short, long, default_value = "rfma_results.csv")]
    output: String,

    /// Optional output path for segment counts as JSON
    #[arg(long)]
    counts: Option<String>,

    /// Number of high-risk patients to list in the summary
    #[arg(long, default_value = "5")]
    top: usize,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    println!("RFM-A patient segmentation");
    println!("  data_dir:  {}", args.data_dir);
    println!("  config:    {}", args.config.as_deref().unwrap_or("(defaults)"));
    match args.as_of {
        Some(date) => println!("  as_of:     {date}"),
        None       => println!("  as_of:     (today)"),
    }
    println!();

    let config = match &args.config {
        Some(path) => RfmaConfig::load(path)?,
        None       => RfmaConfig::default(),
    };
    log::debug!("model config: {config:?}");
    let engine = RfmaEngine::new(config)?;

    let store = FlatFileStore::open(&args.data_dir)?;
    let tables = store.load_tables()?;

    let result = engine.run(&tables, args.as_of)?;

    write_results(&args.output, result.records())
        .with_context(|| format!("writing results to {}", args.output))?;
    if let Some(path) = &args.counts {
        write_segment_counts(path, result.segment_counts())
            .with_context(|| format!("writing segment counts to {path}"))?;
    }

    print_summary(&result);
    print_high_risk(&result, args.top);

    println!();
    println!("Results saved to {}", args.output);
    if let Some(path) = &args.counts {
        println!("Segment counts saved to {path}");
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let total = result.len();

    println!("=== RUN SUMMARY ===");
    println!("  evaluation date:         {}", result.evaluation_date());
    println!("  patients scored:         {total}");
    println!("  dropped (no adherence):  {}", result.dropped_without_adherence().len());
    println!("  never transacted:        {}", result.patients_without_transactions());

    println!();
    println!("=== SEGMENTS ===");
    for (segment, count) in result.segment_counts() {
        let share = *count as f64 / total as f64 * 100.0;
        println!("  {:<20} {count:>6} ({share:.1}%)", segment.label());
    }
}

fn print_high_risk(result: &AnalysisResult, top: usize) {
    if top == 0 {
        return;
    }

    println!();
    println!("=== HIGH-RISK PATIENTS (first {top}) ===");
    let mut shown = 0;
    for patient in result.high_risk().take(top) {
        println!(
            "  {} (ID: {}) | {} | adherence {:.2} | RFMA {:.2}",
            patient.name,
            patient.patient_id,
            patient.primary_disease,
            patient.adherence_score,
            patient.rfma_score,
        );
        shown += 1;
    }
    if shown == 0 {
        println!("  (none)");
    }
}
