//! Batch command - parse many JSON input files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, error, warn};

use poconf_core::{HybridParser, ParseInput, ParsedConfirmationFieldsV1};

use super::{build_parser, load_config};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching JSON input files
    #[arg(required = true)]
    input: String,

    /// Output directory for per-file results and the summary
    #[arg(short, long, default_value = "poconf-out")]
    output_dir: PathBuf,

    /// Rules only; never call the completion service
    #[arg(long)]
    no_llm: bool,

    /// Include every ranked candidate in each result
    #[arg(long)]
    debug: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    parsed: Option<ParsedConfirmationFieldsV1>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let mut files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    fs::create_dir_all(&args.output_dir)?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = build_parser(&config, args.no_llm)?;
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let outcome = process_single_file(&path, &parser, args.debug).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match outcome {
            Ok(parsed) => {
                let output_path = args.output_dir.join(output_name(&path));
                fs::write(&output_path, serde_json::to_string_pretty(&parsed)?)?;
                debug!("Wrote output to {}", output_path.display());

                results.push(ProcessResult {
                    path,
                    parsed: Some(parsed),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        parsed: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    pb.abandon();
                    anyhow::bail!("Processing failed for {}: {}", path.display(), error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    let summary_path = args.output_dir.join("summary.csv");
    write_summary(&summary_path, &results)?;

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );
    println!(
        "{} Summary written to {}",
        style("✓").green(),
        summary_path.display()
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for result in &failed {
            println!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_single_file(
    path: &Path,
    parser: &HybridParser,
    debug: bool,
) -> anyhow::Result<ParsedConfirmationFieldsV1> {
    let content = fs::read_to_string(path)?;
    let mut input: ParseInput = serde_json::from_str(&content)?;
    input.debug |= debug;

    Ok(parser.parse(&input).await?)
}

fn output_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("confirmation");
    format!("{}.result.json", stem)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "supplier_order_number",
        "confirmed_delivery_date",
        "supplier_confirmed_quantity",
        "quantity_mismatch",
        "price_changed",
        "evidence_source",
        "extraction_method",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(parsed) = &result.parsed {
            wtr.write_record([
                filename,
                "success",
                parsed.supplier_order_number.value.as_deref().unwrap_or(""),
                &parsed
                    .confirmed_delivery_date
                    .value
                    .map(|d| d.to_string())
                    .unwrap_or_default(),
                &parsed
                    .supplier_confirmed_quantity
                    .value
                    .map(|q| q.normalize().to_string())
                    .unwrap_or_default(),
                &parsed
                    .quantity_mismatch
                    .value
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                &parsed
                    .price_changed
                    .as_ref()
                    .map(|p| p.value.to_string())
                    .unwrap_or_default(),
                &label(&parsed.evidence_source),
                &label(&parsed.extraction_method),
                &result.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &result.processing_time_ms.to_string(),
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Serialized name of a unit enum variant.
fn label<T: Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default()
}
