//! Batch command for multiple extraction payloads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use lotbill_core::invoice::InvoiceNormalizer;
use lotbill_core::ledger::{reconcile, LedgerMapper, Reconciliation};
use lotbill_core::models::bill::Bill;
use lotbill_core::models::config::LedgerConfig;
use lotbill_core::models::invoice::Invoice;

use super::map::format_bill;
use super::normalize::{format_invoice, OutputFormat};
use super::{load_config, load_invoice};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern for extraction payloads (e.g. "scans/*.json")
    #[arg(required = true)]
    input: String,

    /// Map each invoice to a bill with this account code
    #[arg(short, long)]
    account_code: Option<String>,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    invoice: Option<Invoice>,
    bill: Option<(Bill, Reconciliation)>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if let Some(code) = &args.account_code {
        if code.trim().is_empty() {
            anyhow::bail!("--account-code must not be blank");
        }
    }

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let normalizer = InvoiceNormalizer::new();
    let mapper = LedgerMapper::from_config(&config.ledger);
    let mut results = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = process_single_file(&path, &normalizer, &mapper, &args, &config.ledger);
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok((invoice, bill)) => results.push(ProcessResult {
                path,
                invoice: Some(invoice),
                bill,
                error: None,
                processing_time_ms,
            }),
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    results.push(ProcessResult {
                        path,
                        invoice: None,
                        bill: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_and_clear();

    if let Some(output_dir) = &args.output_dir {
        for result in &results {
            write_output(output_dir, result, args.format)?;
        }
    }

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();
    let flagged = results
        .iter()
        .filter(|r| r.bill.as_ref().is_some_and(|(_, c)| !c.within_tolerance))
        .count();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed, {} out of tolerance",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red(),
        style(flagged).yellow()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

fn process_single_file(
    path: &Path,
    normalizer: &InvoiceNormalizer,
    mapper: &LedgerMapper,
    args: &BatchArgs,
    ledger: &LedgerConfig,
) -> anyhow::Result<(Invoice, Option<(Bill, Reconciliation)>)> {
    let invoice = load_invoice(path, normalizer)?;

    let bill = match &args.account_code {
        Some(code) => {
            let bill = mapper.map(&invoice, code)?;
            let check = reconcile(&invoice, &bill, mapper.tax_codes(), ledger.tolerance);
            Some((bill, check))
        }
        None => None,
    };

    Ok((invoice, bill))
}

fn write_output(output_dir: &Path, result: &ProcessResult, format: OutputFormat) -> anyhow::Result<()> {
    let Some(invoice) = &result.invoice else {
        return Ok(());
    };

    let output_name = result
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("invoice");

    let (name, content) = match &result.bill {
        Some((bill, _)) => (format!("{}.bill", output_name), format_bill(bill, format)?),
        None => (output_name.to_string(), format_invoice(invoice, format)?),
    };

    let output_path = output_dir.join(format!("{}.{}", name, format.extension()));
    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());

    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "invoice_number",
        "invoice_date",
        "supplier_name",
        "total_amount",
        "currency",
        "lines",
        "issues",
        "bill_total",
        "within_tolerance",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_string();

        let record = match &result.invoice {
            Some(invoice) => {
                let (bill_total, within) = match &result.bill {
                    Some((_, check)) => (
                        check.bill_total.to_string(),
                        check.within_tolerance.to_string(),
                    ),
                    None => (String::new(), String::new()),
                };
                [
                    filename,
                    "success".to_string(),
                    invoice.invoice_number.clone(),
                    invoice.invoice_date.clone(),
                    invoice.supplier_name.clone(),
                    invoice.total_amount.to_string(),
                    invoice.currency.clone(),
                    invoice.line_items.len().to_string(),
                    invoice.validate().join("; "),
                    bill_total,
                    within,
                    result.processing_time_ms.to_string(),
                    String::new(),
                ]
            }
            None => [
                filename,
                "error".to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                result.processing_time_ms.to_string(),
                result.error.clone().unwrap_or_default(),
            ],
        };

        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
