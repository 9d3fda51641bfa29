//! Normalize command - coerce an extraction payload into a canonical invoice.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info};

use lotbill_core::invoice::{classify_invoice, InvoiceNormalizer};
use lotbill_core::models::invoice::Invoice;

use super::{emit, load_invoice};

/// Arguments for the normalize command.
#[derive(Args)]
pub struct NormalizeArgs {
    /// Extraction payload (JSON file, or - for stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Recompute tax fields from the auction VAT rules
    #[arg(long)]
    classify: bool,

    /// Keep the invoice date exactly as extracted
    #[arg(long)]
    keep_dates: bool,

    /// Report review issues on stderr
    #[arg(long)]
    validate: bool,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per line item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub async fn run(args: NormalizeArgs) -> anyhow::Result<()> {
    let start = Instant::now();

    info!("Normalizing {}", args.input.display());

    let normalizer = InvoiceNormalizer::new().with_date_normalization(!args.keep_dates);
    let mut invoice = load_invoice(&args.input, &normalizer)?;

    if args.classify {
        classify_invoice(&mut invoice);
    }

    if args.validate {
        print_issues(&invoice.validate());
    }

    let output = format_invoice(&invoice, args.format)?;
    emit(args.output.as_deref(), &output)?;

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

/// Print review issues to stderr.
pub fn print_issues(issues: &[String]) {
    if issues.is_empty() {
        return;
    }
    eprintln!("{}", style("Validation issues:").yellow());
    for issue in issues {
        eprintln!("  - {}", issue);
    }
}

pub fn format_invoice(invoice: &Invoice, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

fn format_csv(invoice: &Invoice) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "invoice_date",
        "supplier_name",
        "currency",
        "line_type",
        "lot_number",
        "description",
        "quantity",
        "unit_price",
        "tax_type",
        "tax_rate",
        "tax_amount",
        "vat_included",
        "line_total",
    ])?;

    for item in &invoice.line_items {
        wtr.write_record([
            invoice.invoice_number.clone(),
            invoice.invoice_date.clone(),
            invoice.supplier_name.clone(),
            invoice.currency.clone(),
            item.line_type.to_string(),
            item.lot_number.clone(),
            item.description.clone(),
            item.quantity.to_string(),
            item.unit_price.to_string(),
            item.tax_type.clone().unwrap_or_default(),
            item.tax_rate.map(|r| r.to_string()).unwrap_or_default(),
            item.tax_amount.map(|a| a.to_string()).unwrap_or_default(),
            item.vat_included.to_string(),
            item.line_total.to_string(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(invoice: &Invoice) -> String {
    let mut output = String::new();

    output.push_str(&format!("Invoice: {}\n", invoice.invoice_number));
    output.push_str(&format!("Date: {}\n", invoice.invoice_date));
    output.push_str(&format!("Supplier: {}\n", invoice.supplier_name));
    output.push('\n');

    output.push_str("Lines:\n");
    for item in &invoice.line_items {
        let lot = if item.lot_number.is_empty() {
            String::new()
        } else {
            format!(" #{}", item.lot_number)
        };
        let tax = match (item.tax_rate, item.tax_amount) {
            (Some(rate), Some(amount)) => format!(" (VAT {}%: {})", rate, amount),
            (Some(rate), None) => format!(" (VAT {}%)", rate),
            (None, Some(amount)) => format!(" (VAT {})", amount),
            (None, None) => String::new(),
        };
        output.push_str(&format!(
            "  {}{} {} x {} = {}{}\n",
            item.line_type, lot, item.quantity, item.unit_price, item.line_total, tax
        ));
        if !item.description.is_empty() {
            output.push_str(&format!("    {}\n", item.description));
        }
    }
    output.push('\n');

    output.push_str(&format!("Total: {} {}\n", invoice.total_amount, invoice.currency));

    output
}
