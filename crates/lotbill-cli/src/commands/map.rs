//! Map command - turn an extraction payload into a draft ledger bill.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use lotbill_core::invoice::InvoiceNormalizer;
use lotbill_core::ledger::{reconcile, LedgerMapper, Reconciliation};
use lotbill_core::models::bill::Bill;

use super::normalize::OutputFormat;
use super::{emit, load_config, load_invoice};

/// Arguments for the map command.
#[derive(Args)]
pub struct MapArgs {
    /// Extraction payload (JSON file, or - for stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Ledger account code for every bill line
    #[arg(short, long)]
    account_code: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Print the totals check on stderr
    #[arg(long)]
    reconcile: bool,
}

pub async fn run(args: MapArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    let invoice = load_invoice(&args.input, &InvoiceNormalizer::new())?;
    let mapper = LedgerMapper::from_config(&config.ledger);
    let bill = mapper.map(&invoice, &args.account_code)?;

    info!(
        "Mapped invoice {} to {} bill lines",
        bill.invoice_number,
        bill.line_items.len()
    );

    if args.reconcile {
        let check = reconcile(&invoice, &bill, mapper.tax_codes(), config.ledger.tolerance);
        print_reconciliation(&check);
    }

    let output = format_bill(&bill, args.format)?;
    emit(args.output.as_deref(), &output)
}

pub fn print_reconciliation(check: &Reconciliation) {
    let status = if check.within_tolerance {
        style("within tolerance").green()
    } else {
        style("OUT OF TOLERANCE").red()
    };
    eprintln!(
        "Invoice total {} / bill {} + tax {} = {} (difference {}, {})",
        check.invoice_total,
        check.bill_subtotal,
        check.bill_tax,
        check.bill_total,
        check.difference,
        status
    );
}

pub fn format_bill(bill: &Bill, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(bill)?),
        OutputFormat::Csv => format_csv(bill),
        OutputFormat::Text => Ok(format_text(bill)),
    }
}

fn format_csv(bill: &Bill) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "invoice_number",
        "date",
        "contact",
        "currency",
        "description",
        "quantity",
        "unit_amount",
        "account_code",
        "line_amount",
        "tax_type",
    ])?;

    for line in &bill.line_items {
        wtr.write_record([
            bill.invoice_number.clone(),
            bill.date_string.clone(),
            bill.contact.name.clone(),
            bill.currency_code.clone(),
            line.description.clone(),
            line.quantity.to_string(),
            line.unit_amount.to_string(),
            line.account_code.clone(),
            line.line_amount.to_string(),
            line.tax_type_code.clone(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(bill: &Bill) -> String {
    let mut output = String::new();

    output.push_str(&format!("Draft bill: {}\n", bill.invoice_number));
    output.push_str(&format!("Contact: {}\n", bill.contact.name));
    output.push_str(&format!(
        "Date: {} (due {})\n",
        bill.date_string, bill.due_date_string
    ));
    output.push('\n');

    for line in &bill.line_items {
        output.push_str(&format!(
            "  {} x {} = {} [{} / {}]\n",
            line.quantity, line.unit_amount, line.line_amount, line.account_code, line.tax_type_code
        ));
        output.push_str(&format!("    {}\n", line.description));
    }
    output.push('\n');

    output.push_str(&format!(
        "Subtotal (excl. tax): {} {}\n",
        bill.subtotal(),
        bill.currency_code
    ));

    output
}
