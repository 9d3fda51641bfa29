//! Validate command - list review issues for an extraction payload.

use std::path::PathBuf;

use clap::Args;
use console::style;

use lotbill_core::invoice::InvoiceNormalizer;

use super::load_invoice;
use super::normalize::print_issues;

/// Arguments for the validate command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Extraction payload (JSON file, or - for stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Exit with an error when issues are found
    #[arg(long)]
    strict: bool,
}

pub async fn run(args: ValidateArgs) -> anyhow::Result<()> {
    let invoice = load_invoice(&args.input, &InvoiceNormalizer::new())?;
    let issues = invoice.validate();

    if issues.is_empty() {
        println!(
            "{} Invoice {} looks complete ({} lines)",
            style("✓").green(),
            invoice.invoice_number,
            invoice.line_items.len()
        );
        return Ok(());
    }

    print_issues(&issues);

    if args.strict {
        anyhow::bail!("{} validation issue(s) found", issues.len());
    }

    Ok(())
}
