//! Submit command - create a draft bill in the ledger.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use lotbill_core::invoice::InvoiceNormalizer;
use lotbill_core::ledger::{submit_bill, AttachmentOutcome, AuthContext, LedgerMapper};
use lotbill_core::models::document::SourceDocument;
use lotbill_core::retry::ResilientInvoker;

use crate::ledger_http::HttpLedger;

use super::{load_config, load_invoice};

/// Arguments for the submit command.
#[derive(Args)]
pub struct SubmitArgs {
    /// Extraction payload (JSON file, or - for stdin)
    #[arg(required = true)]
    input: PathBuf,

    /// Ledger account code for every bill line
    #[arg(short, long)]
    account_code: String,

    /// Ledger tenant id
    #[arg(long, env = "LOTBILL_TENANT_ID")]
    tenant: String,

    /// Ledger access token
    #[arg(long, env = "LOTBILL_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// Original invoice file to attach to the bill
    #[arg(long)]
    attach: Option<PathBuf>,

    /// Override the ledger base URL from the config
    #[arg(long)]
    base_url: Option<String>,
}

pub async fn run(args: SubmitArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(base_url) = args.base_url {
        config.ledger.base_url = base_url;
    }

    let invoice = load_invoice(&args.input, &InvoiceNormalizer::new())?;
    let bill = LedgerMapper::from_config(&config.ledger).map(&invoice, &args.account_code)?;

    let document = match &args.attach {
        Some(path) => Some(SourceDocument::from_path(path)?),
        None => None,
    };

    let auth = AuthContext::new(args.token, args.tenant);
    let transport = HttpLedger::new(&config.ledger)?;
    let invoker = ResilientInvoker::new(config.retry_policy());

    info!(
        "Submitting invoice {} ({} lines) to {}",
        bill.invoice_number,
        bill.line_items.len(),
        config.ledger.base_url
    );

    let report = submit_bill(&transport, &auth, &bill, document.as_ref(), &invoker).await?;

    eprintln!(
        "{} Created draft bill {}",
        style("✓").green(),
        report.receipt.bill_id
    );
    if let AttachmentOutcome::Failed { error, .. } = &report.attachment {
        eprintln!(
            "{} Attachment was not uploaded: {}",
            style("!").yellow(),
            error
        );
    }

    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}
