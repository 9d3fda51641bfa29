//! Core library for auction-house invoice processing.
//!
//! This crate provides:
//! - Normalization of untrusted extraction output into a canonical invoice
//! - UK auction VAT classification (margin scheme vs. standard-rated services)
//! - Mapping to ledger bills with exact pre-tax arithmetic
//! - Retry with backoff for the extraction and ledger calls

pub mod error;
pub mod invoice;
pub mod ledger;
pub mod models;
pub mod pipeline;
pub mod retry;

pub use error::{LotbillError, Result, UpstreamError, ValidationError};
pub use invoice::{normalize, normalize_date, InvoiceNormalizer, TaxClassifier};
pub use ledger::{map_to_bill, submit_bill, AuthContext, LedgerMapper, LedgerTransport};
pub use models::{Bill, BillLine, Invoice, LineItem, LineType, LotbillConfig, SourceDocument};
pub use pipeline::{extract_invoice, ExtractionService};
pub use retry::{ErrorKind, ResilientInvoker, RetryError, RetryPolicy};
