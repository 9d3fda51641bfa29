//! Data models for invoices, ledger bills and configuration.

pub mod bill;
pub mod config;
pub mod document;
pub mod invoice;
pub mod money;

pub use bill::{Bill, BillContact, BillLine, BillStatus, BillType, LineAmountType};
pub use document::SourceDocument;
pub use config::{LedgerConfig, LotbillConfig, RetryConfig};
pub use invoice::{Invoice, LineItem, LineType};
