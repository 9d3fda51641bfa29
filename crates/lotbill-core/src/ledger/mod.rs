//! Ledger side: mapping invoices to bills, checking totals and submitting.

pub mod mapper;
pub mod reconcile;
pub mod submit;

pub use mapper::{map_to_bill, LedgerMapper, TaxCodeTable};
pub use reconcile::{reconcile, Reconciliation};
pub use submit::{
    submit_bill, AttachmentOutcome, AuthContext, BillReceipt, LedgerTransport, SubmissionReport,
};
