//! Deterministic rules for auction invoices: dates, money and VAT.

pub mod amounts;
pub mod dates;
pub mod patterns;
pub mod tax;

pub use amounts::{coerce_amount, parse_amount, round2};
pub use dates::{normalize_date, normalize_date_str, parse_date};
pub use tax::{classify, classify_invoice, TaxBasis, TaxClassifier, TaxTreatment};
