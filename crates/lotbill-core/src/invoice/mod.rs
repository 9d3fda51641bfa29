//! Invoice normalization and the rules it relies on.

pub mod normalizer;
pub mod rules;

pub use normalizer::{normalize, InvoiceNormalizer, ENVELOPE_KEY};
pub use rules::{classify, classify_invoice, normalize_date, TaxClassifier, TaxTreatment};
