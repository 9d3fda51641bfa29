//! Totals check between an invoice and the bill built from it.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::rules::amounts::{rate_multiplier, round2, sum};
use crate::models::bill::Bill;
use crate::models::invoice::Invoice;

use super::mapper::TaxCodeTable;

/// Result of comparing the invoice total to what the ledger will compute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    pub invoice_total: Decimal,
    /// Sum of pre-tax line amounts.
    pub bill_subtotal: Decimal,
    /// Tax the ledger will add from the lines' tax codes.
    pub bill_tax: Decimal,
    pub bill_total: Decimal,
    /// `bill_total - invoice_total`.
    pub difference: Decimal,
    pub within_tolerance: bool,
}

/// Compare the invoice total with the bill total including ledger-applied tax.
///
/// Lines with a tax code not in `tax_codes` contribute no tax.
pub fn reconcile(
    invoice: &Invoice,
    bill: &Bill,
    tax_codes: &TaxCodeTable,
    tolerance: Decimal,
) -> Reconciliation {
    let bill_subtotal = bill.subtotal();
    let bill_tax = sum(bill.line_items.iter().map(|line| {
        let rate = tax_codes.rate_for(&line.tax_type_code).unwrap_or_default();
        round2(line.line_amount * rate_multiplier(rate))
    }));

    let bill_total = bill_subtotal.saturating_add(bill_tax);
    let difference = bill_total.saturating_sub(invoice.total_amount);

    Reconciliation {
        invoice_total: invoice.total_amount,
        bill_subtotal,
        bill_tax,
        bill_total,
        difference,
        within_tolerance: difference.abs() <= tolerance,
    }
}
