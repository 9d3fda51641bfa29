//! Ledger bill representation.
//!
//! A [`Bill`] is an accounts-payable document in the shape the ledger API
//! accepts. It is built once per submission and never edited.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::rules::amounts::sum;

use super::money;

/// Accounts-payable bill ready for submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bill {
    #[serde(rename = "Type")]
    pub bill_type: BillType,

    pub contact: BillContact,

    /// Invoice date, ISO when recognisable.
    pub date_string: String,

    /// Same as the invoice date; no payment terms are derived.
    pub due_date_string: String,

    pub invoice_number: String,

    pub currency_code: String,

    pub status: BillStatus,

    /// Always exclusive: unit amounts are pre-tax and the ledger adds tax.
    #[serde(rename = "LineAmountTypes")]
    pub line_amount_type: LineAmountType,

    pub line_items: Vec<BillLine>,
}

/// Supplier on the bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillContact {
    pub name: String,
}

/// One ledger line.
///
/// `line_amount` always equals `round2(unit_amount * quantity)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillLine {
    pub description: String,

    #[serde(serialize_with = "money::serialize")]
    pub quantity: Decimal,

    /// Pre-tax amount per unit.
    #[serde(serialize_with = "money::serialize")]
    pub unit_amount: Decimal,

    pub account_code: String,

    #[serde(serialize_with = "money::serialize")]
    pub line_amount: Decimal,

    /// Ledger tax-type code.
    #[serde(rename = "TaxType")]
    pub tax_type_code: String,
}

/// Ledger document type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum BillType {
    /// Accounts payable.
    #[default]
    #[serde(rename = "ACCPAY")]
    AccountsPayable,
}

/// Document status. Bills are only ever created as drafts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillStatus {
    #[default]
    Draft,
}

/// How line amounts relate to tax.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LineAmountType {
    #[default]
    Exclusive,
}

impl Bill {
    /// Sum of the pre-tax line amounts.
    pub fn subtotal(&self) -> Decimal {
        sum(self.line_items.iter().map(|l| l.line_amount))
    }
}
