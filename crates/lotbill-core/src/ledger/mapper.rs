//! Mapping canonical invoices to ledger bills.
//!
//! The ledger applies tax itself from a tax-type code, so every amount sent
//! is pre-tax. Each line's amount is derived from its rounded unit amount so
//! that `line_amount == round2(unit_amount * quantity)` holds exactly.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::invoice::rules::amounts::{rate_multiplier, round2};
use crate::invoice::rules::dates::normalize_date_str;
use crate::invoice::rules::tax::{TaxClassifier, REDUCED_VAT_RATE, STANDARD_VAT_RATE};
use crate::models::bill::{Bill, BillContact, BillLine, BillStatus, BillType, LineAmountType};
use crate::models::config::LedgerConfig;
use crate::models::invoice::{Invoice, LineItem, LineType};

use super::reconcile::reconcile;

/// Ledger tax-type codes for the three purchase treatments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxCodeTable {
    /// No VAT.
    pub none: String,
    /// 20% purchase VAT.
    pub vat20: String,
    /// 5% purchase VAT.
    pub vat5: String,
}

impl Default for TaxCodeTable {
    fn default() -> Self {
        Self {
            none: "none".to_string(),
            vat20: "vat20".to_string(),
            vat5: "vat5".to_string(),
        }
    }
}

impl TaxCodeTable {
    /// Pick the code for a line.
    ///
    /// Margin-scheme lines are never taxed. Otherwise a positive rate decides,
    /// with unknown rates falling back to the standard code. The tax label on
    /// the line is not consulted: a rated charge is purchase VAT whatever the
    /// extraction called it.
    pub fn code_for(
        &self,
        line_type: LineType,
        tax_rate: Option<Decimal>,
        tax_amount: Option<Decimal>,
    ) -> &str {
        if line_type.is_margin_scheme() {
            return &self.none;
        }

        match tax_rate {
            Some(rate) if rate > Decimal::ZERO => {
                if rate == STANDARD_VAT_RATE {
                    &self.vat20
                } else if rate == REDUCED_VAT_RATE {
                    &self.vat5
                } else {
                    warn!(%rate, "unexpected VAT rate, using standard rate code");
                    &self.vat20
                }
            }
            _ if tax_amount.is_some_and(|a| a > Decimal::ZERO) => {
                warn!("tax amount without a rate, using standard rate code");
                &self.vat20
            }
            _ => &self.none,
        }
    }

    /// Percentage the ledger applies for a code, if the code is known.
    pub fn rate_for(&self, code: &str) -> Option<Decimal> {
        if code == self.vat20 {
            Some(STANDARD_VAT_RATE)
        } else if code == self.vat5 {
            Some(REDUCED_VAT_RATE)
        } else if code == self.none {
            Some(Decimal::ZERO)
        } else {
            None
        }
    }
}

/// Maps invoices to draft bills.
pub struct LedgerMapper {
    tax_codes: TaxCodeTable,
    default_currency: String,
    tolerance: Decimal,
    classifier: TaxClassifier,
}

impl LedgerMapper {
    /// Create a mapper with default settings.
    pub fn new() -> Self {
        Self::from_config(&LedgerConfig::default())
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            tax_codes: config.tax_codes.clone(),
            default_currency: config.default_currency.clone(),
            tolerance: config.tolerance,
            classifier: TaxClassifier::new(),
        }
    }

    pub fn with_tax_codes(mut self, tax_codes: TaxCodeTable) -> Self {
        self.tax_codes = tax_codes;
        self
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn tax_codes(&self) -> &TaxCodeTable {
        &self.tax_codes
    }

    /// Build a draft bill. Fails only when `account_code` is blank.
    pub fn map(&self, invoice: &Invoice, account_code: &str) -> Result<Bill, ValidationError> {
        let account_code = account_code.trim();
        if account_code.is_empty() {
            return Err(ValidationError::MissingAccountCode);
        }

        let date = normalize_date_str(&invoice.invoice_date);
        let currency = if invoice.currency.trim().is_empty() {
            self.default_currency.clone()
        } else {
            invoice.currency.trim().to_string()
        };

        let bill = Bill {
            bill_type: BillType::AccountsPayable,
            contact: BillContact {
                name: invoice.supplier_name.clone(),
            },
            due_date_string: date.clone(),
            date_string: date,
            invoice_number: invoice.invoice_number.clone(),
            currency_code: currency,
            status: BillStatus::Draft,
            line_amount_type: LineAmountType::Exclusive,
            line_items: invoice
                .line_items
                .iter()
                .map(|item| self.map_line(item, account_code))
                .collect(),
        };

        let check = reconcile(invoice, &bill, &self.tax_codes, self.tolerance);
        if !check.within_tolerance {
            warn!(
                invoice_number = %invoice.invoice_number,
                invoice_total = %check.invoice_total,
                bill_total = %check.bill_total,
                difference = %check.difference,
                "bill total does not match invoice total"
            );
        }

        Ok(bill)
    }

    fn map_line(&self, item: &LineItem, account_code: &str) -> BillLine {
        let item = self.classified(item);

        let quantity = if item.quantity > Decimal::ZERO {
            item.quantity
        } else {
            warn!(quantity = %item.quantity, "non-positive quantity, using 1");
            Decimal::ONE
        };

        let pre_tax = pre_tax_line_amount(&item, quantity);
        let unit_amount = round2(pre_tax / quantity);
        let line_amount = round2(unit_amount * quantity);
        let tax_type_code = self
            .tax_codes
            .code_for(item.line_type, item.tax_rate, item.tax_amount)
            .to_string();

        debug!(
            line_type = %item.line_type,
            %pre_tax,
            %unit_amount,
            %line_amount,
            tax_type_code = %tax_type_code,
            "mapped line"
        );

        BillLine {
            description: describe(&item),
            quantity,
            unit_amount,
            account_code: account_code.to_string(),
            line_amount,
            tax_type_code,
        }
    }

    /// Fill in the rate for lines that arrived with no tax information at all.
    fn classified<'a>(&self, item: &'a LineItem) -> Cow<'a, LineItem> {
        if !item.is_unclassified() {
            return Cow::Borrowed(item);
        }

        let treatment = self
            .classifier
            .classify_line_type(item.line_type, &item.description);
        let mut item = item.clone();
        item.tax_type = treatment.tax_type;
        item.tax_rate = Some(treatment.tax_rate);
        Cow::Owned(item)
    }
}

impl Default for LedgerMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Map an invoice with the default tax codes and currency.
pub fn map_to_bill(invoice: &Invoice, account_code: &str) -> Result<Bill, ValidationError> {
    LedgerMapper::new().map(invoice, account_code)
}

/// Pre-tax amount for the whole line, before rounding.
fn pre_tax_line_amount(item: &LineItem, quantity: Decimal) -> Decimal {
    let rate = item.tax_rate.unwrap_or_default();

    match item.tax_amount {
        Some(tax) if tax > Decimal::ZERO => item.line_total - tax,
        _ if item.vat_included && rate > Decimal::ZERO => {
            item.line_total / (Decimal::ONE + rate_multiplier(rate))
        }
        _ => item.unit_price * quantity,
    }
}

/// `"{type} - Lot #{lot} - {description}"`, leaving out empty parts.
fn describe(item: &LineItem) -> String {
    let lot = item.lot_number.trim();
    let description = item.description.trim();

    let mut parts = vec![item.line_type.to_string()];
    if !lot.is_empty() {
        parts.push(format!("Lot #{}", lot));
    }
    if !description.is_empty() {
        parts.push(description.to_string());
    }
    parts.join(" - ").trim().to_string()
}
