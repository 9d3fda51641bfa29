//! Canonical invoice model produced by the normalizer.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::invoice::rules::amounts::sum;
use crate::invoice::rules::dates::parse_date;

use super::money;

/// An auction-house invoice after normalization.
///
/// Every field is populated; absent input becomes `""` or `0`. Serializes
/// with the same PascalCase keys the normalizer reads, so a serialized
/// invoice can be fed back through it unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    /// Invoice number as printed.
    pub invoice_number: String,

    /// Issue date, ISO `YYYY-MM-DD` when recognisable, otherwise as extracted.
    pub invoice_date: String,

    /// Auction house name.
    pub supplier_name: String,

    /// Grand total as printed on the invoice.
    #[serde(serialize_with = "money::serialize")]
    pub total_amount: Decimal,

    /// Currency code as extracted (may be empty).
    pub currency: String,

    /// Line items in source order.
    pub line_items: Vec<LineItem>,
}

/// Kind of charge on an auction invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum LineType {
    /// Hammer price of a lot.
    #[default]
    Lot,
    /// Buyer's premium.
    Premium,
    /// Ancillary charge: postage, packing, live-bidding fees, insurance.
    Surcharge,
}

impl LineType {
    /// Parse one of the three recognised labels. Matching is exact.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Lot" => Some(LineType::Lot),
            "Premium" => Some(LineType::Premium),
            "Surcharge" => Some(LineType::Surcharge),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LineType::Lot => "Lot",
            LineType::Premium => "Premium",
            LineType::Surcharge => "Surcharge",
        }
    }

    /// Hammer price and premium fall under the margin scheme.
    pub fn is_margin_scheme(&self) -> bool {
        matches!(self, LineType::Lot | LineType::Premium)
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single line on the invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineItem {
    pub line_type: LineType,

    /// Lot number, empty for non-lot charges.
    pub lot_number: String,

    pub description: String,

    /// Quantity (default 1).
    #[serde(serialize_with = "money::serialize")]
    pub quantity: Decimal,

    /// Pre-tax base price.
    #[serde(serialize_with = "money::serialize")]
    pub unit_price: Decimal,

    /// Tax label such as `VAT`.
    pub tax_type: Option<String>,

    /// Tax rate as a percentage (20 means 20%). `Some(0)` is exempt, `None` is unknown.
    #[serde(serialize_with = "money::option::serialize")]
    pub tax_rate: Option<Decimal>,

    /// Tax amount for the line, `None` when unknown.
    #[serde(serialize_with = "money::option::serialize")]
    pub tax_amount: Option<Decimal>,

    /// Whether `line_total` already includes tax.
    pub vat_included: bool,

    /// Line total as shown on the source invoice.
    #[serde(serialize_with = "money::serialize")]
    pub line_total: Decimal,
}

impl LineItem {
    /// A line with the canonical defaults.
    pub fn new(line_type: LineType) -> Self {
        Self {
            line_type,
            lot_number: String::new(),
            description: String::new(),
            quantity: Decimal::ONE,
            unit_price: Decimal::ZERO,
            tax_type: None,
            tax_rate: None,
            tax_amount: None,
            vat_included: false,
            line_total: Decimal::ZERO,
        }
    }

    /// True when none of the tax fields were supplied.
    pub fn is_unclassified(&self) -> bool {
        self.tax_type.is_none() && self.tax_rate.is_none() && self.tax_amount.is_none()
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::new(LineType::Lot)
    }
}

impl Invoice {
    /// Create a new empty invoice with default values.
    pub fn new() -> Self {
        Self {
            invoice_number: String::new(),
            invoice_date: String::new(),
            supplier_name: String::new(),
            total_amount: Decimal::ZERO,
            currency: String::new(),
            line_items: Vec::new(),
        }
    }

    /// Sum of the printed line totals.
    pub fn line_totals(&self) -> Decimal {
        sum(self.line_items.iter().map(|i| i.line_total))
    }

    /// Review the invoice and return any issues found.
    ///
    /// Nothing here is fatal; the list feeds the human review step.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.invoice_number.trim().is_empty() {
            issues.push("Missing invoice number".to_string());
        }

        if self.supplier_name.trim().is_empty() {
            issues.push("Missing supplier name".to_string());
        }

        if self.invoice_date.is_empty() {
            issues.push("Missing invoice date".to_string());
        } else if parse_date(&self.invoice_date).is_none() {
            issues.push(format!("Unrecognised invoice date: {}", self.invoice_date));
        }

        if self.line_items.is_empty() {
            issues.push("No line items".to_string());
        }

        if self.total_amount.is_zero() {
            issues.push("Total amount is zero".to_string());
        }

        for (i, item) in self.line_items.iter().enumerate() {
            if item.quantity <= Decimal::ZERO {
                issues.push(format!(
                    "Line {} has non-positive quantity ({})",
                    i + 1,
                    item.quantity
                ));
            }
        }

        let calculated = self.line_totals();
        if !self.line_items.is_empty()
            && calculated.saturating_sub(self.total_amount).abs() > Decimal::new(1, 2)
        {
            issues.push(format!(
                "Line item total ({}) differs from invoice total ({})",
                calculated, self.total_amount
            ));
        }

        issues
    }
}

impl Default for Invoice {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample() -> Invoice {
        let mut lot = LineItem::new(LineType::Lot);
        lot.lot_number = "12".to_string();
        lot.description = "Georgian silver teapot".to_string();
        lot.unit_price = Decimal::new(1000, 0);
        lot.line_total = Decimal::new(1000, 0);

        Invoice {
            invoice_number: "INV-001".to_string(),
            invoice_date: "2025-11-20".to_string(),
            supplier_name: "Bonhams".to_string(),
            total_amount: Decimal::new(1000, 0),
            currency: "GBP".to_string(),
            line_items: vec![lot],
        }
    }

    #[test]
    fn test_line_type_labels() {
        assert_eq!(LineType::from_label("Lot"), Some(LineType::Lot));
        assert_eq!(LineType::from_label("Premium"), Some(LineType::Premium));
        assert_eq!(LineType::from_label("Surcharge"), Some(LineType::Surcharge));
        assert_eq!(LineType::from_label("lot"), None);
        assert_eq!(LineType::from_label("Fee"), None);
        assert_eq!(LineType::default(), LineType::Lot);
        assert_eq!(LineType::Premium.to_string(), "Premium");
    }

    #[test]
    fn test_validate_clean_invoice() {
        assert!(sample().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_issues() {
        let mut invoice = sample();
        invoice.invoice_number.clear();
        invoice.invoice_date = "next week".to_string();
        invoice.total_amount = Decimal::new(1200, 0);
        invoice.line_items[0].quantity = Decimal::ZERO;

        let issues = invoice.validate();
        assert_eq!(issues.len(), 4);
        assert!(issues[0].contains("invoice number"));
        assert!(issues[1].contains("next week"));
        assert!(issues[2].contains("non-positive quantity"));
        assert!(issues[3].contains("differs"));
    }

    #[test]
    fn test_validate_empty_invoice() {
        let issues = Invoice::new().validate();
        assert!(issues.contains(&"No line items".to_string()));
        assert!(issues.contains(&"Total amount is zero".to_string()));
        assert!(issues.contains(&"Missing invoice date".to_string()));
    }

    #[test]
    fn test_serializes_with_normalizer_keys() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["InvoiceNumber"], json!("INV-001"));
        assert_eq!(value["TotalAmount"], json!(1000.0));
        assert_eq!(value["LineItems"][0]["LineType"], json!("Lot"));
        assert_eq!(value["LineItems"][0]["TaxRate"], json!(null));
        assert_eq!(value["LineItems"][0]["VatIncluded"], json!(false));
    }
}
