//! VAT classification for auction-house invoices.
//!
//! UK auction convention: hammer price and buyer's premium are sold under the
//! margin scheme and carry no VAT on the invoice; ancillary services
//! (postage, packing, live-bidding fees, insurance) are standard-rated.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::invoice::{Invoice, LineItem, LineType};

use super::amounts::{rate_multiplier, round2};
use super::patterns::ANCILLARY_SERVICE;

/// UK standard VAT rate, as a percentage.
pub const STANDARD_VAT_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 0);

/// UK reduced VAT rate, as a percentage.
pub const REDUCED_VAT_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// Tax label used for standard-rated charges.
pub const VAT: &str = "VAT";

/// Why a treatment was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxBasis {
    /// Hammer price or premium under the margin scheme.
    MarginScheme,
    /// Charge whose description names a known ancillary service.
    AncillaryService,
    /// Any other charge. Taxed, since unknown charges are not assumed exempt.
    UnclassifiedCharge,
}

/// VAT treatment for a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxTreatment {
    pub tax_type: Option<String>,
    /// Percentage rate, 0 for exempt lines.
    pub tax_rate: Decimal,
    pub vat_included: bool,
    pub basis: TaxBasis,
}

impl TaxTreatment {
    fn exempt() -> Self {
        Self {
            tax_type: None,
            tax_rate: Decimal::ZERO,
            vat_included: false,
            basis: TaxBasis::MarginScheme,
        }
    }

    fn standard(basis: TaxBasis) -> Self {
        Self {
            tax_type: Some(VAT.to_string()),
            tax_rate: STANDARD_VAT_RATE,
            vat_included: false,
            basis,
        }
    }

    pub fn is_exempt(&self) -> bool {
        self.tax_rate.is_zero()
    }

    /// Tax due on a pre-tax price, rounded once.
    pub fn tax_amount(&self, unit_price: Decimal) -> Decimal {
        if self.is_exempt() {
            Decimal::ZERO
        } else {
            round2(unit_price * rate_multiplier(self.tax_rate))
        }
    }

    /// Line total for a pre-tax price: price plus tax added on top.
    pub fn line_total(&self, unit_price: Decimal) -> Decimal {
        unit_price + self.tax_amount(unit_price)
    }
}

/// Deterministic VAT rule engine.
pub struct TaxClassifier;

impl TaxClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw line-type label.
    ///
    /// Unrecognised labels are taxed like a surcharge, even though the
    /// normalizer stores them structurally as `Lot`.
    pub fn classify(&self, line_type: &str, description: &str) -> TaxTreatment {
        match LineType::from_label(line_type) {
            Some(t) => self.classify_line_type(t, description),
            None => TaxTreatment::standard(charge_basis(description)),
        }
    }

    /// Classify a canonical line type.
    pub fn classify_line_type(&self, line_type: LineType, description: &str) -> TaxTreatment {
        if line_type.is_margin_scheme() {
            TaxTreatment::exempt()
        } else {
            TaxTreatment::standard(charge_basis(description))
        }
    }

    /// Rewrite a line's tax fields and total from its type and unit price.
    pub fn apply(&self, item: &mut LineItem) -> TaxTreatment {
        let treatment = self.classify_line_type(item.line_type, &item.description);
        let tax_amount = treatment.tax_amount(item.unit_price);

        debug!(
            line_type = %item.line_type,
            basis = ?treatment.basis,
            %tax_amount,
            "classified line"
        );

        item.tax_type = treatment.tax_type.clone();
        item.tax_rate = Some(treatment.tax_rate);
        item.tax_amount = Some(tax_amount);
        item.vat_included = treatment.vat_included;
        item.line_total = item.unit_price + tax_amount;

        treatment
    }
}

impl Default for TaxClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn charge_basis(description: &str) -> TaxBasis {
    if ANCILLARY_SERVICE.is_match(description) {
        TaxBasis::AncillaryService
    } else {
        TaxBasis::UnclassifiedCharge
    }
}

/// Classify a raw line-type label and description.
pub fn classify(line_type: &str, description: &str) -> TaxTreatment {
    TaxClassifier::new().classify(line_type, description)
}

/// Apply the VAT rules to every line of an invoice.
pub fn classify_invoice(invoice: &mut Invoice) {
    let classifier = TaxClassifier::new();
    for item in &mut invoice.line_items {
        classifier.apply(item);
    }
}
