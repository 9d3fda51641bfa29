//! Coercion of untrusted extraction output into a canonical [`Invoice`].
//!
//! The extraction model is treated as unreliable input. Nothing here fails:
//! wrong types fall back to defaults and the result is always complete.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::models::invoice::{Invoice, LineItem, LineType};

use super::rules::amounts::coerce_amount;
use super::rules::dates::normalize_date_str;

/// Envelope key some producers wrap the invoice in.
pub const ENVELOPE_KEY: &str = "invoiceData";

/// Converts extraction payloads into canonical invoices.
pub struct InvoiceNormalizer {
    /// Normalize the invoice date to ISO form while coercing.
    normalize_dates: bool,
}

impl InvoiceNormalizer {
    /// Create a normalizer with default settings.
    pub fn new() -> Self {
        Self {
            normalize_dates: true,
        }
    }

    /// Set date normalization.
    pub fn with_date_normalization(mut self, normalize: bool) -> Self {
        self.normalize_dates = normalize;
        self
    }

    /// Coerce any JSON value into an invoice.
    pub fn normalize(&self, payload: &Value) -> Invoice {
        let empty = Map::new();
        let fields = unwrap_envelope(payload).unwrap_or(&empty);

        let invoice_date = string_field(fields, "InvoiceDate");
        let invoice_date = if self.normalize_dates {
            normalize_date_str(&invoice_date)
        } else {
            invoice_date
        };

        let invoice = Invoice {
            invoice_number: string_field(fields, "InvoiceNumber"),
            invoice_date,
            supplier_name: string_field(fields, "SupplierName"),
            total_amount: amount_field(fields, "TotalAmount").unwrap_or(Decimal::ZERO),
            currency: string_field(fields, "Currency"),
            line_items: line_items(fields.get("LineItems")),
        };

        debug!(
            invoice_number = %invoice.invoice_number,
            lines = invoice.line_items.len(),
            "normalized invoice"
        );

        invoice
    }

    /// Parse JSON text and normalize it. Unparseable text yields an empty invoice.
    pub fn normalize_str(&self, text: &str) -> Invoice {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => self.normalize(&value),
            Err(e) => {
                warn!(error = %e, "extraction payload is not valid JSON");
                Invoice::new()
            }
        }
    }
}

impl Default for InvoiceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a payload with default settings.
pub fn normalize(payload: &Value) -> Invoice {
    InvoiceNormalizer::new().normalize(payload)
}

/// Bare invoice object, or the object inside an `invoiceData` envelope.
fn unwrap_envelope(payload: &Value) -> Option<&Map<String, Value>> {
    let object = payload.as_object()?;
    match object.get(ENVELOPE_KEY) {
        Some(Value::Object(inner)) => Some(inner),
        _ => Some(object),
    }
}

fn line_items(value: Option<&Value>) -> Vec<LineItem> {
    let Some(Value::Array(entries)) = value else {
        if value.is_some_and(|v| !v.is_null()) {
            warn!("LineItems is not an array, treating as empty");
        }
        return Vec::new();
    };

    let items: Vec<LineItem> = entries
        .iter()
        .filter(|entry| !entry.is_null())
        .map(line_item)
        .collect();

    if items.len() < entries.len() {
        warn!(
            dropped = entries.len() - items.len(),
            "dropped null line items"
        );
    }

    items
}

fn line_item(entry: &Value) -> LineItem {
    let empty = Map::new();
    let fields = entry.as_object().unwrap_or(&empty);

    LineItem {
        line_type: line_type_field(fields),
        lot_number: string_field(fields, "LotNumber"),
        description: string_field(fields, "Description"),
        quantity: amount_field(fields, "Quantity").unwrap_or(Decimal::ONE),
        unit_price: amount_field(fields, "UnitPrice").unwrap_or(Decimal::ZERO),
        tax_type: fields
            .get("TaxType")
            .and_then(Value::as_str)
            .map(str::to_string),
        tax_rate: amount_field(fields, "TaxRate"),
        tax_amount: amount_field(fields, "TaxAmount"),
        vat_included: fields
            .get("VatIncluded")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        line_total: amount_field(fields, "LineTotal").unwrap_or(Decimal::ZERO),
    }
}

fn line_type_field(fields: &Map<String, Value>) -> LineType {
    match fields.get("LineType") {
        Some(Value::String(label)) => LineType::from_label(label).unwrap_or_else(|| {
            // Structurally a Lot, although the tax rules would treat it as a taxable charge.
            warn!(label = %label, "unrecognised line type, defaulting to Lot");
            LineType::Lot
        }),
        _ => LineType::Lot,
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}

fn amount_field(fields: &Map<String, Value>, key: &str) -> Option<Decimal> {
    fields.get(key).and_then(coerce_amount)
}
