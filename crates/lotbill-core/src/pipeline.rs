//! Extraction step: call the extraction service and normalize what it returns.

use std::future::Future;

use serde_json::Value;
use tracing::info;

use crate::error::{Result, UpstreamError};
use crate::invoice::normalizer::InvoiceNormalizer;
use crate::models::document::SourceDocument;
use crate::models::invoice::Invoice;
use crate::retry::ResilientInvoker;

/// A service that reads an invoice document and returns loosely structured JSON.
pub trait ExtractionService {
    fn extract(
        &self,
        document: &SourceDocument,
    ) -> impl Future<Output = std::result::Result<Value, UpstreamError>> + Send;
}

/// Extract an invoice from `document`, retrying transient failures.
///
/// Once the service answers, normalization cannot fail; only the call itself can.
pub async fn extract_invoice<S: ExtractionService>(
    service: &S,
    document: &SourceDocument,
    invoker: &ResilientInvoker,
) -> Result<Invoice> {
    let payload = invoker.invoke(|| service.extract(document)).await?;
    let invoice = InvoiceNormalizer::new().normalize(&payload);

    info!(
        file = %document.file_name,
        invoice_number = %invoice.invoice_number,
        lines = invoice.line_items.len(),
        "invoice extracted"
    );

    Ok(invoice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LotbillError;
    use crate::models::invoice::LineType;
    use crate::retry::{ErrorKind, RetryPolicy};
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyExtractor {
        failures: u32,
        calls: AtomicU32,
        error: UpstreamError,
    }

    impl ExtractionService for FlakyExtractor {
        async fn extract(
            &self,
            _document: &SourceDocument,
        ) -> std::result::Result<Value, UpstreamError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(self.error.clone());
            }
            Ok(json!({
                "invoiceData": {
                    "InvoiceNumber": "A-100",
                    "InvoiceDate": "03/02/25",
                    "TotalAmount": "300",
                    "LineItems": [{"LineType": "Premium", "UnitPrice": 300, "LineTotal": 300}]
                }
            }))
        }
    }

    fn document() -> SourceDocument {
        SourceDocument::new("scan.png", "image/png", vec![1, 2, 3])
    }

    fn invoker() -> ResilientInvoker {
        ResilientInvoker::new(RetryPolicy::new().with_base_delay(std::time::Duration::from_millis(5)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_after_rate_limit() {
        let service = FlakyExtractor {
            failures: 2,
            calls: AtomicU32::new(0),
            error: UpstreamError::http(429, "rate limited"),
        };

        let invoice = extract_invoice(&service, &document(), &invoker()).await.unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(invoice.invoice_number, "A-100");
        assert_eq!(invoice.invoice_date, "2025-02-03");
        assert_eq!(invoice.total_amount, Decimal::new(300, 0));
        assert_eq!(invoice.line_items[0].line_type, LineType::Premium);
    }

    #[tokio::test(start_paused = true)]
    async fn test_policy_rejection_stops() {
        let service = FlakyExtractor {
            failures: 10,
            calls: AtomicU32::new(0),
            error: UpstreamError::new("candidate blocked due to SAFETY"),
        };

        let err = extract_invoice(&service, &document(), &invoker())
            .await
            .unwrap_err();

        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            LotbillError::Upstream(ref e) if e.kind() == ErrorKind::PolicyRejection
        ));
    }
}
