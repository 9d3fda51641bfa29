//! Submitting bills to the ledger.
//!
//! Creating the bill is the primary step and its failure is returned.
//! Uploading the source document afterwards is best effort: a failure is
//! logged and reported but never fails the submission.

use std::fmt;
use std::future::Future;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{LotbillError, UpstreamError};
use crate::models::bill::Bill;
use crate::models::document::SourceDocument;
use crate::retry::{ErrorKind, ResilientInvoker};

/// Credentials for one ledger call, passed explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub access_token: String,
    pub tenant_id: String,
}

impl AuthContext {
    pub fn new(access_token: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            tenant_id: tenant_id.into(),
        }
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("access_token", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// What the ledger returned for a created bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillReceipt {
    pub bill_id: String,
    pub status: Option<String>,
}

/// Outbound calls to the ledger.
pub trait LedgerTransport {
    /// Create a bill and return its ledger id.
    fn create_bill(
        &self,
        auth: &AuthContext,
        bill: &Bill,
    ) -> impl Future<Output = Result<BillReceipt, UpstreamError>> + Send;

    /// Attach the source document to an existing bill.
    fn attach_document(
        &self,
        auth: &AuthContext,
        bill_id: &str,
        document: &SourceDocument,
    ) -> impl Future<Output = Result<(), UpstreamError>> + Send;
}

/// Result of the attachment step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AttachmentOutcome {
    /// No document was supplied.
    NotRequested,
    Uploaded,
    Failed {
        error: String,
        kind: ErrorKind,
        attempts: u32,
    },
}

/// Outcome of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub receipt: BillReceipt,
    pub attachment: AttachmentOutcome,
}

/// Create `bill` in the ledger and, if given, attach the source document.
pub async fn submit_bill<T: LedgerTransport>(
    transport: &T,
    auth: &AuthContext,
    bill: &Bill,
    document: Option<&SourceDocument>,
    invoker: &ResilientInvoker,
) -> Result<SubmissionReport, LotbillError> {
    let receipt = invoker
        .invoke(|| transport.create_bill(auth, bill))
        .await?;

    info!(
        bill_id = %receipt.bill_id,
        invoice_number = %bill.invoice_number,
        "bill created"
    );

    let attachment = match document {
        None => AttachmentOutcome::NotRequested,
        Some(document) => {
            let uploaded = invoker
                .invoke(|| transport.attach_document(auth, &receipt.bill_id, document))
                .await;

            match uploaded {
                Ok(()) => {
                    info!(bill_id = %receipt.bill_id, file = %document.file_name, "document attached");
                    AttachmentOutcome::Uploaded
                }
                Err(e) => {
                    warn!(
                        bill_id = %receipt.bill_id,
                        file = %document.file_name,
                        error = %e,
                        "attachment upload failed, bill kept"
                    );
                    AttachmentOutcome::Failed {
                        error: e.source.to_string(),
                        kind: e.kind(),
                        attempts: e.attempts(),
                    }
                }
            }
        }
    };

    Ok(SubmissionReport {
        receipt,
        attachment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mapper::map_to_bill;
    use crate::models::invoice::{Invoice, LineItem, LineType};
    use crate::retry::RetryPolicy;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedLedger {
        create_failures: Mutex<Vec<UpstreamError>>,
        attach_failures: Mutex<Vec<UpstreamError>>,
        created: Mutex<Vec<(String, String)>>,
        attached: Mutex<Vec<String>>,
    }

    impl LedgerTransport for ScriptedLedger {
        async fn create_bill(
            &self,
            auth: &AuthContext,
            bill: &Bill,
        ) -> Result<BillReceipt, UpstreamError> {
            if let Some(err) = self.create_failures.lock().unwrap().pop() {
                return Err(err);
            }
            let mut created = self.created.lock().unwrap();
            created.push((auth.tenant_id.clone(), bill.invoice_number.clone()));
            Ok(BillReceipt {
                bill_id: format!("bill-{}", created.len()),
                status: Some("DRAFT".to_string()),
            })
        }

        async fn attach_document(
            &self,
            _auth: &AuthContext,
            bill_id: &str,
            document: &SourceDocument,
        ) -> Result<(), UpstreamError> {
            if let Some(err) = self.attach_failures.lock().unwrap().pop() {
                return Err(err);
            }
            self.attached
                .lock()
                .unwrap()
                .push(format!("{}:{}", bill_id, document.file_name));
            Ok(())
        }
    }

    fn bill() -> Bill {
        let mut line = LineItem::new(LineType::Lot);
        line.unit_price = rust_decimal::Decimal::new(500, 0);
        let mut invoice = Invoice::new();
        invoice.invoice_number = "INV-9".to_string();
        invoice.line_items.push(line);
        map_to_bill(&invoice, "429").unwrap()
    }

    fn invoker() -> ResilientInvoker {
        ResilientInvoker::new(
            RetryPolicy::new()
                .with_max_attempts(3)
                .with_base_delay(Duration::from_millis(10)),
        )
    }

    fn auth() -> AuthContext {
        AuthContext::new("secret-token", "tenant-1")
    }

    fn document() -> SourceDocument {
        SourceDocument::new("inv.pdf", "application/pdf", b"%PDF-1.7".to_vec())
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_with_attachment() {
        let ledger = ScriptedLedger::default();
        ledger
            .create_failures
            .lock()
            .unwrap()
            .push(UpstreamError::http(503, "unavailable"));

        let report = submit_bill(&ledger, &auth(), &bill(), Some(&document()), &invoker())
            .await
            .unwrap();

        assert_eq!(report.receipt.bill_id, "bill-1");
        assert_eq!(report.attachment, AttachmentOutcome::Uploaded);
        assert_eq!(
            *ledger.created.lock().unwrap(),
            vec![("tenant-1".to_string(), "INV-9".to_string())]
        );
        assert_eq!(*ledger.attached.lock().unwrap(), vec!["bill-1:inv.pdf".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attachment_failure_keeps_submission() {
        let ledger = ScriptedLedger::default();
        ledger
            .attach_failures
            .lock()
            .unwrap()
            .push(UpstreamError::http(415, "unsupported media type"));

        let report = submit_bill(&ledger, &auth(), &bill(), Some(&document()), &invoker())
            .await
            .unwrap();

        assert_eq!(report.receipt.bill_id, "bill-1");
        assert_eq!(
            report.attachment,
            AttachmentOutcome::Failed {
                error: "unsupported media type".to_string(),
                kind: ErrorKind::InvalidInput,
                attempts: 1,
            }
        );
        assert!(ledger.attached.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_failure_is_returned() {
        let ledger = ScriptedLedger::default();
        ledger
            .create_failures
            .lock()
            .unwrap()
            .push(UpstreamError::http(401, "unauthorized"));

        let err = submit_bill(&ledger, &auth(), &bill(), Some(&document()), &invoker())
            .await
            .unwrap_err();

        match err {
            LotbillError::Upstream(e) => {
                assert_eq!(e.kind(), ErrorKind::Authentication);
                assert_eq!(e.attempts(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(ledger.attached.lock().unwrap().is_empty());
    }

    /// Creates the bill server-side, then cannot read the response.
    #[derive(Default)]
    struct GarbledLedger {
        created: AtomicU32,
    }

    impl LedgerTransport for GarbledLedger {
        async fn create_bill(
            &self,
            _auth: &AuthContext,
            _bill: &Bill,
        ) -> Result<BillReceipt, UpstreamError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Err(UpstreamError::unreadable_response(
                "unreadable ledger response: expected value at line 1 column 1",
            ))
        }

        async fn attach_document(
            &self,
            _auth: &AuthContext,
            _bill_id: &str,
            _document: &SourceDocument,
        ) -> Result<(), UpstreamError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_create_response_is_not_resubmitted() {
        let ledger = GarbledLedger::default();

        let err = submit_bill(&ledger, &auth(), &bill(), Some(&document()), &invoker())
            .await
            .unwrap_err();

        assert_eq!(ledger.created.load(Ordering::SeqCst), 1);
        match err {
            LotbillError::Upstream(e) => {
                assert_eq!(e.kind(), ErrorKind::UnreadableResponse);
                assert_eq!(e.attempts(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_no_document() {
        let ledger = ScriptedLedger::default();
        let report = submit_bill(&ledger, &auth(), &bill(), None, &invoker())
            .await
            .unwrap();
        assert_eq!(report.attachment, AttachmentOutcome::NotRequested);
    }

    #[test]
    fn test_auth_debug_redacts_token() {
        let printed = format!("{:?}", auth());
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("tenant-1"));
    }
}
