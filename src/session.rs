use std::fs;
use std::path::PathBuf;

use chrono::{Datelike, Local};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::Ledger;
use crate::error::BillingError;
use crate::models::{DraftInvoice, Invoice, InvoiceSummary, LineItem};
use crate::{pdf, receipt};

/// Crate-side service behind the billing form. Owns draft validation,
/// identity assignment, the render-then-persist commit pipeline and
/// the filesystem bootstrap. One instance per process; operations run
/// sequentially and block.
pub struct BillingService {
    ledger: Ledger,
    invoice_dir: PathBuf,
    logo_path: Option<PathBuf>,
}

/// Everything the form needs to redisplay a committed invoice.
#[derive(Debug, Clone, Serialize)]
pub struct CommittedInvoice {
    pub invoice_id: i64,
    pub receipt_number: String,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub document_path: PathBuf,
}

impl BillingService {
    /// Lays the service over `data_dir`: the ledger database goes to
    /// `data/vetsone.db`, rendered documents under `invoices/`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        BillingService {
            ledger: Ledger::new(data_dir.join("data").join("vetsone.db")),
            invoice_dir: data_dir.join("invoices"),
            logo_path: None,
        }
    }

    pub fn with_logo(mut self, logo_path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(logo_path.into());
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Idempotent process-start bootstrap: schema plus output
    /// directories.
    pub fn initialize(&self) -> Result<(), BillingError> {
        self.ledger.initialize()?;
        fs::create_dir_all(&self.invoice_dir).map_err(|e| {
            BillingError::RenderFailure(format!(
                "cannot create invoice directory {}: {e}",
                self.invoice_dir.display()
            ))
        })?;
        Ok(())
    }

    /// Commits a draft: validate, number the items, render the PDF,
    /// then persist invoice and items atomically. The ledger is never
    /// written when rendering failed, so every stored invoice has its
    /// artifact. A generated receipt number that collides (two commits
    /// within the same wall-clock second) is regenerated once; a
    /// caller-supplied duplicate is rejected outright.
    pub fn commit(&self, draft: &DraftInvoice) -> Result<CommittedInvoice, BillingError> {
        validate(draft)?;

        let items = draft.line_items();
        let subtotal: Decimal = items.iter().map(|item| item.line_total).sum();

        let supplied = draft
            .receipt_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let mut receipt_number = match supplied {
            Some(number) => number.to_string(),
            None => receipt::next_receipt_number(),
        };

        // Refuse duplicates before rendering: the artifact path is
        // derived from the receipt number, and rendering first would
        // overwrite the stored invoice's document.
        if self.ledger.receipt_exists(&receipt_number)? {
            if supplied.is_some() {
                return Err(BillingError::DuplicateReceiptNumber(receipt_number));
            }
            warn!(receipt = %receipt_number, "generated receipt number collided, regenerating");
            receipt_number = receipt::next_receipt_number();
        }

        let document_path = self.document_path(&receipt_number)?;

        let date = draft.date.trim();
        let invoice = Invoice {
            id: None,
            receipt_number: receipt_number.clone(),
            date: if date.is_empty() {
                Local::now().format("%Y-%m-%d %H:%M").to_string()
            } else {
                date.to_string()
            },
            payment_method: draft.payment_method,
            customer_name: draft.customer_name.trim().to_string(),
            address: none_if_blank(&draft.address),
            telephone: draft.telephone.trim().to_string(),
            email: none_if_blank(&draft.email),
            subtotal,
            total: subtotal,
            document_path: document_path.display().to_string(),
        };

        let clinic = self.ledger.clinic_info()?;
        pdf::render_invoice(
            &document_path,
            &invoice,
            &items,
            &clinic,
            self.logo_path.as_deref(),
        )?;

        match self.ledger.save_invoice(&invoice, &items) {
            Ok(invoice_id) => {
                info!(
                    invoice_id,
                    receipt = %receipt_number,
                    total = %subtotal,
                    document = %document_path.display(),
                    "invoice committed"
                );
                Ok(CommittedInvoice {
                    invoice_id,
                    receipt_number,
                    items,
                    subtotal,
                    total: subtotal,
                    document_path,
                })
            }
            Err(e) => {
                // A duplicate means the path belongs to the stored
                // invoice; leave its artifact alone. Anything else
                // leaves an orphan worth cleaning up.
                if !matches!(e, BillingError::DuplicateReceiptNumber(_)) {
                    fs::remove_file(&document_path).ok();
                }
                Err(e)
            }
        }
    }

    /// History listing for the past-bills window.
    pub fn recent(&self, limit: u32) -> Result<Vec<InvoiceSummary>, BillingError> {
        self.ledger.list_recent(limit)
    }

    /// Looks up one committed invoice with its items.
    pub fn find(&self, receipt_number: &str) -> Result<Option<(Invoice, Vec<LineItem>)>, BillingError> {
        self.ledger.find_by_receipt(receipt_number)
    }

    /// Artifact location: `invoices/<year>/<month>/<receipt>.pdf`,
    /// partitioned by the current wall clock. Creates the partition
    /// directories on demand.
    fn document_path(&self, receipt_number: &str) -> Result<PathBuf, BillingError> {
        let now = Local::now();
        let dir = self
            .invoice_dir
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()));
        fs::create_dir_all(&dir).map_err(|e| {
            BillingError::RenderFailure(format!("cannot create {}: {e}", dir.display()))
        })?;

        let file_name = receipt_number.replace(['/', '\\', ':'], "-");
        Ok(dir.join(format!("{file_name}.pdf")))
    }
}

fn validate(draft: &DraftInvoice) -> Result<(), BillingError> {
    if draft.customer_name.trim().is_empty() {
        return Err(BillingError::MissingRequiredField("customer name"));
    }
    if draft.telephone.trim().is_empty() {
        return Err(BillingError::MissingRequiredField("telephone"));
    }
    Ok(())
}

fn none_if_blank(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DraftLineItem;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn service() -> (TempDir, BillingService) {
        let dir = TempDir::new().expect("temp dir");
        let service = BillingService::new(dir.path());
        service.initialize().expect("initialize");
        (dir, service)
    }

    fn draft() -> DraftInvoice {
        let mut draft = DraftInvoice::new();
        draft.date = "2024-03-05 10:30".to_string();
        draft.customer_name = "R. Perera".to_string();
        draft.telephone = "077 1234 567".to_string();
        draft.items = vec![
            DraftLineItem {
                item_number: String::new(),
                description: "Consultation".to_string(),
                quantity: "1".to_string(),
                unit_price: "1500".to_string(),
            },
            DraftLineItem {
                item_number: String::new(),
                description: "Vaccine".to_string(),
                quantity: "2".to_string(),
                unit_price: "850".to_string(),
            },
            // scratch row the commit must skip
            DraftLineItem::default(),
        ];
        draft
    }

    #[test]
    fn commit_requires_customer_name_and_telephone() {
        let (_dir, service) = service();

        let mut missing_name = draft();
        missing_name.customer_name = "  ".to_string();
        let err = service.commit(&missing_name).unwrap_err();
        assert!(matches!(err, BillingError::MissingRequiredField("customer name")));

        let mut missing_phone = draft();
        missing_phone.telephone = String::new();
        let err = service.commit(&missing_phone).unwrap_err();
        assert!(matches!(err, BillingError::MissingRequiredField("telephone")));

        // nothing was stored
        assert!(service.recent(10).unwrap().is_empty());
    }

    #[test]
    fn commit_renders_and_persists_one_invoice() {
        let (_dir, service) = service();

        let committed = service.commit(&draft()).expect("commit");
        assert!(committed.receipt_number.starts_with("R-"));
        assert_eq!(committed.subtotal, dec!(3200));
        assert_eq!(committed.total, dec!(3200));
        assert_eq!(committed.items.len(), 2);
        assert_eq!(committed.items[0].item_number, "1");
        assert_eq!(committed.items[1].item_number, "2");
        assert!(committed.document_path.exists());

        let (invoice, items) = service
            .find(&committed.receipt_number)
            .expect("lookup")
            .expect("stored invoice");
        assert_eq!(invoice.id, Some(committed.invoice_id));
        assert_eq!(invoice.total, dec!(3200));
        assert_eq!(invoice.date, "2024-03-05 10:30");
        assert_eq!(invoice.document_path, committed.document_path.display().to_string());

        assert_eq!(items.len(), committed.items.len());
        for (stored, expected) in items.iter().zip(&committed.items) {
            assert_eq!(stored.item_number, expected.item_number);
            assert_eq!(stored.description, expected.description);
            assert_eq!(stored.quantity, expected.quantity);
            assert_eq!(stored.unit_price, expected.unit_price);
            assert_eq!(stored.line_total, expected.line_total);
            assert_eq!(stored.invoice_id, Some(committed.invoice_id));
        }
    }

    #[test]
    fn artifact_lands_in_year_month_partition() {
        let (dir, service) = service();

        let committed = service.commit(&draft()).expect("commit");
        let now = Local::now();
        let expected_dir = dir
            .path()
            .join("invoices")
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()));
        assert_eq!(committed.document_path.parent(), Some(expected_dir.as_path()));
    }

    #[test]
    fn supplied_duplicate_receipt_is_rejected_and_artifact_survives() {
        let (_dir, service) = service();

        let mut first = draft();
        first.receipt_number = Some("R-20240101-090000".to_string());
        let committed = service.commit(&first).expect("first commit");
        let artifact_len = fs::metadata(&committed.document_path).unwrap().len();

        let mut second = draft();
        second.receipt_number = Some("R-20240101-090000".to_string());
        second.customer_name = "Someone Else".to_string();
        let err = service.commit(&second).unwrap_err();
        assert!(matches!(err, BillingError::DuplicateReceiptNumber(_)));

        // first commit's data and artifact are untouched
        let (invoice, _) = service
            .find("R-20240101-090000")
            .unwrap()
            .expect("first invoice intact");
        assert_eq!(invoice.customer_name, "R. Perera");
        assert_eq!(fs::metadata(&committed.document_path).unwrap().len(), artifact_len);
    }

    #[test]
    fn commit_with_no_billable_rows_stores_a_zero_total() {
        let (_dir, service) = service();

        let mut empty = draft();
        empty.items = vec![DraftLineItem::default()];
        let committed = service.commit(&empty).expect("commit");
        assert_eq!(committed.total, dec!(0));
        assert!(committed.items.is_empty());

        let (_, items) = service.find(&committed.receipt_number).unwrap().unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn overflowing_draft_commits_with_full_total() {
        let (_dir, service) = service();

        let mut big = draft();
        big.items = (1..=50)
            .map(|n| DraftLineItem {
                item_number: String::new(),
                description: format!("Service {n}"),
                quantity: "1".to_string(),
                unit_price: "10".to_string(),
            })
            .collect();

        // the page only fits 15 rows, but the stored total covers all 50
        let committed = service.commit(&big).expect("commit");
        assert_eq!(committed.items.len(), 50);
        assert_eq!(committed.total, dec!(500));
        assert!(committed.document_path.exists());

        let (invoice, items) = service.find(&committed.receipt_number).unwrap().unwrap();
        assert_eq!(invoice.total, dec!(500));
        assert_eq!(items.len(), 50);
    }

    #[test]
    fn recent_reflects_committed_invoices() {
        let (_dir, service) = service();

        let mut a = draft();
        a.receipt_number = Some("R-A".to_string());
        a.date = "2024-01-01 09:00".to_string();
        let mut b = draft();
        b.receipt_number = Some("R-B".to_string());
        b.date = "2024-01-02 09:00".to_string();

        service.commit(&a).expect("commit a");
        service.commit(&b).expect("commit b");

        let recent = service.recent(10).expect("recent");
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].receipt_number, "R-B");
        assert_eq!(recent[1].receipt_number, "R-A");
    }
}
