pub mod schema;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::BillingError;
use crate::models::{ClinicInfo, Invoice, InvoiceSummary, LineItem, PaymentMethod};

/// Durable invoice store. Holds only the database location; every
/// operation opens its own connection and releases it when the call
/// returns, on success and error paths alike, so independent processes
/// on the same machine only contend through SQLite's file locking.
#[derive(Debug, Clone)]
pub struct Ledger {
    db_path: PathBuf,
}

impl Ledger {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Ledger { db_path: db_path.into() }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn connect(&self) -> Result<Connection, BillingError> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(conn)
    }

    /// Ensures the schema exists. Safe to call on every process start.
    pub fn initialize(&self) -> Result<(), BillingError> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = self.connect()?;
        schema::create_tables(&conn)?;
        Ok(())
    }

    /// Writes one invoice and its items as a single transaction; the
    /// caller never observes an invoice without its items or vice
    /// versa. Returns the store-assigned invoice id.
    pub fn save_invoice(&self, invoice: &Invoice, items: &[LineItem]) -> Result<i64, BillingError> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO invoices (receipt_number, date, payment_method, customer_name,
             address, telephone, email, subtotal, total, document_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                invoice.receipt_number,
                invoice.date,
                invoice.payment_method.as_str(),
                invoice.customer_name,
                invoice.address,
                invoice.telephone,
                invoice.email,
                invoice.subtotal.to_string(),
                invoice.total.to_string(),
                invoice.document_path,
            ],
        )
        .map_err(|e| map_receipt_conflict(&invoice.receipt_number, e))?;

        let invoice_id = tx.last_insert_rowid();

        for item in items {
            tx.execute(
                "INSERT INTO invoice_items (invoice_id, item_number, description,
                 quantity, unit_price, line_total)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    invoice_id,
                    item.item_number,
                    item.description,
                    item.quantity.to_string(),
                    item.unit_price.to_string(),
                    item.line_total.to_string(),
                ],
            )?;
        }

        tx.commit()?;

        debug!(invoice_id, receipt = %invoice.receipt_number, items = items.len(), "invoice persisted");
        Ok(invoice_id)
    }

    /// Latest invoices for the history window, newest date first and
    /// ties broken by insertion order (latest id first). Summary
    /// projection only; items are never loaded here.
    pub fn list_recent(&self, limit: u32) -> Result<Vec<InvoiceSummary>, BillingError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT id, receipt_number, date, customer_name, total, document_path
             FROM invoices
             ORDER BY date DESC, id DESC
             LIMIT ?1",
        )?;

        let summaries = stmt
            .query_map(params![limit], |row| {
                Ok(InvoiceSummary {
                    id: row.get(0)?,
                    receipt_number: row.get(1)?,
                    date: row.get(2)?,
                    customer_name: row.get(3)?,
                    total: decimal_column(row, 4)?,
                    document_path: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(summaries)
    }

    /// Exact receipt-number lookup; items come back in entry order.
    pub fn find_by_receipt(
        &self,
        receipt_number: &str,
    ) -> Result<Option<(Invoice, Vec<LineItem>)>, BillingError> {
        let conn = self.connect()?;

        let invoice = conn
            .query_row(
                "SELECT id, receipt_number, date, payment_method, customer_name,
                 address, telephone, email, subtotal, total, document_path
                 FROM invoices WHERE receipt_number = ?1",
                params![receipt_number],
                invoice_from_row,
            )
            .optional()?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT id, invoice_id, item_number, description, quantity, unit_price, line_total
             FROM invoice_items
             WHERE invoice_id = ?1
             ORDER BY id",
        )?;

        let items = stmt
            .query_map(params![invoice.id], |row| {
                Ok(LineItem {
                    id: Some(row.get(0)?),
                    invoice_id: Some(row.get(1)?),
                    item_number: row.get(2)?,
                    description: row.get(3)?,
                    quantity: decimal_column(row, 4)?,
                    unit_price: decimal_column(row, 5)?,
                    line_total: decimal_column(row, 6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some((invoice, items)))
    }

    /// Cheap existence probe used before rendering, so a rejected
    /// duplicate can never overwrite the stored invoice's artifact.
    pub fn receipt_exists(&self, receipt_number: &str) -> Result<bool, BillingError> {
        let conn = self.connect()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE receipt_number = ?1",
            params![receipt_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Letterhead identity from the config table, falling back to the
    /// seeded defaults for any missing key.
    pub fn clinic_info(&self) -> Result<ClinicInfo, BillingError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT key, value FROM config")?;

        let mut config: HashMap<String, String> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;

        let defaults = ClinicInfo::default();
        Ok(ClinicInfo {
            name: config.remove("clinic_name").unwrap_or(defaults.name),
            tagline: config.remove("clinic_tagline").unwrap_or(defaults.tagline),
            address: config.remove("clinic_address").unwrap_or(defaults.address),
            phone: config.remove("clinic_phone").unwrap_or(defaults.phone),
        })
    }

    pub fn set_config_value(&self, key: &str, value: &str) -> Result<(), BillingError> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR REPLACE INTO config (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

fn invoice_from_row(row: &Row<'_>) -> Result<Invoice, rusqlite::Error> {
    Ok(Invoice {
        id: Some(row.get(0)?),
        receipt_number: row.get(1)?,
        date: row.get(2)?,
        payment_method: payment_method_column(row, 3)?,
        customer_name: row.get(4)?,
        address: row.get(5)?,
        telephone: row.get(6)?,
        email: row.get(7)?,
        subtotal: decimal_column(row, 8)?,
        total: decimal_column(row, 9)?,
        document_path: row.get(10)?,
    })
}

fn decimal_column(row: &Row<'_>, idx: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn payment_method_column(row: &Row<'_>, idx: usize) -> Result<PaymentMethod, rusqlite::Error> {
    let text: String = row.get(idx)?;
    PaymentMethod::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// The UNIQUE constraint on `invoices.receipt_number` is the one
/// conflict a caller can recover from; everything else is storage
/// being unavailable.
fn map_receipt_conflict(receipt_number: &str, err: rusqlite::Error) -> BillingError {
    if let rusqlite::Error::SqliteFailure(e, Some(message)) = &err {
        if e.code == rusqlite::ErrorCode::ConstraintViolation
            && message.contains("invoices.receipt_number")
        {
            return BillingError::DuplicateReceiptNumber(receipt_number.to_string());
        }
    }
    BillingError::StorageUnavailable(err)
}
