use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{LineItem, PaymentMethod};

/// One editable row of the form's item grid. Quantity and unit price
/// hold the raw text exactly as typed; numeric meaning is derived on
/// demand so the displayed line total can never drift from its inputs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DraftLineItem {
    pub item_number: String,
    pub description: String,
    pub quantity: String,
    pub unit_price: String,
}

impl DraftLineItem {
    pub fn quantity_value(&self) -> Option<Decimal> {
        parse_decimal(&self.quantity)
    }

    pub fn unit_price_value(&self) -> Option<Decimal> {
        parse_decimal(&self.unit_price)
    }

    /// Computed line total for redisplay. `None` means the row carries
    /// no amount at all; a quantity without a price costs 0, a price
    /// without a quantity bills a single unit.
    pub fn line_total(&self) -> Option<Decimal> {
        let quantity = self.quantity_value();
        let unit_price = self.unit_price_value();
        if quantity.is_none() && unit_price.is_none() {
            return None;
        }
        Some(quantity.unwrap_or(Decimal::ONE) * unit_price.unwrap_or(Decimal::ZERO))
    }

    /// A row is billable once it has a description and some amount.
    /// Anything else is scratch space the commit pipeline skips.
    pub fn is_billable(&self) -> bool {
        !self.description.trim().is_empty()
            && (self.quantity_value().is_some() || self.unit_price_value().is_some())
    }
}

/// The in-memory invoice being composed: the form's single source of
/// truth, mutated freely until the user commits. Committing never
/// mutates the draft; the pipeline snapshots it into an `Invoice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftInvoice {
    /// Blank means "generate one at commit time".
    pub receipt_number: Option<String>,
    pub date: String,
    pub payment_method: PaymentMethod,
    pub customer_name: String,
    pub address: String,
    pub telephone: String,
    pub email: String,
    pub items: Vec<DraftLineItem>,
}

impl DraftInvoice {
    pub fn new() -> Self {
        DraftInvoice {
            receipt_number: None,
            date: Local::now().format("%Y-%m-%d %H:%M").to_string(),
            payment_method: PaymentMethod::default(),
            customer_name: String::new(),
            address: String::new(),
            telephone: String::new(),
            email: String::new(),
            items: Vec::new(),
        }
    }

    /// Snapshot of the billable rows, numbered densely 1..N in entry
    /// order, with quantity/price defaults applied and totals computed.
    /// This is the exact sequence the ledger persists.
    pub fn line_items(&self) -> Vec<LineItem> {
        let mut items = Vec::new();
        for row in self.items.iter().filter(|row| row.is_billable()) {
            let quantity = row.quantity_value().unwrap_or(Decimal::ONE);
            let unit_price = row.unit_price_value().unwrap_or(Decimal::ZERO);
            items.push(LineItem {
                id: None,
                invoice_id: None,
                item_number: (items.len() + 1).to_string(),
                description: row.description.trim().to_string(),
                quantity,
                unit_price,
                line_total: quantity * unit_price,
            });
        }
        items
    }

    /// Sum of the billable line totals. Recomputed on every call so
    /// edits to any row are always reflected.
    pub fn subtotal(&self) -> Decimal {
        self.line_items().iter().map(|item| item.line_total).sum()
    }

    /// No tax or discounts apply, so the total equals the subtotal.
    pub fn total(&self) -> Decimal {
        self.subtotal()
    }
}

impl Default for DraftInvoice {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}
