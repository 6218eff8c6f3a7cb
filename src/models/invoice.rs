use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment methods accepted at the front desk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[default]
    Cash,
    Debit,
    Credit,
    Check,
}

impl PaymentMethod {
    /// Display order used by the form's payment selector.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Debit,
        PaymentMethod::Credit,
        PaymentMethod::Check,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Debit => "Debit",
            PaymentMethod::Credit => "Credit",
            PaymentMethod::Check => "Check",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(PaymentMethod::Cash),
            "Debit" => Ok(PaymentMethod::Debit),
            "Credit" => Ok(PaymentMethod::Credit),
            "Check" => Ok(PaymentMethod::Check),
            other => Err(UnknownPaymentMethod(other.to_string())),
        }
    }
}

/// A committed invoice header. Immutable once saved; `id` and
/// `document_path` are assigned during the save pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Option<i64>,
    pub receipt_number: String,
    pub date: String,
    pub payment_method: PaymentMethod,
    pub customer_name: String,
    pub address: Option<String>,
    pub telephone: String,
    pub email: Option<String>,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub document_path: String,
}

/// One billed row of an invoice. `line_total` is a cached projection of
/// `quantity * unit_price`; the draft recomputes it on every edit and
/// it is stored only as part of the committed snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Option<i64>,
    pub invoice_id: Option<i64>,
    pub item_number: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Projection returned by the history listing; never carries items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: i64,
    pub receipt_number: String,
    pub date: String,
    pub customer_name: String,
    pub total: Decimal,
    pub document_path: String,
}

/// Clinic identity shown in the document header. Kept in the ledger's
/// `config` table so the letterhead can be changed without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicInfo {
    pub name: String,
    pub tagline: String,
    pub address: String,
    pub phone: String,
}

impl Default for ClinicInfo {
    fn default() -> Self {
        ClinicInfo {
            name: "VETS ONE".to_string(),
            tagline: "ANIMAL HOSPITAL".to_string(),
            address: "No.321/B, Divulpitiya, Boralesgamuwa".to_string(),
            phone: "Tel : +94 77 8198 882 | +94 704130 333".to_string(),
        }
    }
}
