//! Billing core for the Vets One animal hospital's front desk.
//!
//! The interactive form holds a [`models::DraftInvoice`], renumbers its
//! rows through [`receipt::renumber_items`] while the user edits, and
//! commits through [`BillingService::commit`], which renders the A4
//! receipt PDF and then writes the invoice and its line items to the
//! SQLite ledger in one transaction. Printing and viewing the rendered
//! document go through [`printing`].

pub mod db;
pub mod error;
pub mod models;
pub mod pdf;
pub mod printing;
pub mod receipt;
pub mod session;

pub use error::BillingError;
pub use session::{BillingService, CommittedInvoice};

use std::path::PathBuf;

/// Platform data directory for the application; the database and the
/// rendered invoices live beneath it.
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("LOCALAPPDATA")
            .map(|p| PathBuf::from(p).join("VetsOne"))
            .unwrap_or_else(|_| PathBuf::from("."))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(|p| PathBuf::from(p).join(".vetsone"))
            .unwrap_or_else(|_| PathBuf::from("."))
    }
}
