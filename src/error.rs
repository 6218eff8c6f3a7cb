use thiserror::Error;

/// Everything that can go wrong between the billing form and a saved,
/// rendered invoice. Each variant carries enough context for the form
/// to show the user a specific message.
#[derive(Debug, Error)]
pub enum BillingError {
    /// The draft is not a valid invoice yet; nothing was written.
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// The store rejected a receipt number that already exists. The
    /// caller may regenerate and retry; the stored invoice is intact.
    #[error("receipt number {0} is already registered")]
    DuplicateReceiptNumber(String),

    /// The ledger database could not be opened, read or written.
    #[error("invoice storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    /// The document could not be produced. The ledger is never written
    /// when this occurs, so every stored invoice has an artifact.
    #[error("could not render invoice document: {0}")]
    RenderFailure(String),

    /// Best effort only: the invoice is already saved when printing
    /// is attempted, so this never affects stored data.
    #[error("could not send document to the printer: {0}")]
    PrintDispatchFailure(String),
}
