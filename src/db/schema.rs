use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Clinic configuration
        CREATE TABLE IF NOT EXISTS config (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Invoice headers. Money columns hold canonical decimal text,
        -- never REAL, so stored amounts round-trip exactly.
        CREATE TABLE IF NOT EXISTS invoices (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            receipt_number TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL,
            payment_method TEXT NOT NULL DEFAULT 'Cash',
            customer_name TEXT NOT NULL,
            address TEXT,
            telephone TEXT NOT NULL,
            email TEXT,
            subtotal TEXT NOT NULL DEFAULT '0',
            total TEXT NOT NULL DEFAULT '0',
            document_path TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
        );

        CREATE INDEX IF NOT EXISTS idx_invoices_receipt ON invoices(receipt_number);
        CREATE INDEX IF NOT EXISTS idx_invoices_date ON invoices(date);

        -- Invoice line items; row order (id) is entry order
        CREATE TABLE IF NOT EXISTS invoice_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            invoice_id INTEGER NOT NULL,
            item_number TEXT NOT NULL,
            description TEXT NOT NULL,
            quantity TEXT NOT NULL,
            unit_price TEXT NOT NULL,
            line_total TEXT NOT NULL,
            FOREIGN KEY (invoice_id) REFERENCES invoices(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_invoice_items_invoice ON invoice_items(invoice_id);

        -- Letterhead defaults; editable through the config table
        INSERT OR IGNORE INTO config (key, value) VALUES ('clinic_name', 'VETS ONE');
        INSERT OR IGNORE INTO config (key, value) VALUES ('clinic_tagline', 'ANIMAL HOSPITAL');
        INSERT OR IGNORE INTO config (key, value) VALUES ('clinic_address', 'No.321/B, Divulpitiya, Boralesgamuwa');
        INSERT OR IGNORE INTO config (key, value) VALUES ('clinic_phone', 'Tel : +94 77 8198 882 | +94 704130 333');
        ",
    )?;

    Ok(())
}
