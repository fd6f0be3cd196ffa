use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

const CREATE_SYSTEM_LOG: &str = r#"
    CREATE TABLE system_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        source TEXT NOT NULL,
        category TEXT NOT NULL,
        message TEXT NOT NULL
    );
"#;

const CREATE_ORDER_LINE: &str = r#"
    CREATE TABLE a030_order_line (
        order_id TEXT PRIMARY KEY NOT NULL,
        sku TEXT,
        quantity INTEGER,
        selling_price REAL,
        order_date_time TEXT,
        product_name TEXT,
        customer_state TEXT,
        size TEXT,
        supplier_listed_price REAL,
        supplier_discounted_price REAL,
        packet_id TEXT,
        reason_for_credit_entry TEXT,
        loaded_at_utc TEXT NOT NULL
    );
"#;

const CREATE_SETTLEMENT_PAYMENT: &str = r#"
    CREATE TABLE a031_settlement_payment (
        payment_key TEXT PRIMARY KEY NOT NULL,
        payment_id TEXT NOT NULL,
        order_id TEXT NOT NULL,
        amount REAL,
        final_settlement_amount REAL,
        payment_date_time TEXT,
        order_date_time TEXT,
        order_status TEXT,
        transaction_id TEXT,
        price_type TEXT,
        total_sale_amount REAL,
        total_sale_return_amount REAL,
        dispatch_date TEXT,
        charges_json TEXT,
        loaded_at_utc TEXT NOT NULL
    );
    CREATE INDEX idx_a031_order_id ON a031_settlement_payment(order_id);
"#;

const CREATE_MERGED_ORDER_PAYMENT: &str = r#"
    CREATE TABLE p910_merged_order_payment (
        record_key TEXT PRIMARY KEY NOT NULL,
        position INTEGER NOT NULL,
        order_id TEXT NOT NULL,
        payment_id TEXT,
        sku TEXT,
        final_status TEXT,
        final_status_key TEXT,
        status_source TEXT,
        order_date TEXT,
        payload TEXT NOT NULL,
        built_at TEXT NOT NULL
    );
    CREATE INDEX idx_p910_position ON p910_merged_order_payment(position);
    CREATE INDEX idx_p910_status_key ON p910_merged_order_payment(final_status_key);
    CREATE INDEX idx_p910_order_date ON p910_merged_order_payment(order_date);
"#;

/// Open (or create) the SQLite file and make sure every table exists
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    ensure_table(&conn, "system_log", CREATE_SYSTEM_LOG).await?;
    ensure_table(&conn, "a030_order_line", CREATE_ORDER_LINE).await?;
    ensure_table(&conn, "a031_settlement_payment", CREATE_SETTLEMENT_PAYMENT).await?;
    ensure_table(&conn, "p910_merged_order_payment", CREATE_MERGED_ORDER_PAYMENT).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

async fn ensure_table(conn: &DatabaseConnection, table: &str, ddl: &str) -> anyhow::Result<()> {
    let existing = conn
        .query_all(Statement::from_sql_and_values(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?;",
            [table.into()],
        ))
        .await?;

    if !existing.is_empty() {
        return Ok(());
    }

    tracing::info!("Creating {} table", table);
    // sqlite executes one statement per call
    for statement in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            format!("{};", statement),
        ))
        .await?;
    }
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}
