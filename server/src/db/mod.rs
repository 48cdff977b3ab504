pub mod migrations;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared handle to the SQLite connection.
/// rusqlite is synchronous — the connection lives behind `Arc<Mutex>` and all
/// store calls go through `tokio::task::spawn_blocking`.
pub type DbPool = Arc<Mutex<Connection>>;

/// Open (or create) the database under `data_dir`, enable WAL mode, and run
/// migrations. Failure here is fatal at startup.
pub fn init_db(data_dir: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("natter.db");
    let mut conn = Connection::open(&db_path)?;

    // WAL for concurrent readers while a writer holds the mutex
    conn.pragma_update(None, "journal_mode", "WAL")?;

    migrations::migrations().to_latest(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database with the same schema, for unit tests.
pub fn init_db_in_memory() -> Result<DbPool, Box<dyn std::error::Error>> {
    let mut conn = Connection::open_in_memory()?;
    migrations::migrations().to_latest(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
