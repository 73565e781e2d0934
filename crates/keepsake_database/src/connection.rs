//! Connection pool and migrations.

use crate::DatabaseResult;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use keepsake_error::{DatabaseError, DatabaseErrorKind};
use std::path::Path;
use std::time::Duration;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Pool of ledger connections.
pub type LedgerPool = Pool<ConnectionManager<SqliteConnection>>;

/// Applies ledger PRAGMAs to every pooled connection.
#[derive(Debug, Clone, Copy)]
pub struct SqlitePragmas {
    busy_timeout: Duration,
}

impl SqlitePragmas {
    /// PRAGMAs with the given lock wait.
    pub fn new(busy_timeout: Duration) -> Self {
        Self { busy_timeout }
    }
}

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        conn.batch_execute(&format!(
            "PRAGMA journal_mode = WAL; \
             PRAGMA synchronous = NORMAL; \
             PRAGMA foreign_keys = ON; \
             PRAGMA busy_timeout = {};",
            self.busy_timeout.as_millis()
        ))
        .map_err(diesel::r2d2::Error::QueryError)
    }
}

/// Open a pool on the ledger file at `path`, creating the file if needed.
///
/// # Errors
///
/// Returns a `Connection` error if the parent directory cannot be created
/// or the pool cannot open its first connection.
pub fn create_pool(path: &Path, pool_size: u32) -> DatabaseResult<LedgerPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Connection(format!(
                "cannot create ledger directory {}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let manager = ConnectionManager::<SqliteConnection>::new(path.to_string_lossy());
    Pool::builder()
        .max_size(pool_size)
        .connection_customizer(Box::new(SqlitePragmas::new(Duration::from_secs(5))))
        .build(manager)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Connection(e.to_string())))
}

/// Run pending migrations.
pub fn run_migrations(conn: &mut SqliteConnection) -> DatabaseResult<()> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))
}
