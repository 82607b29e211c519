//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bazaar migrate
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded into
//! the binary at compile time. Each file runs once; applied versions are
//! tracked in `_sqlx_migrations`.

use tracing::info;

use bazaar_storefront::db;

/// Errors that can occur while migrating.
#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the storefront database migrations.
///
/// # Errors
///
/// Returns an error if the URL is missing, the database is unreachable or a
/// migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let database_url = super::database_url()?;

    info!("Connecting to database...");
    let pool = db::create_pool(&database_url)
        .await
        .map_err(MigrationError::from)?;

    info!("Running migrations...");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .map_err(MigrationError::from)?;

    info!("Migrations complete!");
    Ok(())
}
