//! Database infrastructure using SeaORM

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper around the SeaORM connection.
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Open (creating if necessary) the database at the given path.
    pub async fn open(path: &Path) -> Result<Self, DbErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let conn = Self::connect(db_url).await?;

        info!("Opened database at {:?}", path);

        Ok(Self { conn })
    }

    /// An in-memory database, used by tests. Pinned to a single pooled
    /// connection; every sqlite connection would otherwise get its own
    /// private memory database.
    pub async fn open_in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .sqlx_logging(false);
        let conn = SeaDatabase::connect(opt).await?;
        Ok(Self { conn })
    }

    async fn connect(db_url: String) -> Result<DatabaseConnection, DbErr> {
        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(8))
            .sqlx_logging(false); // We use tracing instead

        SeaDatabase::connect(opt).await
    }

    /// Run migrations
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the database connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}
