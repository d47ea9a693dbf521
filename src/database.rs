//! Database (db) union structure.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::Configuration;

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "tribune";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Shared handle over the PostgreSQL pool.
///
/// The database engine is the sole arbiter of concurrent access:
/// uniqueness and referential-integrity constraints live in
/// `migrations/` and back every manager operation.
#[derive(Clone)]
pub struct Database {
    pub postgres: PgPool,
}

impl Database {
    /// Init database connections.
    pub async fn new(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let pool = PgPoolOptions::new().max_connections(pool);
        let postgres = pool.connect(&addr).await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self { postgres })
    }

    /// Init database connections from the `postgres` configuration entry.
    pub async fn from_config(
        config: &Configuration,
    ) -> Result<Self, sqlx::Error> {
        let Some(postgres) = &config.postgres else {
            tracing::error!("missing `postgres` entry on `config.yaml` file");
            return Err(sqlx::Error::Configuration(
                "missing `postgres` entry on `config.yaml` file".into(),
            ));
        };

        Self::new(
            &postgres.address,
            postgres
                .username
                .as_deref()
                .unwrap_or(DEFAULT_CREDENTIALS),
            postgres
                .password
                .as_deref()
                .unwrap_or(DEFAULT_CREDENTIALS),
            postgres
                .database
                .as_deref()
                .unwrap_or(DEFAULT_DATABASE_NAME),
            postgres.pool_size.unwrap_or(DEFAULT_POOL_SIZE),
        )
        .await
    }

    /// Execute migration scripts.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.postgres).await
    }
}
