use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, gauge, histogram};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

pub type DbPool = DatabaseConnection;

/// Pool sizing and timeouts for the ledger database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(8),
        }
    }
}

impl DbConfig {
    /// Single-connection pool; an in-memory SQLite database lives only as long
    /// as its one connection, so the pool must never open a second one.
    pub fn in_memory_sqlite() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        }
    }

    /// `sqlite` or `postgres`, for log and metric labels.
    pub fn backend(&self) -> &'static str {
        if self.url.starts_with("sqlite:") {
            "sqlite"
        } else {
            "postgres"
        }
    }

    fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(self.url.clone());
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .sqlx_logging(false);
        opt
    }
}

impl From<&AppConfig> for DbConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections,
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        }
    }
}

/// Opens a pool with default sizing.
pub async fn establish_connection(database_url: &str) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig {
        url: database_url.to_string(),
        ..Default::default()
    })
    .await
}

pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    establish_connection_with_config(&DbConfig::from(cfg)).await
}

/// # Errors
/// `ServiceError::DatabaseError` when the first connection cannot be opened.
pub async fn establish_connection_with_config(config: &DbConfig) -> Result<DbPool, ServiceError> {
    let backend = config.backend();
    debug!(backend, ?config, "opening ledger database pool");
    gauge!("inventory_db.max_connections", config.max_connections as f64);

    match Database::connect(config.connect_options()).await {
        Ok(pool) => {
            info!(
                backend,
                max_connections = config.max_connections,
                "ledger database pool ready"
            );
            Ok(pool)
        }
        Err(e) => {
            error!(backend, error = %e, "could not open ledger database pool");
            counter!("inventory_db.connection_failures", 1);
            Err(ServiceError::DatabaseError(e))
        }
    }
}

/// Applies pending schema migrations; already-applied ones are skipped.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let outcome = crate::migrator::Migrator::up(pool, None).await;
    let elapsed = started.elapsed();
    histogram!("inventory_db.migrations.duration", elapsed);

    outcome.map_err(|e| {
        error!(?elapsed, error = %e, "schema migration failed");
        ServiceError::MigrationError(e.to_string())
    })?;
    info!(?elapsed, "schema is up to date");
    Ok(())
}

/// Pings the pool and returns the round-trip time.
pub async fn check_connection(pool: &DbPool) -> Result<Duration, ServiceError> {
    let started = Instant::now();
    if let Err(e) = pool.ping().await {
        error!(error = %e, "database ping failed");
        counter!("inventory_db.connection_failures", 1);
        return Err(ServiceError::DatabaseError(e));
    }
    let latency = started.elapsed();
    gauge!("inventory_db.connection_latency", latency.as_millis() as f64);
    debug!(?latency, "database ping ok");
    Ok(latency)
}

pub async fn close_pool(pool: DbPool) -> Result<(), ServiceError> {
    info!("closing ledger database pool");
    pool.close().await.map_err(ServiceError::DatabaseError)
}
