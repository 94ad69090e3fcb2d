//! Dependency initialization and wiring for relation sync.

use std::sync::Arc;
use std::time::Duration;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::time::sleep;
use tracing::{info, warn};

use relation_sync_repository::{
    run_migrations, PostgresChangeLog, PostgresCursorRepository, PostgresDocumentStore,
};

use crate::config::settings::{ConnectionMode, Settings};
use crate::consumer::ChangeFeedConsumer;
use crate::loader::{LoaderConfig, WriteApplier};
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::ReactionDispatcher;
use crate::SyncError;

/// Maximum number of pooled database connections.
const MAX_CONNECTIONS: u32 = 20;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// See [`Settings::from_env`] for the variables read.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(SyncError)` - If configuration is invalid, or the database is
    ///   unreachable in fail-fast mode
    pub async fn new() -> Result<Self, SyncError> {
        Self::from_settings(Settings::from_env()?).await
    }

    /// Initialize all dependencies from explicit settings.
    pub async fn from_settings(settings: Settings) -> Result<Self, SyncError> {
        info!(
            cursor_id = %settings.cursor_id,
            batch_size = settings.batch_size,
            poll_interval_ms = settings.poll_interval.as_millis() as u64,
            write_timeout_secs = settings.write_timeout.as_secs(),
            concurrency = settings.concurrency,
            connection_mode = ?settings.connection_mode,
            retry_interval_secs = settings.retry_interval.as_secs(),
            "Initializing dependencies"
        );

        let pool = Self::connect_to_database(
            &settings.database_url,
            settings.connection_mode,
            settings.retry_interval,
        )
        .await?;

        info!("Database connection established");

        run_migrations(&pool).await?;

        info!("Database migrations applied");

        let store = Arc::new(PostgresDocumentStore::new(pool.clone()));
        let change_log = Arc::new(PostgresChangeLog::new(pool.clone()));
        let cursors = Arc::new(PostgresCursorRepository::new(pool));

        let applier = WriteApplier::with_config(
            store,
            LoaderConfig {
                write_timeout: Some(settings.write_timeout),
            },
        );
        let dispatcher = ReactionDispatcher::new(Arc::new(applier));

        let consumer = ChangeFeedConsumer::new(change_log, cursors, settings.cursor_id)
            .with_batch_size(settings.batch_size)
            .with_poll_interval(settings.poll_interval);

        let orchestrator = Orchestrator::with_config(
            Arc::new(consumer),
            Arc::new(dispatcher),
            OrchestratorConfig {
                concurrency: settings.concurrency,
                ..OrchestratorConfig::default()
            },
        );

        Ok(Self { orchestrator })
    }

    /// Connect to PostgreSQL with retry logic based on connection mode.
    async fn connect_to_database(
        url: &str,
        mode: ConnectionMode,
        retry_interval: Duration,
    ) -> Result<PgPool, SyncError> {
        loop {
            match PgPoolOptions::new()
                .max_connections(MAX_CONNECTIONS)
                .connect(url)
                .await
            {
                Ok(pool) => return Ok(pool),
                Err(e) => match mode {
                    ConnectionMode::FailFast => return Err(e.into()),
                    ConnectionMode::Retry => {
                        warn!(
                            error = %e,
                            retry_interval_secs = retry_interval.as_secs(),
                            "Failed to connect to database, retrying..."
                        );
                        sleep(retry_interval).await;
                    }
                },
            }
        }
    }
}
