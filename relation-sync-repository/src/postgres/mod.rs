//! PostgreSQL implementations of the relation sync repository interfaces.

mod change_log;
mod cursor_repository;
mod document_store;

pub use change_log::PostgresChangeLog;
pub use cursor_repository::PostgresCursorRepository;
pub use document_store::PostgresDocumentStore;

/// Apply the bundled schema migrations.
pub async fn run_migrations(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("src/postgres/migrations").run(pool).await
}
