//! Postgres adapters: pool set-up, schema bootstrap and repositories.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | Meaning |
//! |------------|----------------------|---------|
//! | Database | `23505` | unique violation (duplicate identifier) |
//! | Database | `23503` | foreign key violation (unknown principal) |
//! | Database | `23514` | check constraint violation (status / amount) |
//! | PoolClosed | N/A | connection pool was closed |
//! | Other | N/A | network errors, connection failures, etc. |
//!
//! All of them surface as the repository's storage error; the message keeps
//! the operation name and the code.

mod expenses;
mod principals;

pub use expenses::PostgresExpenseRepository;
pub use principals::PostgresPrincipalRepository;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, instrument};

const MAX_CONNECTIONS: u32 = 10;

/// Idempotent schema statements, applied in order.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS principals (
        user_id TEXT PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        password TEXT NOT NULL,
        department_id INTEGER NOT NULL,
        is_approver BOOLEAN NOT NULL DEFAULT FALSE
    )
    "#,
    "CREATE SEQUENCE IF NOT EXISTS expense_id_seq",
    r#"
    CREATE TABLE IF NOT EXISTS expenses (
        expense_id TEXT PRIMARY KEY,
        row_seq BIGINT GENERATED ALWAYS AS IDENTITY,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        amount NUMERIC NOT NULL CHECK (amount > 0),
        creator_id TEXT NOT NULL REFERENCES principals (user_id),
        approver_id TEXT NOT NULL REFERENCES principals (user_id),
        status TEXT NOT NULL CHECK (status IN ('draft', 'submitted', 'accepted', 'rejected')),
        created_at TIMESTAMPTZ NOT NULL,
        approved_at TIMESTAMPTZ,
        rejected_at TIMESTAMPTZ,
        rejection_reason TEXT
    )
    "#,
    "CREATE INDEX IF NOT EXISTS expenses_creator_idx ON expenses (creator_id)",
    "CREATE INDEX IF NOT EXISTS expenses_approver_idx ON expenses (approver_id)",
];

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Create the tables and the expense identifier sequence if missing.
#[instrument(skip(pool), err)]
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    info!("database schema ready");
    Ok(())
}

fn describe_sqlx_error(operation: &str, err: sqlx::Error) -> String {
    match err {
        sqlx::Error::Database(db_err) => match db_err.code() {
            Some(code) => format!("database error in {operation} ({code}): {}", db_err.message()),
            None => format!("database error in {operation}: {}", db_err.message()),
        },
        sqlx::Error::PoolClosed => format!("connection pool closed in {operation}"),
        other => format!("sqlx error in {operation}: {other}"),
    }
}

/// Throwaway schemas for tests that need a real Postgres.
#[cfg(test)]
pub(crate) mod scratch {
    use chrono::Utc;
    use sqlx::postgres::PgPoolOptions;
    use sqlx::{Executor, PgPool};

    pub(crate) struct ScratchSchema {
        pub(crate) pool: PgPool,
        admin: PgPool,
        name: String,
    }

    impl ScratchSchema {
        /// Migrated schema of its own, or `None` when `DATABASE_URL` is unset.
        pub(crate) async fn create(label: &str) -> Option<Self> {
            let url = std::env::var("DATABASE_URL").ok()?;
            let name = format!(
                "eg_{label}_{}_{}",
                std::process::id(),
                Utc::now().timestamp_subsec_nanos()
            );

            let admin = super::connect(&url).await.expect("connect to DATABASE_URL");
            admin
                .execute(format!("CREATE SCHEMA {name}").as_str())
                .await
                .expect("create scratch schema");

            let search_path = format!("SET search_path TO {name}");
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .after_connect(move |conn, _meta| {
                    let sql = search_path.clone();
                    Box::pin(async move {
                        conn.execute(sql.as_str()).await?;
                        Ok(())
                    })
                })
                .connect(&url)
                .await
                .expect("connect scratch pool");
            super::migrate(&pool).await.expect("migrate scratch schema");

            Some(Self { pool, admin, name })
        }

        pub(crate) async fn drop_schema(self) {
            self.pool.close().await;
            self.admin
                .execute(format!("DROP SCHEMA {} CASCADE", self.name).as_str())
                .await
                .expect("drop scratch schema");
        }
    }
}
