//! Database module for SQLite persistence.
//!
//! SQLite backs the generic [`DataStore`] the dashboard talks to.

mod schema;
mod store;

pub use schema::*;
pub use store::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            full_name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            twitter_handle TEXT NOT NULL DEFAULT '',
            product_website TEXT NOT NULL DEFAULT '',
            codename TEXT NOT NULL DEFAULT '',
            punchline TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            logo_src TEXT NOT NULL DEFAULT '',
            user_id TEXT NOT NULL DEFAULT '',
            categories TEXT,
            tags TEXT,
            labels TEXT,
            approved INTEGER NOT NULL DEFAULT 0,
            archived INTEGER
        );
        "#,
    )
    .execute(pool)
    .await?;

    for table in ["categories", "labels", "tags"] {
        let icon_column = if table == "categories" {
            "icon TEXT,"
        } else {
            ""
        };
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                {icon_column}
                created_at TEXT NOT NULL
            );
            "#
        );
        sqlx::query(&ddl).execute(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            avatar_url TEXT,
            billing_address TEXT,
            payment_method TEXT,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            claims_admin INTEGER NOT NULL DEFAULT 0,
            expires_at TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at);
        CREATE INDEX IF NOT EXISTS idx_products_approved ON products(approved);
        CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at);
        CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
