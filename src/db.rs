use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::Result;

/// Categories every database starts with
pub const DEFAULT_CATEGORIES: &[(i64, &str)] = &[
    (1, "Cleaning"),
    (2, "Woodwork"),
    (3, "Gardening"),
    (4, "Decorating"),
    (5, "Plumbing"),
    (6, "Access"),
];

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the SQLite database file at `path`
    pub async fn new(path: &str) -> Result<Self> {
        Self::connect(&format!("sqlite:{}?mode=rwc", path), 5).await
    }

    /// Connect to any SQLite URL
    ///
    /// An in-memory database lives per connection, so `sqlite::memory:` needs
    /// `max_connections == 1`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tool_category (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tool (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                hire_price REAL NOT NULL,
                tool_category_id INTEGER NOT NULL,
                image TEXT NOT NULL,
                FOREIGN KEY (tool_category_id) REFERENCES tool_category(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tool_description ON tool(description)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tool_image ON tool(image)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tool_category_id ON tool(tool_category_id)")
            .execute(&self.pool)
            .await?;

        // Existing rows win, so renamed categories survive restarts
        for &(id, name) in DEFAULT_CATEGORIES {
            sqlx::query("INSERT OR IGNORE INTO tool_category (id, name) VALUES (?, ?)")
                .bind(id)
                .bind(name)
                .execute(&self.pool)
                .await?;
        }

        tracing::info!("Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Fresh in-memory database with the schema and default categories
    pub(crate) async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:", 1).await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let db = test_db().await;
        db.run_migrations().await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tool_category")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, DEFAULT_CATEGORIES.len() as i64);
    }

    #[tokio::test]
    async fn test_seed_keeps_existing_names() {
        let db = test_db().await;
        sqlx::query("UPDATE tool_category SET name = 'Joinery' WHERE id = 2")
            .execute(db.pool())
            .await
            .unwrap();
        db.run_migrations().await.unwrap();

        let (name,): (String,) = sqlx::query_as("SELECT name FROM tool_category WHERE id = 2")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(name, "Joinery");
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let db = test_db().await;
        let res = sqlx::query(
            "INSERT INTO tool (description, hire_price, tool_category_id, image) VALUES ('x', 1.0, 99, 'img')",
        )
        .execute(db.pool())
        .await;
        assert!(res.is_err());
    }
}
