use anyhow::{Context, Result};
use log::{debug, info};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema};

use crate::config::is_plain_identifier;
use crate::entities::{board, task, user};

/// Database handle owned by a single sync run
pub struct Store {
    pub(crate) conn: DatabaseConnection,
    schema: String,
}

impl Store {
    /// Open a single-connection pool to the given database.
    ///
    /// On Postgres the connection's search path is set to `schema`, so every
    /// unqualified table name resolves inside it. Other backends ignore the
    /// schema name.
    pub async fn connect(database_url: &str, schema: &str) -> Result<Self> {
        if !is_plain_identifier(schema) {
            anyhow::bail!("Schema name '{}' is not a valid SQL identifier", schema);
        }

        let mut options = ConnectOptions::new(database_url.to_string());
        options.max_connections(1).min_connections(1).sqlx_logging(false);
        if database_url.starts_with("postgres") {
            options.set_schema_search_path(schema.to_string());
        }

        let conn = Database::connect(options)
            .await
            .context("Failed to connect to database")?;
        debug!("Connected to {:?} database", conn.get_database_backend());

        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }

    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Create the schema and its tables if they do not exist yet.
    ///
    /// Safe to call on every run; existing tables and rows are left alone.
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();

        if backend == DatabaseBackend::Postgres {
            self.conn
                .execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", self.schema))
                .await
                .with_context(|| format!("Failed to create schema '{}'", self.schema))?;
        }

        let schema = Schema::new(backend);

        // Referenced tables first so the task foreign keys resolve
        let mut boards = schema.create_table_from_entity(board::Entity);
        let mut users = schema.create_table_from_entity(user::Entity);
        let mut tasks = schema.create_table_from_entity(task::Entity);

        for stmt in [boards.if_not_exists(), users.if_not_exists(), tasks.if_not_exists()] {
            self.conn
                .execute(backend.build(&*stmt))
                .await
                .context("Failed to create tables")?;
        }

        info!("✅ Schema '{}' is ready", self.schema);
        Ok(())
    }

    /// Close the underlying connection pool.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await.context("Failed to close database connection")
    }
}
