use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::config::DatabaseConfig;
use crate::infrastructure::persistence::error::DbError;
use crate::utils::logging;

/// Connection pool of the local chain mirror
pub struct DbPool {
    connection: DatabaseConnection,
}

impl DbPool {
    /// Opens the pool and checks the database answers before the sync loops start
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DbError> {
        logging::log_database_connection_details(&config.url);

        let mut options = ConnectOptions::new(config.url.clone());
        options
            .max_connections(config.max_connections)
            .connect_timeout(config.connect_timeout)
            .acquire_timeout(config.connect_timeout)
            .sqlx_logging(false);

        let connection = Database::connect(options).await.map_err(|e| {
            logging::log_error(&format!("[DB] Mirror database unreachable: {}", e));
            DbError::Unavailable(e.to_string())
        })?;

        let pool = DbPool { connection };
        pool.ping().await?;

        logging::log_info(&format!(
            "[DB] ✅ Mirror database ready (pool of {})",
            config.max_connections
        ));
        Ok(pool)
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.connection
            .ping()
            .await
            .map_err(|e| DbError::Unavailable(e.to_string()))
    }

    pub fn get_connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}
