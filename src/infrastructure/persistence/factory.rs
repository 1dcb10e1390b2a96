use sea_orm::DatabaseConnection;

use crate::infrastructure::persistence::connection::DbPool;
use crate::infrastructure::persistence::repositories::{
    ChainRepository, EBlockRepository, EntryRepository, QueueRepository, Repositories,
};

/// Factory for creating repositories
pub struct RepositoryFactory;

impl RepositoryFactory {
    /// Create all repositories
    pub fn create_repositories(db_pool: &DbPool) -> Repositories {
        let conn = db_pool.get_connection().clone();

        Repositories::new(
            Self::create_chain_repository(conn.clone()),
            Self::create_entry_repository(conn.clone()),
            Self::create_eblock_repository(conn.clone()),
            Self::create_queue_repository(conn),
        )
    }

    /// Create a chain repository
    pub fn create_chain_repository(conn: DatabaseConnection) -> ChainRepository {
        ChainRepository::new(conn)
    }

    /// Create an entry repository
    pub fn create_entry_repository(conn: DatabaseConnection) -> EntryRepository {
        EntryRepository::new(conn)
    }

    /// Create an entry block repository
    pub fn create_eblock_repository(conn: DatabaseConnection) -> EBlockRepository {
        EBlockRepository::new(conn)
    }

    /// Create a queue repository
    pub fn create_queue_repository(conn: DatabaseConnection) -> QueueRepository {
        QueueRepository::new(conn)
    }
}
