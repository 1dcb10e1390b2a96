pub mod connection;
pub mod entities;
pub mod error;
pub mod factory;
pub mod repositories;
pub mod store;

pub use connection::DbPool;
pub use error::DbError;
pub use factory::RepositoryFactory;
pub use repositories::Repositories;
pub use store::Store;
