pub mod queue;
pub mod sync;
pub mod sync_manager;

pub use sync_manager::SyncManager;
