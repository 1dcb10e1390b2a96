pub mod chain_repository;
pub mod eblock_repository;
pub mod entry_repository;
mod helpers;
pub mod queue_repository;

pub use chain_repository::ChainRepository;
pub use eblock_repository::EBlockRepository;
pub use entry_repository::EntryRepository;
pub use queue_repository::QueueRepository;

/// Collection of all repositories
#[derive(Clone, Debug)]
pub struct Repositories {
    /// Repository for chain operations
    pub chain: ChainRepository,
    /// Repository for entry operations
    pub entry: EntryRepository,
    /// Repository for entry block operations
    pub eblock: EBlockRepository,
    /// Repository for write queue operations
    pub queue: QueueRepository,
}

impl Repositories {
    /// Create a new Repositories instance
    pub fn new(
        chain: ChainRepository,
        entry: EntryRepository,
        eblock: EBlockRepository,
        queue: QueueRepository,
    ) -> Self {
        Self {
            chain,
            entry,
            eblock,
            queue,
        }
    }
}
