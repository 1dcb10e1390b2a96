pub mod cleaner;
pub mod processor;

pub use cleaner::QueueCleaner;
pub use processor::QueueProcessor;
