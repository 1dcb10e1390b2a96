pub mod poller;
pub mod pool;
pub mod scanner;
pub mod walker;

pub use poller::{next_sleep_minutes, PollSummary, UpdatePoller};
pub use pool::{BackfillJob, BackfillOutcome, Backfiller, Dispatcher, WorkerPool};
pub use scanner::UnsyncedChainScanner;
pub use walker::EntryBlockWalker;
