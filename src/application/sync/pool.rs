//! Backfill worker pool
//!
//! A bounded job channel shared by a fixed set of workers. Each job fills the
//! full history of one chain through the [`EntryBlockWalker`]. Workers observe
//! cancellation only while waiting for a job; a running walk always finishes.

use std::fmt;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::sync::walker::EntryBlockWalker;
use crate::domain::errors::SyncError;
use crate::domain::models::{Chain, ChainPatch, Status, WORKER_FINISHED, ZERO_HASH};
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

/// A chain handed to the pool
#[derive(Debug, Clone)]
pub struct BackfillJob {
    pub chain: Chain,
}

/// What a finished job did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// History walked down to genesis
    Synced { blocks: usize },
    /// Another worker already finished the chain
    AlreadySynced,
}

/// Full-history backfill of a single chain
#[derive(Clone)]
pub struct Backfiller {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    walker: EntryBlockWalker,
}

impl fmt::Debug for Backfiller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backfiller")
            .field("walker", &self.walker)
            .finish_non_exhaustive()
    }
}

impl Backfiller {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>) -> Self {
        let walker = EntryBlockWalker::new(store.clone(), ledger.clone());
        Self {
            store,
            ledger,
            walker,
        }
    }

    /// Backfills a chain on behalf of `worker_id`.
    ///
    /// Resumes from `earliest_entry_block` when a previous walk was interrupted.
    /// Fails with [`SyncError::ChainNotReady`] while the chain has no entry block.
    pub async fn backfill(&self, worker_id: i32, chain_id: &str) -> Result<BackfillOutcome, SyncError> {
        self.store
            .update_chain(chain_id, &ChainPatch::new().worker_id(worker_id))
            .await?;

        let head = self.ledger.chain_head(chain_id).await?;
        let head_key_mr = match (&head.head, head.status()) {
            (Some(key_mr), Status::Completed) => key_mr.clone(),
            _ => return Err(SyncError::ChainNotReady(chain_id.to_string())),
        };

        let chain = match self.store.get_chain(chain_id).await? {
            Some(chain) => chain,
            None => Chain::discovered(chain_id, Status::Completed, Some(head_key_mr.clone())),
        };

        if chain.is_synced() {
            self.store
                .update_chain(chain_id, &ChainPatch::new().worker_id(WORKER_FINISHED))
                .await?;
            return Ok(BackfillOutcome::AlreadySynced);
        }

        let mut patch = ChainPatch::new();
        if chain.status != Status::Completed {
            patch = patch.status(Status::Completed);
        }
        if chain.latest_entry_block.is_none() {
            patch = patch.latest_entry_block(&head_key_mr);
        }
        self.store.update_chain(chain_id, &patch).await?;

        let from = chain.earliest_entry_block.unwrap_or(head_key_mr);
        let blocks = self.walker.walk(chain_id, &from, ZERO_HASH, true).await?;

        self.store
            .update_chain(chain_id, &ChainPatch::new().worker_id(WORKER_FINISHED))
            .await?;

        Ok(BackfillOutcome::Synced { blocks })
    }
}

/// Handle for submitting jobs to a running pool
#[derive(Debug, Clone)]
pub struct Dispatcher {
    sender: mpsc::Sender<BackfillJob>,
}

impl Dispatcher {
    pub fn new(sender: mpsc::Sender<BackfillJob>) -> Self {
        Self { sender }
    }

    /// Waits for channel capacity, then enqueues the job
    pub async fn submit(&self, job: BackfillJob) -> Result<(), SyncError> {
        self.sender.send(job).await.map_err(|_| SyncError::PoolClosed)
    }
}

pub struct WorkerPool {
    dispatcher: Dispatcher,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `workers` workers sharing one bounded job channel
    pub fn start(workers: usize, backfiller: Backfiller, cancel: CancellationToken) -> Self {
        let workers = workers.max(1);
        let (sender, receiver) = mpsc::channel(workers);
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id: id as i32,
                    backfiller: backfiller.clone(),
                    receiver: receiver.clone(),
                    cancel: cancel.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        logging::log_info(&format!("[POOL] 🚀 Started {} backfill workers", workers));

        Self {
            dispatcher: Dispatcher::new(sender),
            handles,
        }
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Closes the job channel and waits for every worker to exit
    pub async fn stop(self) {
        drop(self.dispatcher);
        for handle in self.handles {
            if let Err(e) = handle.await {
                logging::log_error(&format!("[POOL] Worker task failed: {}", e));
            }
        }
        logging::log_info("[POOL] 🛑 All workers stopped");
    }
}

struct Worker {
    id: i32,
    backfiller: Backfiller,
    receiver: Arc<Mutex<mpsc::Receiver<BackfillJob>>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        logging::log_debug(&format!("[WORKER {}] Waiting for jobs", self.id));

        while let Some(job) = self.next_job().await {
            self.handle(job).await;
        }

        logging::log_debug(&format!("[WORKER {}] Stopped", self.id));
    }

    async fn next_job(&self) -> Option<BackfillJob> {
        let mut receiver = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return None,
            receiver = self.receiver.lock() => receiver,
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            job = receiver.recv() => job,
        }
    }

    async fn handle(&self, job: BackfillJob) {
        let chain_id = job.chain.chain_id;
        logging::log_info(&format!("[WORKER {}] Syncing chain {}", self.id, chain_id));

        match self.backfiller.backfill(self.id, &chain_id).await {
            Ok(BackfillOutcome::Synced { blocks }) => logging::log_info(&format!(
                "[WORKER {}] ✅ Chain {} synced ({} entry blocks)",
                self.id, chain_id, blocks
            )),
            Ok(BackfillOutcome::AlreadySynced) => logging::log_debug(&format!(
                "[WORKER {}] Chain {} already synced",
                self.id, chain_id
            )),
            Err(e) => {
                match &e {
                    SyncError::ChainNotReady(_) => logging::log_debug(&format!(
                        "[WORKER {}] {}",
                        self.id, e
                    )),
                    _ => logging::log_error(&format!(
                        "[WORKER {}] ❌ Sync of chain {} failed: {}",
                        self.id, chain_id, e
                    )),
                }
                self.release(&chain_id).await;
            }
        }
    }

    async fn release(&self, chain_id: &str) {
        if let Err(e) = self
            .backfiller
            .store
            .update_chain(chain_id, &ChainPatch::release_claim())
            .await
        {
            logging::log_error(&format!(
                "[WORKER {}] Failed to release chain {}: {}",
                self.id, chain_id, e
            ));
        }
    }
}
