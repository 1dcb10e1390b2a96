use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::application::queue::{QueueCleaner, QueueProcessor};
use crate::application::sync::{Backfiller, UnsyncedChainScanner, UpdatePoller, WorkerPool};
use crate::config::AppConfig;
use crate::domain::services::QueueService;
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::infrastructure::wallet::Wallet;
use crate::utils::logging;

/// Owns every background task of the gateway
pub struct SyncManager {
    config: AppConfig,
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    wallet: Arc<dyn Wallet>,
    cancel: CancellationToken,
    pool: Option<WorkerPool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SyncManager {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        ledger: Arc<dyn LedgerClient>,
        wallet: Arc<dyn Wallet>,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            wallet,
            cancel: CancellationToken::new(),
            pool: None,
            tasks: Vec::new(),
        }
    }

    /// Token cancelled on shutdown or when the database goes away
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Queue service sharing this manager's store, ledger and wallet
    pub fn queue_service(&self) -> QueueService {
        QueueService::new(
            self.store.clone(),
            self.ledger.clone(),
            self.wallet.clone(),
            self.config.sync.queue_retry_delay,
        )
    }

    /// Start the worker pool, scanner, poller, queue loops and database watchdog
    pub fn start_all(&mut self) {
        let sync = self.config.sync.clone();

        let pool = WorkerPool::start(
            sync.workers,
            Backfiller::new(self.store.clone(), self.ledger.clone()),
            self.cancel.clone(),
        );

        let scanner =
            UnsyncedChainScanner::new(self.store.clone(), pool.dispatcher(), sync.scan_interval);
        self.spawn("scanner", scanner.run(self.cancel.clone()));
        self.pool = Some(pool);

        let poller = UpdatePoller::new(
            self.store.clone(),
            self.ledger.clone(),
            sync.minutes_per_block as i64,
        );
        self.spawn("poller", poller.run(self.cancel.clone()));

        let processor = QueueProcessor::new(self.queue_service(), sync.queue_process_interval);
        self.spawn("processor", processor.run(self.cancel.clone()));

        let cleaner = QueueCleaner::new(
            self.queue_service(),
            sync.queue_clear_interval,
            sync.queue_grace_period,
        );
        self.spawn("cleaner", cleaner.run(self.cancel.clone()));

        self.spawn(
            "database watchdog",
            watch_database(
                self.store.clone(),
                self.config.database.ping_interval,
                self.cancel.clone(),
            ),
        );

        logging::log_info("All background tasks started");
    }

    fn spawn<F>(&mut self, name: &'static str, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        self.tasks.push((name, tokio::spawn(task)));
    }

    /// Cancel every task and wait for it to finish its current step
    pub async fn stop_all(&mut self) {
        self.cancel.cancel();

        for (name, handle) in self.tasks.drain(..) {
            if let Err(e) = handle.await {
                logging::log_error(&format!("Task {} ended abnormally: {}", name, e));
            }
        }

        if let Some(pool) = self.pool.take() {
            pool.stop().await;
        }

        logging::log_info("All background tasks stopped");
    }
}

/// Pings the store until it fails, then cancels `cancel`
async fn watch_database(store: Arc<dyn Store>, interval: Duration, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if let Err(e) = store.ping().await {
            logging::log_error(&format!("Database connection lost: {}", e));
            cancel.cancel();
            return;
        }
    }
}
