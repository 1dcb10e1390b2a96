use std::fmt;
use std::sync::Arc;

use crate::domain::errors::ServiceError;
use crate::domain::models::{entry, Entry, QueueAction, QueueParams, Status};
use crate::domain::services::chain_service::{bind_chain_to_user, register_ledger_chain};
use crate::domain::services::queue_service::QueueService;
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

/// Client-facing entry reads and writes
#[derive(Clone)]
pub struct EntryService {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    queue: QueueService,
}

impl fmt::Debug for EntryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryService")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl EntryService {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>, queue: QueueService) -> Self {
        Self {
            store,
            ledger,
            queue,
        }
    }

    /// Stores an entry into an existing chain and queues the ledger write.
    ///
    /// Submitting the same entry again returns the stored copy and its status.
    pub async fn create_entry(
        &self,
        chain_id: &str,
        ext_ids: Vec<Vec<u8>>,
        content: Vec<u8>,
        user_id: i32,
    ) -> Result<Entry, ServiceError> {
        entry::ensure_fits(&ext_ids, &content)?;
        let mut entry = Entry::new(chain_id, ext_ids, content, Status::Queue)?;

        if self.store.get_chain(chain_id).await?.is_none() {
            logging::log_debug(&format!("Chain {} not found in local database", chain_id));

            if register_ledger_chain(self.store.as_ref(), self.ledger.as_ref(), chain_id)
                .await?
                .is_none()
            {
                logging::log_warning(&format!("Chain {} not found on Factom", chain_id));
                return Err(ServiceError::ChainNotFound(chain_id.to_string()));
            }
        }

        match self.store.get_entry(&entry.entry_hash).await? {
            Some(stored) => {
                logging::log_debug(&format!(
                    "Entry {} already in local database",
                    entry.entry_hash
                ));
                entry.status = stored.status;
                entry.factom_time = stored.factom_time;
            }
            None => self.store.upsert_entry(&entry).await?,
        }

        self.queue
            .add_to_queue(user_id, QueueAction::Entry, &QueueParams::from_entry(&entry))
            .await?;
        bind_chain_to_user(self.store.as_ref(), user_id, chain_id).await;

        Ok(entry)
    }

    /// Local entry, or the ledger's copy stored as completed. A ledger hit also
    /// binds its chain to `user_id`.
    pub async fn get_entry(
        &self,
        entry_hash: &str,
        user_id: i32,
    ) -> Result<Option<Entry>, ServiceError> {
        if let Some(entry) = self.store.get_entry(entry_hash).await? {
            return Ok(Some(entry));
        }

        let fetched = match self.ledger.entry(entry_hash).await {
            Ok(fetched) => fetched,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        logging::log_debug(&format!("Entry {} found on Factom", entry_hash));

        let entry = Entry {
            entry_hash: entry_hash.to_string(),
            chain_id: fetched.chain_id,
            ext_ids: fetched.ext_ids,
            content: fetched.content,
            status: Status::Completed,
            factom_time: None,
        };

        if self.store.get_chain(&entry.chain_id).await?.is_none() {
            register_ledger_chain(self.store.as_ref(), self.ledger.as_ref(), &entry.chain_id)
                .await?;
        }
        bind_chain_to_user(self.store.as_ref(), user_id, &entry.chain_id).await;
        self.store.upsert_entry(&entry).await?;

        Ok(Some(entry))
    }
}
