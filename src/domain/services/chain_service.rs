use std::fmt;
use std::sync::Arc;

use crate::domain::errors::{ModelError, ServiceError};
use crate::domain::models::{entry, Chain, Entry, QueueAction, QueueParams, Status};
use crate::domain::services::queue_service::QueueService;
use crate::infrastructure::factom::LedgerClient;
use crate::infrastructure::persistence::Store;
use crate::utils::logging;

/// A chain accepted for writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedChain {
    pub chain: Chain,
    pub first_entry_hash: String,
}

/// One page of a chain's entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPage {
    pub entries: Vec<Entry>,
    pub total: u64,
}

/// Client-facing chain reads and writes
#[derive(Clone)]
pub struct ChainService {
    store: Arc<dyn Store>,
    ledger: Arc<dyn LedgerClient>,
    queue: QueueService,
}

impl fmt::Debug for ChainService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainService")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl ChainService {
    pub fn new(store: Arc<dyn Store>, ledger: Arc<dyn LedgerClient>, queue: QueueService) -> Self {
        Self {
            store,
            ledger,
            queue,
        }
    }

    /// Stores a new chain with its first entry and queues the ledger write
    pub async fn create_chain(
        &self,
        ext_ids: Vec<Vec<u8>>,
        content: Vec<u8>,
        user_id: i32,
    ) -> Result<CreatedChain, ServiceError> {
        entry::ensure_fits(&ext_ids, &content)?;

        let chain = Chain::new_local(ext_ids.clone(), content.clone());
        let first = Entry::new(&chain.chain_id, ext_ids, content, Status::Queue)?
            .with_factom_time(chain.factom_time);

        if self.ledger.chain_head(&chain.chain_id).await?.exists() {
            logging::log_warning(&format!(
                "Chain {} already exists on Factom",
                chain.chain_id
            ));
            return Err(ServiceError::ChainExists(chain.chain_id));
        }

        if self.store.get_chain(&chain.chain_id).await?.is_some() {
            logging::log_warning(&format!(
                "Chain {} already in local database",
                chain.chain_id
            ));
            return Err(ServiceError::ChainExists(chain.chain_id));
        }

        self.store.create_chain(&chain).await?;
        self.store.upsert_entry(&first).await?;
        self.queue
            .add_to_queue(user_id, QueueAction::Chain, &QueueParams::from_chain(&chain))
            .await?;

        logging::log_info(&format!("Chain {} queued for creation", chain.chain_id));
        bind_chain_to_user(self.store.as_ref(), user_id, &chain.chain_id).await;

        Ok(CreatedChain {
            chain,
            first_entry_hash: first.entry_hash,
        })
    }

    /// Local chain, or the ledger's copy registered for backfill and bound to `user_id`
    pub async fn get_chain(
        &self,
        chain_id: &str,
        user_id: i32,
    ) -> Result<Option<Chain>, ServiceError> {
        if let Some(chain) = self.store.get_chain(chain_id).await? {
            return Ok(Some(chain));
        }

        let registered =
            register_ledger_chain(self.store.as_ref(), self.ledger.as_ref(), chain_id).await?;
        if registered.is_some() {
            bind_chain_to_user(self.store.as_ref(), user_id, chain_id).await;
        }
        Ok(registered)
    }

    /// Chains bound to a user, optionally only those in `status`
    pub async fn user_chains(
        &self,
        user_id: i32,
        status: Option<Status>,
    ) -> Result<Vec<Chain>, ServiceError> {
        Ok(self.store.user_chains(user_id, &[], status).await?)
    }

    /// A user's chains whose ext ids contain all of `ext_ids`
    pub async fn search_chains(
        &self,
        user_id: i32,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Chain>, ServiceError> {
        if ext_ids.is_empty() {
            return Err(ModelError::MissingExtIds.into());
        }

        Ok(self.store.user_chains(user_id, ext_ids, status).await?)
    }

    /// Locally mirrored entries of a chain
    pub async fn get_chain_entries(
        &self,
        chain_id: &str,
        limit: u64,
        offset: u64,
        user_id: i32,
    ) -> Result<EntryPage, ServiceError> {
        if self.get_chain(chain_id, user_id).await?.is_none() {
            return Err(ServiceError::ChainNotFound(chain_id.to_string()));
        }

        let (entries, total) = self.store.chain_entries(chain_id, limit, offset).await?;
        Ok(EntryPage { entries, total })
    }

    /// Mirrored entries of a chain whose ext ids contain all of `ext_ids`
    pub async fn search_chain_entries(
        &self,
        chain_id: &str,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
        user_id: i32,
    ) -> Result<Vec<Entry>, ServiceError> {
        if ext_ids.is_empty() {
            return Err(ModelError::MissingExtIds.into());
        }

        if self.get_chain(chain_id, user_id).await?.is_none() {
            return Err(ServiceError::ChainNotFound(chain_id.to_string()));
        }

        Ok(self
            .store
            .search_chain_entries(chain_id, ext_ids, status)
            .await?)
    }
}

/// Stores a chain known to the ledger but not locally. The scanner picks it
/// up for backfill. Returns `None` if the ledger does not know it either.
pub(crate) async fn register_ledger_chain(
    store: &dyn Store,
    ledger: &dyn LedgerClient,
    chain_id: &str,
) -> Result<Option<Chain>, ServiceError> {
    let head = ledger.chain_head(chain_id).await?;
    if !head.exists() {
        return Ok(None);
    }

    logging::log_debug(&format!(
        "Chain {} found on Factom, registering for sync",
        chain_id
    ));

    let chain = Chain::discovered(chain_id, head.status(), head.head.clone());
    store.create_chain(&chain).await?;

    Ok(store.get_chain(chain_id).await?.or(Some(chain)))
}

/// Binds a chain to a user. Failures are logged and otherwise ignored.
pub(crate) async fn bind_chain_to_user(store: &dyn Store, user_id: i32, chain_id: &str) {
    if let Err(e) = store.bind_chain_to_user(user_id, chain_id).await {
        logging::log_error(&format!(
            "Binding chain {} to user {} failed: {}",
            chain_id, user_id, e
        ));
    }
}
