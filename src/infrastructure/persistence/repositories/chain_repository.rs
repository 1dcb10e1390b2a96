//! Repository for chain operations

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::fmt;

use crate::domain::models::{Chain, ChainFilter, ChainPatch, Status, WORKER_UNCLAIMED};
use crate::infrastructure::persistence::entities::{chains, users_chains};
use crate::infrastructure::persistence::error::{is_duplicate_key, DbError};
use crate::infrastructure::persistence::repositories::helpers::{
    decode_base64, ext_ids_from_json, ext_ids_to_json, to_db_time, to_utc,
};

/// Repository for chain operations
#[derive(Clone)]
pub struct ChainRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for ChainRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainRepository").finish_non_exhaustive()
    }
}

impl ChainRepository {
    /// Create a new ChainRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub async fn get(&self, chain_id: &str) -> Result<Option<Chain>, DbError> {
        chains::Entity::find_by_id(chain_id.to_string())
            .one(&self.conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    /// Insert a chain; an existing row with the same id is left as is
    pub async fn create(&self, chain: &Chain) -> Result<(), DbError> {
        let now = Utc::now().fixed_offset();
        let model = chains::ActiveModel {
            chain_id: Set(chain.chain_id.clone()),
            ext_ids: Set(ext_ids_to_json(&chain.ext_ids)),
            content: Set(chain.content.as_ref().map(base64::encode)),
            status: Set(chain.status.to_string()),
            synced: Set(chain.synced),
            earliest_entry_block: Set(chain.earliest_entry_block.clone()),
            latest_entry_block: Set(chain.latest_entry_block.clone()),
            worker_id: Set(chain.worker_id),
            sent_to_pool: Set(chain.sent_to_pool),
            factom_time: Set(chain.factom_time.map(to_db_time)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write the fields present in `patch`
    pub async fn update(&self, chain_id: &str, patch: &ChainPatch) -> Result<(), DbError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut update = chains::Entity::update_many()
            .col_expr(chains::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()));

        if let Some(ext_ids) = &patch.ext_ids {
            update = update.col_expr(chains::Column::ExtIds, Expr::value(ext_ids_to_json(ext_ids)));
        }
        if let Some(status) = patch.status {
            update = update.col_expr(chains::Column::Status, Expr::value(status.to_string()));
        }
        if let Some(synced) = patch.synced {
            update = update.col_expr(chains::Column::Synced, Expr::value(synced));
        }
        if let Some(keymr) = &patch.earliest_entry_block {
            update = update.col_expr(chains::Column::EarliestEntryBlock, Expr::value(keymr.clone()));
        }
        if let Some(keymr) = &patch.latest_entry_block {
            update = update.col_expr(chains::Column::LatestEntryBlock, Expr::value(keymr.clone()));
        }
        if let Some(worker_id) = patch.worker_id {
            update = update.col_expr(chains::Column::WorkerId, Expr::value(worker_id));
        }
        if let Some(sent_to_pool) = patch.sent_to_pool {
            update = update.col_expr(chains::Column::SentToPool, Expr::value(sent_to_pool));
        }
        if let Some(factom_time) = patch.factom_time {
            update = update.col_expr(chains::Column::FactomTime, Expr::value(to_db_time(factom_time)));
        }

        update
            .filter(chains::Column::ChainId.eq(chain_id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    pub async fn find(&self, filter: &ChainFilter) -> Result<Vec<Chain>, DbError> {
        let mut query = chains::Entity::find();

        if let Some(status) = filter.status {
            query = query.filter(chains::Column::Status.eq(status.to_string()));
        }
        if let Some(synced) = filter.synced {
            query = query.filter(chains::Column::Synced.eq(synced));
        }
        if let Some(worker_id) = filter.worker_id {
            query = query.filter(chains::Column::WorkerId.eq(worker_id));
        }
        if let Some(sent_to_pool) = filter.sent_to_pool {
            query = query.filter(chains::Column::SentToPool.eq(sent_to_pool));
        }

        query
            .order_by_asc(chains::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    /// Flag an unclaimed unsynced chain as sent to the pool in a single statement.
    /// Returns false if another caller got there first.
    pub async fn claim_for_pool(&self, chain_id: &str) -> Result<bool, DbError> {
        let result = chains::Entity::update_many()
            .col_expr(chains::Column::SentToPool, Expr::value(true))
            .col_expr(chains::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(chains::Column::ChainId.eq(chain_id))
            .filter(chains::Column::Synced.eq(false))
            .filter(chains::Column::WorkerId.eq(WORKER_UNCLAIMED))
            .filter(chains::Column::SentToPool.eq(false))
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    /// Release every claim held on a chain that is not synced
    pub async fn reset_unsynced(&self) -> Result<u64, DbError> {
        let result = chains::Entity::update_many()
            .col_expr(chains::Column::WorkerId, Expr::value(WORKER_UNCLAIMED))
            .col_expr(chains::Column::SentToPool, Expr::value(false))
            .filter(
                Condition::any()
                    .add(chains::Column::Synced.eq(false))
                    .add(chains::Column::Synced.is_null()),
            )
            .exec(&self.conn)
            .await?;

        Ok(result.rows_affected)
    }

    /// Record that a user works with a chain; repeated bindings are no-ops
    pub async fn bind_to_user(&self, user_id: i32, chain_id: &str) -> Result<(), DbError> {
        let model = users_chains::ActiveModel {
            user_id: Set(user_id),
            chain_id: Set(chain_id.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Chains bound to a user, newest first.
    ///
    /// A non-empty `ext_ids` keeps only chains whose ext ids contain all of them.
    pub async fn find_for_user(
        &self,
        user_id: i32,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Chain>, DbError> {
        let bound = Query::select()
            .column(users_chains::Column::ChainId)
            .from(users_chains::Entity)
            .and_where(users_chains::Column::UserId.eq(user_id))
            .to_owned();

        let mut query = chains::Entity::find().filter(chains::Column::ChainId.in_subquery(bound));

        if !ext_ids.is_empty() {
            query = query.filter(Expr::cust_with_values(
                "chains.ext_ids::jsonb @> $1::jsonb",
                [ext_ids_to_json(ext_ids)],
            ));
        }
        if let Some(status) = status {
            query = query.filter(chains::Column::Status.eq(status.to_string()));
        }

        query
            .order_by_desc(chains::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

fn to_domain(model: chains::Model) -> Result<Chain, DbError> {
    Ok(Chain {
        ext_ids: ext_ids_from_json(&model.ext_ids)?,
        content: model.content.as_deref().map(decode_base64).transpose()?,
        status: model.status.parse().map_err(DbError::CorruptRow)?,
        synced: model.synced,
        earliest_entry_block: model.earliest_entry_block,
        latest_entry_block: model.latest_entry_block,
        worker_id: model.worker_id,
        sent_to_pool: model.sent_to_pool,
        factom_time: model.factom_time.map(to_utc),
        chain_id: model.chain_id,
    })
}
