//! Repository for the durable write queue

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::fmt;

use crate::domain::models::{NewQueueItem, QueueAction, QueueItem, QueueItemPatch};
use crate::infrastructure::persistence::entities::queue;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::persistence::repositories::helpers::{to_db_time, to_utc};

/// Repository for the durable write queue
#[derive(Clone)]
pub struct QueueRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for QueueRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueRepository").finish_non_exhaustive()
    }
}

impl QueueRepository {
    /// Create a new QueueRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// An item with identical user, action and params, if one is queued
    pub async fn find_matching(
        &self,
        user_id: i32,
        action: QueueAction,
        params: &str,
    ) -> Result<Option<QueueItem>, DbError> {
        queue::Entity::find()
            .filter(queue::Column::UserId.eq(user_id))
            .filter(queue::Column::Action.eq(action.as_str()))
            .filter(queue::Column::Params.eq(params))
            .one(&self.conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    pub async fn create(&self, item: &NewQueueItem) -> Result<QueueItem, DbError> {
        let model = queue::ActiveModel {
            user_id: Set(item.user_id),
            action: Set(item.action.to_string()),
            params: Set(item.params.clone()),
            ledger_result: Set(None),
            last_error: Set(None),
            try_count: Set(0),
            processed_at: Set(None),
            next_try_at: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
            ..Default::default()
        };

        to_domain(model.insert(&self.conn).await?)
    }

    pub async fn update(&self, id: i32, patch: &QueueItemPatch) -> Result<(), DbError> {
        if patch == &QueueItemPatch::default() {
            return Ok(());
        }

        let mut update = queue::Entity::update_many();

        if let Some(result) = &patch.result {
            update = update.col_expr(queue::Column::LedgerResult, Expr::value(result.clone()));
        }
        if let Some(error) = &patch.error {
            update = update.col_expr(queue::Column::LastError, Expr::value(error.clone()));
        }
        if let Some(try_count) = patch.try_count {
            update = update.col_expr(queue::Column::TryCount, Expr::value(try_count));
        }
        if let Some(processed_at) = patch.processed_at {
            update = update.col_expr(queue::Column::ProcessedAt, Expr::value(to_db_time(processed_at)));
        }
        if let Some(next_try_at) = patch.next_try_at {
            update = update.col_expr(queue::Column::NextTryAt, Expr::value(to_db_time(next_try_at)));
        }

        update
            .filter(queue::Column::Id.eq(id))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Unprocessed items whose backoff has elapsed, oldest first
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        queue::Entity::find()
            .filter(queue::Column::ProcessedAt.is_null())
            .filter(
                Condition::any()
                    .add(queue::Column::NextTryAt.is_null())
                    .add(queue::Column::NextTryAt.lt(to_db_time(now))),
            )
            .order_by_asc(queue::Column::Id)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    /// Processed items with a result that were processed before `before`
    pub async fn to_clear(&self, before: DateTime<Utc>) -> Result<Vec<QueueItem>, DbError> {
        queue::Entity::find()
            .filter(queue::Column::LedgerResult.is_not_null())
            .filter(queue::Column::ProcessedAt.lt(to_db_time(before)))
            .order_by_asc(queue::Column::Id)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    /// Every row a user has queued, newest first
    pub async fn by_user(&self, user_id: i32) -> Result<Vec<QueueItem>, DbError> {
        queue::Entity::find()
            .filter(queue::Column::UserId.eq(user_id))
            .order_by_desc(queue::Column::Id)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }

    pub async fn delete(&self, id: i32) -> Result<(), DbError> {
        queue::Entity::delete_by_id(id).exec(&self.conn).await?;
        Ok(())
    }
}

fn to_domain(model: queue::Model) -> Result<QueueItem, DbError> {
    Ok(QueueItem {
        id: model.id,
        user_id: model.user_id,
        action: model.action.parse().map_err(DbError::CorruptRow)?,
        params: model.params,
        result: model.ledger_result,
        error: model.last_error,
        try_count: model.try_count,
        processed_at: model.processed_at.map(to_utc),
        next_try_at: model.next_try_at.map(to_utc),
        created_at: to_utc(model.created_at),
    })
}
