//! Repository for entry operations

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::fmt;

use crate::domain::models::{Entry, Status};
use crate::infrastructure::persistence::entities::entries;
use crate::infrastructure::persistence::error::{is_duplicate_key, DbError};
use crate::infrastructure::persistence::repositories::helpers::{
    decode_base64, ext_ids_from_json, ext_ids_to_json, to_db_time, to_utc,
};

/// Repository for entry operations
#[derive(Clone)]
pub struct EntryRepository {
    conn: DatabaseConnection,
}

impl fmt::Debug for EntryRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryRepository").finish_non_exhaustive()
    }
}

impl EntryRepository {
    /// Create a new EntryRepository
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, entry_hash: &str) -> Result<Option<Entry>, DbError> {
        entries::Entity::find_by_id(entry_hash.to_string())
            .one(&self.conn)
            .await?
            .map(to_domain)
            .transpose()
    }

    /// Insert an entry or refresh the stored copy. A completed status is kept.
    pub async fn upsert(&self, entry: &Entry) -> Result<(), DbError> {
        let now = Utc::now().fixed_offset();

        if let Some(existing) = entries::Entity::find_by_id(entry.entry_hash.clone())
            .one(&self.conn)
            .await?
        {
            let stored: Status = existing.status.parse().map_err(DbError::CorruptRow)?;
            let mut model: entries::ActiveModel = existing.into();
            model.status = Set(Status::merge(stored, entry.status).to_string());
            if let Some(factom_time) = entry.factom_time {
                model.factom_time = Set(Some(to_db_time(factom_time)));
            }
            model.updated_at = Set(now);
            model.update(&self.conn).await?;
            return Ok(());
        }

        let model = entries::ActiveModel {
            entry_hash: Set(entry.entry_hash.clone()),
            chain_id: Set(entry.chain_id.clone()),
            ext_ids: Set(ext_ids_to_json(&entry.ext_ids)),
            content: Set(base64::encode(&entry.content)),
            status: Set(entry.status.to_string()),
            factom_time: Set(entry.factom_time.map(to_db_time)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&self.conn).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Move an entry to `status` unless it is already completed
    pub async fn update_status(&self, entry_hash: &str, status: Status) -> Result<(), DbError> {
        entries::Entity::update_many()
            .col_expr(entries::Column::Status, Expr::value(status.to_string()))
            .col_expr(entries::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(entries::Column::EntryHash.eq(entry_hash))
            .filter(entries::Column::Status.ne(Status::Completed.to_string()))
            .exec(&self.conn)
            .await?;

        Ok(())
    }

    /// Entries of a chain, oldest first, with the total count
    pub async fn by_chain(
        &self,
        chain_id: &str,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<Entry>, u64), DbError> {
        let query = entries::Entity::find().filter(entries::Column::ChainId.eq(chain_id));

        let total = query.clone().count(&self.conn).await?;

        let rows = query
            .order_by_asc(entries::Column::FactomTime)
            .order_by_asc(entries::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    }

    /// Entries of a chain whose ext ids contain all of `ext_ids`, oldest first
    pub async fn search(
        &self,
        chain_id: &str,
        ext_ids: &[Vec<u8>],
        status: Option<Status>,
    ) -> Result<Vec<Entry>, DbError> {
        let mut query = entries::Entity::find()
            .filter(entries::Column::ChainId.eq(chain_id))
            .filter(Expr::cust_with_values(
                "entries.ext_ids::jsonb @> $1::jsonb",
                [ext_ids_to_json(ext_ids)],
            ));

        if let Some(status) = status {
            query = query.filter(entries::Column::Status.eq(status.to_string()));
        }

        query
            .order_by_asc(entries::Column::FactomTime)
            .order_by_asc(entries::Column::CreatedAt)
            .all(&self.conn)
            .await?
            .into_iter()
            .map(to_domain)
            .collect()
    }
}

fn to_domain(model: entries::Model) -> Result<Entry, DbError> {
    Ok(Entry {
        ext_ids: ext_ids_from_json(&model.ext_ids)?,
        content: decode_base64(&model.content)?,
        status: model.status.parse().map_err(DbError::CorruptRow)?,
        factom_time: model.factom_time.map(to_utc),
        entry_hash: model.entry_hash,
        chain_id: model.chain_id,
    })
}
