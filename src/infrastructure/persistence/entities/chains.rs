//! SeaORM Entity for chains table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chains")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chain_id: String,
    /// JSON array of base64 strings
    pub ext_ids: Json,
    /// Base64 first entry content
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub status: String,
    pub synced: Option<bool>,
    pub earliest_entry_block: Option<String>,
    pub latest_entry_block: Option<String>,
    pub worker_id: i32,
    pub sent_to_pool: bool,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub factom_time: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
