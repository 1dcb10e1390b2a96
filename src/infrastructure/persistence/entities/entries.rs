//! SeaORM Entity for entries table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_hash: String,
    pub chain_id: String,
    /// JSON array of base64 strings
    pub ext_ids: Json,
    /// Base64 content
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub status: String,
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
