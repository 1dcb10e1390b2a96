//! SeaORM Entity for queue table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "queue")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub action: String,
    /// Serialized queue params, also the deduplication key
    #[sea_orm(column_type = "Text")]
    pub params: String,
    #[sea_orm(column_name = "result")]
    pub ledger_result: Option<String>,
    #[sea_orm(column_name = "error", column_type = "Text", nullable)]
    pub last_error: Option<String>,
    pub try_count: i32,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub processed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "TimestampWithTimeZone", nullable)]
    pub next_try_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "TimestampWithTimeZone")]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
