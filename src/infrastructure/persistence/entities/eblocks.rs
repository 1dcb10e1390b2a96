//! SeaORM Entity for eblocks table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "eblocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key_mr: String,
    pub chain_id: String,
    pub prev_key_mr: String,
    pub timestamp: i64,
    pub db_height: i64,
    pub block_sequence_number: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
