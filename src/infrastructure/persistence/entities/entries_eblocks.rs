//! SeaORM Entity for the entries <-> eblocks join table

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entries_eblocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entry_hash: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub key_mr: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
