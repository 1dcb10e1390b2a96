//! Column encodings shared by the repositories

use chrono::{DateTime, FixedOffset, Utc};
use sea_orm::prelude::Json;

use crate::infrastructure::persistence::error::DbError;

pub fn ext_ids_to_json(ext_ids: &[Vec<u8>]) -> Json {
    Json::Array(
        ext_ids
            .iter()
            .map(|id| Json::String(base64::encode(id)))
            .collect(),
    )
}

pub fn ext_ids_from_json(value: &Json) -> Result<Vec<Vec<u8>>, DbError> {
    let items = value
        .as_array()
        .ok_or_else(|| DbError::CorruptRow("ext_ids is not an array".to_string()))?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .ok_or_else(|| DbError::CorruptRow("ext_id is not a string".to_string()))
                .and_then(decode_base64)
        })
        .collect()
}

pub fn decode_base64(value: &str) -> Result<Vec<u8>, DbError> {
    base64::decode(value).map_err(|e| DbError::CorruptRow(format!("invalid base64: {}", e)))
}

pub fn to_utc(value: DateTime<FixedOffset>) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

pub fn to_db_time(value: DateTime<Utc>) -> DateTime<FixedOffset> {
    value.fixed_offset()
}
