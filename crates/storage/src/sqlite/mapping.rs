use chrono::{DateTime, Utc};
use sqlx::Row;
use walkthrough_core::model::{DrillKind, ScriptDraft};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn script_to_json(draft: &ScriptDraft) -> Result<String, StorageError> {
    serde_json::to_string(draft).map_err(ser)
}

pub(crate) fn script_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<ScriptDraft, StorageError> {
    let body: String = row.try_get("body").map_err(ser)?;
    serde_json::from_str(&body).map_err(ser)
}

pub(crate) fn completion_from_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<(DrillKind, DateTime<Utc>), StorageError> {
    let kind: String = row.try_get("drill_kind").map_err(ser)?;
    let kind = kind.parse::<DrillKind>().map_err(ser)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    Ok((kind, completed_at))
}
