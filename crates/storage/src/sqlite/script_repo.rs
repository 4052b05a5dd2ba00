use chrono::Utc;
use walkthrough_core::model::{OrgId, ScriptDraft, ScriptId};

use super::SqliteRepository;
use super::mapping::{conn, ser, script_from_row, script_to_json};
use crate::repository::{ScriptRepository, StorageError, class_code_of};

#[async_trait::async_trait]
impl ScriptRepository for SqliteRepository {
    async fn org_script(
        &self,
        org_id: &OrgId,
        script_id: &ScriptId,
    ) -> Result<Option<ScriptDraft>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT body FROM org_scripts
            WHERE org_id = ?1 AND class_code = ?2
            ",
        )
        .bind(org_id.as_str())
        .bind(script_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(script_from_row).transpose()
    }

    async fn default_script(
        &self,
        script_id: &ScriptId,
    ) -> Result<Option<ScriptDraft>, StorageError> {
        let row = sqlx::query("SELECT body FROM default_scripts WHERE class_code = ?1")
            .bind(script_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(script_from_row).transpose()
    }

    async fn upsert_org_script(
        &self,
        org_id: &OrgId,
        draft: &ScriptDraft,
    ) -> Result<(), StorageError> {
        let class_code = class_code_of(draft)?;
        let body = script_to_json(draft)?;

        sqlx::query(
            r"
            INSERT INTO org_scripts (org_id, class_code, body, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(org_id, class_code) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(org_id.as_str())
        .bind(class_code.as_str())
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        tracing::debug!(org = %org_id, class_code = %class_code, "stored org script");
        Ok(())
    }

    async fn upsert_default_script(&self, draft: &ScriptDraft) -> Result<(), StorageError> {
        let class_code = class_code_of(draft)?;
        let body = script_to_json(draft)?;

        sqlx::query(
            r"
            INSERT INTO default_scripts (class_code, body, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(class_code) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            ",
        )
        .bind(class_code.as_str())
        .bind(body)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        tracing::debug!(class_code = %class_code, "stored default script");
        Ok(())
    }

    async fn class_codes(&self, org_id: Option<&OrgId>) -> Result<Vec<ScriptId>, StorageError> {
        let codes: Vec<String> = sqlx::query_scalar(
            r"
            SELECT class_code FROM default_scripts
            UNION
            SELECT class_code FROM org_scripts WHERE org_id = ?1
            ORDER BY class_code ASC
            ",
        )
        .bind(org_id.map(OrgId::as_str))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        codes
            .iter()
            .map(|code| code.parse::<ScriptId>().map_err(ser))
            .collect()
    }
}
