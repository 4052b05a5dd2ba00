use chrono::{DateTime, Utc};
use walkthrough_core::model::{LearnerId, MasteredEvent, ProgressRecord, ScriptId};

use super::SqliteRepository;
use super::mapping::{completion_from_row, conn};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(
        &self,
        learner_id: &LearnerId,
        script_id: &ScriptId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT drill_kind, completed_at FROM drill_completions
            WHERE learner_id = ?1 AND script_id = ?2
            ",
        )
        .bind(learner_id.as_str())
        .bind(script_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mastered_at: Option<DateTime<Utc>> = sqlx::query_scalar(
            r"
            SELECT mastered_at FROM script_mastery
            WHERE learner_id = ?1 AND script_id = ?2
            ",
        )
        .bind(learner_id.as_str())
        .bind(script_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        if rows.is_empty() && mastered_at.is_none() {
            return Ok(None);
        }

        let completions = rows
            .iter()
            .map(completion_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(ProgressRecord::from_persisted(
            learner_id.clone(),
            script_id.clone(),
            completions,
            mastered_at,
        )))
    }

    async fn save_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        for (kind, completed_at) in record.completions() {
            sqlx::query(
                r"
                INSERT INTO drill_completions (learner_id, script_id, drill_kind, completed_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(learner_id, script_id, drill_kind) DO NOTHING
                ",
            )
            .bind(record.learner_id().as_str())
            .bind(record.script_id().as_str())
            .bind(kind.as_str())
            .bind(completed_at)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn record_mastery(&self, event: &MasteredEvent) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO script_mastery (learner_id, script_id, mastered_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(learner_id, script_id) DO NOTHING
            ",
        )
        .bind(event.learner_id.as_str())
        .bind(event.script_id.as_str())
        .bind(event.mastered_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        tracing::info!(
            learner = %event.learner_id,
            script = %event.script_id,
            "recorded script mastery"
        );
        Ok(())
    }
}
