use course_core::model::{CourseId, LessonProgress, ProgressKey, ProgressWrite, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_progress_row, write_err};
use crate::repository::{LessonProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = "user_id, lesson_id, course_id, watched_seconds, total_seconds, is_completed, completed_at, last_watched_at";

// Ticks never touch the completion columns of an existing row.
const UPSERT_TICK: &str = r"
    INSERT INTO lesson_progress (user_id, lesson_id, course_id, watched_seconds, total_seconds, is_completed, completed_at, last_watched_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, ?6)
    ON CONFLICT(user_id, lesson_id) DO UPDATE SET
        course_id = excluded.course_id,
        watched_seconds = excluded.watched_seconds,
        total_seconds = excluded.total_seconds,
        last_watched_at = excluded.last_watched_at
    RETURNING user_id, lesson_id, course_id, watched_seconds, total_seconds, is_completed, completed_at, last_watched_at
";

const UPSERT_COMPLETE: &str = r"
    INSERT INTO lesson_progress (user_id, lesson_id, course_id, watched_seconds, total_seconds, is_completed, completed_at, last_watched_at)
    VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?6)
    ON CONFLICT(user_id, lesson_id) DO UPDATE SET
        course_id = excluded.course_id,
        watched_seconds = excluded.watched_seconds,
        total_seconds = excluded.total_seconds,
        is_completed = 1,
        completed_at = excluded.completed_at,
        last_watched_at = excluded.last_watched_at
    RETURNING user_id, lesson_id, course_id, watched_seconds, total_seconds, is_completed, completed_at, last_watched_at
";

#[async_trait::async_trait]
impl LessonProgressRepository for SqliteRepository {
    async fn upsert_progress(
        &self,
        key: ProgressKey,
        write: ProgressWrite,
    ) -> Result<LessonProgress, StorageError> {
        let sql = if write.is_completion() {
            UPSERT_COMPLETE
        } else {
            UPSERT_TICK
        };

        let row = sqlx::query(sql)
            .bind(key.user_id.as_uuid())
            .bind(id_to_i64("lesson_id", key.lesson_id.value())?)
            .bind(id_to_i64("course_id", write.course_id().value())?)
            .bind(i64::from(write.watched_seconds()))
            .bind(i64::from(write.total_seconds()))
            .bind(write.at())
            .fetch_one(&self.pool)
            .await
            .map_err(write_err)?;

        map_progress_row(&row)
    }

    async fn get_progress(&self, key: ProgressKey) -> Result<Option<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = ?1 AND lesson_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(key.user_id.as_uuid())
            .bind(id_to_i64("lesson_id", key.lesson_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM lesson_progress WHERE user_id = ?1 AND course_id = ?2 ORDER BY lesson_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.as_uuid())
            .bind(id_to_i64("course_id", course_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}
