use course_core::model::{CourseId, Enrollment, EnrollmentUpdate, UserId};

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_enrollment_row, write_err};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, enrolled_at, progress_percentage, last_lesson_id, last_watched_at, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(enrollment.user_id().as_uuid())
        .bind(id_to_i64("course_id", enrollment.course_id().value())?)
        .bind(enrollment.enrolled_at())
        .bind(i64::from(enrollment.progress_percentage()))
        .bind(
            enrollment
                .last_lesson_id()
                .map(|id| id_to_i64("lesson_id", id.value()))
                .transpose()?,
        )
        .bind(enrollment.last_watched_at())
        .bind(enrollment.completed_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, course_id, enrolled_at, progress_percentage, last_lesson_id, last_watched_at, completed_at
            FROM enrollments
            WHERE user_id = ?1 AND course_id = ?2
            ",
        )
        .bind(user_id.as_uuid())
        .bind(id_to_i64("course_id", course_id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_enrollment_row).transpose()
    }

    async fn update_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
        update: &EnrollmentUpdate,
    ) -> Result<Enrollment, StorageError> {
        let row = sqlx::query(
            r"
            UPDATE enrollments SET
                progress_percentage = ?3,
                last_lesson_id = ?4,
                last_watched_at = ?5,
                completed_at = ?6
            WHERE user_id = ?1 AND course_id = ?2
            RETURNING user_id, course_id, enrolled_at, progress_percentage, last_lesson_id, last_watched_at, completed_at
            ",
        )
        .bind(user_id.as_uuid())
        .bind(id_to_i64("course_id", course_id.value())?)
        .bind(i64::from(update.progress_percentage))
        .bind(id_to_i64("lesson_id", update.last_lesson_id.value())?)
        .bind(update.last_watched_at)
        .bind(update.completed_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(write_err)?;

        match row {
            Some(row) => map_enrollment_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
