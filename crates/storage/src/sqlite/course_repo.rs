use course_core::model::{Course, CourseId, CourseOutline, Lesson, Section};

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_course_row, map_lesson_row, map_section_row, ser, write_err,
};
use crate::repository::{CourseRepository, StorageError};

#[async_trait::async_trait]
impl CourseRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, is_published)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                is_published = excluded.is_published
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(course.title())
        .bind(course.is_published())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO sections (id, course_id, title, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                sort_order = excluded.sort_order
            ",
        )
        .bind(id_to_i64("section_id", section.id.value())?)
        .bind(id_to_i64("course_id", section.course_id.value())?)
        .bind(&section.title)
        .bind(section.sort_order)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, section_id, title, video_url, duration_seconds, sort_order, is_published)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                section_id = excluded.section_id,
                title = excluded.title,
                video_url = excluded.video_url,
                duration_seconds = excluded.duration_seconds,
                sort_order = excluded.sort_order,
                is_published = excluded.is_published
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id.value())?)
        .bind(id_to_i64("section_id", lesson.section_id.value())?)
        .bind(&lesson.title)
        .bind(lesson.video_url.as_deref())
        .bind(i64::from(lesson.duration_seconds))
        .bind(lesson.sort_order)
        .bind(lesson.is_published)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;
        Ok(())
    }

    async fn get_outline(&self, id: CourseId) -> Result<Option<CourseOutline>, StorageError> {
        let course_id = id_to_i64("course_id", id.value())?;

        let Some(row) = sqlx::query("SELECT id, title, is_published FROM courses WHERE id = ?1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
        else {
            return Ok(None);
        };
        let course = map_course_row(&row)?;

        let section_rows = sqlx::query(
            r"
            SELECT id, course_id, title, sort_order
            FROM sections
            WHERE course_id = ?1
            ORDER BY sort_order ASC, id ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let lesson_rows = sqlx::query(
            r"
            SELECT l.id, l.section_id, l.title, l.video_url, l.duration_seconds, l.sort_order, l.is_published
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE s.course_id = ?1
            ORDER BY l.sort_order ASC, l.id ASC
            ",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let sections = section_rows
            .iter()
            .map(map_section_row)
            .collect::<Result<Vec<_>, _>>()?;
        let lessons = lesson_rows
            .iter()
            .map(map_lesson_row)
            .collect::<Result<Vec<_>, _>>()?;

        CourseOutline::assemble(course, sections, lessons)
            .map(Some)
            .map_err(ser)
    }
}
