use chrono::{DateTime, Utc};
use course_core::model::{
    Course, CourseId, Enrollment, Lesson, LessonId, LessonProgress, ProgressKey, Section,
    SectionId, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Map write failures, turning key collisions into `Conflict`.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    match e.as_database_error() {
        Some(db) if db.is_unique_violation() => StorageError::Conflict,
        Some(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        _ => StorageError::Connection(e.to_string()),
    }
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn user_id_from_row(row: &SqliteRow) -> Result<UserId, StorageError> {
    Ok(UserId::new(row.try_get::<Uuid, _>("user_id").map_err(ser)?))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn section_id_from_i64(v: i64) -> Result<SectionId, StorageError> {
    Ok(SectionId::new(i64_to_u64("section_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<bool, _>("is_published").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<Section, StorageError> {
    Ok(Section {
        id: section_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id: course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        sort_order: row.try_get("sort_order").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    Ok(Lesson {
        id: lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        section_id: section_id_from_i64(row.try_get::<i64, _>("section_id").map_err(ser)?)?,
        title: row.try_get("title").map_err(ser)?,
        video_url: row.try_get("video_url").map_err(ser)?,
        duration_seconds: i64_to_u32(
            "duration_seconds",
            row.try_get::<i64, _>("duration_seconds").map_err(ser)?,
        )?,
        sort_order: row.try_get("sort_order").map_err(ser)?,
        is_published: row.try_get("is_published").map_err(ser)?,
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let is_completed: bool = row.try_get("is_completed").map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
    if is_completed && completed_at.is_none() {
        return Err(StorageError::Serialization(
            "completed progress without completed_at".into(),
        ));
    }

    let key = ProgressKey::new(
        user_id_from_row(row)?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
    );
    Ok(LessonProgress::from_persisted(
        key,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        i64_to_u32(
            "watched_seconds",
            row.try_get::<i64, _>("watched_seconds").map_err(ser)?,
        )?,
        i64_to_u32(
            "total_seconds",
            row.try_get::<i64, _>("total_seconds").map_err(ser)?,
        )?,
        completed_at.filter(|_| is_completed),
        row.try_get("last_watched_at").map_err(ser)?,
    ))
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let percentage: i64 = row.try_get("progress_percentage").map_err(ser)?;
    let percentage = u8::try_from(percentage)
        .map_err(|_| StorageError::Serialization(format!("invalid progress_percentage: {percentage}")))?;

    Enrollment::from_persisted(
        user_id_from_row(row)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get("enrolled_at").map_err(ser)?,
        percentage,
        row.try_get::<Option<i64>, _>("last_lesson_id")
            .map_err(ser)?
            .map(lesson_id_from_i64)
            .transpose()?,
        row.try_get("last_watched_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
    )
    .map_err(ser)
}
