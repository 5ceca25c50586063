use async_trait::async_trait;
use course_core::model::{
    Course, CourseId, CourseOutline, Enrollment, EnrollmentUpdate, Lesson, LessonProgress,
    ProgressKey, ProgressWrite, Section, UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Read access to the course tree, plus the writes needed to seed it.
#[async_trait]
pub trait CourseRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Persist or update a section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the section cannot be stored or its course is missing.
    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError>;

    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored or its section is missing.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Load the ordered course tree, unpublished lessons included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend or mapping failures.
    async fn get_outline(&self, id: CourseId) -> Result<Option<CourseOutline>, StorageError>;
}

/// Per-lesson watch state keyed by `(user_id, lesson_id)`.
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Insert or update the row for `key` and return the stored state.
    ///
    /// Conflict resolution is last-write-wins: the incoming write replaces
    /// `watched_seconds`, `total_seconds` and `last_watched_at` even when it
    /// moves `watched_seconds` backwards. Completion fields are only written
    /// by `ProgressWrite::Complete`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn upsert_progress(
        &self,
        key: ProgressKey,
        write: ProgressWrite,
    ) -> Result<LessonProgress, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend or mapping failures.
    async fn get_progress(&self, key: ProgressKey) -> Result<Option<LessonProgress>, StorageError>;

    /// All rows of `user_id` within `course_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend or mapping failures.
    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

/// Enrollment rows keyed by `(user_id, course_id)`.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the learner is already enrolled.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend or mapping failures.
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError>;

    /// Apply aggregate progress to an existing enrollment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if there is no enrollment to update.
    async fn update_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
        update: &EnrollmentUpdate,
    ) -> Result<Enrollment, StorageError>;
}

#[derive(Default)]
struct CatalogState {
    courses: HashMap<CourseId, Course>,
    sections: Vec<Section>,
    lessons: Vec<Lesson>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    catalog: Arc<Mutex<CatalogState>>,
    progress: Arc<Mutex<HashMap<ProgressKey, LessonProgress>>>,
    enrollments: Arc<Mutex<HashMap<(UserId, CourseId), Enrollment>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl CourseRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn upsert_section(&self, section: &Section) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        if !guard.courses.contains_key(&section.course_id) {
            return Err(StorageError::NotFound);
        }
        guard.sections.retain(|s| s.id != section.id);
        guard.sections.push(section.clone());
        Ok(())
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.catalog.lock().map_err(poisoned)?;
        if !guard.sections.iter().any(|s| s.id == lesson.section_id) {
            return Err(StorageError::NotFound);
        }
        guard.lessons.retain(|l| l.id != lesson.id);
        guard.lessons.push(lesson.clone());
        Ok(())
    }

    async fn get_outline(&self, id: CourseId) -> Result<Option<CourseOutline>, StorageError> {
        let guard = self.catalog.lock().map_err(poisoned)?;
        let Some(course) = guard.courses.get(&id).cloned() else {
            return Ok(None);
        };
        let sections: Vec<Section> = guard
            .sections
            .iter()
            .filter(|s| s.course_id == id)
            .cloned()
            .collect();
        let lessons: Vec<Lesson> = guard
            .lessons
            .iter()
            .filter(|l| sections.iter().any(|s| s.id == l.section_id))
            .cloned()
            .collect();
        CourseOutline::assemble(course, sections, lessons)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LessonProgressRepository for InMemoryRepository {
    async fn upsert_progress(
        &self,
        key: ProgressKey,
        write: ProgressWrite,
    ) -> Result<LessonProgress, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let row = guard
            .entry(key)
            .and_modify(|row| row.apply(&write))
            .or_insert_with(|| LessonProgress::from_write(key, &write));
        Ok(row.clone())
    }

    async fn get_progress(&self, key: ProgressKey) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(guard.get(&key).cloned())
    }

    async fn list_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        let mut rows: Vec<LessonProgress> = guard
            .values()
            .filter(|p| p.user_id() == user_id && p.course_id() == course_id)
            .cloned()
            .collect();
        rows.sort_by_key(LessonProgress::lesson_id);
        Ok(rows)
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let key = (enrollment.user_id(), enrollment.course_id());
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        guard.insert(key, enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let guard = self.enrollments.lock().map_err(poisoned)?;
        Ok(guard.get(&(user_id, course_id)).cloned())
    }

    async fn update_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
        update: &EnrollmentUpdate,
    ) -> Result<Enrollment, StorageError> {
        let mut guard = self.enrollments.lock().map_err(poisoned)?;
        let enrollment = guard
            .get_mut(&(user_id, course_id))
            .ok_or(StorageError::NotFound)?;
        enrollment.apply(update);
        Ok(enrollment.clone())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
///
/// Built once at startup and handed to services explicitly.
#[derive(Clone)]
pub struct Storage {
    pub courses: Arc<dyn CourseRepository>,
    pub progress: Arc<dyn LessonProgressRepository>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let courses: Arc<dyn CourseRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn LessonProgressRepository> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo);
        Self {
            courses,
            progress,
            enrollments,
        }
    }
}
