//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{CourseId, LessonId, PlaybackError, UserId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `EnrollmentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnrollmentServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error("user {user_id} is not enrolled in course {course_id}")]
    NotEnrolled { user_id: UserId, course_id: CourseId },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the playback controller.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PlayerError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("player is not ready")]
    NotReady,
    #[error("unsupported playback rate: {0}")]
    InvalidPlaybackRate(f32),
    #[error("no quality levels available")]
    NoQualityLevels,
    #[error("quality level {0} does not exist")]
    UnknownQualityLevel(usize),
}

/// Errors emitted while opening a lesson page.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonPlayerError {
    #[error("sign in to watch this lesson")]
    NotAuthenticated,
    #[error("lesson {0} has no video")]
    MissingVideo(LessonId),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Course(#[from] CourseServiceError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentServiceError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
