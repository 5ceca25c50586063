use std::sync::Arc;

use course_core::model::{CourseId, LessonId, LessonProgress, ProgressKey, ProgressWrite, UserId};
use storage::repository::LessonProgressRepository;
use tracing::debug;

use crate::Clock;
use crate::error::ProgressServiceError;

/// Write path for per-lesson watch state.
///
/// Each call is a single upsert keyed by `(user_id, lesson_id)`. Nothing here
/// touches the enrollment; see `EnrollmentService::recompute`.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn LessonProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(clock: Clock, progress: Arc<dyn LessonProgressRepository>) -> Self {
        Self { clock, progress }
    }

    /// Record a playback tick. Last write wins, so a rewind lowers the stored value.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the upsert fails.
    pub async fn report_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        watched_seconds: u32,
        total_seconds: u32,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let write = ProgressWrite::Tick {
            course_id,
            watched_seconds,
            total_seconds,
            at: self.clock.now(),
        };
        let row = self
            .progress
            .upsert_progress(ProgressKey::new(user_id, lesson_id), write)
            .await?;
        debug!(%user_id, %lesson_id, watched_seconds, "progress recorded");
        Ok(row)
    }

    /// Mark a lesson finished; `watched_seconds` is forced to `total_seconds`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the upsert fails.
    pub async fn mark_complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        course_id: CourseId,
        total_seconds: u32,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let write = ProgressWrite::Complete {
            course_id,
            total_seconds,
            at: self.clock.now(),
        };
        let row = self
            .progress
            .upsert_progress(ProgressKey::new(user_id, lesson_id), write)
            .await?;
        debug!(%user_id, %lesson_id, "lesson marked complete");
        Ok(row)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the read fails.
    pub async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, ProgressServiceError> {
        Ok(self
            .progress
            .get_progress(ProgressKey::new(user_id, lesson_id))
            .await?)
    }
}
