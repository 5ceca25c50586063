use std::sync::Arc;

use course_core::aggregate::{LessonStatus, compute_progress, lesson_statuses};
use course_core::model::{CourseId, CourseOutline, UserId};
use course_core::navigation::{Destination, continue_lesson};
use storage::repository::{CourseRepository, EnrollmentRepository, LessonProgressRepository};

use crate::error::CourseServiceError;

/// Learner-facing view of a course: sidebar rows plus the live percentage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOverview {
    pub course_id: CourseId,
    pub title: String,
    pub lessons: Vec<LessonStatus>,
    /// Computed from the progress rows on read.
    pub live_percentage: u8,
    /// What the enrollment row currently stores, if enrolled.
    pub stored_percentage: Option<u8>,
    pub continue_to: Destination,
}

/// Read-side queries over the course tree.
#[derive(Clone)]
pub struct CourseService {
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn LessonProgressRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl CourseService {
    #[must_use]
    pub fn new(
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn LessonProgressRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            courses,
            progress,
            enrollments,
        }
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError::CourseNotFound` for an unknown course.
    pub async fn outline(&self, course_id: CourseId) -> Result<CourseOutline, CourseServiceError> {
        self.courses
            .get_outline(course_id)
            .await?
            .ok_or(CourseServiceError::CourseNotFound(course_id))
    }

    /// # Errors
    ///
    /// Returns `CourseServiceError` if the course is missing or a read fails.
    pub async fn overview(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseOverview, CourseServiceError> {
        let outline = self.outline(course_id).await?;
        let rows = self
            .progress
            .list_course_progress(user_id, course_id)
            .await?;
        let enrollment = self.enrollments.get_enrollment(user_id, course_id).await?;

        let live = compute_progress(&outline.published_lesson_ids(), &rows, None);
        Ok(CourseOverview {
            course_id,
            title: outline.course().title().to_owned(),
            lessons: lesson_statuses(&outline, &rows),
            live_percentage: live.percentage,
            stored_percentage: enrollment.as_ref().map(|e| e.progress_percentage()),
            continue_to: continue_lesson(&outline, enrollment.as_ref()),
        })
    }

    /// Target of the "continue learning" button.
    ///
    /// # Errors
    ///
    /// Returns `CourseServiceError` if the course is missing or a read fails.
    pub async fn continue_destination(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Destination, CourseServiceError> {
        let outline = self.outline(course_id).await?;
        let enrollment = self.enrollments.get_enrollment(user_id, course_id).await?;
        Ok(continue_lesson(&outline, enrollment.as_ref()))
    }
}
