use std::sync::Arc;

use course_core::aggregate::{CourseProgress, compute_progress};
use course_core::model::{CourseId, Enrollment, EnrollmentUpdate, LessonId, UserId};
use storage::repository::{
    CourseRepository, EnrollmentRepository, LessonProgressRepository, StorageError,
};
use tracing::info;

use crate::Clock;
use crate::error::EnrollmentServiceError;

/// Result of a recompute: the stored enrollment and the figures behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentProgress {
    pub enrollment: Enrollment,
    pub progress: CourseProgress,
}

/// Keeps `enrollments.progress_percentage` in step with lesson completions.
///
/// The percentage is persisted eagerly after each completion and is not
/// recomputed on ticks, so it can lag between completions.
#[derive(Clone)]
pub struct EnrollmentService {
    clock: Clock,
    courses: Arc<dyn CourseRepository>,
    progress: Arc<dyn LessonProgressRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        courses: Arc<dyn CourseRepository>,
        progress: Arc<dyn LessonProgressRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
    ) -> Self {
        Self {
            clock,
            courses,
            progress,
            enrollments,
        }
    }

    /// Enroll a learner, returning the existing row if already enrolled.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::CourseNotFound` for an unknown course,
    /// or `EnrollmentServiceError::Storage` on repository failure.
    pub async fn enroll(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Enrollment, EnrollmentServiceError> {
        if self.courses.get_outline(course_id).await?.is_none() {
            return Err(EnrollmentServiceError::CourseNotFound(course_id));
        }
        if let Some(existing) = self.enrollments.get_enrollment(user_id, course_id).await? {
            return Ok(existing);
        }

        let enrollment = Enrollment::new(user_id, course_id, self.clock.now());
        match self.enrollments.insert_enrollment(&enrollment).await {
            Ok(()) => {
                info!(%user_id, %course_id, "enrolled");
                Ok(enrollment)
            }
            // Lost a race with another insert; the stored row wins.
            Err(StorageError::Conflict) => self
                .enrollments
                .get_enrollment(user_id, course_id)
                .await?
                .ok_or(EnrollmentServiceError::NotEnrolled { user_id, course_id }),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::Storage` on repository failure.
    pub async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, EnrollmentServiceError> {
        Ok(self.enrollments.get_enrollment(user_id, course_id).await?)
    }

    /// Recompute and persist the course percentage after `just_completed` finished.
    ///
    /// `just_completed` is counted even if the preceding progress write is not
    /// visible to the read yet. At 100% `completed_at` is stamped with now;
    /// below that it is cleared. An empty course stays at 0%.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentServiceError::CourseNotFound` if the course is gone,
    /// `EnrollmentServiceError::NotEnrolled` if there is no enrollment row, or
    /// `EnrollmentServiceError::Storage` on repository failure.
    pub async fn recompute(
        &self,
        user_id: UserId,
        course_id: CourseId,
        just_completed: LessonId,
    ) -> Result<EnrollmentProgress, EnrollmentServiceError> {
        let outline = self
            .courses
            .get_outline(course_id)
            .await?
            .ok_or(EnrollmentServiceError::CourseNotFound(course_id))?;
        let rows = self
            .progress
            .list_course_progress(user_id, course_id)
            .await?;

        let summary = compute_progress(&outline.published_lesson_ids(), &rows, Some(just_completed));
        let now = self.clock.now();
        let update = EnrollmentUpdate {
            progress_percentage: summary.percentage,
            last_lesson_id: just_completed,
            last_watched_at: now,
            completed_at: summary.is_complete().then_some(now),
        };

        let enrollment = self
            .enrollments
            .update_enrollment(user_id, course_id, &update)
            .await
            .map_err(|e| match e {
                StorageError::NotFound => EnrollmentServiceError::NotEnrolled { user_id, course_id },
                other => other.into(),
            })?;

        info!(
            %user_id,
            %course_id,
            completed = summary.completed_lessons,
            total = summary.total_lessons,
            percentage = summary.percentage,
            "enrollment progress updated"
        );
        Ok(EnrollmentProgress {
            enrollment,
            progress: summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use course_core::model::{Course, ProgressKey, ProgressWrite, Section, SectionId};
    use course_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    async fn empty_course(repo: &InMemoryRepository) {
        repo.upsert_course(&Course::new(CourseId::new(5), "Empty", true).unwrap())
            .await
            .unwrap();
        repo.upsert_section(&Section {
            id: SectionId::new(1),
            course_id: CourseId::new(5),
            title: "Nothing yet".into(),
            sort_order: 0,
        })
        .await
        .unwrap();
    }

    fn service(repo: &InMemoryRepository) -> EnrollmentService {
        EnrollmentService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
    }

    #[tokio::test]
    async fn empty_course_recomputes_to_zero() {
        let repo = InMemoryRepository::new();
        empty_course(&repo).await;
        let svc = service(&repo);
        let user = UserId::random();
        svc.enroll(user, CourseId::new(5)).await.unwrap();

        let result = svc
            .recompute(user, CourseId::new(5), LessonId::new(1))
            .await
            .unwrap();
        assert_eq!(result.progress.total_lessons, 0);
        assert_eq!(result.enrollment.progress_percentage(), 0);
        assert!(result.enrollment.completed_at().is_none());
    }

    #[tokio::test]
    async fn enroll_is_idempotent() {
        let repo = InMemoryRepository::new();
        empty_course(&repo).await;
        let svc = service(&repo);
        let user = UserId::random();

        let first = svc.enroll(user, CourseId::new(5)).await.unwrap();
        let second = svc.enroll(user, CourseId::new(5)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.enrolled_at(), fixed_now());
    }

    #[tokio::test]
    async fn unknown_course_and_missing_enrollment_are_reported() {
        let repo = InMemoryRepository::new();
        empty_course(&repo).await;
        let svc = service(&repo);
        let user = UserId::random();

        assert!(matches!(
            svc.enroll(user, CourseId::new(77)).await,
            Err(EnrollmentServiceError::CourseNotFound(_))
        ));

        repo.upsert_progress(
            ProgressKey::new(user, LessonId::new(1)),
            ProgressWrite::Complete {
                course_id: CourseId::new(5),
                total_seconds: 10,
                at: fixed_now(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(
            svc.recompute(user, CourseId::new(5), LessonId::new(1)).await,
            Err(EnrollmentServiceError::NotEnrolled { .. })
        ));
    }
}
