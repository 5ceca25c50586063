use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::course_service::CourseService;
use crate::enrollment_service::EnrollmentService;
use crate::error::AppServicesError;
use crate::identity::IdentityProvider;
use crate::lesson_player::LessonPlayerService;
use crate::progress_service::ProgressService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    courses: Arc<CourseService>,
    progress: Arc<ProgressService>,
    enrollments: Arc<EnrollmentService>,
    lesson_player: Arc<LessonPlayerService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, identity))
    }

    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let courses = CourseService::new(
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.enrollments),
        );
        let progress = ProgressService::new(clock, Arc::clone(&storage.progress));
        let enrollments = EnrollmentService::new(
            clock,
            Arc::clone(&storage.courses),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.enrollments),
        );
        let lesson_player = LessonPlayerService::new(
            identity,
            courses.clone(),
            progress.clone(),
            enrollments.clone(),
        );

        Self {
            courses: Arc::new(courses),
            progress: Arc::new(progress),
            enrollments: Arc::new(enrollments),
            lesson_player: Arc::new(lesson_player),
        }
    }

    #[must_use]
    pub fn courses(&self) -> Arc<CourseService> {
        Arc::clone(&self.courses)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn enrollments(&self) -> Arc<EnrollmentService> {
        Arc::clone(&self.enrollments)
    }

    #[must_use]
    pub fn lesson_player(&self) -> Arc<LessonPlayerService> {
        Arc::clone(&self.lesson_player)
    }
}
