use std::sync::Arc;

use course_core::model::{
    CourseId, CourseOutline, Enrollment, Lesson, LessonId, LessonProgress, PlaybackSupport, UserId,
};
use course_core::navigation::{Destination, LessonNeighbors, destination_after_completion, neighbors};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{info, warn};

use crate::course_service::CourseService;
use crate::enrollment_service::EnrollmentService;
use crate::error::{CourseServiceError, LessonPlayerError};
use crate::identity::IdentityProvider;
use crate::player::{MediaElement, PROGRESS_TICK, PlaybackController, PlaybackEvent, PlayerOptions};
use crate::progress_service::ProgressService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient message for the learner (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Outcome of opening a lesson URL.
pub enum LessonPage {
    Ready(LessonPlayer),
    /// The lesson cannot be shown; send the learner here instead.
    Redirect(Destination),
}

/// Resolves lesson pages for the signed-in learner.
#[derive(Clone)]
pub struct LessonPlayerService {
    identity: Arc<dyn IdentityProvider>,
    courses: CourseService,
    progress: ProgressService,
    enrollments: EnrollmentService,
}

impl LessonPlayerService {
    #[must_use]
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        courses: CourseService,
        progress: ProgressService,
        enrollments: EnrollmentService,
    ) -> Self {
        Self {
            identity,
            courses,
            progress,
            enrollments,
        }
    }

    /// Open `/courses/{course_id}/learn/{lesson_id}`.
    ///
    /// Unknown or unpublished lessons and missing enrollments redirect to the
    /// course overview.
    ///
    /// # Errors
    ///
    /// Returns `LessonPlayerError::NotAuthenticated` when nobody is signed in,
    /// `LessonPlayerError::Course` for an unknown course, or a storage error.
    pub async fn open(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<LessonPage, LessonPlayerError> {
        let user_id = self
            .identity
            .current_user()
            .await
            .ok_or(LessonPlayerError::NotAuthenticated)?;
        let outline = self.courses.outline(course_id).await?;
        let overview = LessonPage::Redirect(Destination::CourseOverview(course_id));

        let (Some(lesson), Some(neighbors)) =
            (outline.lesson(lesson_id).cloned(), neighbors(&outline, lesson_id))
        else {
            info!(%course_id, %lesson_id, "lesson not found, redirecting");
            return Ok(overview);
        };
        let Some(enrollment) = self.enrollments.get_enrollment(user_id, course_id).await? else {
            info!(%user_id, %course_id, "not enrolled, redirecting");
            return Ok(overview);
        };
        let progress = self.progress.get_progress(user_id, lesson_id).await?;

        Ok(LessonPage::Ready(LessonPlayer {
            user_id,
            outline,
            lesson,
            neighbors,
            enrollment,
            completed: progress.as_ref().is_some_and(LessonProgress::is_completed),
            row: progress,
            progress: self.progress.clone(),
            enrollments: self.enrollments.clone(),
            notifications: Vec::new(),
        }))
    }

    /// Like `open`, but an unknown course also redirects.
    ///
    /// # Errors
    ///
    /// Returns `LessonPlayerError::NotAuthenticated` or a storage error.
    pub async fn open_or_redirect(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<LessonPage, LessonPlayerError> {
        match self.open(course_id, lesson_id).await {
            Err(LessonPlayerError::Course(CourseServiceError::CourseNotFound(_))) => Ok(
                LessonPage::Redirect(Destination::CourseOverview(course_id)),
            ),
            other => other,
        }
    }
}

/// One mounted lesson page: persists player events and decides where to go next.
pub struct LessonPlayer {
    user_id: UserId,
    outline: CourseOutline,
    lesson: Lesson,
    neighbors: LessonNeighbors,
    enrollment: Enrollment,
    row: Option<LessonProgress>,
    completed: bool,
    progress: ProgressService,
    enrollments: EnrollmentService,
    notifications: Vec<Notification>,
}

impl LessonPlayer {
    #[must_use]
    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    #[must_use]
    pub fn outline(&self) -> &CourseOutline {
        &self.outline
    }

    #[must_use]
    pub fn neighbors(&self) -> LessonNeighbors {
        self.neighbors
    }

    #[must_use]
    pub fn enrollment(&self) -> &Enrollment {
        &self.enrollment
    }

    /// Stored progress row as of the last successful write.
    #[must_use]
    pub fn progress(&self) -> Option<&LessonProgress> {
        self.row.as_ref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Options for a controller resuming where the learner left off.
    ///
    /// Completed lessons restart from the beginning.
    #[must_use]
    pub fn player_options(&self, autoplay: bool) -> PlayerOptions {
        let start_offset = match &self.row {
            Some(row) if !row.is_completed() => row.watched_seconds(),
            _ => 0,
        };
        PlayerOptions {
            start_offset,
            autoplay,
            already_completed: self.completed,
            tick_period: PROGRESS_TICK,
        }
    }

    /// Build the playback controller for this lesson's video.
    ///
    /// # Errors
    ///
    /// Returns `LessonPlayerError::MissingVideo` if the lesson has no video URL,
    /// or `LessonPlayerError::Player` if the URL is unusable.
    pub fn build_controller<M: MediaElement>(
        &self,
        support: PlaybackSupport,
        media: M,
        autoplay: bool,
    ) -> Result<(PlaybackController<M>, UnboundedReceiver<PlaybackEvent>), LessonPlayerError> {
        let url = self
            .lesson
            .video_url
            .as_deref()
            .ok_or(LessonPlayerError::MissingVideo(self.lesson.id))?;
        Ok(PlaybackController::new(
            url,
            support,
            self.player_options(autoplay),
            media,
        )?)
    }

    /// Persist one player event. Returns where to navigate, if anywhere.
    pub async fn handle_event(&mut self, event: PlaybackEvent) -> Option<Destination> {
        match event {
            PlaybackEvent::Progress(seconds) => {
                self.record_tick(seconds).await;
                None
            }
            PlaybackEvent::Completed => self.mark_complete().await,
        }
    }

    async fn record_tick(&mut self, watched_seconds: u32) {
        let result = self
            .progress
            .report_progress(
                self.user_id,
                self.lesson.id,
                self.outline.course_id(),
                watched_seconds,
                self.lesson.duration_seconds,
            )
            .await;
        match result {
            Ok(row) => self.row = Some(row),
            Err(e) => {
                warn!(lesson_id = %self.lesson.id, error = %e, "failed to save progress");
                self.notifications
                    .push(Notification::error("Could not save your progress"));
            }
        }
    }

    /// Mark the lesson complete, refresh the course percentage and pick the
    /// next destination.
    ///
    /// Failures become error notifications and keep the learner on the page.
    /// A failed enrollment update after a successful progress write is left
    /// as is.
    pub async fn mark_complete(&mut self) -> Option<Destination> {
        let course_id = self.outline.course_id();
        let row = match self
            .progress
            .mark_complete(
                self.user_id,
                self.lesson.id,
                course_id,
                self.lesson.duration_seconds,
            )
            .await
        {
            Ok(row) => row,
            Err(e) => {
                warn!(lesson_id = %self.lesson.id, error = %e, "failed to mark lesson complete");
                self.notifications
                    .push(Notification::error("Could not mark the lesson complete"));
                return None;
            }
        };
        self.row = Some(row);
        self.completed = true;

        match self
            .enrollments
            .recompute(self.user_id, course_id, self.lesson.id)
            .await
        {
            Ok(updated) => self.enrollment = updated.enrollment,
            Err(e) => {
                warn!(%course_id, error = %e, "failed to update course progress");
                self.notifications
                    .push(Notification::error("Could not update your course progress"));
                return None;
            }
        }

        self.notifications
            .push(Notification::success("Lesson completed"));
        let destination = destination_after_completion(&self.outline, self.lesson.id);
        info!(lesson_id = %self.lesson.id, to = %destination.path(), "lesson completed");
        Some(destination)
    }

    /// Drain player events until navigation is decided or the player goes away.
    pub async fn run(&mut self, events: &mut UnboundedReceiver<PlaybackEvent>) -> Option<Destination> {
        while let Some(event) = events.recv().await {
            if let Some(destination) = self.handle_event(event).await {
                return Some(destination);
            }
        }
        None
    }

    #[must_use]
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }
}
