use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("progress percentage must be within 0..=100, got {0}")]
    InvalidPercentage(u8),
}

/// A learner's registration in a course, holding aggregate progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    user_id: UserId,
    course_id: CourseId,
    enrolled_at: DateTime<Utc>,
    progress_percentage: u8,
    last_lesson_id: Option<LessonId>,
    last_watched_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    /// A fresh enrollment with no progress.
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at,
            progress_percentage: 0,
            last_lesson_id: None,
            last_watched_at: None,
            completed_at: None,
        }
    }

    /// Rehydrate a stored enrollment.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidPercentage` when the stored value exceeds 100.
    pub fn from_persisted(
        user_id: UserId,
        course_id: CourseId,
        enrolled_at: DateTime<Utc>,
        progress_percentage: u8,
        last_lesson_id: Option<LessonId>,
        last_watched_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, EnrollmentError> {
        if progress_percentage > 100 {
            return Err(EnrollmentError::InvalidPercentage(progress_percentage));
        }
        Ok(Self {
            user_id,
            course_id,
            enrolled_at,
            progress_percentage,
            last_lesson_id,
            last_watched_at,
            completed_at,
        })
    }

    pub fn apply(&mut self, update: &EnrollmentUpdate) {
        self.progress_percentage = update.progress_percentage;
        self.last_lesson_id = Some(update.last_lesson_id);
        self.last_watched_at = Some(update.last_watched_at);
        self.completed_at = update.completed_at;
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        self.progress_percentage
    }

    #[must_use]
    pub fn last_lesson_id(&self) -> Option<LessonId> {
        self.last_lesson_id
    }

    #[must_use]
    pub fn last_watched_at(&self) -> Option<DateTime<Utc>> {
        self.last_watched_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Values written back to an enrollment after a lesson is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrollmentUpdate {
    pub progress_percentage: u8,
    pub last_lesson_id: LessonId,
    pub last_watched_at: DateTime<Utc>,
    /// `None` clears a previous completion stamp.
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn rejects_out_of_range_percentage() {
        let err = Enrollment::from_persisted(
            UserId::random(),
            CourseId::new(1),
            fixed_now(),
            101,
            None,
            None,
            None,
        )
        .unwrap_err();
        assert_eq!(err, EnrollmentError::InvalidPercentage(101));
    }

    #[test]
    fn update_clears_completion_below_full() {
        let now = fixed_now();
        let mut enrollment = Enrollment::new(UserId::random(), CourseId::new(1), now);
        enrollment.apply(&EnrollmentUpdate {
            progress_percentage: 100,
            last_lesson_id: LessonId::new(4),
            last_watched_at: now,
            completed_at: Some(now),
        });
        assert!(enrollment.is_completed());

        enrollment.apply(&EnrollmentUpdate {
            progress_percentage: 80,
            last_lesson_id: LessonId::new(2),
            last_watched_at: now,
            completed_at: None,
        });
        assert!(!enrollment.is_completed());
        assert_eq!(enrollment.last_lesson_id(), Some(LessonId::new(2)));
    }
}
