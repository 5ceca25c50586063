use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{CourseId, LessonId, UserId};

/// Upsert key for a lesson progress row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProgressKey {
    pub user_id: UserId,
    pub lesson_id: LessonId,
}

impl ProgressKey {
    #[must_use]
    pub fn new(user_id: UserId, lesson_id: LessonId) -> Self {
        Self { user_id, lesson_id }
    }
}

/// Fields written by a single progress upsert.
///
/// Conflict policy is last-write-wins: whatever the latest write carries
/// replaces the stored values, with no high-water mark on `watched_seconds`.
/// A `Tick` leaves existing completion fields untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressWrite {
    Tick {
        course_id: CourseId,
        watched_seconds: u32,
        total_seconds: u32,
        at: DateTime<Utc>,
    },
    Complete {
        course_id: CourseId,
        total_seconds: u32,
        at: DateTime<Utc>,
    },
}

impl ProgressWrite {
    #[must_use]
    pub fn course_id(&self) -> CourseId {
        match self {
            Self::Tick { course_id, .. } | Self::Complete { course_id, .. } => *course_id,
        }
    }

    #[must_use]
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Tick { at, .. } | Self::Complete { at, .. } => *at,
        }
    }

    /// Seconds recorded by this write. Completion always records the full duration.
    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        match self {
            Self::Tick {
                watched_seconds, ..
            } => *watched_seconds,
            Self::Complete { total_seconds, .. } => *total_seconds,
        }
    }

    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        match self {
            Self::Tick { total_seconds, .. } | Self::Complete { total_seconds, .. } => {
                *total_seconds
            }
        }
    }

    #[must_use]
    pub fn is_completion(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }
}

/// Per-learner, per-lesson watch state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    key: ProgressKey,
    course_id: CourseId,
    watched_seconds: u32,
    total_seconds: u32,
    completed_at: Option<DateTime<Utc>>,
    last_watched_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Row created by the first write for `key`.
    #[must_use]
    pub fn from_write(key: ProgressKey, write: &ProgressWrite) -> Self {
        Self {
            key,
            course_id: write.course_id(),
            watched_seconds: write.watched_seconds(),
            total_seconds: write.total_seconds(),
            completed_at: write.is_completion().then(|| write.at()),
            last_watched_at: write.at(),
        }
    }

    /// Rehydrate a stored row. Completion is carried by `completed_at`.
    #[must_use]
    pub fn from_persisted(
        key: ProgressKey,
        course_id: CourseId,
        watched_seconds: u32,
        total_seconds: u32,
        completed_at: Option<DateTime<Utc>>,
        last_watched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            key,
            course_id,
            watched_seconds,
            total_seconds,
            completed_at,
            last_watched_at,
        }
    }

    /// Merge a later write into this row.
    pub fn apply(&mut self, write: &ProgressWrite) {
        self.course_id = write.course_id();
        self.watched_seconds = write.watched_seconds();
        self.total_seconds = write.total_seconds();
        self.last_watched_at = write.at();
        if write.is_completion() {
            self.completed_at = Some(write.at());
        }
    }

    #[must_use]
    pub fn key(&self) -> ProgressKey {
        self.key
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.key.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.key.lesson_id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.watched_seconds
    }

    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.total_seconds
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn last_watched_at(&self) -> DateTime<Utc> {
        self.last_watched_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn key() -> ProgressKey {
        ProgressKey::new(UserId::random(), LessonId::new(7))
    }

    fn tick(watched: u32, at: DateTime<Utc>) -> ProgressWrite {
        ProgressWrite::Tick {
            course_id: CourseId::new(1),
            watched_seconds: watched,
            total_seconds: 300,
            at,
        }
    }

    #[test]
    fn later_tick_overwrites_even_when_smaller() {
        let now = fixed_now();
        let mut row = LessonProgress::from_write(key(), &tick(45, now));
        row.apply(&tick(10, now + Duration::seconds(10)));
        assert_eq!(row.watched_seconds(), 10);
        assert_eq!(row.last_watched_at(), now + Duration::seconds(10));
        assert!(!row.is_completed());
    }

    #[test]
    fn completion_forces_full_duration() {
        let now = fixed_now();
        let mut row = LessonProgress::from_write(key(), &tick(0, now));
        row.apply(&ProgressWrite::Complete {
            course_id: CourseId::new(1),
            total_seconds: 300,
            at: now,
        });
        assert!(row.is_completed());
        assert_eq!(row.completed_at(), Some(now));
        assert_eq!(row.watched_seconds(), 300);
    }

    #[test]
    fn tick_after_completion_keeps_completion() {
        let now = fixed_now();
        let complete = ProgressWrite::Complete {
            course_id: CourseId::new(1),
            total_seconds: 300,
            at: now,
        };
        let mut row = LessonProgress::from_write(key(), &complete);
        row.apply(&tick(20, now + Duration::seconds(30)));
        assert!(row.is_completed());
        assert_eq!(row.completed_at(), Some(now));
        assert_eq!(row.watched_seconds(), 20);
    }
}
