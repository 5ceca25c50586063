//! Course-level completion derived from lesson progress rows.

use std::collections::HashSet;

use crate::model::{CourseOutline, LessonId, LessonProgress};

/// Completion figures for one learner in one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourseProgress {
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub percentage: u8,
}

impl CourseProgress {
    /// True once the rounded percentage hits 100. An empty course never completes.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.percentage >= 100
    }
}

/// `round(100 * completed / total)` with halves rounded up; 0 for an empty course.
#[must_use]
pub fn progress_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Count completed lessons among `lessons`.
///
/// A lesson counts when its progress row is completed or when it is
/// `just_completed`, which covers a completion write that a follow-up read
/// has not observed yet. Each lesson counts once, so repeated completions
/// of the same lesson never move the percentage.
#[must_use]
pub fn compute_progress(
    lessons: &[LessonId],
    progress: &[LessonProgress],
    just_completed: Option<LessonId>,
) -> CourseProgress {
    let completed: HashSet<LessonId> = progress
        .iter()
        .filter(|p| p.is_completed())
        .map(LessonProgress::lesson_id)
        .chain(just_completed)
        .collect();

    let distinct: HashSet<LessonId> = lessons.iter().copied().collect();
    let total = u32::try_from(distinct.len()).unwrap_or(u32::MAX);
    let done = u32::try_from(distinct.intersection(&completed).count()).unwrap_or(u32::MAX);

    CourseProgress {
        completed_lessons: done,
        total_lessons: total,
        percentage: progress_percentage(done, total),
    }
}

/// Per-lesson watch state for a course sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonStatus {
    pub lesson_id: LessonId,
    pub title: String,
    pub duration_seconds: u32,
    pub watched_seconds: u32,
    pub is_completed: bool,
}

#[must_use]
pub fn lesson_statuses(outline: &CourseOutline, progress: &[LessonProgress]) -> Vec<LessonStatus> {
    outline
        .published_lessons()
        .map(|lesson| {
            let row = progress.iter().find(|p| p.lesson_id() == lesson.id);
            LessonStatus {
                lesson_id: lesson.id,
                title: lesson.title.clone(),
                duration_seconds: lesson.duration_seconds,
                watched_seconds: row.map_or(0, LessonProgress::watched_seconds),
                is_completed: row.is_some_and(LessonProgress::is_completed),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CourseId, ProgressKey, ProgressWrite, UserId};
    use crate::time::fixed_now;

    fn ids(n: u64) -> Vec<LessonId> {
        (1..=n).map(LessonId::new).collect()
    }

    fn completed(user: UserId, lesson: u64) -> LessonProgress {
        LessonProgress::from_write(
            ProgressKey::new(user, LessonId::new(lesson)),
            &ProgressWrite::Complete {
                course_id: CourseId::new(1),
                total_seconds: 60,
                at: fixed_now(),
            },
        )
    }

    fn watching(user: UserId, lesson: u64) -> LessonProgress {
        LessonProgress::from_write(
            ProgressKey::new(user, LessonId::new(lesson)),
            &ProgressWrite::Tick {
                course_id: CourseId::new(1),
                watched_seconds: 30,
                total_seconds: 60,
                at: fixed_now(),
            },
        )
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(1, 8), 13);
        assert_eq!(progress_percentage(3, 4), 75);
        assert_eq!(progress_percentage(4, 4), 100);
    }

    #[test]
    fn empty_course_is_zero_and_never_complete() {
        let summary = compute_progress(&[], &[], Some(LessonId::new(1)));
        assert_eq!(summary.percentage, 0);
        assert_eq!(summary.total_lessons, 0);
        assert!(!summary.is_complete());
    }

    #[test]
    fn k_of_n_matches_rounded_ratio() {
        let user = UserId::random();
        for n in 1..=7_u64 {
            for k in 0..=n {
                let rows: Vec<_> = (1..=k).map(|l| completed(user, l)).collect();
                let summary = compute_progress(&ids(n), &rows, None);
                let expected = (100.0 * k as f64 / n as f64).round() as u8;
                assert_eq!(summary.percentage, expected, "k={k} n={n}");
                assert_eq!(summary.completed_lessons, u32::try_from(k).unwrap());
            }
        }
    }

    #[test]
    fn just_completed_counts_once() {
        let user = UserId::random();
        let rows = vec![completed(user, 1), watching(user, 2)];
        let summary = compute_progress(&ids(4), &rows, Some(LessonId::new(2)));
        assert_eq!(summary.completed_lessons, 2);
        assert_eq!(summary.percentage, 50);

        let again = compute_progress(&ids(4), &rows, Some(LessonId::new(1)));
        assert_eq!(again.completed_lessons, 1);
        assert_eq!(again.percentage, 25);
    }

    #[test]
    fn rows_outside_the_course_are_ignored() {
        let user = UserId::random();
        let rows = vec![completed(user, 1), completed(user, 99)];
        let summary = compute_progress(&ids(2), &rows, None);
        assert_eq!(summary.completed_lessons, 1);
        assert_eq!(summary.percentage, 50);
    }
}
