//! Previous/next lesson resolution over an ordered course outline.

use crate::model::{CourseId, CourseOutline, Enrollment, LessonId};

/// Where the learner sits in the flattened lesson list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonNeighbors {
    pub index: usize,
    pub total: usize,
    pub previous: Option<LessonId>,
    pub next: Option<LessonId>,
}

impl LessonNeighbors {
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next.is_none()
    }
}

/// Page the learner should land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Lesson {
        course_id: CourseId,
        lesson_id: LessonId,
    },
    CourseOverview(CourseId),
}

impl Destination {
    /// Route path in the web app's URL layout.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Destination::Lesson {
                course_id,
                lesson_id,
            } => format!("/courses/{course_id}/learn/{lesson_id}"),
            Destination::CourseOverview(course_id) => format!("/courses/{course_id}"),
        }
    }
}

/// Locate `current` among the published lessons. `None` if it is not there.
#[must_use]
pub fn neighbors(outline: &CourseOutline, current: LessonId) -> Option<LessonNeighbors> {
    let order = outline.published_lesson_ids();
    let index = order.iter().position(|id| *id == current)?;
    Some(LessonNeighbors {
        index,
        total: order.len(),
        previous: index.checked_sub(1).map(|i| order[i]),
        next: order.get(index + 1).copied(),
    })
}

/// Where to go once `completed` is finished: the next lesson, or the overview
/// when it was the last one or is not part of the course.
#[must_use]
pub fn destination_after_completion(outline: &CourseOutline, completed: LessonId) -> Destination {
    let course_id = outline.course_id();
    match neighbors(outline, completed).and_then(|n| n.next) {
        Some(lesson_id) => Destination::Lesson {
            course_id,
            lesson_id,
        },
        None => Destination::CourseOverview(course_id),
    }
}

/// Target of a "continue learning" action.
///
/// Resumes at the last lesson recorded on the enrollment while it is still
/// published, otherwise starts from the first lesson.
#[must_use]
pub fn continue_lesson(outline: &CourseOutline, enrollment: Option<&Enrollment>) -> Destination {
    let course_id = outline.course_id();
    let resume = enrollment
        .and_then(Enrollment::last_lesson_id)
        .filter(|id| outline.lesson(*id).is_some());
    match resume.or_else(|| outline.published_lessons().next().map(|l| l.id)) {
        Some(lesson_id) => Destination::Lesson {
            course_id,
            lesson_id,
        },
        None => Destination::CourseOverview(course_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Course, EnrollmentUpdate, Lesson, Section, SectionId, UserId};
    use crate::time::fixed_now;

    fn outline(lessons: &[(u64, bool)]) -> CourseOutline {
        let course = Course::new(CourseId::new(1), "Course", true).unwrap();
        let section = Section {
            id: SectionId::new(1),
            course_id: CourseId::new(1),
            title: "Only".into(),
            sort_order: 0,
        };
        let lessons = lessons
            .iter()
            .enumerate()
            .map(|(i, (id, published))| Lesson {
                id: LessonId::new(*id),
                section_id: SectionId::new(1),
                title: format!("L{id}"),
                video_url: None,
                duration_seconds: 60,
                sort_order: i32::try_from(i).unwrap(),
                is_published: *published,
            })
            .collect();
        CourseOutline::assemble(course, vec![section], lessons).unwrap()
    }

    #[test]
    fn abc_neighbors() {
        let outline = outline(&[(1, true), (2, true), (3, true)]);
        let a = neighbors(&outline, LessonId::new(1)).unwrap();
        let c = neighbors(&outline, LessonId::new(3)).unwrap();
        assert_eq!(a.next, Some(LessonId::new(2)));
        assert_eq!(a.previous, None);
        assert_eq!(c.next, None);
        assert_eq!(c.previous, Some(LessonId::new(2)));
        assert!(c.is_last());
    }

    #[test]
    fn unpublished_lessons_are_skipped() {
        let outline = outline(&[(1, true), (2, false), (3, true)]);
        let a = neighbors(&outline, LessonId::new(1)).unwrap();
        assert_eq!(a.next, Some(LessonId::new(3)));
        assert!(neighbors(&outline, LessonId::new(2)).is_none());
    }

    #[test]
    fn completion_routes_forward_or_to_overview() {
        let outline = outline(&[(1, true), (2, true)]);
        assert_eq!(
            destination_after_completion(&outline, LessonId::new(1)).path(),
            "/courses/1/learn/2"
        );
        assert_eq!(
            destination_after_completion(&outline, LessonId::new(2)),
            Destination::CourseOverview(CourseId::new(1))
        );
        assert_eq!(
            destination_after_completion(&outline, LessonId::new(42)),
            Destination::CourseOverview(CourseId::new(1))
        );
    }

    #[test]
    fn continue_prefers_last_lesson() {
        let outline = outline(&[(1, true), (2, true), (3, false)]);
        let mut enrollment = crate::model::Enrollment::new(UserId::random(), CourseId::new(1), fixed_now());
        assert_eq!(
            continue_lesson(&outline, Some(&enrollment)),
            Destination::Lesson {
                course_id: CourseId::new(1),
                lesson_id: LessonId::new(1)
            }
        );

        enrollment.apply(&EnrollmentUpdate {
            progress_percentage: 50,
            last_lesson_id: LessonId::new(2),
            last_watched_at: fixed_now(),
            completed_at: None,
        });
        assert_eq!(
            continue_lesson(&outline, Some(&enrollment)).path(),
            "/courses/1/learn/2"
        );

        enrollment.apply(&EnrollmentUpdate {
            progress_percentage: 50,
            last_lesson_id: LessonId::new(3),
            last_watched_at: fixed_now(),
            completed_at: None,
        });
        assert_eq!(continue_lesson(&outline, Some(&enrollment)).path(), "/courses/1/learn/1");
    }

    #[test]
    fn empty_course_continues_to_overview() {
        let outline = outline(&[]);
        assert_eq!(
            continue_lesson(&outline, None),
            Destination::CourseOverview(CourseId::new(1))
        );
    }
}
