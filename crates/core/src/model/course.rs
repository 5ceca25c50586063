use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, SectionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CourseError {
    #[error("course title cannot be empty")]
    EmptyTitle,

    #[error("section {section} belongs to course {found}, expected {expected}")]
    ForeignSection {
        section: SectionId,
        expected: CourseId,
        found: CourseId,
    },

    #[error("lesson {lesson} references unknown section {section}")]
    OrphanLesson { lesson: LessonId, section: SectionId },

    #[error("lesson {0} appears more than once in the course tree")]
    DuplicateLesson(LessonId),
}

//
// ─── CATALOG ENTITIES ──────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    is_published: bool,
}

impl Course {
    /// # Errors
    ///
    /// Returns `CourseError::EmptyTitle` for a blank title.
    pub fn new(id: CourseId, title: impl Into<String>, is_published: bool) -> Result<Self, CourseError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(CourseError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            is_published,
        })
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_published(&self) -> bool {
        self.is_published
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub course_id: CourseId,
    pub title: String,
    pub sort_order: i32,
}

/// A video lesson inside a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: LessonId,
    pub section_id: SectionId,
    pub title: String,
    pub video_url: Option<String>,
    pub duration_seconds: u32,
    pub sort_order: i32,
    pub is_published: bool,
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// A section together with its lessons, both in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineSection {
    pub section: Section,
    pub lessons: Vec<Lesson>,
}

/// The ordered course tree as a learner sees it.
///
/// Sections are sorted by `sort_order`, and each section's lessons by their own
/// `sort_order`. Ties fall back to the id so the order is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    course: Course,
    sections: Vec<OutlineSection>,
}

impl CourseOutline {
    /// Assemble an outline from loose rows.
    ///
    /// # Errors
    ///
    /// Returns `CourseError` if a section belongs to another course, a lesson
    /// points at a missing section, or a lesson id is repeated.
    pub fn assemble(
        course: Course,
        sections: Vec<Section>,
        lessons: Vec<Lesson>,
    ) -> Result<Self, CourseError> {
        let mut sections = sections;
        if let Some(foreign) = sections.iter().find(|s| s.course_id != course.id()) {
            return Err(CourseError::ForeignSection {
                section: foreign.id,
                expected: course.id(),
                found: foreign.course_id,
            });
        }
        sections.sort_by_key(|s| (s.sort_order, s.id));

        let mut grouped: Vec<OutlineSection> = sections
            .into_iter()
            .map(|section| OutlineSection {
                section,
                lessons: Vec::new(),
            })
            .collect();

        let mut seen = std::collections::HashSet::new();
        for lesson in lessons {
            if !seen.insert(lesson.id) {
                return Err(CourseError::DuplicateLesson(lesson.id));
            }
            let slot = grouped
                .iter_mut()
                .find(|g| g.section.id == lesson.section_id)
                .ok_or(CourseError::OrphanLesson {
                    lesson: lesson.id,
                    section: lesson.section_id,
                })?;
            slot.lessons.push(lesson);
        }
        for group in &mut grouped {
            group.lessons.sort_by_key(|l| (l.sort_order, l.id));
        }

        Ok(Self {
            course,
            sections: grouped,
        })
    }

    #[must_use]
    pub fn course(&self) -> &Course {
        &self.course
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course.id()
    }

    #[must_use]
    pub fn sections(&self) -> &[OutlineSection] {
        &self.sections
    }

    /// Published lessons flattened in navigation order.
    pub fn published_lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.sections
            .iter()
            .flat_map(|s| s.lessons.iter())
            .filter(|l| l.is_published)
    }

    #[must_use]
    pub fn published_lesson_ids(&self) -> Vec<LessonId> {
        self.published_lessons().map(|l| l.id).collect()
    }

    #[must_use]
    pub fn lesson(&self, id: LessonId) -> Option<&Lesson> {
        self.published_lessons().find(|l| l.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: u64, order: i32) -> Section {
        Section {
            id: SectionId::new(id),
            course_id: CourseId::new(1),
            title: format!("Section {id}"),
            sort_order: order,
        }
    }

    fn lesson(id: u64, section: u64, order: i32, published: bool) -> Lesson {
        Lesson {
            id: LessonId::new(id),
            section_id: SectionId::new(section),
            title: format!("Lesson {id}"),
            video_url: None,
            duration_seconds: 60,
            sort_order: order,
            is_published: published,
        }
    }

    #[test]
    fn flattens_by_section_then_lesson_order() {
        let course = Course::new(CourseId::new(1), "Rust", true).unwrap();
        let outline = CourseOutline::assemble(
            course,
            vec![section(20, 2), section(10, 1)],
            vec![
                lesson(4, 20, 1, true),
                lesson(2, 10, 2, true),
                lesson(1, 10, 1, true),
                lesson(3, 20, 0, true),
            ],
        )
        .unwrap();

        let ids: Vec<u64> = outline.published_lessons().map(|l| l.id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn hides_unpublished_lessons() {
        let course = Course::new(CourseId::new(1), "Rust", true).unwrap();
        let outline = CourseOutline::assemble(
            course,
            vec![section(10, 1)],
            vec![lesson(1, 10, 1, true), lesson(2, 10, 2, false)],
        )
        .unwrap();

        assert_eq!(outline.published_lesson_ids(), vec![LessonId::new(1)]);
        assert!(outline.lesson(LessonId::new(2)).is_none());
    }

    #[test]
    fn rejects_orphans_and_foreign_sections() {
        let course = Course::new(CourseId::new(1), "Rust", true).unwrap();
        let err = CourseOutline::assemble(course.clone(), vec![section(10, 1)], vec![lesson(1, 99, 1, true)])
            .unwrap_err();
        assert!(matches!(err, CourseError::OrphanLesson { .. }));

        let mut other = section(11, 1);
        other.course_id = CourseId::new(2);
        let err = CourseOutline::assemble(course, vec![other], Vec::new()).unwrap_err();
        assert!(matches!(err, CourseError::ForeignSection { .. }));
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            Course::new(CourseId::new(1), "  ", false).unwrap_err(),
            CourseError::EmptyTitle
        );
    }
}
