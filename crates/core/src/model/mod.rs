mod course;
mod enrollment;
mod ids;
pub mod media;
mod progress;

pub use course::{Course, CourseError, CourseOutline, Lesson, OutlineSection, Section};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentUpdate};
pub use ids::{CourseId, LessonId, ParseIdError, SectionId, UserId};
pub use media::{MediaKind, MediaSource, PlaybackError, PlaybackStrategy, PlaybackSupport, QualityLevel};
pub use progress::{LessonProgress, ProgressKey, ProgressWrite};
