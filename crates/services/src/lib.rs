#![forbid(unsafe_code)]

pub mod app_services;
pub mod course_service;
pub mod enrollment_service;
pub mod error;
pub mod identity;
pub mod lesson_player;
pub mod player;
pub mod progress_service;

pub use course_core::Clock;

pub use app_services::AppServices;
pub use course_service::{CourseOverview, CourseService};
pub use enrollment_service::{EnrollmentProgress, EnrollmentService};
pub use error::{
    AppServicesError, CourseServiceError, EnrollmentServiceError, LessonPlayerError, PlayerError,
    ProgressServiceError,
};
pub use identity::{IdentityProvider, StaticIdentity};
pub use lesson_player::{
    LessonPage, LessonPlayer, LessonPlayerService, Notification, NotificationLevel,
};
pub use progress_service::ProgressService;
