use thiserror::Error;

use crate::model::{CourseError, EnrollmentError, PlaybackError};

/// Umbrella for the domain validation errors of this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
