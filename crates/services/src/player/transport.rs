use course_core::model::QualityLevel;

/// Selectable playback speeds.
pub const PLAYBACK_RATES: [f32; 6] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0];

/// UI-only transport settings. None of these reach the server.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportState {
    pub volume: f32,
    pub muted: bool,
    pub playback_rate: f32,
    pub fullscreen: bool,
    pub levels: Vec<QualityLevel>,
    /// `None` means automatic level selection.
    pub quality: Option<usize>,
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            muted: false,
            playback_rate: 1.0,
            fullscreen: false,
            levels: Vec::new(),
            quality: None,
        }
    }
}

/// Scrub-bar label: `m:ss`, or `h:mm:ss` past the hour.
#[must_use]
pub fn format_timestamp(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_hours() {
        assert_eq!(format_timestamp(0), "0:00");
        assert_eq!(format_timestamp(75), "1:15");
        assert_eq!(format_timestamp(3_725), "1:02:05");
    }
}
