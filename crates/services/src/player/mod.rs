mod controller;
mod media;
mod position;
mod ticker;
mod transport;

pub use controller::{
    PROGRESS_TICK, PlaybackController, PlaybackEvent, PlayerOptions, PlayerStatus,
};
pub use media::{HeadlessMedia, MediaCommand, MediaElement};
pub use position::PositionClock;
pub use ticker::ProgressTicker;
pub use transport::{PLAYBACK_RATES, TransportState, format_timestamp};
