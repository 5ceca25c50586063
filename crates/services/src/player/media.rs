use course_core::model::PlaybackStrategy;
use url::Url;

/// Host-side media element driven by the controller.
///
/// Implementations wrap whatever actually renders video; the controller only
/// issues commands and is fed back metadata, time updates, end and errors.
pub trait MediaElement: Send {
    fn load(&mut self, url: &Url, strategy: PlaybackStrategy);
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, seconds: f64);
    fn set_volume(&mut self, volume: f32, muted: bool);
    fn set_playback_rate(&mut self, rate: f32);
    fn set_quality_level(&mut self, level: Option<usize>);
    fn set_fullscreen(&mut self, fullscreen: bool);
}

/// Command log entry, as recorded by `HeadlessMedia`.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCommand {
    Load(Url, PlaybackStrategy),
    Play,
    Pause,
    Seek(f64),
    Volume { volume: f32, muted: bool },
    Rate(f32),
    Quality(Option<usize>),
    Fullscreen(bool),
}

/// A media element with no output that records the commands it receives.
#[derive(Debug, Default)]
pub struct HeadlessMedia {
    commands: Vec<MediaCommand>,
}

impl HeadlessMedia {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn commands(&self) -> &[MediaCommand] {
        &self.commands
    }
}

impl MediaElement for HeadlessMedia {
    fn load(&mut self, url: &Url, strategy: PlaybackStrategy) {
        self.commands.push(MediaCommand::Load(url.clone(), strategy));
    }

    fn play(&mut self) {
        self.commands.push(MediaCommand::Play);
    }

    fn pause(&mut self) {
        self.commands.push(MediaCommand::Pause);
    }

    fn seek(&mut self, seconds: f64) {
        self.commands.push(MediaCommand::Seek(seconds));
    }

    fn set_volume(&mut self, volume: f32, muted: bool) {
        self.commands.push(MediaCommand::Volume { volume, muted });
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.commands.push(MediaCommand::Rate(rate));
    }

    fn set_quality_level(&mut self, level: Option<usize>) {
        self.commands.push(MediaCommand::Quality(level));
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.commands.push(MediaCommand::Fullscreen(fullscreen));
    }
}
