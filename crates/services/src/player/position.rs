use tokio::time::Instant;

/// Playback position derived from a monotonic anchor.
///
/// While running, the position advances with wall-clock time scaled by the
/// playback rate. It never exceeds the media duration once that is known.
#[derive(Debug, Clone)]
pub struct PositionClock {
    base: f64,
    anchor: Option<Instant>,
    rate: f64,
    duration: Option<f64>,
}

impl Default for PositionClock {
    fn default() -> Self {
        Self {
            base: 0.0,
            anchor: None,
            rate: 1.0,
            duration: None,
        }
    }
}

impl PositionClock {
    #[must_use]
    pub fn current(&self) -> f64 {
        let elapsed = self
            .anchor
            .map_or(0.0, |a| a.elapsed().as_secs_f64() * self.rate);
        self.clamp(self.base + elapsed)
    }

    /// Current position truncated to whole seconds.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn whole_seconds(&self) -> u32 {
        let secs = self.current().trunc();
        if secs <= 0.0 {
            0
        } else if secs >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            secs as u32
        }
    }

    #[must_use]
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn set_duration(&mut self, duration: f64) {
        self.duration = Some(duration.max(0.0));
    }

    pub fn start(&mut self) {
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
        }
    }

    pub fn stop(&mut self) {
        self.base = self.current();
        self.anchor = None;
    }

    /// Jump to `position`, keeping the running state.
    pub fn set(&mut self, position: f64) {
        self.base = self.clamp(position);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.set(self.current());
        self.rate = rate;
    }

    fn clamp(&self, position: f64) -> f64 {
        let floor = position.max(0.0);
        match self.duration {
            Some(d) => floor.min(d),
            None => floor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn advances_only_while_running() {
        let mut clock = PositionClock::default();
        clock.set_duration(100.0);
        clock.start();
        tokio::time::advance(Duration::from_secs(4)).await;
        clock.stop();
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(clock.whole_seconds(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_scales_and_duration_caps() {
        let mut clock = PositionClock::default();
        clock.set_duration(10.0);
        clock.set_rate(2.0);
        clock.start();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.whole_seconds(), 6);
        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(clock.whole_seconds(), 10);
    }
}
