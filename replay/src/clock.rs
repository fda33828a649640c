use geom::Duration;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SpeedSetting {
    /// The base progress step every tick
    Normal,
    /// 2x
    Fast,
    /// 4x
    Faster,
    /// 8x
    Fastest,
    /// 16x
    Ludicrous,
}

impl SpeedSetting {
    pub fn multiplier(self) -> f64 {
        match self {
            SpeedSetting::Normal => 1.0,
            SpeedSetting::Fast => 2.0,
            SpeedSetting::Faster => 4.0,
            SpeedSetting::Fastest => 8.0,
            SpeedSetting::Ludicrous => 16.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing
    Idle,
    Advanced,
    /// Sitting at the end, waiting out the grace period
    Holding,
    /// The grace period passed and progress went back to 0
    Wrapped,
}

/// Drives progress in [0, 100] in discrete ticks. Nothing moves between ticks.
pub struct PlaybackClock {
    progress: f64,
    playing: bool,
    speed: SpeedSetting,
    tick_interval: Duration,
    end_grace: Duration,
    base_step: f64,
    // Real time not yet turned into a tick
    pending: Duration,
    // Ticks spent at 100
    held_ticks: usize,
}

impl PlaybackClock {
    pub fn new(tick_interval: Duration, end_grace: Duration, base_step: f64, speed: SpeedSetting) -> Self {
        Self {
            progress: 0.0,
            playing: false,
            speed,
            tick_interval,
            end_grace,
            base_step,
            pending: Duration::ZERO,
            held_ticks: 0,
        }
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> SpeedSetting {
        self.speed
    }

    pub fn set_speed(&mut self, speed: SpeedSetting) {
        self.speed = speed;
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Pauses, rewinds, and forgets any pending tick.
    pub fn stop(&mut self) {
        self.playing = false;
        self.progress = 0.0;
        self.pending = Duration::ZERO;
        self.held_ticks = 0;
    }

    /// Takes effect immediately, not on the next tick.
    pub fn seek(&mut self, progress: f64) {
        self.progress = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 100.0)
        };
        self.held_ticks = 0;
    }

    pub fn tick(&mut self) -> TickOutcome {
        if !self.playing {
            return TickOutcome::Idle;
        }
        if self.progress >= 100.0 {
            self.held_ticks += 1;
            if (self.held_ticks as f64) * self.tick_interval >= self.end_grace {
                self.progress = 0.0;
                self.held_ticks = 0;
                return TickOutcome::Wrapped;
            }
            return TickOutcome::Holding;
        }
        self.progress = (self.progress + self.base_step * self.speed.multiplier()).min(100.0);
        TickOutcome::Advanced
    }

    /// Adds elapsed real time, returning how many whole ticks are now due. The caller runs them.
    pub fn due_ticks(&mut self, real_dt: Duration) -> usize {
        if !self.playing || self.tick_interval <= Duration::ZERO {
            return 0;
        }
        self.pending = self.pending + real_dt;
        let mut due = 0;
        while self.pending >= self.tick_interval {
            self.pending = self.pending - self.tick_interval;
            due += 1;
        }
        due
    }}
