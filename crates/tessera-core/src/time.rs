//! Frame clock for the client loop
//!
//! Turns raw wall-clock deltas into the clamped, scaled `dt` handed to
//! `World::update` once per frame.

use serde::{Deserialize, Serialize};

/// Configuration for game time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// How many in-game seconds pass per real second
    pub time_scale: f32,
    /// Target frames per second for the driving loop
    pub tick_rate: f32,
    /// Maximum delta time to prevent a spiral of death after a stall
    pub max_delta_time: f32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            tick_rate: 60.0,
            max_delta_time: 0.25,
        }
    }
}

impl TimeConfig {
    /// Duration of one frame at the target tick rate
    pub fn frame_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f32(1.0 / self.tick_rate.max(1.0))
    }
}

/// Game time tracking
#[derive(Debug, Clone, Default)]
pub struct GameTime {
    /// Configuration
    pub config: TimeConfig,
    /// Time since start in seconds
    pub total_time: f64,
    /// Delta time for this frame (clamped and scaled)
    pub delta_time: f32,
    /// Clamped but unscaled delta time
    pub unscaled_delta_time: f32,
    /// Frame counter
    pub frame_count: u64,
    /// Whether the simulation is paused
    pub paused: bool,
}

impl GameTime {
    /// Create a new game time with custom config
    pub fn new(config: TimeConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Advance by the raw delta from the previous frame and return the dt to simulate
    pub fn advance(&mut self, raw_delta: f32) -> f32 {
        self.unscaled_delta_time = raw_delta.clamp(0.0, self.config.max_delta_time);
        self.frame_count += 1;

        if self.paused {
            self.delta_time = 0.0;
            return 0.0;
        }

        self.delta_time = self.unscaled_delta_time * self.config.time_scale;
        self.total_time += self.delta_time as f64;
        self.delta_time
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Set the time scale (0.0 = frozen, 1.0 = normal)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.config.time_scale = scale.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_clamps_and_counts() {
        let mut time = GameTime::default();
        let dt = time.advance(0.016);
        assert!((dt - 0.016).abs() < 1e-6);
        assert_eq!(time.frame_count, 1);

        let dt = time.advance(5.0);
        assert_eq!(dt, time.config.max_delta_time);
    }

    #[test]
    fn test_pause_yields_zero_delta() {
        let mut time = GameTime::default();
        time.pause();
        assert_eq!(time.advance(0.016), 0.0);
        assert_eq!(time.total_time, 0.0);
        time.resume();
        assert!(time.advance(0.016) > 0.0);
    }

    #[test]
    fn test_time_scale() {
        let mut time = GameTime::default();
        time.set_time_scale(2.0);
        assert!((time.advance(0.1) - 0.2).abs() < 1e-6);
        time.set_time_scale(-1.0);
        assert_eq!(time.config.time_scale, 0.0);
    }
}
