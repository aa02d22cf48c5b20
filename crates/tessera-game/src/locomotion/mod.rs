//! Locomotion animation state machine
//!
//! Four states (`idle`, `walk`, `run`, `dance`) driven by movement intent.
//! The machine only talks to animation through [`AnimationProxy`], so it can
//! be driven by a real mixer or a test double.
//!
//! [`AnimationProxy`]: tessera_render::AnimationProxy

mod machine;
mod state;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use machine::{LocomotionMachine, SetStateOutcome, Transition};
pub use state::LocomotionState;

/// Name of a locomotion state. Each state plays the clip of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateName {
    Idle,
    Walk,
    Run,
    Dance,
}

impl StateName {
    pub const ALL: [StateName; 4] = [
        StateName::Idle,
        StateName::Walk,
        StateName::Run,
        StateName::Dance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StateName::Idle => "idle",
            StateName::Walk => "walk",
            StateName::Run => "run",
            StateName::Dance => "dance",
        }
    }

    /// Name of the clip this state plays.
    pub fn clip(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StateName::ALL
            .into_iter()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| format!("unknown locomotion state '{s}'"))
    }
}

/// Consolidated movement intent fed to the machine each tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementIntent {
    pub is_moving: bool,
    pub is_running: bool,
}

impl MovementIntent {
    /// The state this intent asks for when it starts or changes.
    pub fn desired_state(self) -> StateName {
        match (self.is_moving, self.is_running) {
            (false, _) => StateName::Idle,
            (true, false) => StateName::Walk,
            (true, true) => StateName::Run,
        }
    }
}

/// Cross-fade timing and diagnostics settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Fade between idle, walk and run, in seconds
    pub fade_duration: f32,
    /// Fade into dance, in seconds
    pub dance_fade_duration: f32,
    /// Transitions kept for diagnostics
    pub history_len: usize,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            fade_duration: 0.5,
            dance_fade_duration: 0.2,
            history_len: 32,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use tessera_assets::ClipAsset;
    use tessera_render::AnimationMixer;

    /// A mixer with every locomotion clip except those listed.
    pub fn mixer_without(missing: &[&str]) -> AnimationMixer {
        let mut mixer = AnimationMixer::new();
        for (name, duration) in [("idle", 2.0), ("walk", 1.0), ("run", 0.5), ("dance", 1.5)] {
            if !missing.contains(&name) {
                mixer.add_clip(
                    name,
                    &ClipAsset {
                        name: name.to_string(),
                        duration,
                    },
                );
            }
        }
        mixer
    }
}
