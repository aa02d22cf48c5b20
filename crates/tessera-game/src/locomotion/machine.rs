use std::collections::VecDeque;

use tessera_render::AnimationProxy;
use tracing::{debug, info};

use super::{LocomotionConfig, LocomotionState, MovementIntent, StateName};

/// Result of asking the machine to change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetStateOutcome {
    Applied,
    /// Already in that state.
    Unchanged,
    /// The target clip is not available yet; the transition is remembered and
    /// applied once it is.
    Deferred,
}

/// A completed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Option<StateName>,
    pub to: StateName,
}

/// Finite-state machine over [`LocomotionState`]s.
#[derive(Debug)]
pub struct LocomotionMachine {
    config: LocomotionConfig,
    current: Option<LocomotionState>,
    pending: Option<StateName>,
    history: VecDeque<Transition>,
}

impl LocomotionMachine {
    pub fn new(config: LocomotionConfig) -> Self {
        Self {
            config,
            current: None,
            pending: None,
            history: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn current(&self) -> Option<StateName> {
        self.current.as_ref().map(LocomotionState::name)
    }

    /// A deferred transition waiting for its clip.
    pub fn pending(&self) -> Option<StateName> {
        self.pending
    }

    /// Recent transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    pub fn last_transition(&self) -> Option<Transition> {
        self.history.back().copied()
    }

    /// Switch to `name`: exit the current state, then enter the new one.
    pub fn set_state(&mut self, name: StateName, proxy: &mut dyn AnimationProxy) -> SetStateOutcome {
        let previous = self.current();
        if previous == Some(name) {
            self.pending = None;
            return SetStateOutcome::Unchanged;
        }
        if proxy.animation(name.clip()).is_none() {
            debug!("Clip '{}' not available, deferring transition", name.clip());
            self.pending = Some(name);
            return SetStateOutcome::Deferred;
        }

        if let Some(state) = self.current.as_mut() {
            state.exit();
        }
        match previous {
            Some(prev) => info!("Locomotion: {} -> {}", prev, name),
            None => info!("Locomotion: entering {}", name),
        }

        let mut state = LocomotionState::new(name);
        state.enter(previous, proxy, &self.config);
        self.current = Some(state);
        self.pending = None;
        self.record(Transition { from: previous, to: name });
        SetStateOutcome::Applied
    }

    /// Apply any deferred transition whose clip has arrived, then let the
    /// current state react to `input`. Returns the last transition applied.
    pub fn update(
        &mut self,
        dt: f32,
        input: MovementIntent,
        proxy: &mut dyn AnimationProxy,
    ) -> Option<Transition> {
        let mut applied = None;

        if let Some(pending) = self.pending {
            if proxy.animation(pending.clip()).is_some()
                && self.set_state(pending, proxy) == SetStateOutcome::Applied
            {
                applied = self.last_transition();
            }
        }

        let next = self.current.as_mut()?.update(dt, input, proxy);
        if let Some(next) = next {
            if self.set_state(next, proxy) == SetStateOutcome::Applied {
                applied = self.last_transition();
            }
        }
        applied
    }

    fn record(&mut self, transition: Transition) {
        if self.config.history_len == 0 {
            return;
        }
        while self.history.len() >= self.config.history_len {
            self.history.pop_front();
        }
        self.history.push_back(transition);
    }
}

impl Default for LocomotionMachine {
    fn default() -> Self {
        Self::new(LocomotionConfig::default())
    }
}
