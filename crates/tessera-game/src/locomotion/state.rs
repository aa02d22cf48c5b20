use tessera_render::{AnimationProxy, LoopMode, PlayRequest};
use tracing::debug;

use super::{LocomotionConfig, MovementIntent, StateName};

/// A live locomotion state with its enter/exit/update behavior.
#[derive(Debug, Clone, PartialEq)]
pub enum LocomotionState {
    Idle,
    Walk,
    Run,
    /// `watching` is set while the one-shot dance clip is being polled for
    /// completion.
    Dance { watching: bool },
}

impl LocomotionState {
    pub fn new(name: StateName) -> Self {
        match name {
            StateName::Idle => LocomotionState::Idle,
            StateName::Walk => LocomotionState::Walk,
            StateName::Run => LocomotionState::Run,
            StateName::Dance => LocomotionState::Dance { watching: false },
        }
    }

    pub fn name(&self) -> StateName {
        match self {
            LocomotionState::Idle => StateName::Idle,
            LocomotionState::Walk => StateName::Walk,
            LocomotionState::Run => StateName::Run,
            LocomotionState::Dance { .. } => StateName::Dance,
        }
    }

    /// Start this state's clip, cross-fading from the previous state's clip
    /// when both are available.
    pub fn enter(
        &mut self,
        previous: Option<StateName>,
        proxy: &mut dyn AnimationProxy,
        config: &LocomotionConfig,
    ) {
        let name = self.name();
        let Some(current) = proxy.animation(name.clip()) else {
            debug!("No '{}' clip to play", name);
            return;
        };
        let prev_status = previous.and_then(|p| proxy.animation(p.clip()).map(|s| (p, s)));

        let mut request = PlayRequest::new(name.clip());
        match self {
            LocomotionState::Dance { watching } => {
                request = request.looping(LoopMode::Once { clamp: true });
                if let Some((prev, _)) = prev_status {
                    request = request.fade_from(prev.clip(), config.dance_fade_duration);
                }
                *watching = true;
            }
            _ => {
                if let Some((prev, status)) = prev_status {
                    let paired = matches!(
                        (prev, name),
                        (StateName::Walk, StateName::Run) | (StateName::Run, StateName::Walk)
                    );
                    if paired && status.duration > 0.0 {
                        // Keep the gait phase: scale by the clip length ratio.
                        request = request.at_time(status.time * current.duration / status.duration);
                    }
                    request = request.fade_from(prev.clip(), config.fade_duration);
                }
            }
        }
        proxy.play(request);
    }

    pub fn exit(&mut self) {
        if let LocomotionState::Dance { watching } = self {
            *watching = false;
        }
    }

    /// Returns the state to switch to, if any.
    pub fn update(
        &mut self,
        _dt: f32,
        input: MovementIntent,
        proxy: &dyn AnimationProxy,
    ) -> Option<StateName> {
        match self {
            LocomotionState::Idle => input.is_moving.then(|| input.desired_state()),
            LocomotionState::Walk | LocomotionState::Run => {
                let desired = input.desired_state();
                (desired != self.name()).then_some(desired)
            }
            LocomotionState::Dance { watching } => {
                let finished = *watching
                    && proxy
                        .animation(StateName::Dance.clip())
                        .is_some_and(|s| s.finished);
                if finished {
                    *watching = false;
                    Some(StateName::Idle)
                } else {
                    None
                }
            }
        }
    }
}
