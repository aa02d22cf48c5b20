//! Clip playback with cross-fades
//!
//! [`AnimationMixer`] is the per-character playback engine: each registered
//! clip has its own time, weight and loop mode, and a cross-fade ramps one
//! clip's weight down while another ramps up. Consumers only see the narrow
//! [`AnimationProxy`] capability.

use std::collections::HashMap;

use tessera_assets::ClipAsset;
use tracing::{debug, warn};

/// How a clip behaves when it reaches its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Repeat,
    /// Play once. With `clamp`, the last frame is held (weight kept) instead
    /// of the clip dropping out.
    Once { clamp: bool },
}

/// Fade out `from` while the requested clip fades in.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossFade {
    pub from: String,
    pub duration: f32,
}

/// A request to start a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayRequest {
    pub clip: String,
    pub loop_mode: LoopMode,
    /// Playback position in seconds to start from.
    pub start_time: f32,
    pub fade: Option<CrossFade>,
}

impl PlayRequest {
    pub fn new(clip: impl Into<String>) -> Self {
        Self {
            clip: clip.into(),
            loop_mode: LoopMode::Repeat,
            start_time: 0.0,
            fade: None,
        }
    }

    pub fn looping(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = loop_mode;
        self
    }

    pub fn at_time(mut self, start_time: f32) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn fade_from(mut self, from: impl Into<String>, duration: f32) -> Self {
        self.fade = Some(CrossFade {
            from: from.into(),
            duration,
        });
        self
    }
}

/// Snapshot of one clip's playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipStatus {
    pub duration: f32,
    pub time: f32,
    pub weight: f32,
    pub playing: bool,
    /// A `Once` clip reached its end since it was last started.
    pub finished: bool,
}

impl ClipStatus {
    /// Playback position as a fraction of the clip length.
    pub fn normalized_time(&self) -> f32 {
        if self.duration > 0.0 {
            self.time / self.duration
        } else {
            0.0
        }
    }
}

/// The capability a locomotion state machine needs from the animation layer:
/// look up a clip and start one.
pub trait AnimationProxy: Send + Sync {
    /// Status of a clip, or `None` if the clip is not available.
    fn animation(&self, name: &str) -> Option<ClipStatus>;

    /// Start a clip. Returns `false` if the clip is not available.
    fn play(&mut self, request: PlayRequest) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    from_weight: f32,
    to_weight: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone)]
struct Action {
    duration: f32,
    time: f32,
    weight: f32,
    loop_mode: LoopMode,
    playing: bool,
    finished: bool,
    fade: Option<Fade>,
}

impl Action {
    fn new(duration: f32) -> Self {
        Self {
            duration,
            time: 0.0,
            weight: 0.0,
            loop_mode: LoopMode::Repeat,
            playing: false,
            finished: false,
            fade: None,
        }
    }

    fn status(&self) -> ClipStatus {
        ClipStatus {
            duration: self.duration,
            time: self.time,
            weight: self.weight,
            playing: self.playing,
            finished: self.finished,
        }
    }

    fn fade_to(&mut self, to_weight: f32, duration: f32) {
        if duration <= 0.0 {
            self.weight = to_weight;
            self.fade = None;
            if to_weight == 0.0 {
                self.playing = false;
            }
            return;
        }
        self.fade = Some(Fade {
            from_weight: self.weight,
            to_weight,
            elapsed: 0.0,
            duration,
        });
    }

    fn advance(&mut self, dt: f32) {
        if self.playing {
            self.time += dt;
            match self.loop_mode {
                LoopMode::Repeat => {
                    if self.duration > 0.0 {
                        self.time = self.time.rem_euclid(self.duration);
                    }
                }
                LoopMode::Once { clamp } => {
                    if self.time >= self.duration {
                        self.finished = true;
                        self.playing = false;
                        if clamp {
                            self.time = self.duration;
                        } else {
                            self.time = 0.0;
                            self.weight = 0.0;
                            self.fade = None;
                        }
                    }
                }
            }
        }

        if let Some(mut fade) = self.fade {
            fade.elapsed += dt;
            let t = (fade.elapsed / fade.duration).min(1.0);
            self.weight = fade.from_weight + (fade.to_weight - fade.from_weight) * t;
            if t >= 1.0 {
                self.fade = None;
                if fade.to_weight == 0.0 {
                    self.playing = false;
                }
            } else {
                self.fade = Some(fade);
            }
        }
    }
}

/// Per-character clip playback.
#[derive(Debug, Default)]
pub struct AnimationMixer {
    actions: HashMap<String, Action>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a clip available under `name`. Replaces any clip of that name.
    pub fn add_clip(&mut self, name: impl Into<String>, clip: &ClipAsset) {
        let name = name.into();
        debug!("Mixer: clip '{}' ({:.2}s)", name, clip.duration);
        self.actions.insert(name, Action::new(clip.duration));
    }

    pub fn has_clip(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn clip_count(&self) -> usize {
        self.actions.len()
    }

    pub fn status(&self, name: &str) -> Option<ClipStatus> {
        self.actions.get(name).map(Action::status)
    }

    /// Start a clip. Without a fade, every other clip is stopped.
    pub fn play(&mut self, request: PlayRequest) -> bool {
        let Some(target) = self.actions.get_mut(&request.clip) else {
            warn!("Mixer: no clip named '{}'", request.clip);
            return false;
        };
        target.loop_mode = request.loop_mode;
        target.time = request.start_time.clamp(0.0, target.duration.max(0.0));
        target.playing = true;
        target.finished = false;

        let fade = request
            .fade
            .filter(|f| f.from != request.clip && self.is_active(&f.from));

        match fade {
            Some(fade) => {
                if let Some(target) = self.actions.get_mut(&request.clip) {
                    target.weight = 0.0;
                    target.fade_to(1.0, fade.duration);
                }
                if let Some(from) = self.actions.get_mut(&fade.from) {
                    from.fade_to(0.0, fade.duration);
                }
            }
            None => {
                for (name, action) in self.actions.iter_mut() {
                    if *name == request.clip {
                        action.weight = 1.0;
                        action.fade = None;
                    } else {
                        action.playing = false;
                        action.weight = 0.0;
                        action.fade = None;
                    }
                }
            }
        }
        true
    }

    /// Stop a clip immediately.
    pub fn stop(&mut self, name: &str) {
        if let Some(action) = self.actions.get_mut(name) {
            action.playing = false;
            action.weight = 0.0;
            action.fade = None;
        }
    }

    /// Advance every clip by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for action in self.actions.values_mut() {
            action.advance(dt);
        }
    }

    /// Names of clips currently contributing to the pose, sorted.
    pub fn active_clips(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .actions
            .iter()
            .filter(|(_, a)| a.weight > 0.0 || (a.playing && a.fade.is_some()))
            .map(|(n, _)| n.clone())
            .collect();
        names.sort();
        names
    }

    fn is_active(&self, name: &str) -> bool {
        self.actions
            .get(name)
            .is_some_and(|a| a.playing || a.weight > 0.0)
    }
}

impl AnimationProxy for AnimationMixer {
    fn animation(&self, name: &str) -> Option<ClipStatus> {
        self.status(name)
    }

    fn play(&mut self, request: PlayRequest) -> bool {
        AnimationMixer::play(self, request)
    }
}
