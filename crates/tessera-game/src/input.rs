//! Input system with action-based mapping
//!
//! Raw key events are queued in an [`InputQueue`] resource by whoever owns the
//! window (or a script). [`InputSystem`] turns them into held actions and a
//! consolidated movement intent, and raises locomotion transitions on edges.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tessera_ecs::{Registry, System};
use tracing::{debug, trace};
use winit::event::ElementState;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::character::CharacterController;
use crate::components::{CharacterComponent, InputComponent};
use crate::locomotion::{MovementIntent, StateName};

/// Game actions that can be triggered by input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InputAction {
    /// Move forward (W by default)
    MoveForward,
    /// Move backward (S by default)
    MoveBackward,
    /// Move left (A by default)
    MoveLeft,
    /// Move right (D by default)
    MoveRight,
    /// Running modifier (Shift by default)
    Run,
    /// Dance (G by default)
    Dance,
}

impl InputAction {
    pub fn is_direction(self) -> bool {
        matches!(
            self,
            InputAction::MoveForward
                | InputAction::MoveBackward
                | InputAction::MoveLeft
                | InputAction::MoveRight
        )
    }
}

/// Maps physical keys to game actions
#[derive(Debug, Clone)]
pub struct InputBindings {
    bindings: HashMap<KeyCode, InputAction>,
    /// Reverse lookup: action to all keys
    reverse: HashMap<InputAction, Vec<KeyCode>>,
}

impl Default for InputBindings {
    fn default() -> Self {
        let mut bindings = Self {
            bindings: HashMap::new(),
            reverse: HashMap::new(),
        };

        // Default WASD bindings
        bindings.bind(KeyCode::KeyW, InputAction::MoveForward);
        bindings.bind(KeyCode::KeyS, InputAction::MoveBackward);
        bindings.bind(KeyCode::KeyA, InputAction::MoveLeft);
        bindings.bind(KeyCode::KeyD, InputAction::MoveRight);

        // Arrow keys as alternative
        bindings.bind(KeyCode::ArrowUp, InputAction::MoveForward);
        bindings.bind(KeyCode::ArrowDown, InputAction::MoveBackward);
        bindings.bind(KeyCode::ArrowLeft, InputAction::MoveLeft);
        bindings.bind(KeyCode::ArrowRight, InputAction::MoveRight);

        bindings.bind(KeyCode::ShiftLeft, InputAction::Run);
        bindings.bind(KeyCode::ShiftRight, InputAction::Run);
        bindings.bind(KeyCode::KeyG, InputAction::Dance);

        bindings
    }
}

impl InputBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key to an action (replacing any previous binding of that key)
    pub fn bind(&mut self, key: KeyCode, action: InputAction) {
        self.unbind(key);
        self.bindings.insert(key, action);
        self.reverse.entry(action).or_default().push(key);
    }

    pub fn unbind(&mut self, key: KeyCode) {
        if let Some(action) = self.bindings.remove(&key) {
            if let Some(keys) = self.reverse.get_mut(&action) {
                keys.retain(|k| *k != key);
            }
        }
    }

    pub fn get_key_action(&self, key: KeyCode) -> Option<InputAction> {
        self.bindings.get(&key).copied()
    }

    /// All keys bound to an action
    pub fn keys_for(&self, action: InputAction) -> &[KeyCode] {
        self.reverse.get(&action).map_or(&[], Vec::as_slice)
    }
}

/// A raw input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    Key { key: KeyCode, state: ElementState },
    /// An action injected directly, bypassing key bindings.
    Action { action: InputAction, state: ElementState },
}

/// Queue of raw input events for the next tick, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct InputQueue {
    events: Vec<RawInput>,
}

impl InputQueue {
    pub fn push(&mut self, event: RawInput) {
        self.events.push(event);
    }

    pub fn key(&mut self, key: KeyCode, state: ElementState) {
        self.push(RawInput::Key { key, state });
    }

    /// Queue a winit keyboard event; keys without a code are ignored.
    pub fn physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        if let PhysicalKey::Code(code) = key {
            self.key(code, state);
        }
    }

    pub fn action(&mut self, action: InputAction, state: ElementState) {
        self.push(RawInput::Action { action, state });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn drain(&mut self) -> Vec<RawInput> {
        std::mem::take(&mut self.events)
    }
}

/// Consumes [`InputQueue`] events, keeps the held-action set and the
/// consolidated intent, and requests locomotion transitions on edges.
#[derive(Debug, Default)]
pub struct InputSystem {
    bindings: InputBindings,
    held: HashSet<InputAction>,
    intent: MovementIntent,
}

impl InputSystem {
    pub fn new(bindings: InputBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            intent: MovementIntent::default(),
        }
    }

    pub fn intent(&self) -> MovementIntent {
        self.intent
    }

    pub fn is_held(&self, action: InputAction) -> bool {
        self.held.contains(&action)
    }

    /// Apply one event; returns the transition it triggers, if any.
    fn handle(&mut self, event: RawInput) -> Option<StateName> {
        let (action, state) = match event {
            RawInput::Key { key, state } => (self.bindings.get_key_action(key)?, state),
            RawInput::Action { action, state } => (action, state),
        };

        let newly_pressed = match state {
            ElementState::Pressed => self.held.insert(action),
            ElementState::Released => {
                self.held.remove(&action);
                false
            }
        };
        if action == InputAction::Dance {
            return newly_pressed.then_some(StateName::Dance);
        }

        let previous = self.intent;
        self.intent = MovementIntent {
            is_moving: self.held.iter().any(|a| a.is_direction()),
            is_running: self.held.contains(&InputAction::Run),
        };
        trace!("{:?} {:?} -> {:?}", action, state, self.intent);

        match (previous.is_moving, self.intent.is_moving) {
            (false, true) => Some(self.intent.desired_state()),
            (true, false) => Some(StateName::Idle),
            (true, true) if previous.is_running != self.intent.is_running => {
                Some(self.intent.desired_state())
            }
            _ => None,
        }
    }
}

impl System for InputSystem {
    fn name(&self) -> &'static str {
        "input"
    }

    fn update(&mut self, registry: &mut Registry, _dt: f32) {
        let events = registry
            .resource_mut::<InputQueue>()
            .map(InputQueue::drain)
            .unwrap_or_default();
        if events.is_empty() {
            return;
        }

        let requests: Vec<StateName> = events.into_iter().filter_map(|e| self.handle(e)).collect();

        for entity in registry.entities_with::<InputComponent>() {
            if let Some(input) = registry.get_mut::<InputComponent>(entity) {
                input.held = self.held.clone();
                input.intent = self.intent;
            }
        }

        if requests.is_empty() {
            return;
        }
        for entity in registry.entities_with::<CharacterComponent>() {
            for &name in &requests {
                if let Some(controller) = registry.get_mut::<CharacterController>(entity) {
                    let outcome = controller.request(name);
                    debug!("Entity {} requested {}: {:?}", entity, name, outcome);
                }
                if let Some(character) = registry.get_mut::<CharacterComponent>(entity) {
                    character.state = name;
                }
            }
        }
    }
}
