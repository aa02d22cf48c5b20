//! Gameplay components attached to the character entity

use std::collections::HashSet;

use glam::Vec3;

use crate::input::InputAction;
use crate::locomotion::{MovementIntent, StateName};
use crate::movement::MovementConfig;

/// Movement state: click-to-move target and speeds.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementComponent {
    pub is_moving: bool,
    pub target: Vec3,
    pub has_target: bool,
    /// Units per second
    pub speed: f32,
    /// Speed multiplier while the run modifier is held
    pub run_multiplier: f32,
    /// Radians per second
    pub rotation_speed: f32,
    /// How close to the target counts as arrived
    pub stopping_distance: f32,
}

impl Default for MovementComponent {
    fn default() -> Self {
        Self::from_config(&MovementConfig::default())
    }
}

impl MovementComponent {
    pub fn from_config(config: &MovementConfig) -> Self {
        Self {
            is_moving: false,
            target: Vec3::ZERO,
            has_target: false,
            speed: config.walk_speed,
            run_multiplier: config.run_multiplier,
            rotation_speed: config.rotation_speed,
            stopping_distance: config.stopping_distance,
        }
    }

    /// Start moving toward `target`.
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.has_target = true;
        self.is_moving = true;
    }

    pub fn stop(&mut self) {
        self.is_moving = false;
        self.has_target = false;
    }

    pub fn distance_to_target(&self, position: Vec3) -> f32 {
        position.distance(self.target)
    }
}

/// Per-key input state mirrored onto the character.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputComponent {
    pub held: HashSet<InputAction>,
    pub intent: MovementIntent,
}

impl InputComponent {
    pub fn is_held(&self, action: InputAction) -> bool {
        self.held.contains(&action)
    }

    /// Held direction keys as a world-space direction on the XZ plane
    /// (forward is -Z). Not normalized; zero when nothing is held.
    pub fn direction(&self) -> Vec3 {
        let mut dir = Vec3::ZERO;
        if self.is_held(InputAction::MoveForward) {
            dir.z -= 1.0;
        }
        if self.is_held(InputAction::MoveBackward) {
            dir.z += 1.0;
        }
        if self.is_held(InputAction::MoveLeft) {
            dir.x -= 1.0;
        }
        if self.is_held(InputAction::MoveRight) {
            dir.x += 1.0;
        }
        dir
    }
}

/// Current locomotion state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterComponent {
    pub state: StateName,
}

impl Default for CharacterComponent {
    fn default() -> Self {
        Self {
            state: StateName::Idle,
        }
    }
}

/// Marks a player entity; the local player's position is the viewpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerComponent {
    pub is_local: bool,
    pub player_id: Option<String>,
}

impl PlayerComponent {
    pub fn local() -> Self {
        Self {
            is_local: true,
            player_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_defaults() {
        let movement = MovementComponent::default();
        assert_eq!(movement.speed, 5.0);
        assert_eq!(movement.rotation_speed, 10.0);
        assert_eq!(movement.stopping_distance, 0.1);
        assert!(!movement.is_moving && !movement.has_target);
    }

    #[test]
    fn target_and_stop() {
        let mut movement = MovementComponent::default();
        movement.set_target(Vec3::new(3.0, 0.0, 4.0));
        assert!(movement.is_moving && movement.has_target);
        assert_eq!(movement.distance_to_target(Vec3::ZERO), 5.0);
        movement.stop();
        assert!(!movement.is_moving && !movement.has_target);
    }

    #[test]
    fn opposing_keys_cancel() {
        let mut input = InputComponent::default();
        input.held.insert(InputAction::MoveForward);
        input.held.insert(InputAction::MoveRight);
        assert_eq!(input.direction(), Vec3::new(1.0, 0.0, -1.0));
        input.held.insert(InputAction::MoveBackward);
        assert_eq!(input.direction(), Vec3::new(1.0, 0.0, 0.0));
    }
}
