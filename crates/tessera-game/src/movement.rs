//! Character movement: held direction keys or a click-to-move target

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tessera_core::{wrap_angle, Transform};
use tessera_ecs::{Registry, System};
use tessera_world::Viewpoint;
use tracing::trace;

use crate::components::{InputComponent, MovementComponent, PlayerComponent};

/// Movement configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Walking speed in units per second
    pub walk_speed: f32,
    /// Run speed multiplier (applied to walk_speed)
    pub run_multiplier: f32,
    /// Turning speed in radians per second
    pub rotation_speed: f32,
    /// Distance at which a move target counts as reached
    pub stopping_distance: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_multiplier: 2.0,
            rotation_speed: 10.0,
            stopping_distance: 0.1,
        }
    }
}

impl MovementConfig {
    /// Get the current max speed based on run state
    pub fn max_speed(&self, running: bool) -> f32 {
        if running {
            self.walk_speed * self.run_multiplier
        } else {
            self.walk_speed
        }
    }
}

/// Yaw (rotation about +Y) that points the forward axis (-Z) along `heading`.
pub fn yaw_for_heading(heading: Vec3) -> f32 {
    (-heading.x).atan2(-heading.z)
}

/// Turn `current` toward `target` by at most `max_step` radians.
fn turn_toward(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(target - current);
    wrap_angle(current + diff.clamp(-max_step, max_step))
}

/// Moves every entity with a `Transform` and a `MovementComponent`.
///
/// Held direction keys take priority and cancel any move target. The local
/// player's resulting position is published as the [`Viewpoint`].
#[derive(Debug, Default)]
pub struct MovementSystem;

impl MovementSystem {
    pub fn new() -> Self {
        Self
    }

    fn step(
        transform: &mut Transform,
        movement: &mut MovementComponent,
        input: Option<&InputComponent>,
        dt: f32,
    ) {
        let held = input.map(InputComponent::direction).unwrap_or(Vec3::ZERO);

        let velocity = if held != Vec3::ZERO {
            movement.has_target = false;
            let running = input.is_some_and(|i| i.intent.is_running);
            let speed = if running {
                movement.speed * movement.run_multiplier
            } else {
                movement.speed
            };
            held.normalize() * speed
        } else if movement.has_target {
            let mut to_target = movement.target - transform.position;
            to_target.y = 0.0;
            let distance = to_target.length();
            if distance <= movement.stopping_distance {
                movement.stop();
                return;
            }
            // Don't overshoot the target on the last step
            let speed = movement.speed.min(distance / dt.max(f32::EPSILON));
            to_target / distance * speed
        } else {
            movement.is_moving = false;
            return;
        };

        movement.is_moving = true;
        transform.translate(velocity * dt);

        let target_yaw = yaw_for_heading(velocity);
        transform.rotation.y = turn_toward(
            transform.rotation.y,
            target_yaw,
            movement.rotation_speed * dt,
        );
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn update(&mut self, registry: &mut Registry, dt: f32) {
        if dt <= 0.0 {
            return;
        }

        let mut viewpoint = None;
        for entity in registry.entities_with::<MovementComponent>() {
            let input = registry.get::<InputComponent>(entity).cloned();
            let (Some(mut transform), Some(mut movement)) = (
                registry.get::<Transform>(entity).copied(),
                registry.get::<MovementComponent>(entity).cloned(),
            ) else {
                continue;
            };

            Self::step(&mut transform, &mut movement, input.as_ref(), dt);
            trace!(
                "Entity {} at {:?} (moving: {})",
                entity,
                transform.position,
                movement.is_moving
            );

            if registry.get::<PlayerComponent>(entity).is_some_and(|p| p.is_local) {
                viewpoint = Some(transform.position);
            }
            if let Some(slot) = registry.get_mut::<Transform>(entity) {
                *slot = transform;
            }
            if let Some(slot) = registry.get_mut::<MovementComponent>(entity) {
                *slot = movement;
            }
        }

        if let Some(position) = viewpoint {
            match registry.resource_mut::<Viewpoint>() {
                Some(view) => view.position = position,
                None => {
                    registry.insert_resource(Viewpoint::new(position));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::InputAction;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn spawn(registry: &mut Registry, local: bool) -> tessera_ecs::Entity {
        let e = registry.create_entity();
        registry.insert(e, Transform::default()).unwrap();
        registry.insert(e, MovementComponent::default()).unwrap();
        registry.insert(e, InputComponent::default()).unwrap();
        if local {
            registry.insert(e, PlayerComponent::local()).unwrap();
        }
        e
    }

    #[test]
    fn run_speed_scales_walk_speed() {
        let config = MovementConfig::default();
        assert_eq!(config.max_speed(false), 5.0);
        assert_eq!(config.max_speed(true), 10.0);
        assert_eq!(MovementComponent::from_config(&config).run_multiplier, 2.0);
    }

    #[test]
    fn heading_yaw_matches_forward_axis() {
        assert!(approx(yaw_for_heading(Vec3::NEG_Z), 0.0));
        assert!(approx(yaw_for_heading(Vec3::NEG_X), FRAC_PI_2));
        assert!(approx(yaw_for_heading(Vec3::X), -FRAC_PI_2));
        assert!(approx(yaw_for_heading(Vec3::Z).abs(), PI));

        let mut t = Transform::default();
        t.rotation.y = yaw_for_heading(Vec3::X);
        assert!(t.forward().distance(Vec3::X) < 1e-4);
    }

    #[test]
    fn turning_is_rate_limited_and_takes_the_short_way() {
        assert!(approx(turn_toward(0.0, 1.0, 0.25), 0.25));
        assert!(approx(turn_toward(0.0, -1.0, 0.25), -0.25));
        assert!(approx(turn_toward(0.0, 0.1, 0.25), 0.1));
        // From just below PI to just above -PI is a short hop across the seam
        assert!(approx(turn_toward(3.0, -3.0, 0.1), 3.1));
    }

    #[test]
    fn held_keys_move_at_walk_and_run_speed() {
        let mut registry = Registry::new();
        let e = spawn(&mut registry, false);
        registry
            .get_mut::<InputComponent>(e)
            .unwrap()
            .held
            .insert(InputAction::MoveForward);

        let mut system = MovementSystem::new();
        system.update(&mut registry, 1.0);
        assert!(approx(registry.get::<Transform>(e).unwrap().position.z, -5.0));
        assert!(registry.get::<MovementComponent>(e).unwrap().is_moving);

        let input = registry.get_mut::<InputComponent>(e).unwrap();
        input.intent.is_running = true;
        system.update(&mut registry, 1.0);
        assert!(approx(registry.get::<Transform>(e).unwrap().position.z, -15.0));
    }

    #[test]
    fn target_is_reached_and_stops() {
        let mut registry = Registry::new();
        let e = spawn(&mut registry, false);
        registry
            .get_mut::<MovementComponent>(e)
            .unwrap()
            .set_target(Vec3::new(2.0, 0.0, 0.0));

        let mut system = MovementSystem::new();
        system.update(&mut registry, 0.25);
        let position = registry.get::<Transform>(e).unwrap().position;
        assert!(approx(position.x, 1.25));

        system.update(&mut registry, 1.0);
        assert!(approx(registry.get::<Transform>(e).unwrap().position.x, 2.0));
        system.update(&mut registry, 0.1);
        let movement = registry.get::<MovementComponent>(e).unwrap();
        assert!(!movement.is_moving);
        assert!(!movement.has_target);
    }

    #[test]
    fn keys_cancel_the_target() {
        let mut registry = Registry::new();
        let e = spawn(&mut registry, false);
        registry
            .get_mut::<MovementComponent>(e)
            .unwrap()
            .set_target(Vec3::new(10.0, 0.0, 0.0));
        registry
            .get_mut::<InputComponent>(e)
            .unwrap()
            .held
            .insert(InputAction::MoveLeft);

        MovementSystem::new().update(&mut registry, 0.1);
        assert!(!registry.get::<MovementComponent>(e).unwrap().has_target);
        assert!(registry.get::<Transform>(e).unwrap().position.x < 0.0);
    }

    #[test]
    fn local_player_drives_the_viewpoint() {
        let mut registry = Registry::new();
        registry.insert_resource(Viewpoint::default());
        let remote = spawn(&mut registry, false);
        let local = spawn(&mut registry, true);
        registry
            .get_mut::<InputComponent>(remote)
            .unwrap()
            .held
            .insert(InputAction::MoveRight);
        registry
            .get_mut::<InputComponent>(local)
            .unwrap()
            .held
            .insert(InputAction::MoveBackward);

        MovementSystem::new().update(&mut registry, 1.0);
        let view = registry.resource::<Viewpoint>().unwrap();
        assert!(approx(view.position.z, 5.0));
        assert!(approx(view.position.x, 0.0));
    }

    #[test]
    fn idle_entity_is_not_moving() {
        let mut registry = Registry::new();
        let e = spawn(&mut registry, false);
        registry.get_mut::<MovementComponent>(e).unwrap().is_moving = true;
        MovementSystem::new().update(&mut registry, 0.1);
        assert!(!registry.get::<MovementComponent>(e).unwrap().is_moving);
        assert_eq!(registry.get::<Transform>(e).unwrap().position, Vec3::ZERO);
    }
}
