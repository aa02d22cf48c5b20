//! Tessera Game - Character, input and locomotion logic
//!
//! Provides the gameplay components, the input, movement, character and
//! render-sync systems, the locomotion state machine, and the session that
//! wires them into a world.

pub mod character;
pub mod components;
pub mod input;
pub mod locomotion;
pub mod movement;
pub mod render_sync;
pub mod session;

pub use character::{CharacterAssets, CharacterController, CharacterSystem};
pub use components::{CharacterComponent, InputComponent, MovementComponent, PlayerComponent};
pub use input::{InputAction, InputBindings, InputQueue, InputSystem, RawInput};
pub use locomotion::{
    LocomotionConfig, LocomotionMachine, LocomotionState, MovementIntent, SetStateOutcome,
    StateName, Transition,
};
pub use movement::{MovementConfig, MovementSystem};
pub use render_sync::RenderSystem;
pub use session::{GameError, GameSession, SessionConfig};
