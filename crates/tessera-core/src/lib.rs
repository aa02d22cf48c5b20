//! Tessera Core - Core types and utilities for the Tessera client
//!
//! This crate provides the foundational types used throughout the client:
//! - Mathematical primitives (re-exported from glam)
//! - Transform component for entity positioning
//! - Frame clock that feeds `dt` into the world update

pub mod time;
pub mod types;

pub use glam::{Quat, Vec2, Vec3};
pub use time::{GameTime, TimeConfig};
pub use types::{wrap_angle, Transform};
