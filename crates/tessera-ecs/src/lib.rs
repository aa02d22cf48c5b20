//! Tessera ECS - Entity Component System
//!
//! Generational entity handles, sparse-set component tables, shared resources,
//! and the [`World`] scheduler that drives registered systems once per tick.

mod component;
mod entity;
mod error;
mod query;
mod registry;
mod resource;
mod system;

pub use component::Component;
pub use entity::Entity;
pub use error::EcsError;
pub use query::{QueryIter, WorldQuery};
pub use registry::Registry;
pub use system::{System, World};
