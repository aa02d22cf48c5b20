use tracing::{debug, info};

use crate::component::Component;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::registry::Registry;

/// A subsystem driven by the [`World`] every tick.
///
/// Systems never hold references into each other; anything they share lives
/// in the registry as a resource or a component.
pub trait System: Send + Sync {
    /// Name used in logs and configuration errors.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Called exactly once, after every system has been registered.
    fn init(&mut self, _registry: &mut Registry) -> Result<(), EcsError> {
        Ok(())
    }

    /// Called once per tick, in registration order.
    fn update(&mut self, registry: &mut Registry, dt: f32);
}

/// Closures can be used as systems.
impl<F: FnMut(&mut Registry, f32) + Send + Sync> System for F {
    fn update(&mut self, registry: &mut Registry, dt: f32) {
        (self)(registry, dt);
    }
}

/// The system scheduler: owns the registry and an ordered list of systems.
#[derive(Default)]
pub struct World {
    registry: Registry,
    systems: Vec<Box<dyn System>>,
    initialized: bool,
    tick: u64,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        self.registry.create_entity()
    }

    /// Remove an entity and all of its components.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.registry.remove_entity(entity)
    }

    /// Attach a component to an entity.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        self.registry.insert(entity, component)
    }

    /// Insert a singleton resource visible to every system.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.registry.insert_resource(value)
    }

    /// Append a system to the schedule.
    ///
    /// Systems registered after [`World::init`] are initialized immediately so
    /// every system still sees exactly one `init` call.
    pub fn register_system<S: System + 'static>(&mut self, system: S) -> Result<(), EcsError> {
        let mut system: Box<dyn System> = Box::new(system);
        if self.initialized {
            debug!("Late registration of '{}', initializing now", system.name());
            system.init(&mut self.registry)?;
        }
        self.systems.push(system);
        Ok(())
    }

    /// Initialize every registered system in registration order.
    ///
    /// Stops at the first failure; a failed init is fatal for startup.
    pub fn init(&mut self) -> Result<(), EcsError> {
        if self.initialized {
            return Ok(());
        }
        for system in &mut self.systems {
            debug!("Initializing system '{}'", system.name());
            system.init(&mut self.registry)?;
        }
        self.initialized = true;
        info!("World initialized with {} systems", self.systems.len());
        Ok(())
    }

    /// Run one tick: every system's `update(dt)` in registration order.
    pub fn update(&mut self, dt: f32) {
        for system in &mut self.systems {
            system.update(&mut self.registry, dt);
        }
        self.tick += 1;
    }

    /// Whether [`World::init`] has completed.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of completed ticks.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Number of registered systems.
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.registry.entity_count()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }
}
