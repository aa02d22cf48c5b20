use std::any::TypeId;

use tracing::{debug, trace};

use crate::component::{Component, ComponentTables};
use crate::entity::{Entity, EntityAllocator};
use crate::error::EcsError;
use crate::query::{self, QueryIter, WorldQuery};
use crate::resource::Resources;

/// Owns entity identities, their components, and shared resources.
#[derive(Default)]
pub struct Registry {
    entities: EntityAllocator,
    components: ComponentTables,
    resources: Resources,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- Entity management ----

    /// Create a new entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.entities.allocate();
        trace!("Created entity {}", entity);
        entity
    }

    /// Remove an entity and release all of its components.
    pub fn remove_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        if !self.entities.release(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        let kinds = self.components.remove_all(entity.index);
        debug!("Removed entity {} ({} components)", entity, kinds.len());
        Ok(())
    }

    /// Check whether an entity is alive.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of alive entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// All alive entities.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    // ---- Component management ----

    /// Attach a component. An entity holds at most one component per kind, so
    /// inserting a second one of the same kind replaces the first.
    pub fn insert<T: Component>(&mut self, entity: Entity, component: T) -> Result<(), EcsError> {
        if !self.entities.is_alive(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        if self
            .components
            .table_or_insert::<T>()
            .insert(entity.index, component)
            .is_some()
        {
            debug!(
                "Entity {} already had a {}; replaced it",
                entity,
                std::any::type_name::<T>()
            );
        }
        Ok(())
    }

    /// Get an immutable reference to a component on an entity.
    pub fn get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.table::<T>()?.get(entity.index)
    }

    /// Get a mutable reference to a component on an entity.
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.table_mut::<T>()?.get_mut(entity.index)
    }

    /// Detach and return a component.
    pub fn remove<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.entities.is_alive(entity) {
            return None;
        }
        self.components.table_mut::<T>()?.take(entity.index)
    }

    /// Check whether an entity has a component of the given kind.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.get::<T>(entity).is_some()
    }

    // ---- Queries ----

    /// Kind-filter query: every alive entity carrying a `T`.
    ///
    /// Returns an owned list so callers can mutate the registry while walking it.
    pub fn entities_with<T: Component>(&self) -> Vec<Entity> {
        let Some(table) = self.components.table::<T>() else {
            return Vec::new();
        };
        table
            .owners()
            .iter()
            .filter_map(|&index| self.entities.live_at(index))
            .collect()
    }

    /// Number of alive entities carrying a `T`.
    pub fn count<T: Component>(&self) -> usize {
        self.components.table::<T>().map_or(0, |t| t.len())
    }

    /// Read-only query over entities that match the given component pattern.
    ///
    /// ```ignore
    /// for (entity, (transform, chunk)) in registry.query::<(&Transform, &ChunkComponent)>() {
    ///     // ...
    /// }
    /// ```
    pub fn query<Q: WorldQuery>(&self) -> QueryIter<'_, Q> {
        let required: Vec<TypeId> = Q::required_type_ids();
        let candidates = query::candidates(&required, &self.components, &self.entities);
        QueryIter {
            entities: &self.entities,
            storages: &self.components,
            candidates: candidates.into_iter(),
            _marker: std::marker::PhantomData,
        }
    }

    // ---- Resources ----

    /// Insert a singleton resource, returning the previous one of that type.
    pub fn insert_resource<T: 'static + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.resources.insert(value)
    }

    /// Get an immutable reference to a resource.
    pub fn resource<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.resources.get::<T>()
    }

    /// Get a mutable reference to a resource.
    pub fn resource_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.resources.get_mut::<T>()
    }

    /// Remove a resource.
    pub fn remove_resource<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.resources.remove::<T>()
    }

    /// Check whether a resource of this type exists.
    pub fn has_resource<T: 'static + Send + Sync>(&self) -> bool {
        self.resources.contains::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Velocity {
        dx: f32,
        dy: f32,
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Name(String);

    #[test]
    fn create_and_remove() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        assert!(registry.contains(e));
        assert_eq!(registry.entity_count(), 1);
        assert_eq!(registry.remove_entity(e), Ok(()));
        assert!(!registry.contains(e));
        assert_eq!(registry.entity_count(), 0);
    }

    #[test]
    fn removing_twice_reports_not_found() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.remove_entity(e).unwrap();
        assert_eq!(registry.remove_entity(e), Err(EcsError::EntityNotFound(e)));
    }

    #[test]
    fn insert_get_remove_component() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.insert(e, Position { x: 1.0, y: 2.0 }).unwrap();
        assert_eq!(registry.get::<Position>(e), Some(&Position { x: 1.0, y: 2.0 }));
        assert!(registry.has::<Position>(e));
        assert_eq!(registry.remove::<Position>(e), Some(Position { x: 1.0, y: 2.0 }));
        assert!(!registry.has::<Position>(e));
    }

    #[test]
    fn second_insert_of_same_kind_wins() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.insert(e, Name("first".into())).unwrap();
        registry.insert(e, Name("second".into())).unwrap();
        assert_eq!(registry.get::<Name>(e), Some(&Name("second".into())));
        assert_eq!(registry.count::<Name>(), 1);
    }

    #[test]
    fn insert_on_removed_entity_fails() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.remove_entity(e).unwrap();
        assert_eq!(
            registry.insert(e, Name("ghost".into())),
            Err(EcsError::EntityNotFound(e))
        );
    }

    #[test]
    fn component_mutation() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.insert(e, Position { x: 0.0, y: 0.0 }).unwrap();
        registry.get_mut::<Position>(e).unwrap().x = 5.0;
        assert_eq!(registry.get::<Position>(e).unwrap().x, 5.0);
    }

    #[test]
    fn entities_with_filters_by_kind() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        let c = registry.create_entity();
        registry.insert(a, Name("a".into())).unwrap();
        registry.insert(c, Name("c".into())).unwrap();
        registry.insert(b, Position { x: 0.0, y: 0.0 }).unwrap();

        let mut named = registry.entities_with::<Name>();
        named.sort();
        assert_eq!(named, vec![a, c]);
        assert!(registry.entities_with::<Velocity>().is_empty());
    }

    #[test]
    fn query_multi_component() {
        let mut registry = Registry::new();
        let e1 = registry.create_entity();
        let e2 = registry.create_entity();
        let e3 = registry.create_entity();
        registry.insert(e1, Position { x: 1.0, y: 0.0 }).unwrap();
        registry.insert(e1, Velocity { dx: 1.0, dy: 0.0 }).unwrap();
        registry.insert(e2, Position { x: 2.0, y: 0.0 }).unwrap();
        registry.insert(e3, Velocity { dx: 3.0, dy: 0.0 }).unwrap();

        let results: Vec<_> = registry.query::<(&Position, &Velocity)>().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, e1);
    }

    #[test]
    fn query_optional() {
        let mut registry = Registry::new();
        let e1 = registry.create_entity();
        let e2 = registry.create_entity();
        registry.insert(e1, Position { x: 1.0, y: 0.0 }).unwrap();
        registry.insert(e1, Name("one".to_string())).unwrap();
        registry.insert(e2, Position { x: 2.0, y: 0.0 }).unwrap();

        let results: Vec<_> = registry.query::<(&Position, Option<&Name>)>().collect();
        assert_eq!(results.len(), 2);
        let with_name = results.iter().filter(|(_, (_, n))| n.is_some()).count();
        assert_eq!(with_name, 1);
    }

    #[test]
    fn removal_releases_components() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.insert(e, Position { x: 1.0, y: 0.0 }).unwrap();
        registry.remove_entity(e).unwrap();

        assert_eq!(registry.query::<(&Position,)>().count(), 0);
        assert_eq!(registry.count::<Position>(), 0);
    }

    #[test]
    fn stale_handle_sees_nothing_after_reuse() {
        let mut registry = Registry::new();
        let e1 = registry.create_entity();
        registry.insert(e1, Position { x: 1.0, y: 0.0 }).unwrap();
        registry.remove_entity(e1).unwrap();

        let e2 = registry.create_entity();
        registry.insert(e2, Position { x: 9.0, y: 0.0 }).unwrap();
        assert_ne!(e1, e2);
        assert_eq!(registry.get::<Position>(e1), None);
        assert!(registry.get_mut::<Position>(e1).is_none());
        assert_eq!(registry.get::<Position>(e2).map(|p| p.x), Some(9.0));
    }

    #[test]
    fn resources() {
        let mut registry = Registry::new();
        registry.insert_resource(42u32);
        assert_eq!(registry.resource::<u32>(), Some(&42));
        *registry.resource_mut::<u32>().unwrap() = 100;
        assert_eq!(registry.resource::<u32>(), Some(&100));
        assert!(registry.has_resource::<u32>());
        assert_eq!(registry.remove_resource::<u32>(), Some(100));
    }
}
