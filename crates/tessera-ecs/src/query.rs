use std::any::TypeId;

use crate::component::{Component, ComponentTables};
use crate::entity::{Entity, EntityAllocator};

/// Read-only query parameter (`&T`, `Option<&T>` and tuples of those).
///
/// Mutation goes through `Registry::get_mut` on the entities a query yields.
pub trait WorldQuery {
    type Item<'w>;

    /// Component kinds that must be present on a matching entity.
    fn required_type_ids() -> Vec<TypeId>;

    /// Fetch the item for a slot, or `None` when a required kind is missing.
    #[doc(hidden)]
    fn fetch(storages: &ComponentTables, index: u32) -> Option<Self::Item<'_>>;
}

impl<T: Component> WorldQuery for &T {
    type Item<'w> = &'w T;

    fn required_type_ids() -> Vec<TypeId> {
        vec![TypeId::of::<T>()]
    }

    fn fetch(storages: &ComponentTables, index: u32) -> Option<Self::Item<'_>> {
        storages.table::<T>()?.get(index)
    }
}

impl<T: Component> WorldQuery for Option<&T> {
    type Item<'w> = Option<&'w T>;

    fn required_type_ids() -> Vec<TypeId> {
        Vec::new()
    }

    fn fetch(storages: &ComponentTables, index: u32) -> Option<Self::Item<'_>> {
        Some(storages.table::<T>().and_then(|t| t.get(index)))
    }
}

macro_rules! impl_world_query_tuple {
    ($($name:ident),+) => {
        impl<$($name: WorldQuery),+> WorldQuery for ($($name,)+) {
            type Item<'w> = ($($name::Item<'w>,)+);

            fn required_type_ids() -> Vec<TypeId> {
                let mut ids = Vec::new();
                $(ids.extend($name::required_type_ids());)+
                ids
            }

            fn fetch(storages: &ComponentTables, index: u32) -> Option<Self::Item<'_>> {
                Some(($($name::fetch(storages, index)?,)+))
            }
        }
    };
}

impl_world_query_tuple!(A);
impl_world_query_tuple!(A, B);
impl_world_query_tuple!(A, B, C);
impl_world_query_tuple!(A, B, C, D);
impl_world_query_tuple!(A, B, C, D, E);

/// Candidate slots for a query: the owners of the smallest required table, or
/// every live slot when nothing is required.
pub(crate) fn candidates(
    required: &[TypeId],
    storages: &ComponentTables,
    entities: &EntityAllocator,
) -> Vec<u32> {
    if required.is_empty() {
        return entities.iter().map(|e| e.index()).collect();
    }
    let mut best: Option<Vec<u32>> = None;
    for tid in required {
        let Some(storage) = storages.erased(tid) else {
            // A required kind has never been inserted: nothing can match.
            return Vec::new();
        };
        let owners: Vec<u32> = entities
            .iter()
            .map(|e| e.index())
            .filter(|&i| storage.contains(i))
            .collect();
        if best.as_ref().map_or(true, |b| owners.len() < b.len()) {
            best = Some(owners);
        }
    }
    best.unwrap_or_default()
}

/// Iterator returned by `Registry::query`. Yields `(Entity, Q::Item)`.
pub struct QueryIter<'w, Q: WorldQuery> {
    pub(crate) entities: &'w EntityAllocator,
    pub(crate) storages: &'w ComponentTables,
    pub(crate) candidates: std::vec::IntoIter<u32>,
    pub(crate) _marker: std::marker::PhantomData<Q>,
}

impl<'w, Q: WorldQuery> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        for index in self.candidates.by_ref() {
            let Some(entity) = self.entities.live_at(index) else {
                continue;
            };
            if let Some(item) = Q::fetch(self.storages, index) {
                return Some((entity, item));
            }
        }
        None
    }
}
