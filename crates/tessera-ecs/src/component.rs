use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Marker trait for types that can be stored as ECS components.
///
/// Components are plain data records. Each kind is its own Rust type, so the
/// set of kinds is closed at compile time and lookup is a typed table access.
pub trait Component: 'static + Send + Sync {}

impl<T: 'static + Send + Sync> Component for T {}

/// Type-erased view of one component table, used for whole-entity removal.
pub(crate) trait ComponentStorage: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn remove_index(&mut self, index: u32) -> bool;
    fn contains(&self, index: u32) -> bool;
    fn kind_name(&self) -> &'static str;
}

/// Sparse-set table for a single component kind: O(1) insert/remove/lookup and
/// dense iteration.
pub(crate) struct SparseSet<T> {
    /// Entity slot index → dense index.
    sparse: Vec<Option<usize>>,
    dense: Vec<T>,
    /// Slot index owning each dense entry.
    owners: Vec<u32>,
}

impl<T: Component> SparseSet<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            owners: Vec::new(),
        }
    }

    /// Insert or replace. Returns the previous value when one was replaced.
    pub fn insert(&mut self, index: u32, value: T) -> Option<T> {
        let idx = index as usize;
        if idx >= self.sparse.len() {
            self.sparse.resize(idx + 1, None);
        }
        match self.sparse[idx] {
            Some(dense_idx) => Some(std::mem::replace(&mut self.dense[dense_idx], value)),
            None => {
                self.sparse[idx] = Some(self.dense.len());
                self.dense.push(value);
                self.owners.push(index);
                None
            }
        }
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        let dense_idx = (*self.sparse.get(index as usize)?)?;
        self.dense.get(dense_idx)
    }

    pub fn get_mut(&mut self, index: u32) -> Option<&mut T> {
        let dense_idx = (*self.sparse.get(index as usize)?)?;
        self.dense.get_mut(dense_idx)
    }

    /// Remove and return the value for a slot.
    pub fn take(&mut self, index: u32) -> Option<T> {
        let idx = index as usize;
        let dense_idx = self.sparse.get_mut(idx)?.take()?;
        let value = self.dense.swap_remove(dense_idx);
        self.owners.swap_remove(dense_idx);
        // The former last entry now lives at `dense_idx`.
        if let Some(&moved) = self.owners.get(dense_idx) {
            self.sparse[moved as usize] = Some(dense_idx);
        }
        Some(value)
    }

    /// Slot indices that currently hold this component.
    pub fn owners(&self) -> &[u32] {
        &self.owners
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }
}

impl<T: Component> ComponentStorage for SparseSet<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn remove_index(&mut self, index: u32) -> bool {
        self.take(index).is_some()
    }

    fn contains(&self, index: u32) -> bool {
        self.get(index).is_some()
    }

    fn kind_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// Every component table in a registry, keyed by component kind.
#[derive(Default)]
pub struct ComponentTables {
    tables: HashMap<TypeId, Box<dyn ComponentStorage>>,
}

impl ComponentTables {
    pub(crate) fn table<T: Component>(&self) -> Option<&SparseSet<T>> {
        self.tables
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<SparseSet<T>>())
    }

    pub(crate) fn table_mut<T: Component>(&mut self) -> Option<&mut SparseSet<T>> {
        self.tables
            .get_mut(&TypeId::of::<T>())
            .and_then(|s| s.as_any_mut().downcast_mut::<SparseSet<T>>())
    }

    /// The table for `T`, created on first use.
    pub(crate) fn table_or_insert<T: Component>(&mut self) -> &mut SparseSet<T> {
        let storage = self
            .tables
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(SparseSet::<T>::new()));
        match storage.as_any_mut().downcast_mut::<SparseSet<T>>() {
            Some(table) => table,
            // Keys are the TypeId of the boxed table's element type.
            None => unreachable!("component table keyed under the wrong TypeId"),
        }
    }

    pub(crate) fn erased(&self, kind: &TypeId) -> Option<&dyn ComponentStorage> {
        self.tables.get(kind).map(|s| s.as_ref())
    }

    /// Drop every component owned by a slot. Returns the kinds that were removed.
    pub(crate) fn remove_all(&mut self, index: u32) -> Vec<&'static str> {
        self.tables
            .values_mut()
            .filter_map(|table| table.remove_index(index).then(|| table.kind_name()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_get() {
        let mut set = SparseSet::new();
        assert_eq!(set.insert(5, 42i32), None);
        assert_eq!(set.get(5), Some(&42));
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(99), None);
    }

    #[test]
    fn overwrite_returns_previous() {
        let mut set = SparseSet::new();
        set.insert(0, 1i32);
        assert_eq!(set.insert(0, 2), Some(1));
        assert_eq!(set.get(0), Some(&2));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn take_keeps_other_slots_addressable() {
        let mut set = SparseSet::new();
        set.insert(0, 'a');
        set.insert(1, 'b');
        set.insert(2, 'c');
        assert_eq!(set.take(0), Some('a'));
        assert_eq!(set.get(0), None);
        assert_eq!(set.get(1), Some(&'b'));
        assert_eq!(set.get(2), Some(&'c'));
        assert_eq!(set.len(), 2);
        assert_eq!(set.take(0), None);
    }

    #[test]
    fn take_last_entry() {
        let mut set = SparseSet::new();
        set.insert(3, 30u8);
        set.insert(7, 70u8);
        assert_eq!(set.take(7), Some(70));
        assert_eq!(set.owners(), &[3]);
        assert_eq!(set.get(3), Some(&30));
    }
}
