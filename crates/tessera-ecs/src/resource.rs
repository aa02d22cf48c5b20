use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-map storage for singleton resources shared between systems
/// (scene handle, asset cache, viewpoint, raw input queue).
#[derive(Default)]
pub(crate) struct Resources {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Resources {
    /// Insert a resource, returning any previous value of the same type.
    pub fn insert<T: 'static + Send + Sync>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast().ok())
            .map(|old| *old)
    }

    pub fn get<T: 'static + Send + Sync>(&self) -> Option<&T> {
        self.map.get(&TypeId::of::<T>()).and_then(|b| b.downcast_ref())
    }

    pub fn get_mut<T: 'static + Send + Sync>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut())
    }

    pub fn remove<T: 'static + Send + Sync>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast().ok())
            .map(|b| *b)
    }

    pub fn contains<T: 'static + Send + Sync>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_and_returns_previous() {
        let mut res = Resources::default();
        assert_eq!(res.insert(1u32), None);
        assert_eq!(res.insert(2u32), Some(1));
        assert_eq!(res.get::<u32>(), Some(&2));
    }

    #[test]
    fn distinct_types_coexist() {
        let mut res = Resources::default();
        res.insert(42u32);
        res.insert("hello".to_string());
        assert_eq!(res.get::<u32>(), Some(&42));
        assert_eq!(res.get::<String>().map(String::as_str), Some("hello"));
    }

    #[test]
    fn mutate_and_remove() {
        let mut res = Resources::default();
        res.insert(vec![1, 2, 3]);
        if let Some(v) = res.get_mut::<Vec<i32>>() {
            v.push(4);
        }
        assert_eq!(res.remove::<Vec<i32>>(), Some(vec![1, 2, 3, 4]));
        assert!(!res.contains::<Vec<i32>>());
    }
}
