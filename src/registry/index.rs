use crate::core::{FutureError, FutureResult, ALL_PORTS};
use std::collections::HashMap;

/// Insertion-ordered port name index shared by both registries
#[derive(Debug, Clone)]
pub struct PortIndex<V> {
    names: Vec<String>,
    slots: HashMap<String, V>,
}

impl<V> PortIndex<V> {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Add a new port. Fails with `DuplicatePort` if the name is taken.
    pub fn insert(&mut self, name: impl Into<String>, value: V) -> FutureResult<()> {
        let name = name.into();
        if self.slots.contains_key(&name) {
            return Err(FutureError::DuplicatePort(name));
        }
        self.names.push(name.clone());
        self.slots.insert(name, value);
        Ok(())
    }

    /// Mutable slot for `name`, created with `V::default()` on first use
    pub fn entry(&mut self, name: &str) -> &mut V
    where
        V: Default,
    {
        if !self.slots.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.slots.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> FutureResult<&V> {
        self.slots
            .get(name)
            .ok_or_else(|| FutureError::UnknownPort(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> FutureResult<&mut V> {
        self.slots
            .get_mut(name)
            .ok_or_else(|| FutureError::UnknownPort(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Port names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.names.iter().filter_map(|name| self.slots.get(name))
    }

    /// Values addressed by `name`; `ALL_PORTS` selects every port
    pub fn select(&self, name: &str) -> FutureResult<Vec<&V>> {
        if name == ALL_PORTS {
            return Ok(self.values().collect());
        }
        self.get(name).map(|value| vec![value])
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<V> Default for PortIndex<V> {
    fn default() -> Self {
        Self::new()
    }
}
