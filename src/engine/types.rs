use crate::core::DataInfo;
use std::any::Any;
use std::collections::HashMap;

/// Maps the type names used in wiring configuration to runtime type identities
#[derive(Debug, Clone, Default)]
pub struct DataTypeRegistry {
    types: HashMap<String, DataInfo>,
}

impl DataTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-filled with the scalar types and sample buffers
    pub fn with_primitives() -> Self {
        Self::new()
            .with::<bool>("bool")
            .with::<u32>("u32")
            .with::<u64>("u64")
            .with::<i32>("i32")
            .with::<i64>("i64")
            .with::<f32>("f32")
            .with::<f64>("f64")
            .with::<String>("String")
            .with::<Vec<f32>>("Vec<f32>")
            .with::<Vec<f64>>("Vec<f64>")
            .with::<Vec<u64>>("Vec<u64>")
    }

    pub fn with<T: Any>(mut self, name: impl Into<String>) -> Self {
        self.register::<T>(name);
        self
    }

    /// Register `T` under `name`, replacing any previous binding
    pub fn register<T: Any>(&mut self, name: impl Into<String>) {
        self.types.insert(name.into(), DataInfo::of::<T>());
    }

    pub fn resolve(&self, name: &str) -> Option<DataInfo> {
        self.types.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
