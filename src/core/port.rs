//! Port descriptors for pipeline stages.
//!
//! A stage declares its outputs as `OutputPort`s (each owning the promise the
//! stage fulfils) and its inputs as `InputPort`s (each collecting the futures
//! of the upstream outputs connected to it, in connection order).

use super::{DataInfo, Future, FutureError, FutureResult, Futures, Promise};
use std::any::Any;
use tracing::debug;

/// Sentinel port name selecting every future of a registry
pub const ALL_PORTS: &str = "*";

/// Rejects empty names and the `ALL_PORTS` sentinel
pub fn validate_port_name(name: &str) -> FutureResult<()> {
    if name.is_empty() || name == ALL_PORTS {
        return Err(FutureError::InvalidPortName(name.to_string()));
    }
    Ok(())
}

/// Name and value type of a declared port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub data_info: DataInfo,
}

impl PortInfo {
    pub fn new(name: impl Into<String>, data_info: DataInfo) -> FutureResult<Self> {
        let name = name.into();
        validate_port_name(&name)?;
        Ok(Self { name, data_info })
    }

    pub fn of<T: Any>(name: impl Into<String>) -> FutureResult<Self> {
        Self::new(name, DataInfo::of::<T>())
    }
}

/// Declared output of a stage
#[derive(Debug)]
pub struct OutputPort {
    info: PortInfo,
    promise: Promise,
}

impl OutputPort {
    pub fn new(info: PortInfo) -> Self {
        let promise = Promise::with_data_info(info.name.clone(), info.data_info);
        Self { info, promise }
    }

    pub fn of<T: Any + Send + Sync>(name: impl Into<String>) -> FutureResult<Self> {
        PortInfo::of::<T>(name).map(Self::new)
    }

    pub fn info(&self) -> &PortInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn future(&self) -> Future {
        self.promise.future()
    }

    pub fn is_set(&self) -> bool {
        self.promise.is_set()
    }

    /// Publish the stage result on this port
    pub fn set<T: Any + Send + Sync>(&self, value: T) -> FutureResult<()> {
        self.promise.set(value)
    }
}

/// Declared input of a stage and the upstream futures feeding it
#[derive(Debug, Clone)]
pub struct InputPort {
    info: PortInfo,
    futures: Futures,
}

impl InputPort {
    pub fn new(info: PortInfo) -> Self {
        Self {
            info,
            futures: Vec::new(),
        }
    }

    pub fn of<T: Any>(name: impl Into<String>) -> FutureResult<Self> {
        PortInfo::of::<T>(name).map(Self::new)
    }

    pub fn info(&self) -> &PortInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn futures(&self) -> &[Future] {
        &self.futures
    }

    pub fn is_connected(&self) -> bool {
        !self.futures.is_empty()
    }

    /// Connect an upstream output. Fails with `TypeMismatch` when the port types differ.
    pub fn connect(&mut self, output: &OutputPort) -> FutureResult<()> {
        self.connect_future(output.future())
    }

    /// Connect an upstream future directly
    pub fn connect_future(&mut self, future: Future) -> FutureResult<()> {
        self.info.data_info.check_compatible(&future.data_info())?;
        debug!(
            input = %self.info.name,
            upstream = %future.name(),
            fan_in = self.futures.len() + 1,
            "input connected"
        );
        self.futures.push(future);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names_rejected() {
        assert!(matches!(
            PortInfo::of::<u8>(ALL_PORTS),
            Err(FutureError::InvalidPortName(_))
        ));
        assert!(matches!(
            PortInfo::of::<u8>(""),
            Err(FutureError::InvalidPortName(_))
        ));
    }

    #[test]
    fn test_connect_keeps_order() {
        let first = OutputPort::of::<u32>("partial").unwrap();
        let second = OutputPort::of::<u32>("partial").unwrap();
        let mut input = InputPort::of::<u32>("partial").unwrap();

        input.connect(&first).unwrap();
        input.connect(&second).unwrap();

        assert_eq!(input.futures(), &[first.future(), second.future()]);
    }

    #[test]
    fn test_connect_type_mismatch() {
        let output = OutputPort::of::<f32>("volume").unwrap();
        let mut input = InputPort::of::<f64>("volume").unwrap();

        assert!(matches!(
            input.connect(&output),
            Err(FutureError::TypeMismatch { .. })
        ));
        assert!(!input.is_connected());
    }
}
