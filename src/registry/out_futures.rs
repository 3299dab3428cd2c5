use super::PortIndex;
use crate::core::port::validate_port_name;
use crate::core::{self, Future, FutureError, FutureResult, ALL_PORTS};
use std::any::Any;
use std::time::Duration;

/// Output registry of a stage: every port name is bound to exactly one future
#[derive(Debug, Clone)]
pub struct OutFutures {
    futures: Vec<Future>,
    index: PortIndex<Future>,
}

impl OutFutures {
    /// Register futures under their own names
    pub fn new(futures: Vec<Future>) -> FutureResult<Self> {
        let names = futures.iter().map(|f| f.name().to_string()).collect();
        Self::with_names(futures, names)
    }

    /// Register futures under explicit port names, matched by position
    pub fn with_names(futures: Vec<Future>, names: Vec<String>) -> FutureResult<Self> {
        if futures.len() != names.len() {
            return Err(FutureError::NameCountMismatch {
                futures: futures.len(),
                names: names.len(),
            });
        }

        let mut index = PortIndex::new();
        for (future, name) in futures.iter().zip(names) {
            validate_port_name(&name)?;
            index.insert(name, future.clone())?;
        }
        Ok(Self { futures, index })
    }

    /// Port names in declaration order
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.index.names()
    }

    /// The future bound to `port_name`. `ALL_PORTS` is rejected, use `get_futures`.
    pub fn get_future(&self, port_name: &str) -> FutureResult<&Future> {
        if port_name == ALL_PORTS {
            return Err(FutureError::UnknownPort(port_name.to_string()));
        }
        self.index.get(port_name)
    }

    /// Every output future in declaration order
    pub fn get_futures(&self) -> &[Future] {
        &self.futures
    }

    /// With `ALL_PORTS`, true when every output is ready
    pub fn is_ready(&self, port_name: &str) -> FutureResult<bool> {
        Ok(self.select(port_name)?.iter().all(|f| f.is_ready()))
    }

    /// With `ALL_PORTS`, waits for every output
    pub fn wait(&self, port_name: &str) -> FutureResult<()> {
        core::wait_for_all(&self.select(port_name)?);
        Ok(())
    }

    pub fn wait_timeout(&self, port_name: &str, timeout: Duration) -> FutureResult<()> {
        core::wait_for_all_timeout(&self.select(port_name)?, timeout)
    }

    /// Wait until one of the selected futures is ready.
    ///
    /// With `ALL_PORTS` this returns as soon as any output of the stage is
    /// ready; otherwise it waits on the named port.
    pub fn wait_for_any(&self, port_name: &str) -> FutureResult<()> {
        core::wait_for_any(&self.select(port_name)?).map(drop)
    }

    pub fn wait_for_any_timeout(&self, port_name: &str, timeout: Duration) -> FutureResult<()> {
        core::wait_for_any_timeout(&self.select(port_name)?, timeout).map(drop)
    }

    pub async fn wait_async(&self, port_name: &str) -> FutureResult<()> {
        for future in self.select(port_name)? {
            future.wait_async().await;
        }
        Ok(())
    }

    pub fn get<T: Any + Clone + Send + Sync>(&self, port_name: &str) -> FutureResult<T> {
        self.get_future(port_name)?.get()
    }

    pub fn take<T: Any + Send + Sync>(&self, port_name: &str) -> FutureResult<T> {
        self.get_future(port_name)?.take()
    }

    fn select(&self, port_name: &str) -> FutureResult<Vec<Future>> {
        Ok(self
            .index
            .select(port_name)?
            .into_iter()
            .cloned()
            .collect())
    }
}
