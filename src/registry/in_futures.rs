use super::PortIndex;
use crate::core::future::take_all;
use crate::core::{self, DataInfo, Future, FutureResult, InputPort};
use std::any::Any;
use std::collections::HashMap;
use std::time::Duration;
use tracing::trace;

/// Input registry of a stage: a port name may be fed by several upstream
/// futures (fan-in). Values always come back in connection order.
#[derive(Debug, Clone)]
pub struct InFutures {
    index: PortIndex<Vec<Future>>,
}

impl InFutures {
    /// Build from the stage's input ports. Ports sharing a name are merged and
    /// must declare the same data type.
    pub fn new(input_ports: &[InputPort]) -> FutureResult<Self> {
        let mut index: PortIndex<Vec<Future>> = PortIndex::new();
        let mut declared: HashMap<&str, &DataInfo> = HashMap::new();
        for port in input_ports {
            let data = &port.info().data_info;
            if let Some(first) = declared.get(port.name()) {
                first.check_compatible(data)?;
            } else {
                declared.insert(port.name(), data);
            }
            index
                .entry(port.name())
                .extend(port.futures().iter().cloned());
        }
        Ok(Self { index })
    }

    /// Declared input names in declaration order
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.index.names()
    }

    /// Futures feeding `port_name`; `ALL_PORTS` selects every connected future
    pub fn get_futures(&self, port_name: &str) -> FutureResult<Vec<Future>> {
        Ok(self
            .index
            .select(port_name)?
            .into_iter()
            .flatten()
            .cloned()
            .collect())
    }

    /// True when every future feeding the port is ready
    pub fn is_ready(&self, port_name: &str) -> FutureResult<bool> {
        Ok(core::all_ready(&self.get_futures(port_name)?))
    }

    pub fn wait(&self, port_name: &str) -> FutureResult<()> {
        core::wait_for_all(&self.get_futures(port_name)?);
        Ok(())
    }

    pub fn wait_timeout(&self, port_name: &str, timeout: Duration) -> FutureResult<()> {
        core::wait_for_all_timeout(&self.get_futures(port_name)?, timeout)
    }

    pub fn wait_for_any(&self, port_name: &str) -> FutureResult<()> {
        core::wait_for_any(&self.get_futures(port_name)?).map(drop)
    }

    /// Join: block on every upstream future and copy their values
    pub fn get<T: Any + Clone + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        check_all::<T>(futures)?;
        futures.iter().map(Future::get::<T>).collect()
    }

    /// Join: block on every upstream future, then move all values out at
    /// once. On error nothing has been moved.
    pub fn take<T: Any + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        check_all::<T>(futures)?;
        core::wait_for_all(futures);
        take_all(futures, false)
    }

    /// Copy the values that are ready right now, skipping pending producers
    pub fn get_ready<T: Any + Clone + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        let mut results = Vec::with_capacity(futures.len());
        for future in futures {
            if let Some(value) = future.try_get()? {
                results.push(value);
            }
        }
        trace!(port = port_name, ready = results.len(), total = futures.len(), "partial read");
        Ok(results)
    }

    /// Move out the values that are ready right now. Futures consumed by an
    /// earlier call are skipped, so repeated polling drains each producer once.
    /// On error nothing has been moved.
    pub fn take_ready<T: Any + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        let results = take_all(futures, true)?;
        trace!(port = port_name, taken = results.len(), total = futures.len(), "partial take");
        Ok(results)
    }

    pub async fn get_async<T: Any + Clone + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        check_all::<T>(futures)?;
        let mut results = Vec::with_capacity(futures.len());
        for future in futures {
            results.push(future.get_async().await?);
        }
        Ok(results)
    }

    pub async fn take_async<T: Any + Send + Sync>(&self, port_name: &str) -> FutureResult<Vec<T>> {
        let futures = self.index.get(port_name)?;
        check_all::<T>(futures)?;
        for future in futures {
            future.wait_async().await;
        }
        take_all(futures, false)
    }
}

// Reject a mismatched read before blocking on any producer
fn check_all<T: Any>(futures: &[Future]) -> FutureResult<()> {
    futures
        .iter()
        .try_for_each(|future| future.data_info().check::<T>())
}
