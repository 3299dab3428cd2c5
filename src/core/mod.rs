pub mod data;
pub mod error;
pub mod future;
pub mod group;
pub mod port;

pub use data::DataInfo;
pub use error::{FutureError, FutureResult};
pub use future::{Future, FutureId, FutureStatus, Promise};
pub use group::{
    all_ready, any_ready, wait_for_all, wait_for_all_timeout, wait_for_any, wait_for_any_timeout,
    Futures,
};
pub use port::{InputPort, OutputPort, PortInfo, ALL_PORTS};
