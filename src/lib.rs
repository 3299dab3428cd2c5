pub mod core;
pub mod engine;
pub mod registry;

pub use crate::core::{Future, FutureError, FutureResult, Promise, ALL_PORTS};
pub use crate::registry::{InFutures, OutFutures};
