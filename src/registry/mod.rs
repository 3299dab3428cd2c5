pub mod in_futures;
pub mod index;
pub mod out_futures;

pub use in_futures::InFutures;
pub use index::PortIndex;
pub use out_futures::OutFutures;
