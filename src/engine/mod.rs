pub mod types;
pub mod wiring;

pub use types::DataTypeRegistry;
pub use wiring::{PipelineWiring, StagePorts, WiringConfig};
