pub mod actuator;
pub mod aggregator;
pub mod error;
pub mod staleness;
pub mod state;

pub use actuator::ActuatorRouter;
pub use aggregator::Aggregator;
pub use error::ControlError;
pub use staleness::StalenessMonitor;
pub use state::{GatewayState, SensorSnapshot};
