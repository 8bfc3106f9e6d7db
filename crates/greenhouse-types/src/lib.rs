pub mod class;
pub mod model;
pub mod wire;

pub use class::SensorClass;
pub use model::{Ack, Command, DeviceStatus, SensorReading};
pub use wire::WireError;
