pub mod gateway;
pub mod loader;

pub use gateway::{
    ActuatorEndpoint, ApiConfig, BrokerConfig, ControlConfig, GatewayConfig, TelemetryConfig,
};
pub use loader::ConfigLoader;
