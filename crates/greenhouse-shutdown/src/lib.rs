pub mod signal;
pub mod tasks;

pub use signal::{ShutdownController, ShutdownListener, ShutdownSignal};
pub use tasks::TaskGroup;
