pub mod clock;
pub mod config;
pub mod fleet;

pub use clock::{Clock, SystemClock};
pub use config::FleetConfig;
pub use fleet::FleetError;
