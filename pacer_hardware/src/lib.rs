//! Hardware backends for the pacer.
//!
//! The simulated rig is always available; the GPIO operator panel and RGB
//! status LED are compiled in with the `hardware` feature.
pub mod error;
pub mod indicator;
pub mod sim;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod gpio;

pub use error::HwError;
pub use indicator::LogIndicator;
pub use sim::{SimActuator, SimRig, SimRigCfg, SimSensor};
