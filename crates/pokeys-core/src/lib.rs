//! Shared types and constants for the PoKeys I/O bridge.
//!
//! Everything in this crate is plain data: identifiers for the controller's
//! pins, encoders, PWM channels and LED matrix displays, the value kinds that
//! travel between the host and the device, and the hardware limits of the
//! PoKeys57E family.

pub mod constants;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
