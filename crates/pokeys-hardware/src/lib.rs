//! Driver boundary for PoKeys network I/O controllers.
//!
//! The vendor SDK is treated as an opaque, blocking request/response API.
//! This crate describes that API as the [`PokeysDriver`] trait, translates
//! its status codes into [`HardwareError`], and provides the
//! [`TransportCoordinator`] that serializes every hardware transaction in the
//! process.
//!
//! # Design Philosophy
//!
//! - **Blocking**: one method call is one transaction on the wire. Callers
//!   decide which thread blocks.
//! - **Serialized**: callers hold a [`TransportPermit`] around every driver
//!   call, even across different devices.
//! - **Status-checked**: only an explicit OK is success; everything else is a
//!   [`DriverStatus`].
//!
//! # Example
//!
//! ```
//! use pokeys_hardware::{GlobalTransport, PokeysDriver, TransportCoordinator};
//! use pokeys_hardware::mock::MockDriver;
//!
//! let transport = GlobalTransport::shared();
//! let (mut driver, handle) = MockDriver::new();
//!
//! {
//!     let _permit = transport.acquire();
//!     driver.connect().unwrap();
//! }
//!
//! handle.set_input(0, true);
//! let levels = {
//!     let _permit = transport.acquire();
//!     driver.read_digital_inputs().unwrap()
//! };
//! assert!(levels[0]);
//! ```
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides an in-memory controller and an instrumented
//! coordinator for development and testing without hardware.

pub mod error;
pub mod mock;
pub mod traits;
pub mod transport;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DriverResult, DriverResultExt, DriverStatus, HardwareError, Result};
pub use traits::PokeysDriver;
pub use transport::{GlobalTransport, TransportCoordinator, TransportPermit};
pub use types::{
    DeviceInfo, DeviceSummary, DriverCall, EncoderConfig, MatrixLedConfig, PinCapability,
    PinFunction, PwmConfig,
};
