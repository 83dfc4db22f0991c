//! Mock implementations for testing and development.
//!
//! [`MockDriver`] simulates a PoKeys controller in memory and is controlled
//! through its [`MockDriverHandle`]. [`MockBus`] detects transactions that
//! overlap in time across any number of mock drivers, and
//! [`RecordingTransport`] is a coordinator that counts permits.

pub mod driver;
pub mod transport;

// Re-export commonly used types
pub use driver::{MockBus, MockDriver, MockDriverHandle};
pub use transport::RecordingTransport;
