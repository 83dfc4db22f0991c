//! Per-device runtime settings.
//!
//! Hosts usually deserialize these from their own configuration files; every
//! field has a default, so partial documents are fine.
//!
//! ```
//! use pokeys_device::DeviceSettings;
//!
//! let settings: DeviceSettings =
//!     serde_json::from_str(r#"{ "read_interval_ms": 20 }"#).unwrap();
//! assert_eq!(settings.read_interval_ms, 20);
//! assert_eq!(settings.pulse_duration_ms, 750);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use pokeys_core::constants::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_PULSE_DURATION_MS, DEFAULT_READ_INTERVAL_MS,
    DEFAULT_START_DELAY_MS,
};
use pokeys_hardware::{HardwareError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Delay before the first poll cycle.
    pub start_delay_ms: u64,

    /// Time between poll cycles.
    pub read_interval_ms: u64,

    /// How long a PWM pulse command keeps the channel driven.
    pub pulse_duration_ms: u64,

    /// Capacity of the event channel created by `subscribe`.
    pub event_capacity: usize,

    /// Start the poll scheduler as soon as the device is connected.
    pub autostart: bool,

    /// Skip encoder events when the raw counter moved but the clamped
    /// logical value did not.
    pub suppress_clamped_encoder_events: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            start_delay_ms: DEFAULT_START_DELAY_MS,
            read_interval_ms: DEFAULT_READ_INTERVAL_MS,
            pulse_duration_ms: DEFAULT_PULSE_DURATION_MS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            autostart: true,
            suppress_clamped_encoder_events: false,
        }
    }
}

impl DeviceSettings {
    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    pub fn pulse_duration(&self) -> Duration {
        Duration::from_millis(self.pulse_duration_ms)
    }

    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.read_interval_ms == 0 {
            return Err(HardwareError::configuration(
                "read_interval_ms must be greater than zero",
            ));
        }
        if self.event_capacity == 0 {
            return Err(HardwareError::configuration(
                "event_capacity must be greater than zero",
            ));
        }
        Ok(())
    }
}
