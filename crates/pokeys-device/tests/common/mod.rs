//! Shared helpers for the device integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pokeys_core::{EncoderId, PinNumber, PinRole};
use pokeys_device::{DeviceSettings, EncoderSpec, PokeyDevice};
use pokeys_hardware::mock::{MockDriver, MockDriverHandle};
use pokeys_hardware::{GlobalTransport, TransportCoordinator};

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Settings for tests that drive cycles by hand.
pub fn manual() -> DeviceSettings {
    DeviceSettings {
        autostart: false,
        pulse_duration_ms: 20,
        ..Default::default()
    }
}

/// Settings for tests that let the scheduler poll quickly.
pub fn fast_polling() -> DeviceSettings {
    DeviceSettings {
        start_delay_ms: 0,
        read_interval_ms: 5,
        pulse_duration_ms: 20,
        autostart: true,
        ..Default::default()
    }
}

pub fn connect_with(
    settings: DeviceSettings,
    transport: Arc<dyn TransportCoordinator>,
) -> (PokeyDevice<MockDriver>, MockDriverHandle) {
    let (driver, handle) = MockDriver::new();
    let device = PokeyDevice::builder(driver)
        .with_settings(settings)
        .with_transport(transport)
        .connect()
        .expect("mock controller should connect");
    (device, handle)
}

pub fn connect(settings: DeviceSettings) -> (PokeyDevice<MockDriver>, MockDriverHandle) {
    connect_with(settings, Arc::new(GlobalTransport::new()))
}

pub fn pin(number: u16) -> PinNumber {
    PinNumber::new(number).expect("valid pin number")
}

pub fn add_input(device: &PokeyDevice<MockDriver>, name: &str, number: u16) {
    device
        .add_pin(name, pin(number), PinRole::Input, false, "")
        .expect("input pin should configure");
}

pub fn encoder(ordinal: u16, name: &str, default: i32, min: i32, max: i32, step: i32) -> EncoderSpec {
    EncoderSpec {
        id: EncoderId::new(ordinal).expect("valid encoder ordinal"),
        default,
        name: name.to_string(),
        description: String::new(),
        min,
        max,
        step,
        invert: false,
        units: "ticks".to_string(),
    }
}
