//! Driver SDK boundary.
//!
//! [`PokeysDriver`] is the request/response surface of the vendor SDK. Every
//! method is one blocking hardware transaction: it sends a request to the
//! controller, waits for the reply and reports a status. Callers must hold a
//! [`TransportPermit`](crate::transport::TransportPermit) for the whole call;
//! the driver itself does no locking and no retries.
//!
//! Pins, encoders, PWM channels and displays are addressed by zero-based
//! index at this layer.

use pokeys_core::constants::MATRIX_LED_COLUMNS;

use crate::error::DriverResult;
use crate::types::{
    DeviceSummary, EncoderConfig, MatrixLedConfig, PinCapability, PinFunction, PwmConfig,
};

/// Blocking access to one PoKeys controller.
///
/// The trait is object safe, so hosts can hold `Box<dyn PokeysDriver>` when
/// the concrete SDK binding is chosen at runtime.
///
/// # Examples
///
/// ```
/// use pokeys_hardware::PokeysDriver;
/// use pokeys_hardware::mock::MockDriver;
///
/// let (mut driver, handle) = MockDriver::new();
/// driver.connect().unwrap();
///
/// handle.set_input(3, true);
/// let levels = driver.read_digital_inputs().unwrap();
/// assert!(levels[3]);
/// ```
pub trait PokeysDriver: Send + 'static {
    /// Open the connection and return the device's discovery record.
    fn connect(&mut self) -> DriverResult<DeviceSummary>;

    /// Close the connection. Never fails; a dead link is already closed.
    fn disconnect(&mut self);

    fn check_pin_capability(&mut self, pin: usize, capability: PinCapability)
    -> DriverResult<bool>;

    fn set_pin_function(&mut self, pin: usize, function: PinFunction) -> DriverResult<()>;

    /// Sample every pin's digital level in one transaction.
    fn read_digital_inputs(&mut self) -> DriverResult<Vec<bool>>;

    fn write_digital_output(&mut self, pin: usize, value: bool) -> DriverResult<()>;

    fn configure_encoder(&mut self, encoder: usize, config: EncoderConfig) -> DriverResult<()>;

    /// Overwrite an encoder's raw counter.
    fn set_encoder_value(&mut self, encoder: usize, raw: u32) -> DriverResult<()>;

    /// Sample every fast encoder's raw counter in one transaction.
    fn read_encoder_values(&mut self) -> DriverResult<Vec<u32>>;

    fn pwm_configuration(&mut self) -> DriverResult<PwmConfig>;

    fn set_pwm_configuration(&mut self, config: &PwmConfig) -> DriverResult<()>;

    /// Stage a duty value; it takes effect on the next [`update_pwm`](Self::update_pwm).
    fn set_pwm_duty(&mut self, channel: usize, duty: u32) -> DriverResult<()>;

    fn update_pwm(&mut self) -> DriverResult<()>;

    fn matrix_led_configuration(&mut self, display: usize) -> DriverResult<MatrixLedConfig>;

    fn set_matrix_led_configuration(
        &mut self,
        display: usize,
        config: &MatrixLedConfig,
    ) -> DriverResult<()>;

    /// Push a display's row buffer to the hardware.
    fn update_matrix_led(
        &mut self,
        display: usize,
        rows: &[u8; MATRIX_LED_COLUMNS],
    ) -> DriverResult<()>;

    fn set_device_name(&mut self, name: &str) -> DriverResult<()>;
}

impl<D: PokeysDriver + ?Sized> PokeysDriver for Box<D> {
    fn connect(&mut self) -> DriverResult<DeviceSummary> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect()
    }

    fn check_pin_capability(
        &mut self,
        pin: usize,
        capability: PinCapability,
    ) -> DriverResult<bool> {
        (**self).check_pin_capability(pin, capability)
    }

    fn set_pin_function(&mut self, pin: usize, function: PinFunction) -> DriverResult<()> {
        (**self).set_pin_function(pin, function)
    }

    fn read_digital_inputs(&mut self) -> DriverResult<Vec<bool>> {
        (**self).read_digital_inputs()
    }

    fn write_digital_output(&mut self, pin: usize, value: bool) -> DriverResult<()> {
        (**self).write_digital_output(pin, value)
    }

    fn configure_encoder(&mut self, encoder: usize, config: EncoderConfig) -> DriverResult<()> {
        (**self).configure_encoder(encoder, config)
    }

    fn set_encoder_value(&mut self, encoder: usize, raw: u32) -> DriverResult<()> {
        (**self).set_encoder_value(encoder, raw)
    }

    fn read_encoder_values(&mut self) -> DriverResult<Vec<u32>> {
        (**self).read_encoder_values()
    }

    fn pwm_configuration(&mut self) -> DriverResult<PwmConfig> {
        (**self).pwm_configuration()
    }

    fn set_pwm_configuration(&mut self, config: &PwmConfig) -> DriverResult<()> {
        (**self).set_pwm_configuration(config)
    }

    fn set_pwm_duty(&mut self, channel: usize, duty: u32) -> DriverResult<()> {
        (**self).set_pwm_duty(channel, duty)
    }

    fn update_pwm(&mut self) -> DriverResult<()> {
        (**self).update_pwm()
    }

    fn matrix_led_configuration(&mut self, display: usize) -> DriverResult<MatrixLedConfig> {
        (**self).matrix_led_configuration(display)
    }

    fn set_matrix_led_configuration(
        &mut self,
        display: usize,
        config: &MatrixLedConfig,
    ) -> DriverResult<()> {
        (**self).set_matrix_led_configuration(display, config)
    }

    fn update_matrix_led(
        &mut self,
        display: usize,
        rows: &[u8; MATRIX_LED_COLUMNS],
    ) -> DriverResult<()> {
        (**self).update_matrix_led(display, rows)
    }

    fn set_device_name(&mut self, name: &str) -> DriverResult<()> {
        (**self).set_device_name(name)
    }
}
