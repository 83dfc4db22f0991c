//! Mock PoKeys controller for testing and development.
//!
//! The mock keeps the whole controller in memory: pin levels and functions,
//! encoder counters, the PWM block and both LED matrix buffers. A
//! [`MockDriverHandle`] shares that state, so a test can move inputs, inject
//! failures and inspect outputs while the driver is owned by a device.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, trace};

use pokeys_core::constants::{
    ENCODER_COUNT, MATRIX_LED_COLUMNS, MATRIX_LED_COUNT, MAX_DEVICE_NAME_LEN, PIN_COUNT,
    PWM_CHANNEL_COUNT,
};

use crate::error::{DriverResult, DriverStatus};
use crate::traits::PokeysDriver;
use crate::types::{
    DeviceSummary, DriverCall, EncoderConfig, MatrixLedConfig, PinCapability, PinFunction,
    PwmConfig,
};

/// Shared wire that detects overlapping transactions.
///
/// Give several mock drivers the same bus to check that nothing drives two
/// of them at once.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    inner: Arc<BusCounters>,
}

#[derive(Debug, Default)]
struct BusCounters {
    in_flight: AtomicUsize,
    overlaps: AtomicUsize,
    transactions: AtomicUsize,
}

struct BusGuard<'a>(&'a BusCounters);

impl Drop for BusGuard<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transactions that started while another was still in flight.
    pub fn overlaps(&self) -> usize {
        self.inner.overlaps.load(Ordering::SeqCst)
    }

    /// Total transactions seen on the bus.
    pub fn transactions(&self) -> usize {
        self.inner.transactions.load(Ordering::SeqCst)
    }

    fn enter(&self) -> BusGuard<'_> {
        if self.inner.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.inner.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.transactions.fetch_add(1, Ordering::SeqCst);
        BusGuard(&self.inner)
    }
}

#[derive(Debug)]
struct MockState {
    summary: DeviceSummary,
    connected: bool,
    levels: Vec<bool>,
    functions: Vec<Option<PinFunction>>,
    denied_capabilities: HashSet<(usize, PinCapability)>,
    encoder_configs: [Option<EncoderConfig>; ENCODER_COUNT],
    encoder_values: [u32; ENCODER_COUNT],
    pwm: PwmConfig,
    staged_duty: [u32; PWM_CHANNEL_COUNT],
    applied_duty: [u32; PWM_CHANNEL_COUNT],
    pwm_updates: Vec<[u32; PWM_CHANNEL_COUNT]>,
    matrix_configs: [MatrixLedConfig; MATRIX_LED_COUNT],
    matrix_rows: [[u8; MATRIX_LED_COLUMNS]; MATRIX_LED_COUNT],
    matrix_updates: usize,
    device_name: String,
    failures: HashMap<DriverCall, DriverStatus>,
    journal: Vec<DriverCall>,
    latency: Duration,
}

impl MockState {
    fn new(summary: DeviceSummary) -> Self {
        Self {
            summary,
            connected: false,
            levels: vec![false; PIN_COUNT],
            functions: vec![None; PIN_COUNT],
            denied_capabilities: HashSet::new(),
            encoder_configs: [None; ENCODER_COUNT],
            encoder_values: [0; ENCODER_COUNT],
            pwm: PwmConfig::default(),
            staged_duty: [0; PWM_CHANNEL_COUNT],
            applied_duty: [0; PWM_CHANNEL_COUNT],
            pwm_updates: Vec::new(),
            matrix_configs: [MatrixLedConfig::default(); MATRIX_LED_COUNT],
            matrix_rows: [[0; MATRIX_LED_COLUMNS]; MATRIX_LED_COUNT],
            matrix_updates: 0,
            device_name: String::new(),
            failures: HashMap::new(),
            journal: Vec::new(),
            latency: Duration::ZERO,
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn slot<T>(items: &mut [T], index: usize) -> DriverResult<&mut T> {
    items.get_mut(index).ok_or(DriverStatus::Parameter)
}

/// Mock PoKeys controller.
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
/// handle.set_encoder_raw(0, 17);
/// assert_eq!(driver.read_encoder_values().unwrap()[0], 17);
///
/// driver.write_digital_output(4, true).unwrap();
/// assert!(handle.level(4));
/// ```
#[derive(Debug)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
    bus: MockBus,
}

impl MockDriver {
    /// Create a mock PoKeys57E with a default discovery record.
    ///
    /// Returns the driver and a handle that controls it.
    pub fn new() -> (Self, MockDriverHandle) {
        Self::with_summary(DeviceSummary::default())
    }

    /// Create a mock that reports `summary` when connected.
    pub fn with_summary(summary: DeviceSummary) -> (Self, MockDriverHandle) {
        let state = Arc::new(Mutex::new(MockState::new(summary)));
        let driver = Self {
            state: Arc::clone(&state),
            bus: MockBus::new(),
        };
        (driver, MockDriverHandle { state })
    }

    /// Attach the driver to a bus shared with other mocks.
    pub fn on_bus(mut self, bus: MockBus) -> Self {
        self.bus = bus;
        self
    }

    fn transact<T>(
        &mut self,
        call: DriverCall,
        op: impl FnOnce(&mut MockState) -> DriverResult<T>,
    ) -> DriverResult<T> {
        let _wire = self.bus.enter();

        let latency = {
            let mut state = lock(&self.state);
            state.journal.push(call);
            state.latency
        };
        if !latency.is_zero() {
            thread::sleep(latency);
        }

        let mut state = lock(&self.state);
        if let Some(status) = state.failures.get(&call) {
            debug!("Mock {} failing with injected {}", call, status);
            return Err(*status);
        }
        trace!("Mock {}", call);
        if !state.connected && call != DriverCall::Connect {
            return Err(DriverStatus::NotConnected);
        }
        op(&mut state)
    }
}

impl PokeysDriver for MockDriver {
    fn connect(&mut self) -> DriverResult<DeviceSummary> {
        self.transact(DriverCall::Connect, |state| {
            state.connected = true;
            Ok(state.summary.clone())
        })
    }

    fn disconnect(&mut self) {
        let _wire = self.bus.enter();
        let mut state = lock(&self.state);
        state.journal.push(DriverCall::Disconnect);
        state.connected = false;
    }

    fn check_pin_capability(
        &mut self,
        pin: usize,
        capability: PinCapability,
    ) -> DriverResult<bool> {
        self.transact(DriverCall::CheckPinCapability, |state| {
            if pin >= PIN_COUNT {
                return Err(DriverStatus::Parameter);
            }
            Ok(!state.denied_capabilities.contains(&(pin, capability)))
        })
    }

    fn set_pin_function(&mut self, pin: usize, function: PinFunction) -> DriverResult<()> {
        self.transact(DriverCall::SetPinFunction, |state| {
            *slot(&mut state.functions, pin)? = Some(function);
            Ok(())
        })
    }

    fn read_digital_inputs(&mut self) -> DriverResult<Vec<bool>> {
        self.transact(DriverCall::ReadDigitalInputs, |state| Ok(state.levels.clone()))
    }

    fn write_digital_output(&mut self, pin: usize, value: bool) -> DriverResult<()> {
        self.transact(DriverCall::WriteDigitalOutput, |state| {
            *slot(&mut state.levels, pin)? = value;
            Ok(())
        })
    }

    fn configure_encoder(&mut self, encoder: usize, config: EncoderConfig) -> DriverResult<()> {
        self.transact(DriverCall::ConfigureEncoder, |state| {
            *slot(&mut state.encoder_configs, encoder)? = Some(config);
            Ok(())
        })
    }

    fn set_encoder_value(&mut self, encoder: usize, raw: u32) -> DriverResult<()> {
        self.transact(DriverCall::SetEncoderValue, |state| {
            *slot(&mut state.encoder_values, encoder)? = raw;
            Ok(())
        })
    }

    fn read_encoder_values(&mut self) -> DriverResult<Vec<u32>> {
        self.transact(DriverCall::ReadEncoderValues, |state| {
            Ok(state.encoder_values.to_vec())
        })
    }

    fn pwm_configuration(&mut self) -> DriverResult<PwmConfig> {
        self.transact(DriverCall::ReadPwmConfiguration, |state| Ok(state.pwm))
    }

    fn set_pwm_configuration(&mut self, config: &PwmConfig) -> DriverResult<()> {
        self.transact(DriverCall::SetPwmConfiguration, |state| {
            state.pwm = *config;
            Ok(())
        })
    }

    fn set_pwm_duty(&mut self, channel: usize, duty: u32) -> DriverResult<()> {
        self.transact(DriverCall::SetPwmDuty, |state| {
            *slot(&mut state.staged_duty, channel)? = duty;
            Ok(())
        })
    }

    fn update_pwm(&mut self) -> DriverResult<()> {
        self.transact(DriverCall::UpdatePwm, |state| {
            state.applied_duty = state.staged_duty;
            state.pwm_updates.push(state.applied_duty);
            Ok(())
        })
    }

    fn matrix_led_configuration(&mut self, display: usize) -> DriverResult<MatrixLedConfig> {
        self.transact(DriverCall::ReadMatrixLedConfiguration, |state| {
            Ok(*slot(&mut state.matrix_configs, display)?)
        })
    }

    fn set_matrix_led_configuration(
        &mut self,
        display: usize,
        config: &MatrixLedConfig,
    ) -> DriverResult<()> {
        self.transact(DriverCall::SetMatrixLedConfiguration, |state| {
            *slot(&mut state.matrix_configs, display)? = *config;
            Ok(())
        })
    }

    fn update_matrix_led(
        &mut self,
        display: usize,
        rows: &[u8; MATRIX_LED_COLUMNS],
    ) -> DriverResult<()> {
        self.transact(DriverCall::UpdateMatrixLed, |state| {
            *slot(&mut state.matrix_rows, display)? = *rows;
            state.matrix_updates += 1;
            Ok(())
        })
    }

    fn set_device_name(&mut self, name: &str) -> DriverResult<()> {
        self.transact(DriverCall::SetDeviceName, |state| {
            if name.len() > MAX_DEVICE_NAME_LEN {
                return Err(DriverStatus::Parameter);
            }
            state.device_name = name.to_string();
            Ok(())
        })
    }
}

/// Handle for controlling a mock controller.
///
/// Clones share the same simulated device.
///
/// # Examples
///
/// ```
/// use pokeys_hardware::{DriverCall, DriverStatus, PokeysDriver};
/// use pokeys_hardware::mock::MockDriver;
///
/// let (mut driver, handle) = MockDriver::new();
/// driver.connect().unwrap();
///
/// handle.fail(DriverCall::ReadDigitalInputs, DriverStatus::Transfer);
/// assert_eq!(driver.read_digital_inputs(), Err(DriverStatus::Transfer));
///
/// handle.clear_failure(DriverCall::ReadDigitalInputs);
/// assert!(driver.read_digital_inputs().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDriverHandle {
    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Drive a pin's level as if an external signal changed it.
    pub fn set_input(&self, pin: usize, level: bool) {
        if let Some(slot) = self.state().levels.get_mut(pin) {
            *slot = level;
        }
    }

    /// Current level of a pin (zero-based).
    pub fn level(&self, pin: usize) -> bool {
        self.state().levels.get(pin).copied().unwrap_or(false)
    }

    pub fn pin_function(&self, pin: usize) -> Option<PinFunction> {
        self.state().functions.get(pin).copied().flatten()
    }

    /// Make capability queries for `pin` answer false.
    pub fn deny_capability(&self, pin: usize, capability: PinCapability) {
        self.state().denied_capabilities.insert((pin, capability));
    }

    /// Move an encoder's raw counter, as turning the knob would.
    pub fn set_encoder_raw(&self, encoder: usize, raw: u32) {
        if let Some(slot) = self.state().encoder_values.get_mut(encoder) {
            *slot = raw;
        }
    }

    pub fn encoder_raw(&self, encoder: usize) -> u32 {
        self.state().encoder_values.get(encoder).copied().unwrap_or(0)
    }

    pub fn encoder_config(&self, encoder: usize) -> Option<EncoderConfig> {
        self.state().encoder_configs.get(encoder).copied().flatten()
    }

    pub fn pwm_config(&self) -> PwmConfig {
        self.state().pwm
    }

    /// Duty currently applied to a channel by the last PWM update.
    pub fn applied_duty(&self, channel: usize) -> u32 {
        self.state().applied_duty.get(channel).copied().unwrap_or(0)
    }

    /// Applied duty of every channel after each PWM update, oldest first.
    pub fn pwm_updates(&self) -> Vec<[u32; PWM_CHANNEL_COUNT]> {
        self.state().pwm_updates.clone()
    }

    pub fn matrix_config(&self, display: usize) -> MatrixLedConfig {
        self.state()
            .matrix_configs
            .get(display)
            .copied()
            .unwrap_or_default()
    }

    /// Last row buffer pushed to a display.
    pub fn matrix_rows(&self, display: usize) -> [u8; MATRIX_LED_COLUMNS] {
        self.state()
            .matrix_rows
            .get(display)
            .copied()
            .unwrap_or([0; MATRIX_LED_COLUMNS])
    }

    pub fn matrix_update_count(&self) -> usize {
        self.state().matrix_updates
    }

    pub fn device_name(&self) -> String {
        self.state().device_name.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Make every future `call` return `status` until cleared.
    pub fn fail(&self, call: DriverCall, status: DriverStatus) {
        self.state().failures.insert(call, status);
    }

    pub fn clear_failure(&self, call: DriverCall) {
        self.state().failures.remove(&call);
    }

    /// Delay every transaction, to widen race windows in stress tests.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = latency;
    }

    /// Every driver call made so far, oldest first.
    pub fn journal(&self) -> Vec<DriverCall> {
        self.state().journal.clone()
    }

    /// Number of journal entries, for "nothing happened after" checks.
    pub fn journal_len(&self) -> usize {
        self.state().journal.len()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pokeys_core::EncoderId;

    fn connected() -> (MockDriver, MockDriverHandle) {
        let (mut driver, handle) = MockDriver::new();
        driver.connect().unwrap();
        (driver, handle)
    }

    #[test]
    fn test_calls_fail_before_connect() {
        let (mut driver, _handle) = MockDriver::new();
        assert_eq!(driver.read_digital_inputs(), Err(DriverStatus::NotConnected));
    }

    #[test]
    fn test_connect_reports_summary() {
        let summary = DeviceSummary {
            serial_number: 4242,
            ..Default::default()
        };
        let (mut driver, handle) = MockDriver::with_summary(summary.clone());
        assert_eq!(driver.connect().unwrap(), summary);
        assert!(handle.is_connected());

        driver.disconnect();
        assert!(!handle.is_connected());
        assert_eq!(
            handle.journal(),
            vec![DriverCall::Connect, DriverCall::Disconnect]
        );
    }

    #[test]
    fn test_injected_connect_failure() {
        let (mut driver, handle) = MockDriver::new();
        handle.fail(DriverCall::Connect, DriverStatus::CannotConnect);
        assert_eq!(driver.connect(), Err(DriverStatus::CannotConnect));
        assert!(!handle.is_connected());
    }

    #[test]
    fn test_out_of_range_index_is_parameter_error() {
        let (mut driver, _handle) = connected();
        assert_eq!(
            driver.write_digital_output(PIN_COUNT, true),
            Err(DriverStatus::Parameter)
        );
        assert_eq!(driver.set_encoder_value(3, 1), Err(DriverStatus::Parameter));
        assert_eq!(
            driver.update_matrix_led(2, &[0; MATRIX_LED_COLUMNS]),
            Err(DriverStatus::Parameter)
        );
    }

    #[test]
    fn test_pwm_duty_applies_on_update() {
        let (mut driver, handle) = connected();
        driver.set_pwm_duty(2, 900).unwrap();
        assert_eq!(handle.applied_duty(2), 0);

        driver.update_pwm().unwrap();
        assert_eq!(handle.applied_duty(2), 900);
        assert_eq!(handle.pwm_updates().len(), 1);
    }

    #[test]
    fn test_denied_capability() {
        let (mut driver, handle) = connected();
        let encoder = EncoderId::new(2).unwrap();
        handle.deny_capability(4, PinCapability::FastEncoderA(encoder));

        assert!(!driver
            .check_pin_capability(4, PinCapability::FastEncoderA(encoder))
            .unwrap());
        assert!(driver
            .check_pin_capability(4, PinCapability::DigitalInput)
            .unwrap());
    }

    #[test]
    fn test_device_name_length_limit() {
        let (mut driver, handle) = connected();
        driver.set_device_name("cockpit").unwrap();
        assert_eq!(handle.device_name(), "cockpit");
        assert_eq!(
            driver.set_device_name(&"x".repeat(31)),
            Err(DriverStatus::Parameter)
        );
    }

    #[test]
    fn test_shared_bus_counts_transactions() {
        let bus = MockBus::new();
        let (a, _) = MockDriver::new();
        let (b, _) = MockDriver::new();
        let mut a = a.on_bus(bus.clone());
        let mut b = b.on_bus(bus.clone());

        a.connect().unwrap();
        b.connect().unwrap();
        assert_eq!(bus.transactions(), 2);
        assert_eq!(bus.overlaps(), 0);
    }
}
