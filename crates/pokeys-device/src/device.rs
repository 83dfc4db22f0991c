//! Host facade for one controller.
//!
//! A [`PokeyDevice`] owns the driver handle, the in-memory mirror of every
//! configured resource, and the poll scheduler. Every driver call, whether
//! from the poll thread or a host command, runs inside a session that holds
//! the transport permit first and the device state second.
//!
//! # Examples
//!
//! ```
//! use pokeys_core::{PinNumber, PinRole, PluginHandle};
//! use pokeys_device::{DeviceSettings, PokeyDevice};
//! use pokeys_hardware::GlobalTransport;
//! use pokeys_hardware::mock::MockDriver;
//!
//! # fn main() -> pokeys_hardware::Result<()> {
//! let (driver, handle) = MockDriver::new();
//! let settings = DeviceSettings { autostart: false, ..Default::default() };
//! let device = PokeyDevice::builder(driver)
//!     .with_settings(settings)
//!     .with_transport(std::sync::Arc::new(GlobalTransport::new()))
//!     .connect()?;
//!
//! let _events = device.subscribe(PluginHandle(1));
//! device.add_pin("GEAR", PinNumber::new(3)?, PinRole::Input, false, "gear lever")?;
//!
//! handle.set_input(2, true);
//! let events = device.poll();
//! assert_eq!(events[0].name, "GEAR");
//! # Ok(())
//! # }
//! ```

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use pokeys_core::constants::{
    ENCODER_CHANNEL_PINS, ENCODER_OPTIONS_ENABLED_4X, MAX_DEVICE_NAME_LEN,
};
use pokeys_core::{
    DisplayId, EncoderId, PinNumber, PinRole, PluginHandle, PwmChannel, ResourceKind,
    TargetValue,
};
use pokeys_hardware::{
    DeviceInfo, DriverCall, DriverResultExt, EncoderConfig, GlobalTransport, HardwareError,
    PinCapability, PinFunction, PokeysDriver, Result, TransportCoordinator, TransportPermit,
};

use crate::display::{DigitGroup, DisplayBank, MatrixDisplay, RenderOutcome, RowBuffer};
use crate::encoder::{EncoderSpec, EncoderState, EncoderTracker, raw_seed};
use crate::events::{Change, Event, EventEmitter};
use crate::pins::{ChangeDetector, PinState};
use crate::pwm::{PwmBank, PwmChannelState, PwmSpec};
use crate::registry::NameRegistry;
use crate::scheduler::{DeferredAction, PollScheduler, PollTarget};
use crate::settings::DeviceSettings;

/// Mirror of everything configured on the device, plus the driver.
struct Hardware<D> {
    driver: D,
    registry: NameRegistry,
    pins: ChangeDetector,
    encoders: EncoderTracker,
    pwm: PwmBank,
    displays: DisplayBank,
}

impl<D: PokeysDriver> Hardware<D> {
    fn new(driver: D) -> Self {
        Self {
            driver,
            registry: NameRegistry::new(),
            pins: ChangeDetector::new(),
            encoders: EncoderTracker::new(),
            pwm: PwmBank::new(),
            displays: DisplayBank::new(),
        }
    }

    /// One poll cycle. Failed reads are logged and their values dropped.
    fn poll(&mut self, serial: &str, suppress_clamped: bool) -> Vec<Change> {
        let mut changes = Vec::new();

        match self
            .driver
            .read_encoder_values()
            .during(DriverCall::ReadEncoderValues)
        {
            Ok(raws) => changes.extend(self.encoders.update(&raws, suppress_clamped)),
            Err(e) => warn!("Device {}: {}", serial, e),
        }

        match self
            .driver
            .read_digital_inputs()
            .during(DriverCall::ReadDigitalInputs)
        {
            Ok(levels) => changes.extend(self.pins.diff(&levels)),
            Err(e) => warn!("Device {}: {}", serial, e),
        }

        changes
    }

    fn write_pwm_duty(&mut self, channel: PwmChannel, duty: u32) -> Result<()> {
        self.driver
            .set_pwm_duty(channel.index(), duty)
            .during(DriverCall::SetPwmDuty)?;
        self.driver.update_pwm().during(DriverCall::UpdatePwm)
    }

    fn display_mut(&mut self, id: DisplayId) -> Result<&mut MatrixDisplay> {
        self.displays
            .get_mut(id)
            .ok_or_else(|| HardwareError::configuration(format!("display {id} has not been added")))
    }

    /// Push a display's buffer, clearing its refresh flag on success.
    fn push_display(&mut self, id: DisplayId) -> Result<()> {
        let display = self
            .displays
            .get_mut(id)
            .ok_or_else(|| HardwareError::configuration(format!("display {id} has not been added")))?;
        self.driver
            .update_matrix_led(id.index(), &display.buffer)
            .during(DriverCall::UpdateMatrixLed)?;
        display.refresh = false;
        Ok(())
    }
}

/// Exclusive access to the transport and the device state.
struct Session<'a, D> {
    hardware: MutexGuard<'a, Hardware<D>>,
    _permit: TransportPermit<'a>,
}

impl<D> Deref for Session<'_, D> {
    type Target = Hardware<D>;

    fn deref(&self) -> &Self::Target {
        &self.hardware
    }
}

impl<D> DerefMut for Session<'_, D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.hardware
    }
}

/// State shared between the host-facing handle and the poll thread.
struct DeviceShared<D> {
    info: DeviceInfo,
    settings: DeviceSettings,
    transport: Arc<dyn TransportCoordinator>,
    hardware: Mutex<Hardware<D>>,
    emitter: EventEmitter,
}

impl<D: PokeysDriver> DeviceShared<D> {
    /// Permit first, then state. Never the other way round.
    fn session(&self) -> Session<'_, D> {
        let permit = self.transport.acquire();
        let hardware = self.mirror();
        Session {
            hardware,
            _permit: permit,
        }
    }

    /// State only, for updates that make no driver call.
    fn mirror(&self) -> MutexGuard<'_, Hardware<D>> {
        self.hardware.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn serial(&self) -> &str {
        &self.info.serial_number
    }

    fn apply(&self, action: DeferredAction) -> Result<()> {
        match action {
            DeferredAction::PwmOff { channel, pulse } => {
                let mut hw = self.session();
                if !hw.pwm.is_latest_pulse(channel, pulse) {
                    trace!(
                        "Device {}: PWM channel {} pulse {} superseded",
                        self.serial(),
                        channel,
                        pulse
                    );
                    return Ok(());
                }
                trace!("Device {}: PWM channel {} off", self.serial(), channel);
                hw.write_pwm_duty(channel, 0)
            }
        }
    }
}

impl<D: PokeysDriver> PollTarget for DeviceShared<D> {
    fn label(&self) -> String {
        self.info.serial_number.clone()
    }

    fn poll_cycle(&self) -> Vec<Event> {
        let changes = self
            .session()
            .poll(self.serial(), self.settings.suppress_clamped_encoder_events);
        self.emitter.build(changes)
    }

    fn run_deferred(&self, action: DeferredAction) {
        if let Err(e) = self.apply(action) {
            warn!("Device {}: deferred {:?} failed: {}", self.serial(), action, e);
        }
    }

    fn emitter(&self) -> &EventEmitter {
        &self.emitter
    }
}

/// Builder for [`PokeyDevice`].
///
/// Connecting is the last step; nothing is returned if it fails.
pub struct PokeyDeviceBuilder<D> {
    driver: D,
    index: u8,
    settings: DeviceSettings,
    transport: Option<Arc<dyn TransportCoordinator>>,
}

impl<D: PokeysDriver> PokeyDeviceBuilder<D> {
    /// Position of the device in the host's device list.
    pub fn with_index(mut self, index: u8) -> Self {
        self.index = index;
        self
    }

    pub fn with_settings(mut self, settings: DeviceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Use `transport` instead of the process-wide [`GlobalTransport`].
    pub fn with_transport(mut self, transport: Arc<dyn TransportCoordinator>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Connect to the controller and, if `autostart` is set, start polling.
    ///
    /// A connection failure aborts construction. A scheduler that fails to
    /// start is logged and leaves the device connected but not polling.
    pub fn connect(self) -> Result<PokeyDevice<D>> {
        self.settings.validate()?;

        let transport: Arc<dyn TransportCoordinator> = match self.transport {
            Some(transport) => transport,
            None => GlobalTransport::shared(),
        };

        let mut driver = self.driver;
        let summary = {
            let _permit = transport.acquire();
            driver.connect()
        }
        .map_err(|status| HardwareError::connection_failed(status.to_string()))?;

        let info = DeviceInfo::from_summary(&summary, self.index);
        info!(
            "Connected to {} {} (firmware {}, {})",
            info.hardware_type_name(),
            info.serial_number,
            info.firmware_version(),
            info.ip_address
        );

        let device = PokeyDevice {
            shared: Arc::new(DeviceShared {
                info,
                settings: self.settings,
                transport,
                hardware: Mutex::new(Hardware::new(driver)),
                emitter: EventEmitter::new(),
            }),
            scheduler: Mutex::new(None),
        };

        if device.shared.settings.autostart
            && let Err(e) = device.start_polling()
        {
            error!(
                "Device {}: polling disabled, scheduler failed to start: {}",
                device.shared.serial(),
                e
            );
        }

        Ok(device)
    }
}

/// One connected PoKeys controller.
pub struct PokeyDevice<D: PokeysDriver> {
    shared: Arc<DeviceShared<D>>,
    scheduler: Mutex<Option<PollScheduler>>,
}

impl<D: PokeysDriver> PokeyDevice<D> {
    pub fn builder(driver: D) -> PokeyDeviceBuilder<D> {
        PokeyDeviceBuilder {
            driver,
            index: 0,
            settings: DeviceSettings::default(),
            transport: None,
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.shared.settings
    }

    fn scheduler(&self) -> MutexGuard<'_, Option<PollScheduler>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Event wiring

    /// Deliver events to `tx`, tagged with `owner`.
    pub fn set_event_sink(&self, owner: PluginHandle, tx: mpsc::Sender<Event>) {
        self.shared.emitter.attach(owner, tx);
    }

    /// Create a bounded event channel sized by `event_capacity` and attach it.
    pub fn subscribe(&self, owner: PluginHandle) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(self.shared.settings.event_capacity);
        self.set_event_sink(owner, tx);
        rx
    }

    // Configuration

    /// Configure a digital pin and register it under `name`.
    ///
    /// Outputs are configured with inverted polarity.
    pub fn add_pin(
        &self,
        name: &str,
        pin: PinNumber,
        role: PinRole,
        default: bool,
        description: &str,
    ) -> Result<()> {
        let function = match role {
            PinRole::Input => PinFunction::DigitalInput,
            PinRole::Output => PinFunction::DigitalOutput { inverted: true },
        };

        let mut hw = self.shared.session();
        hw.driver
            .set_pin_function(pin.index(), function)
            .during(DriverCall::SetPinFunction)?;
        hw.registry.pins.insert(name, pin);
        hw.pins
            .configure(PinState::new(pin, role, default, name, description));

        debug!("Device {}: pin {} {} as {}", self.shared.serial(), pin, name, role);
        Ok(())
    }

    /// Configure a fast encoder and register it under its name.
    ///
    /// The encoder is registered only once the controller accepted both its
    /// configuration and its starting counter.
    pub fn add_encoder(&self, spec: EncoderSpec) -> Result<()> {
        if spec.min > spec.max {
            return Err(HardwareError::configuration(format!(
                "encoder {}: min {} exceeds max {}",
                spec.name, spec.min, spec.max
            )));
        }
        if spec.step < 0 {
            return Err(HardwareError::configuration(format!(
                "encoder {}: step must not be negative, got {}",
                spec.name, spec.step
            )));
        }

        let (a, b) = ENCODER_CHANNEL_PINS[spec.id.index()];
        let (channel_a_pin, channel_b_pin) = if spec.invert { (b, a) } else { (a, b) };
        let config = EncoderConfig {
            options: ENCODER_OPTIONS_ENABLED_4X,
            channel_a_pin,
            channel_b_pin,
        };

        let mut hw = self.shared.session();
        hw.driver
            .configure_encoder(spec.id.index(), config)
            .during(DriverCall::ConfigureEncoder)?;
        hw.driver
            .set_encoder_value(spec.id.index(), raw_seed(spec.default))
            .during(DriverCall::SetEncoderValue)?;

        hw.registry.encoders.insert(spec.name.as_str(), spec.id);
        hw.encoders.configure(EncoderState::new(&spec));

        debug!(
            "Device {}: encoder {} {} in [{}, {}] step {}",
            self.shared.serial(),
            spec.id,
            spec.name,
            spec.min,
            spec.max,
            spec.step
        );
        Ok(())
    }

    /// Enable a PWM channel with its configured period and register it.
    pub fn add_pwm(&self, spec: PwmSpec) -> Result<()> {
        let mut hw = self.shared.session();
        let mut config = hw
            .driver
            .pwm_configuration()
            .during(DriverCall::ReadPwmConfiguration)?;
        config.period = spec.period;
        config.enable(spec.channel);
        hw.driver
            .set_pwm_configuration(&config)
            .during(DriverCall::SetPwmConfiguration)?;

        hw.registry.pwm.insert(spec.name.as_str(), spec.channel);
        hw.pwm.configure(PwmChannelState::new(&spec));

        debug!(
            "Device {}: PWM {} {} period {}",
            self.shared.serial(),
            spec.channel,
            spec.name,
            spec.period
        );
        Ok(())
    }

    /// Register a matrix LED display.
    ///
    /// Adding an existing display again renames it and keeps its groups.
    pub fn add_matrix_led(&self, id: DisplayId, name: &str, kind: &str) -> Result<()> {
        let mut hw = self.shared.session();
        let current = hw
            .driver
            .matrix_led_configuration(id.index())
            .during(DriverCall::ReadMatrixLedConfiguration)?;

        match hw.displays.get_mut(id) {
            Some(display) => {
                display.name = name.to_string();
                display.kind = kind.to_string();
                display.config = current;
            }
            None => {
                let mut display = MatrixDisplay::new(id, name, kind);
                display.config = current;
                hw.displays.add(display);
            }
        }
        hw.registry.displays.insert(name, id);

        debug!("Device {}: display {} {} ({})", self.shared.serial(), id, name, kind);
        Ok(())
    }

    /// Add a digit group to a display's mirror.
    ///
    /// Groups are identified by their start position; a group at the same
    /// position replaces the old one. No driver call is made.
    pub fn add_group_to_matrix_led(
        &self,
        display: DisplayId,
        name: &str,
        length: usize,
        position: usize,
    ) -> Result<()> {
        let group = DigitGroup::new(name, position, length)?;

        let mut hw = self.shared.mirror();
        let replaced = hw.display_mut(display)?.add_group(group);
        hw.registry.displays.insert(name, display);

        if let Some(old) = replaced {
            debug!(
                "Device {}: group {} replaced {} at position {}",
                self.shared.serial(),
                name,
                old.name,
                position
            );
        }
        Ok(())
    }

    /// Set a display's geometry, clear it and push it.
    pub fn config_matrix_led(
        &self,
        id: DisplayId,
        rows: u8,
        columns: u8,
        enabled: bool,
    ) -> Result<()> {
        let mut hw = self.shared.session();
        let config = hw.display_mut(id)?.configure(rows, columns, enabled);
        hw.driver
            .set_matrix_led_configuration(id.index(), &config)
            .during(DriverCall::SetMatrixLedConfiguration)?;
        hw.push_display(id)
    }

    // Commands

    /// Apply a host value to the named target.
    ///
    /// Booleans drive output pins, integers render on displays and floats
    /// pulse PWM channels. Failures are logged as well as returned.
    pub fn target_value(&self, name: &str, value: impl Into<TargetValue>) -> Result<()> {
        let result = match value.into() {
            TargetValue::Bool(level) => self.write_pin(name, level),
            TargetValue::Int(number) => self.display_number(name, number),
            TargetValue::Float(fraction) => self.pulse_pwm(name, fraction),
        };
        if let Err(e) = &result {
            warn!("Device {}: target {} not applied: {}", self.shared.serial(), name, e);
        }
        result
    }

    /// Drive a named output pin.
    pub fn write_pin(&self, name: &str, level: bool) -> Result<()> {
        let mut hw = self.shared.session();
        let pin = hw
            .registry
            .pins
            .lookup(name)
            .ok_or_else(|| HardwareError::unknown_target(ResourceKind::Pin, name))?;
        if hw.pins.get(pin).is_some_and(|p| p.role == PinRole::Input) {
            return Err(HardwareError::invalid_value(format!(
                "pin {name} is configured as an input"
            )));
        }

        hw.driver
            .write_digital_output(pin.index(), level)
            .during(DriverCall::WriteDigitalOutput)?;
        if let Some(state) = hw.pins.get_mut(pin) {
            state.update(level);
        }
        trace!("Device {}: pin {} = {}", self.shared.serial(), name, level);
        Ok(())
    }

    /// Render a number on the named digit group (or display) and push it.
    pub fn display_number(&self, name: &str, value: i32) -> Result<()> {
        let mut hw = self.shared.session();
        let id = hw
            .registry
            .displays
            .lookup(name)
            .ok_or_else(|| HardwareError::unknown_target(ResourceKind::Display, name))?;

        let outcome = hw.display_mut(id)?.render(name, value)?;
        if let RenderOutcome::Overflow(digits) = outcome {
            debug!(
                "Device {}: {} needs {} digits, group {} is too short",
                self.shared.serial(),
                value,
                digits,
                name
            );
        }
        hw.push_display(id)
    }

    /// Drive a PWM channel to `fraction` of its range, then back to zero
    /// after the pulse duration.
    ///
    /// With polling running, the turn-off is handed to the poll thread and
    /// this returns immediately. Otherwise the caller's thread waits out the
    /// pulse without holding the transport.
    pub fn pulse_pwm(&self, name: &str, fraction: f32) -> Result<()> {
        let off = {
            let mut hw = self.shared.session();
            let channel = hw
                .registry
                .pwm
                .lookup(name)
                .ok_or_else(|| HardwareError::unknown_target(ResourceKind::Pwm, name))?;
            let duty = hw
                .pwm
                .get(channel)
                .ok_or_else(|| HardwareError::unknown_target(ResourceKind::Pwm, name))?
                .duty_for(fraction)?;
            hw.write_pwm_duty(channel, duty)?;
            let pulse = hw
                .pwm
                .begin_pulse(channel)
                .ok_or_else(|| HardwareError::unknown_target(ResourceKind::Pwm, name))?;
            trace!(
                "Device {}: PWM {} duty {} (pulse {})",
                self.shared.serial(),
                name,
                duty,
                pulse
            );
            DeferredAction::PwmOff { channel, pulse }
        };

        let duration = self.shared.settings.pulse_duration();
        let scheduled = match self.scheduler().as_ref() {
            Some(scheduler) => scheduler.schedule(duration, off),
            None => Err(off),
        };

        if let Err(off) = scheduled {
            debug!(
                "Device {}: not polling, holding PWM {} pulse on caller thread",
                self.shared.serial(),
                name
            );
            thread::sleep(duration);
            self.shared.apply(off)?;
        }
        Ok(())
    }

    // Validation and naming

    /// Ask the controller whether `pin` can serve in `role`.
    pub fn validate_pin_capability(&self, pin: PinNumber, role: PinRole) -> Result<bool> {
        let capability = match role {
            PinRole::Input => PinCapability::DigitalInput,
            PinRole::Output => PinCapability::DigitalOutput,
        };
        let mut hw = self.shared.session();
        hw.driver
            .check_pin_capability(pin.index(), capability)
            .during(DriverCall::CheckPinCapability)
    }

    /// Ask the controller whether both pins of an encoder's pair support
    /// fast encoding.
    pub fn validate_encoder(&self, id: EncoderId) -> Result<bool> {
        let (a, b) = ENCODER_CHANNEL_PINS[id.index()];
        let mut hw = self.shared.session();
        let a_ok = hw
            .driver
            .check_pin_capability(usize::from(a), PinCapability::FastEncoderA(id))
            .during(DriverCall::CheckPinCapability)?;
        let b_ok = hw
            .driver
            .check_pin_capability(usize::from(b), PinCapability::FastEncoderB(id))
            .during(DriverCall::CheckPinCapability)?;
        Ok(a_ok && b_ok)
    }

    /// Store a device name, truncated to what the controller holds.
    pub fn set_device_name(&self, name: &str) -> Result<()> {
        let name = truncate_name(name);
        let mut hw = self.shared.session();
        hw.driver
            .set_device_name(name)
            .during(DriverCall::SetDeviceName)?;
        info!("Device {} renamed to {:?}", self.shared.serial(), name);
        Ok(())
    }

    // Polling lifecycle

    /// Start the poll thread. Does nothing if it is already running.
    pub fn start_polling(&self) -> Result<()> {
        let mut scheduler = self.scheduler();
        if scheduler.as_ref().is_some_and(PollScheduler::is_running) {
            debug!("Device {}: already polling", self.shared.serial());
            return Ok(());
        }

        let target: Arc<dyn PollTarget> = self.shared.clone();
        *scheduler = Some(PollScheduler::start(
            target,
            self.shared.settings.start_delay(),
            self.shared.settings.read_interval(),
        )?);
        Ok(())
    }

    /// Stop the poll thread and wait for it to exit.
    ///
    /// Safe to call repeatedly.
    pub fn stop_polling(&self) {
        let scheduler = self.scheduler().take();
        if let Some(mut scheduler) = scheduler {
            scheduler.stop();
        }
    }

    pub fn is_polling(&self) -> bool {
        self.scheduler()
            .as_ref()
            .is_some_and(PollScheduler::is_running)
    }

    /// Run one poll cycle on the caller's thread and return its events
    /// instead of sending them.
    pub fn poll(&self) -> Vec<Event> {
        self.shared.poll_cycle()
    }

    // Inspection

    pub fn pin_state(&self, name: &str) -> Option<PinState> {
        let hw = self.shared.mirror();
        let pin = hw.registry.pins.lookup(name)?;
        hw.pins.get(pin).cloned()
    }

    pub fn encoder_state(&self, name: &str) -> Option<EncoderState> {
        let hw = self.shared.mirror();
        let id = hw.registry.encoders.lookup(name)?;
        hw.encoders.get(id).cloned()
    }

    pub fn pwm_state(&self, name: &str) -> Option<PwmChannelState> {
        let hw = self.shared.mirror();
        let channel = hw.registry.pwm.lookup(name)?;
        hw.pwm.get(channel).cloned()
    }

    pub fn display_buffer(&self, id: DisplayId) -> Option<RowBuffer> {
        self.shared.mirror().displays.get(id).map(|d| d.buffer)
    }
}

impl<D: PokeysDriver> Drop for PokeyDevice<D> {
    fn drop(&mut self) {
        self.stop_polling();

        let mut hw = self.shared.session();
        hw.driver.disconnect();
        info!("Disconnected from {}", self.shared.serial());
    }
}

/// Cut `name` to the controller's limit without splitting a character.
fn truncate_name(name: &str) -> &str {
    let mut end = name.len().min(MAX_DEVICE_NAME_LEN);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pokeys_core::EventValue;
    use pokeys_hardware::DriverStatus;
    use pokeys_hardware::mock::{MockDriver, MockDriverHandle, RecordingTransport};

    fn manual() -> DeviceSettings {
        DeviceSettings {
            autostart: false,
            pulse_duration_ms: 20,
            ..Default::default()
        }
    }

    fn device() -> (PokeyDevice<MockDriver>, MockDriverHandle) {
        let (driver, handle) = MockDriver::new();
        let device = PokeyDevice::builder(driver)
            .with_settings(manual())
            .with_transport(Arc::new(GlobalTransport::new()))
            .connect()
            .unwrap();
        (device, handle)
    }

    fn pin(n: u16) -> PinNumber {
        PinNumber::new(n).unwrap()
    }

    fn encoder_spec(default: i32) -> EncoderSpec {
        EncoderSpec {
            id: EncoderId::new(2).unwrap(),
            default,
            name: "HDG".to_string(),
            description: "heading".to_string(),
            min: 0,
            max: 359,
            step: 1,
            invert: false,
            units: "deg".to_string(),
        }
    }

    fn pwm_spec() -> PwmSpec {
        PwmSpec {
            channel: PwmChannel::new(0).unwrap(),
            name: "GAUGE".to_string(),
            description: "fuel gauge".to_string(),
            units: String::new(),
            left_duty: 3000,
            right_duty: 1000,
            period: 25_000,
        }
    }

    fn radio(device: &PokeyDevice<MockDriver>) -> DisplayId {
        let id = DisplayId::new(1).unwrap();
        device.add_matrix_led(id, "RADIO", "7seg").unwrap();
        device.add_group_to_matrix_led(id, "COM1", 4, 0).unwrap();
        device.add_group_to_matrix_led(id, "COM2", 4, 4).unwrap();
        device.config_matrix_led(id, 8, 8, true).unwrap();
        id
    }

    #[test]
    fn test_connect_failure_is_fatal() {
        let (driver, handle) = MockDriver::new();
        handle.fail(DriverCall::Connect, DriverStatus::CannotConnect);

        let result = PokeyDevice::builder(driver)
            .with_settings(manual())
            .with_transport(Arc::new(GlobalTransport::new()))
            .connect();

        assert!(matches!(result, Err(HardwareError::ConnectionFailed { .. })));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let (driver, _handle) = MockDriver::new();
        let result = PokeyDevice::builder(driver)
            .with_settings(DeviceSettings {
                read_interval_ms: 0,
                ..manual()
            })
            .connect();
        assert!(matches!(result, Err(HardwareError::ConfigurationError { .. })));
    }

    #[test]
    fn test_add_pin_configures_function() {
        let (device, handle) = device();
        device.add_pin("GEAR", pin(3), PinRole::Input, false, "").unwrap();
        device.add_pin("LAMP", pin(4), PinRole::Output, false, "").unwrap();

        assert_eq!(handle.pin_function(2), Some(PinFunction::DigitalInput));
        assert_eq!(
            handle.pin_function(3),
            Some(PinFunction::DigitalOutput { inverted: true })
        );
    }

    #[test]
    fn test_poll_reports_input_changes_once() {
        let (device, handle) = device();
        device.add_pin("GEAR", pin(3), PinRole::Input, false, "gear").unwrap();

        assert!(device.poll().is_empty());
        handle.set_input(2, true);

        let events = device.poll();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, EventValue::Bool(true));
        assert_eq!(events[0].units, "");
        assert!(device.poll().is_empty());

        let state = device.pin_state("GEAR").unwrap();
        assert!(state.value);
        assert!(!state.previous);
    }

    #[test]
    fn test_output_pins_are_not_diffed() {
        let (device, handle) = device();
        device.add_pin("LAMP", pin(4), PinRole::Output, false, "").unwrap();
        handle.set_input(3, true);
        assert!(device.poll().is_empty());
    }

    #[test]
    fn test_events_tagged_with_owner() {
        let (device, handle) = device();
        let _rx = device.subscribe(PluginHandle(77));
        device.add_pin("GEAR", pin(1), PinRole::Input, false, "").unwrap();
        handle.set_input(0, true);

        assert_eq!(device.poll()[0].owner, PluginHandle(77));
    }

    #[test]
    fn test_encoder_configuration() {
        let (device, handle) = device();
        device.add_encoder(EncoderSpec {
            invert: true,
            ..encoder_spec(90)
        })
        .unwrap();

        let config = handle.encoder_config(1).unwrap();
        assert_eq!(config.options, ENCODER_OPTIONS_ENABLED_4X);
        assert_eq!((config.channel_a_pin, config.channel_b_pin), (5, 4));
        assert_eq!(handle.encoder_raw(1), 90);
        assert_eq!(device.encoder_state("HDG").unwrap().value, 90);
    }

    #[test]
    fn test_encoder_not_registered_when_rejected() {
        let (device, handle) = device();
        handle.fail(DriverCall::ConfigureEncoder, DriverStatus::Parameter);

        assert!(device.add_encoder(encoder_spec(0)).is_err());
        assert!(device.encoder_state("HDG").is_none());
    }

    #[test]
    fn test_encoder_bounds_validated() {
        let (device, _handle) = device();
        let spec = EncoderSpec {
            min: 10,
            max: 0,
            ..encoder_spec(0)
        };
        assert!(matches!(
            device.add_encoder(spec),
            Err(HardwareError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn test_encoder_events_carry_units() {
        let (device, handle) = device();
        device.add_encoder(encoder_spec(90)).unwrap();

        handle.set_encoder_raw(1, 400);
        let events = device.poll();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].value, EventValue::Int(91));
        assert_eq!(events[0].units, "deg");
        assert_eq!(events[0].byte_len, 4);
    }

    #[test]
    fn test_write_pin_updates_mirror() {
        let (device, handle) = device();
        device.add_pin("LAMP", pin(4), PinRole::Output, false, "").unwrap();

        device.target_value("LAMP", true).unwrap();

        assert!(handle.level(3));
        assert!(device.pin_state("LAMP").unwrap().value);
    }

    #[test]
    fn test_write_to_input_rejected() {
        let (device, _handle) = device();
        device.add_pin("GEAR", pin(3), PinRole::Input, false, "").unwrap();
        assert!(matches!(
            device.target_value("GEAR", true),
            Err(HardwareError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_failed_write_leaves_mirror() {
        let (device, handle) = device();
        device.add_pin("LAMP", pin(4), PinRole::Output, false, "").unwrap();
        handle.fail(DriverCall::WriteDigitalOutput, DriverStatus::Transfer);

        let err = device.write_pin("LAMP", true).unwrap_err();
        assert_eq!(err.status(), Some(DriverStatus::Transfer));
        assert!(!device.pin_state("LAMP").unwrap().value);
    }

    #[test]
    fn test_unknown_targets() {
        let (device, _handle) = device();
        for value in [TargetValue::Bool(true), TargetValue::Int(5), TargetValue::Float(0.5)] {
            assert!(matches!(
                device.target_value("NOPE", value),
                Err(HardwareError::UnknownTarget { .. })
            ));
        }
    }

    #[test]
    fn test_display_number_pushes_buffer() {
        let (device, handle) = device();
        let id = radio(&device);

        device.target_value("COM2", 12).unwrap();

        let rows = handle.matrix_rows(1);
        assert_eq!(rows[4], pokeys_core::constants::DIGIT_PATTERNS[1]);
        assert_eq!(rows[5], pokeys_core::constants::DIGIT_PATTERNS[2]);
        assert_eq!(device.display_buffer(id), Some(rows));
    }

    #[test]
    fn test_display_update_failure_is_reported() {
        let (device, handle) = device();
        radio(&device);
        handle.fail(DriverCall::UpdateMatrixLed, DriverStatus::Transfer);

        let err = device.display_number("COM1", 5).unwrap_err();
        assert!(matches!(
            err,
            HardwareError::Driver {
                call: DriverCall::UpdateMatrixLed,
                ..
            }
        ));
    }

    #[test]
    fn test_config_matrix_led() {
        let (device, handle) = device();
        radio(&device);

        let config = handle.matrix_config(1);
        assert_eq!((config.rows, config.columns, config.enabled), (8, 8, true));
        assert_eq!(handle.matrix_rows(1), [0; 8]);
    }

    #[test]
    fn test_group_needs_display() {
        let (device, _handle) = device();
        let result = device.add_group_to_matrix_led(DisplayId::new(0).unwrap(), "COM1", 4, 0);
        assert!(matches!(result, Err(HardwareError::ConfigurationError { .. })));
    }

    #[test]
    fn test_add_pwm_enables_channel() {
        let (device, handle) = device();
        device.add_pwm(pwm_spec()).unwrap();

        let config = handle.pwm_config();
        assert_eq!(config.period, 25_000);
        assert!(config.is_enabled(PwmChannel::new(0).unwrap()));
        assert_eq!(device.pwm_state("GAUGE").unwrap().left_duty, 3000);
    }

    #[test]
    fn test_pulse_without_scheduler_waits_on_caller() {
        let (device, handle) = device();
        device.add_pwm(pwm_spec()).unwrap();

        device.target_value("GAUGE", 0.5f32).unwrap();

        let updates = handle.pwm_updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0][0], 2000);
        assert_eq!(updates[1][0], 0);
    }

    #[test]
    fn test_pulse_with_scheduler_is_deferred() {
        let (driver, handle) = MockDriver::new();
        let device = PokeyDevice::builder(driver)
            .with_settings(DeviceSettings {
                start_delay_ms: 60_000,
                pulse_duration_ms: 30,
                autostart: true,
                ..Default::default()
            })
            .with_transport(Arc::new(GlobalTransport::new()))
            .connect()
            .unwrap();
        device.add_pwm(pwm_spec()).unwrap();

        device.pulse_pwm("GAUGE", 1.0).unwrap();
        assert_eq!(handle.applied_duty(0), 1000);

        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(handle.applied_duty(0), 0);
    }

    #[test]
    fn test_validate_encoder_checks_pin_pair() {
        let (device, handle) = device();
        let id = EncoderId::new(3).unwrap();
        assert!(device.validate_encoder(id).unwrap());

        handle.deny_capability(15, PinCapability::FastEncoderB(id));
        assert!(!device.validate_encoder(id).unwrap());
    }

    #[test]
    fn test_validate_pin_capability() {
        let (device, handle) = device();
        handle.deny_capability(9, PinCapability::DigitalOutput);

        assert!(device.validate_pin_capability(pin(10), PinRole::Input).unwrap());
        assert!(!device.validate_pin_capability(pin(10), PinRole::Output).unwrap());
    }

    #[test]
    fn test_device_name_truncated() {
        let (device, handle) = device();
        device.set_device_name(&"x".repeat(40)).unwrap();
        assert_eq!(handle.device_name().len(), MAX_DEVICE_NAME_LEN);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let name = format!("{}é", "a".repeat(29));
        assert_eq!(truncate_name(&name), "a".repeat(29));
        assert_eq!(truncate_name("short"), "short");
    }

    #[test]
    fn test_transport_held_for_every_transaction() {
        let (driver, handle) = MockDriver::new();
        let transport = Arc::new(RecordingTransport::new());
        let device = PokeyDevice::builder(driver)
            .with_settings(manual())
            .with_transport(transport.clone())
            .connect()
            .unwrap();

        device.add_pin("GEAR", pin(1), PinRole::Input, false, "").unwrap();
        device.poll();
        drop(device);

        assert_eq!(transport.max_holders(), 1);
        assert!(transport.acquisitions() >= 4);
        assert_eq!(handle.journal().last(), Some(&DriverCall::Disconnect));
    }

    #[test]
    fn test_drop_disconnects() {
        let (device, handle) = device();
        assert!(handle.is_connected());
        drop(device);
        assert!(!handle.is_connected());
    }
}
