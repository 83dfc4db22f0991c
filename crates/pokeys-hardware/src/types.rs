//! Records exchanged with the driver SDK.
//!
//! These mirror the SDK's configuration blocks closely enough that a real
//! driver binding can translate them field by field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use pokeys_core::constants::{POKEY_57E_HARDWARE_TYPE, PWM_CHANNEL_COUNT};
use pokeys_core::{EncoderId, PwmChannel};

/// Individual driver SDK calls, used for error context and call journals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverCall {
    Connect,
    Disconnect,
    CheckPinCapability,
    SetPinFunction,
    ReadDigitalInputs,
    WriteDigitalOutput,
    ConfigureEncoder,
    SetEncoderValue,
    ReadEncoderValues,
    ReadPwmConfiguration,
    SetPwmConfiguration,
    SetPwmDuty,
    UpdatePwm,
    ReadMatrixLedConfiguration,
    SetMatrixLedConfiguration,
    UpdateMatrixLed,
    SetDeviceName,
}

impl fmt::Display for DriverCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::CheckPinCapability => "pin capability query",
            Self::SetPinFunction => "pin configuration",
            Self::ReadDigitalInputs => "digital input read",
            Self::WriteDigitalOutput => "digital output write",
            Self::ConfigureEncoder => "encoder configuration",
            Self::SetEncoderValue => "encoder value write",
            Self::ReadEncoderValues => "encoder value read",
            Self::ReadPwmConfiguration => "PWM configuration read",
            Self::SetPwmConfiguration => "PWM configuration",
            Self::SetPwmDuty => "PWM duty write",
            Self::UpdatePwm => "PWM update",
            Self::ReadMatrixLedConfiguration => "matrix LED configuration read",
            Self::SetMatrixLedConfiguration => "matrix LED configuration",
            Self::UpdateMatrixLed => "matrix LED update",
            Self::SetDeviceName => "device name write",
        };
        f.write_str(text)
    }
}

/// Discovery record for a network device, as returned by the SDK's
/// enumeration call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub serial_number: u32,
    pub user_id: u8,
    /// Packed firmware major byte: high nibble is major-major minus one,
    /// low nibble is major.
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub ip_address: [u8; 4],
    pub hardware_type: u8,
    pub dhcp: bool,
}

impl Default for DeviceSummary {
    fn default() -> Self {
        Self {
            serial_number: 0,
            user_id: 0,
            firmware_major: 0,
            firmware_minor: 0,
            ip_address: [0; 4],
            hardware_type: POKEY_57E_HARDWARE_TYPE,
            dhcp: false,
        }
    }
}

/// Decoded identity of a connected device.
///
/// ```
/// use pokeys_hardware::{DeviceInfo, DeviceSummary};
///
/// let summary = DeviceSummary {
///     serial_number: 31337,
///     firmware_major: 0x34,
///     firmware_minor: 12,
///     hardware_type: 31,
///     ..Default::default()
/// };
/// let info = DeviceInfo::from_summary(&summary, 0);
///
/// assert_eq!(info.serial_number, "31337");
/// assert_eq!(info.firmware_version(), "4.4.12");
/// assert_eq!(info.hardware_type_name(), "Pokey 57E");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Position of the device in the host's device list.
    pub index: u8,
    pub serial_number: String,
    pub user_id: u8,
    pub firmware_major_major: u8,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub ip_address: Ipv4Addr,
    pub hardware_type: u8,
    pub dhcp: bool,
}

impl DeviceInfo {
    pub fn from_summary(summary: &DeviceSummary, index: u8) -> Self {
        Self {
            index,
            serial_number: summary.serial_number.to_string(),
            user_id: summary.user_id,
            firmware_major_major: (summary.firmware_major >> 4) + 1,
            firmware_major: summary.firmware_major & 0x0F,
            firmware_minor: summary.firmware_minor,
            ip_address: Ipv4Addr::from(summary.ip_address),
            hardware_type: summary.hardware_type,
            dhcp: summary.dhcp,
        }
    }

    pub fn firmware_version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.firmware_major_major, self.firmware_major, self.firmware_minor
        )
    }

    pub fn hardware_type_name(&self) -> &'static str {
        if self.hardware_type == POKEY_57E_HARDWARE_TYPE {
            "Pokey 57E"
        } else {
            "Unknown"
        }
    }
}

/// Pin capabilities the SDK can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinCapability {
    DigitalInput,
    DigitalOutput,
    FastEncoderA(EncoderId),
    FastEncoderB(EncoderId),
}

/// Function assigned to a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinFunction {
    DigitalInput,
    DigitalOutput { inverted: bool },
}

/// Configuration of one fast encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub options: u8,
    /// Zero-based pin sampled as channel A.
    pub channel_a_pin: u8,
    /// Zero-based pin sampled as channel B.
    pub channel_b_pin: u8,
}

/// PWM block configuration, shared by all channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PwmConfig {
    /// Period in controller clock cycles.
    pub period: u32,
    pub enabled_channels: [bool; PWM_CHANNEL_COUNT],
}

impl PwmConfig {
    pub fn enable(&mut self, channel: PwmChannel) {
        self.enabled_channels[channel.index()] = true;
    }

    pub fn is_enabled(&self, channel: PwmChannel) -> bool {
        self.enabled_channels[channel.index()]
    }
}

/// Geometry and enable state of one LED matrix output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatrixLedConfig {
    pub rows: u8,
    pub columns: u8,
    pub enabled: bool,
}
