//! Identifier and value types shared by the driver boundary and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{ENCODER_COUNT, MATRIX_LED_COUNT, PIN_COUNT, PWM_CHANNEL_COUNT};
use crate::error::{Error, Result};

/// A controller pin, numbered from 1 as printed on the board.
///
/// Driver calls address pins by zero-based index; use [`PinNumber::index`]
/// to convert.
///
/// ```
/// use pokeys_core::PinNumber;
///
/// let pin = PinNumber::new(12).unwrap();
/// assert_eq!(pin.get(), 12);
/// assert_eq!(pin.index(), 11);
/// assert!(PinNumber::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct PinNumber(u8);

impl PinNumber {
    pub fn new(number: u16) -> Result<Self> {
        if number == 0 || usize::from(number) > PIN_COUNT {
            return Err(Error::InvalidPin(number));
        }
        Ok(Self(number as u8))
    }

    /// Build a pin from its zero-based driver index.
    pub fn from_index(index: usize) -> Result<Self> {
        let number = u16::try_from(index + 1).map_err(|_| Error::InvalidPin(u16::MAX))?;
        Self::new(number)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<u16> for PinNumber {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PinNumber> for u16 {
    fn from(pin: PinNumber) -> Self {
        u16::from(pin.0)
    }
}

impl fmt::Display for PinNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin {}", self.0)
    }
}

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinRole {
    /// Sampled every poll cycle; changes are reported to the host.
    Input,

    /// Driven by host commands; never diffed.
    Output,
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => write!(f, "digital input"),
            Self::Output => write!(f, "digital output"),
        }
    }
}

/// Fast quadrature encoder ordinal (1-3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct EncoderId(u8);

impl EncoderId {
    pub fn new(ordinal: u16) -> Result<Self> {
        if ordinal == 0 || usize::from(ordinal) > ENCODER_COUNT {
            return Err(Error::InvalidEncoder(ordinal));
        }
        Ok(Self(ordinal as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based slot in the driver's encoder table.
    pub fn index(self) -> usize {
        usize::from(self.0) - 1
    }
}

impl TryFrom<u16> for EncoderId {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EncoderId> for u16 {
    fn from(id: EncoderId) -> Self {
        u16::from(id.0)
    }
}

impl fmt::Display for EncoderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoder {}", self.0)
    }
}

/// PWM channel (0-5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct PwmChannel(u8);

impl PwmChannel {
    pub fn new(channel: u16) -> Result<Self> {
        if usize::from(channel) >= PWM_CHANNEL_COUNT {
            return Err(Error::InvalidPwmChannel(channel));
        }
        Ok(Self(channel as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<u16> for PwmChannel {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<PwmChannel> for u16 {
    fn from(channel: PwmChannel) -> Self {
        u16::from(channel.0)
    }
}

impl fmt::Display for PwmChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PWM channel {}", self.0)
    }
}

/// LED matrix output (0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct DisplayId(u8);

impl DisplayId {
    pub fn new(id: u16) -> Result<Self> {
        if usize::from(id) >= MATRIX_LED_COUNT {
            return Err(Error::InvalidDisplay(id));
        }
        Ok(Self(id as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl TryFrom<u16> for DisplayId {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DisplayId> for u16 {
    fn from(id: DisplayId) -> Self {
        u16::from(id.0)
    }
}

impl fmt::Display for DisplayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "matrix LED {}", self.0)
    }
}

/// Kind of named resource a host command or lookup refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Pin,
    Pwm,
    Encoder,
    Display,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pin => write!(f, "pin"),
            Self::Pwm => write!(f, "PWM"),
            Self::Encoder => write!(f, "encoder"),
            Self::Display => write!(f, "display"),
        }
    }
}

/// Opaque handle identifying the host plugin instance that owns a device.
///
/// The bridge never interprets it; it is copied into every event so the host
/// can route events back to the right plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PluginHandle(pub u64);

/// Payload of an event sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EventValue {
    /// Digital pin level.
    Bool(bool),

    /// Encoder logical value.
    Int(i32),
}

impl EventValue {
    /// Size in bytes of the value as the host's record format stores it.
    pub fn byte_len(&self) -> usize {
        match self {
            Self::Bool(_) => std::mem::size_of::<u8>(),
            Self::Int(_) => std::mem::size_of::<u32>(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(_) => None,
        }
    }
}

/// Value carried by a host command.
///
/// The variant selects the kind of output the command drives: booleans write
/// a digital pin, integers render onto a display digit group, and floats in
/// `0.0..=1.0` pulse a PWM channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TargetValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl From<bool> for TargetValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for TargetValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for TargetValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}
