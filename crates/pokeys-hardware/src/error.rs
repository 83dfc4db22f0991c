//! Error types for hardware operations.
//!
//! The driver SDK reports every call with a status code. Only an explicit OK
//! is success; every other code becomes a [`DriverStatus`], and the bridge
//! wraps it in a [`HardwareError`] naming the call that failed.

use pokeys_core::ResourceKind;

use crate::types::DriverCall;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Result of a single driver call.
pub type DriverResult<T> = std::result::Result<T, DriverStatus>;

/// Non-OK status codes returned by the driver SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum DriverStatus {
    #[error("generic error")]
    Generic,

    #[error("device not connected")]
    NotConnected,

    #[error("transfer error")]
    Transfer,

    #[error("parameter error")]
    Parameter,

    #[error("operation not supported")]
    NotSupported,

    #[error("cannot claim USB device")]
    CannotClaimUsb,

    #[error("cannot connect")]
    CannotConnect,

    #[error("unknown status code {0}")]
    Unknown(i32),
}

impl DriverStatus {
    /// Raw status code value used by the SDK.
    pub const OK: i32 = 0;

    /// Interpret a raw SDK status code.
    ///
    /// ```
    /// use pokeys_hardware::DriverStatus;
    ///
    /// assert_eq!(DriverStatus::check(0), Ok(()));
    /// assert_eq!(DriverStatus::check(-10), Err(DriverStatus::Transfer));
    /// assert_eq!(DriverStatus::check(7), Err(DriverStatus::Unknown(7)));
    /// ```
    pub fn check(code: i32) -> DriverResult<()> {
        match code {
            Self::OK => Ok(()),
            -1 => Err(Self::Generic),
            -5 => Err(Self::NotConnected),
            -10 => Err(Self::Transfer),
            -20 => Err(Self::Parameter),
            -30 => Err(Self::NotSupported),
            -100 => Err(Self::CannotClaimUsb),
            -200 => Err(Self::CannotConnect),
            other => Err(Self::Unknown(other)),
        }
    }

    /// Raw SDK code for this status.
    pub fn code(self) -> i32 {
        match self {
            Self::Generic => -1,
            Self::NotConnected => -5,
            Self::Transfer => -10,
            Self::Parameter => -20,
            Self::NotSupported => -30,
            Self::CannotClaimUsb => -100,
            Self::CannotConnect => -200,
            Self::Unknown(code) => code,
        }
    }
}

/// Errors that can occur during hardware device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The controller could not be reached during construction.
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    /// A driver call returned a non-OK status.
    #[error("{call} failed: {status}")]
    Driver { call: DriverCall, status: DriverStatus },

    /// No resource of this kind is registered under the name.
    #[error("Unknown {kind} target: {name}")]
    UnknownTarget { kind: ResourceKind, name: String },

    /// Device configuration error.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// A value could not be applied to the target.
    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    /// Poll scheduler could not be started or reached.
    #[error("Scheduler error: {message}")]
    Scheduler { message: String },

    /// Identifier validation failure.
    #[error(transparent)]
    Core(#[from] pokeys_core::Error),
}

impl HardwareError {
    /// Create a new connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    /// Wrap a driver status with the call that produced it.
    pub fn driver(call: DriverCall, status: DriverStatus) -> Self {
        Self::Driver { call, status }
    }

    /// Create a new unknown target error.
    pub fn unknown_target(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::UnknownTarget {
            kind,
            name: name.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new invalid value error.
    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    /// Create a new scheduler error.
    pub fn scheduler(message: impl Into<String>) -> Self {
        Self::Scheduler {
            message: message.into(),
        }
    }

    /// Driver status behind this error, if it came from a driver call.
    pub fn status(&self) -> Option<DriverStatus> {
        match self {
            Self::Driver { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Attach the failing call to a raw driver result.
pub trait DriverResultExt<T> {
    fn during(self, call: DriverCall) -> Result<T>;
}

impl<T> DriverResultExt<T> for DriverResult<T> {
    fn during(self, call: DriverCall) -> Result<T> {
        self.map_err(|status| HardwareError::driver(call, status))
    }
}
