use thiserror::Error;

/// Validation errors for identifiers and values handed to the bridge.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid pin number: {0} (expected 1-{max})", max = crate::constants::PIN_COUNT)]
    InvalidPin(u16),

    #[error("Invalid encoder ordinal: {0} (expected 1-{max})", max = crate::constants::ENCODER_COUNT)]
    InvalidEncoder(u16),

    #[error("Invalid PWM channel: {0} (expected 0-{max})", max = crate::constants::PWM_CHANNEL_COUNT - 1)]
    InvalidPwmChannel(u16),

    #[error("Invalid matrix LED id: {0} (expected 0-{max})", max = crate::constants::MATRIX_LED_COUNT - 1)]
    InvalidDisplay(u16),
}

pub type Result<T> = std::result::Result<T, Error>;
