//! Hardware limits and default timings.
//!
//! The limits describe the PoKeys57E controller: 55 general purpose pins,
//! three fast quadrature encoders, six PWM channels and two LED matrix
//! outputs, each backed by an eight byte row buffer.
//!
//! # 7-segment rows
//!
//! Matrix displays wired as 7-segment digits take one byte per column. The
//! bits are, from most significant to least significant, segments
//! `a b c d e f g dp`:
//!
//! ```text
//!  aaa
//! f   b
//!  ggg
//! e   c
//!  ddd  dp
//! ```
//!
//! ```
//! use pokeys_core::constants::{DIGIT_PATTERNS, digit_pattern};
//!
//! assert_eq!(digit_pattern(8), Some(0b1111_1110));
//! assert_eq!(DIGIT_PATTERNS.len(), 10);
//! assert_eq!(digit_pattern(10), None);
//! ```

// ============================================================================
// Hardware Limits
// ============================================================================

/// Number of general purpose pins on the controller.
pub const PIN_COUNT: usize = 55;

/// Number of fast quadrature encoders.
pub const ENCODER_COUNT: usize = 3;

/// Number of PWM channels.
pub const PWM_CHANNEL_COUNT: usize = 6;

/// Number of LED matrix outputs.
pub const MATRIX_LED_COUNT: usize = 2;

/// Bytes in one LED matrix row buffer (one byte per column).
pub const MATRIX_LED_COLUMNS: usize = 8;

/// Longest device name the controller stores.
pub const MAX_DEVICE_NAME_LEN: usize = 30;

/// Hardware type code reported by a PoKeys57E.
pub const POKEY_57E_HARDWARE_TYPE: u8 = 31;

/// Encoder options: bit 0 enables the encoder, bit 1 selects 4x sampling.
pub const ENCODER_OPTIONS_ENABLED_4X: u8 = 0b11;

/// Zero-based channel A/B pins wired to each fast encoder, in ordinal order.
pub const ENCODER_CHANNEL_PINS: [(u8, u8); ENCODER_COUNT] = [(0, 1), (4, 5), (14, 15)];

// ============================================================================
// Timing
// ============================================================================

/// Delay between starting the poll loop and its first cycle.
pub const DEFAULT_START_DELAY_MS: u64 = 1000;

/// Interval between poll cycles.
pub const DEFAULT_READ_INTERVAL_MS: u64 = 100;

/// How long a PWM pulse stays on before the channel is driven back to zero.
pub const DEFAULT_PULSE_DURATION_MS: u64 = 750;

/// Capacity of the bounded event channel between a device and the host.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

// ============================================================================
// 7-Segment Rendering
// ============================================================================

/// Row patterns for the decimal digits 0-9.
pub const DIGIT_PATTERNS: [u8; 10] = [
    0b1111_1100, // 0
    0b0110_0000, // 1
    0b1101_1010, // 2
    0b1111_0010, // 3
    0b0110_0110, // 4
    0b1011_0110, // 5
    0b1011_1110, // 6
    0b1110_0000, // 7
    0b1111_1110, // 8
    0b1110_0110, // 9
];

/// Row pattern with every segment off.
pub const BLANK_ROW: u8 = 0b0000_0000;

/// Look up the row pattern for a single decimal digit.
pub fn digit_pattern(digit: u8) -> Option<u8> {
    DIGIT_PATTERNS.get(usize::from(digit)).copied()
}
