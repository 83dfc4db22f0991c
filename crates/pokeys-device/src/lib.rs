//! Poll, diff and emit engine for PoKeys I/O controllers.
//!
//! A [`PokeyDevice`] samples a controller's digital inputs and encoder
//! counters at a fixed interval, compares them with what it saw last, and
//! sends each change to the host as an [`Event`]. Host commands travel the
//! other way: booleans drive output pins, integers render on LED matrix
//! digit groups and floats pulse PWM channels.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────── PokeyDevice ────────────────┐
//!   host commands ──►│ NameRegistry ─► pins / PWM / displays       │
//!                    │                                             │
//!                    │ PollScheduler ─► ChangeDetector             │──► Event
//!                    │   (own thread)   EncoderTracker             │   channel
//!                    │                  EventEmitter               │
//!                    └──────────────────────┬──────────────────────┘
//!                                           │ TransportPermit
//!                                    TransportCoordinator
//!                                           │
//!                                      PokeysDriver
//! ```
//!
//! Every driver call holds the transport permit, so at most one hardware
//! transaction runs at a time across all devices sharing a coordinator.
//! Events are collected under the permit and sent after it is released.

pub mod device;
pub mod display;
pub mod encoder;
pub mod events;
pub mod pins;
pub mod pwm;
pub mod registry;
pub mod scheduler;
pub mod settings;

pub use device::{PokeyDevice, PokeyDeviceBuilder};
pub use display::{DigitGroup, DisplayRenderer, MatrixDisplay, RenderOutcome};
pub use encoder::{EncoderSpec, EncoderState, EncoderTracker};
pub use events::{Change, Event, EventEmitter};
pub use pins::{ChangeDetector, PinState};
pub use pwm::{PwmChannelState, PwmSpec};
pub use registry::{NameRegistry, NameTable};
pub use scheduler::{DeferredAction, PollScheduler, PollTarget};
pub use settings::DeviceSettings;
