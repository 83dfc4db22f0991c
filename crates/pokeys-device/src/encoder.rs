//! Encoder tracking.
//!
//! The hardware reports a free-running raw counter per encoder. The host sees
//! a logical value instead, clamped to `[min, max]` and moved by exactly one
//! `step` per poll cycle in which the raw counter changed, whatever the size
//! of the raw movement. Fast spins therefore collapse into one step per
//! cycle.
//!
//! Direction comes from comparing the new raw counter with the previous one,
//! not from the magnitude of a signed delta, so a counter wrapping from
//! `u32::MAX` to `0` reads as a decrease.

use pokeys_core::constants::ENCODER_COUNT;
use pokeys_core::{EncoderId, EventValue};

use crate::events::Change;

/// Way the raw counter moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increasing,
    Decreasing,
}

/// Outcome of feeding a changed raw counter to an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderStep {
    pub direction: Direction,
    /// False when the logical value was already pinned at a boundary.
    pub moved: bool,
}

/// Configuration for one encoder, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSpec {
    pub id: EncoderId,
    pub default: i32,
    pub name: String,
    pub description: String,
    pub min: i32,
    pub max: i32,
    pub step: i32,
    /// Swap the A/B channels, reversing the counting direction.
    pub invert: bool,
    pub units: String,
}

/// Mirror of one encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderState {
    pub id: EncoderId,
    pub value: i32,
    pub previous: i32,
    /// Raw counter seen on the last cycle.
    pub raw: u32,
    pub min: i32,
    pub max: i32,
    pub step: i32,
    pub name: String,
    pub description: String,
    pub units: String,
}

impl EncoderState {
    /// Build the mirror for validated settings, starting at the default.
    ///
    /// The default is clamped into `[min, max]`. The raw counter is seeded
    /// with the default's bit pattern, matching what the device is told.
    pub fn new(spec: &EncoderSpec) -> Self {
        let value = spec.default.clamp(spec.min, spec.max);
        Self {
            id: spec.id,
            value,
            previous: value,
            raw: raw_seed(spec.default),
            min: spec.min,
            max: spec.max,
            step: spec.step,
            name: spec.name.clone(),
            description: spec.description.clone(),
            units: spec.units.clone(),
        }
    }

    /// Feed a raw counter sample.
    ///
    /// Returns `None` when the counter did not move.
    pub fn observe(&mut self, raw: u32) -> Option<EncoderStep> {
        if raw == self.raw {
            return None;
        }

        let direction = if raw < self.raw {
            Direction::Decreasing
        } else {
            Direction::Increasing
        };
        self.raw = raw;

        let before = self.value;
        match direction {
            Direction::Decreasing if self.value <= self.min => self.pin_to(self.min),
            Direction::Increasing if self.value >= self.max => self.pin_to(self.max),
            Direction::Decreasing => {
                self.previous = self.value;
                self.value = self.value.saturating_sub(self.step).max(self.min);
            }
            Direction::Increasing => {
                self.previous = self.value;
                self.value = self.value.saturating_add(self.step).min(self.max);
            }
        }

        Some(EncoderStep {
            direction,
            moved: self.value != before,
        })
    }

    fn pin_to(&mut self, boundary: i32) {
        self.previous = boundary;
        self.value = boundary;
    }

    fn change(&self) -> Change {
        Change {
            value: EventValue::Int(self.value),
            name: self.name.clone(),
            description: self.description.clone(),
            units: self.units.clone(),
        }
    }
}

/// Raw counters are unsigned; negative defaults wrap as the SDK would.
pub(crate) fn raw_seed(default: i32) -> u32 {
    default as u32
}

/// All configured encoders of one device.
#[derive(Debug, Clone, Default)]
pub struct EncoderTracker {
    encoders: [Option<EncoderState>; ENCODER_COUNT],
}

impl EncoderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn configure(&mut self, state: EncoderState) -> Option<EncoderState> {
        let index = state.id.index();
        self.encoders[index].replace(state)
    }

    pub fn get(&self, id: EncoderId) -> Option<&EncoderState> {
        self.encoders[id.index()].as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.iter().all(Option::is_none)
    }

    /// Apply one cycle of raw counters, indexed by encoder slot.
    ///
    /// Every encoder whose counter moved yields a change, even when the
    /// logical value is pinned at a boundary, unless `suppress_clamped` is
    /// set.
    pub fn update(&mut self, raws: &[u32], suppress_clamped: bool) -> Vec<Change> {
        let mut changes = Vec::new();
        for (slot, raw) in self.encoders.iter_mut().zip(raws) {
            let Some(encoder) = slot else { continue };
            let Some(step) = encoder.observe(*raw) else {
                continue;
            };
            if suppress_clamped && !step.moved {
                continue;
            }
            changes.push(encoder.change());
        }
        changes
    }
}
