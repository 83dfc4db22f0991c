//! Property-based tests for change detection and encoder tracking.
//!
//! These drive the detectors directly with generated samples and check the
//! invariants the poll loop relies on.

use proptest::prelude::*;

use pokeys_core::constants::PIN_COUNT;
use pokeys_core::{EncoderId, EventValue, PinNumber, PinRole};
use pokeys_device::encoder::Direction;
use pokeys_device::{ChangeDetector, EncoderSpec, EncoderState, EncoderTracker, PinState};

/// Strategy for encoder bounds with `min <= default <= max` and a positive step.
fn encoder_spec() -> impl Strategy<Value = EncoderSpec> {
    (-1000i32..1000, 0i32..2000, 1i32..50)
        .prop_flat_map(|(min, span, step)| {
            let max = min + span;
            (Just(min), Just(max), min..=max, Just(step))
        })
        .prop_map(|(min, max, default, step)| EncoderSpec {
            id: EncoderId::new(1).unwrap(),
            default,
            name: "ENC".to_string(),
            description: String::new(),
            min,
            max,
            step,
            invert: false,
            units: String::new(),
        })
}

/// Strategy for a run of raw counters starting from the seed of `default`.
fn raw_samples() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(any::<u32>(), 1..64)
}

proptest! {
    /// Property: the logical value never leaves [min, max].
    #[test]
    fn prop_encoder_value_stays_in_bounds(spec in encoder_spec(), raws in raw_samples()) {
        let mut encoder = EncoderState::new(&spec);
        for raw in raws {
            encoder.observe(raw);
            prop_assert!(encoder.value >= spec.min && encoder.value <= spec.max);
            prop_assert!(encoder.previous >= spec.min && encoder.previous <= spec.max);
            prop_assert_eq!(encoder.raw, raw);
        }
    }

    /// Property: every raw change moves the value by at most one step, in
    /// the direction of the raw change, and by exactly one step unless a
    /// boundary is in the way.
    #[test]
    fn prop_one_step_per_changed_cycle(spec in encoder_spec(), raws in raw_samples()) {
        let mut encoder = EncoderState::new(&spec);
        for raw in raws {
            let before = encoder.value;
            let Some(step) = encoder.observe(raw) else {
                prop_assert_eq!(encoder.value, before);
                continue;
            };
            let moved = encoder.value - before;
            match step.direction {
                Direction::Increasing => {
                    let expected = (before + spec.step).min(spec.max).max(before);
                    prop_assert_eq!(encoder.value, expected);
                    prop_assert!(moved >= 0);
                }
                Direction::Decreasing => {
                    let expected = (before - spec.step).max(spec.min).min(before);
                    prop_assert_eq!(encoder.value, expected);
                    prop_assert!(moved <= 0);
                }
            }
        }
    }

    /// Property: by default every raw change yields exactly one event.
    #[test]
    fn prop_every_raw_change_emits(spec in encoder_spec(), raws in raw_samples()) {
        let mut tracker = EncoderTracker::new();
        let mut last_raw = EncoderState::new(&spec).raw;
        tracker.configure(EncoderState::new(&spec));

        for raw in raws {
            let changes = tracker.update(&[raw, 0, 0], false);
            let expected = usize::from(raw != last_raw);
            prop_assert_eq!(changes.len(), expected);
            last_raw = raw;
        }
    }

    /// Property: an emitted pin event always carries a value different from
    /// the one stored before the cycle, so no duplicate values are emitted.
    #[test]
    fn prop_no_duplicate_pin_events(
        inputs in prop::collection::vec(0usize..PIN_COUNT, 1..8),
        cycles in prop::collection::vec(prop::collection::vec(any::<bool>(), PIN_COUNT), 1..32),
    ) {
        let mut detector = ChangeDetector::new();
        for index in &inputs {
            let pin = PinNumber::from_index(*index).unwrap();
            detector.configure(PinState::new(pin, PinRole::Input, false, format!("P{index}"), ""));
        }

        for levels in cycles {
            let stored: Vec<bool> = (0..PIN_COUNT)
                .map(|i| {
                    let pin = PinNumber::from_index(i).unwrap();
                    detector.get(pin).map(|p| p.value).unwrap_or(false)
                })
                .collect();

            for change in detector.diff(&levels) {
                let index: usize = change.name[1..].parse().unwrap();
                let EventValue::Bool(value) = change.value else {
                    panic!("pin events are boolean");
                };
                prop_assert_ne!(value, stored[index]);
                prop_assert_eq!(value, levels[index]);
            }
        }
    }
}

/// Decrease, increase, decrease across ticks: one step per tick, clamped
/// without overshoot.
#[test]
fn test_direction_reversals_step_once_per_tick() {
    let spec = EncoderSpec {
        id: EncoderId::new(1).unwrap(),
        default: 4,
        name: "ENC".to_string(),
        description: String::new(),
        min: 0,
        max: 10,
        step: 3,
        invert: false,
        units: String::new(),
    };
    let mut encoder = EncoderState::new(&spec);
    let raws = [3u32, 1, 0, 9, 50, 51, 52, 40, 39];
    let expected = [1, 0, 0, 3, 6, 9, 10, 7, 4];

    for (raw, want) in raws.into_iter().zip(expected) {
        encoder.observe(raw);
        assert_eq!(encoder.value, want, "after raw {raw}");
    }
}
