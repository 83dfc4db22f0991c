//! Digital pin mirror and change detection.

use pokeys_core::constants::PIN_COUNT;
use pokeys_core::{EventValue, PinNumber, PinRole};

use crate::events::Change;

/// Mirror of one configured pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinState {
    pub number: PinNumber,
    pub role: PinRole,
    pub value: bool,
    pub previous: bool,
    pub default: bool,
    pub name: String,
    pub description: String,
}

impl PinState {
    pub fn new(
        number: PinNumber,
        role: PinRole,
        default: bool,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            number,
            role,
            value: default,
            previous: default,
            default,
            name: name.into(),
            description: description.into(),
        }
    }

    /// Record a new level, returning true if it differs from the stored one.
    pub(crate) fn update(&mut self, level: bool) -> bool {
        if level == self.value {
            return false;
        }
        self.previous = self.value;
        self.value = level;
        true
    }

    fn change(&self) -> Change {
        Change {
            value: EventValue::Bool(self.value),
            name: self.name.clone(),
            description: self.description.clone(),
            units: String::new(),
        }
    }
}

/// Diffs digital snapshots against the stored pin levels.
///
/// ```
/// use pokeys_core::{PinNumber, PinRole};
/// use pokeys_device::pins::{ChangeDetector, PinState};
///
/// let mut detector = ChangeDetector::new();
/// let pin = PinNumber::new(2).unwrap();
/// detector.configure(PinState::new(pin, PinRole::Input, false, "gear", ""));
///
/// let mut levels = vec![false; 55];
/// assert!(detector.diff(&levels).is_empty());
///
/// levels[pin.index()] = true;
/// assert_eq!(detector.diff(&levels).len(), 1);
/// assert!(detector.diff(&levels).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ChangeDetector {
    pins: Vec<Option<PinState>>,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self {
            pins: vec![None; PIN_COUNT],
        }
    }
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a pin, returning the state it replaced.
    pub fn configure(&mut self, state: PinState) -> Option<PinState> {
        let index = state.number.index();
        self.pins[index].replace(state)
    }

    pub fn get(&self, pin: PinNumber) -> Option<&PinState> {
        self.pins[pin.index()].as_ref()
    }

    pub fn get_mut(&mut self, pin: PinNumber) -> Option<&mut PinState> {
        self.pins[pin.index()].as_mut()
    }

    pub fn configured(&self) -> impl Iterator<Item = &PinState> {
        self.pins.iter().flatten()
    }

    /// Compare a full digital snapshot with the stored levels.
    ///
    /// Only input pins are compared. Each pin whose level changed is updated
    /// and yields exactly one change. Pins missing from a short snapshot are
    /// left alone.
    pub fn diff(&mut self, levels: &[bool]) -> Vec<Change> {
        self.pins
            .iter_mut()
            .flatten()
            .filter(|pin| pin.role == PinRole::Input)
            .filter_map(|pin| {
                let level = *levels.get(pin.number.index())?;
                pin.update(level).then(|| pin.change())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: u16) -> PinNumber {
        PinNumber::new(n).unwrap()
    }

    fn detector_with(pins: &[(u16, PinRole, bool)]) -> ChangeDetector {
        let mut detector = ChangeDetector::new();
        for (n, role, default) in pins {
            detector.configure(PinState::new(pin(*n), *role, *default, format!("P{n}"), "desc"));
        }
        detector
    }

    #[test]
    fn test_unchanged_pins_emit_nothing() {
        let mut detector = detector_with(&[(1, PinRole::Input, false), (2, PinRole::Input, true)]);
        let mut levels = vec![false; PIN_COUNT];
        levels[1] = true;
        assert!(detector.diff(&levels).is_empty());
    }

    #[test]
    fn test_change_updates_previous_and_current() {
        let mut detector = detector_with(&[(3, PinRole::Input, false)]);
        let mut levels = vec![false; PIN_COUNT];
        levels[2] = true;

        let changes = detector.diff(&levels);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].value, EventValue::Bool(true));
        assert_eq!(changes[0].name, "P3");
        assert_eq!(changes[0].description, "desc");
        assert_eq!(changes[0].units, "");

        let state = detector.get(pin(3)).unwrap();
        assert!(state.value);
        assert!(!state.previous);
    }

    #[test]
    fn test_output_pins_never_diffed() {
        let mut detector = detector_with(&[(4, PinRole::Output, false)]);
        let levels = vec![true; PIN_COUNT];
        assert!(detector.diff(&levels).is_empty());
        assert!(!detector.get(pin(4)).unwrap().value);
    }

    #[test]
    fn test_one_change_per_pin_per_cycle() {
        let mut detector = detector_with(&[
            (1, PinRole::Input, false),
            (2, PinRole::Input, false),
            (3, PinRole::Output, false),
        ]);
        let levels = vec![true; PIN_COUNT];
        let changes = detector.diff(&levels);
        let names: Vec<_> = changes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["P1", "P2"]);
    }

    #[test]
    fn test_short_snapshot_skips_missing_pins() {
        let mut detector = detector_with(&[(10, PinRole::Input, false)]);
        assert!(detector.diff(&[true; 5]).is_empty());
    }

    #[test]
    fn test_reconfigure_replaces_state() {
        let mut detector = ChangeDetector::new();
        detector.configure(PinState::new(pin(5), PinRole::Input, false, "old", ""));
        let replaced = detector.configure(PinState::new(pin(5), PinRole::Output, true, "new", ""));
        assert_eq!(replaced.unwrap().name, "old");
        assert_eq!(detector.get(pin(5)).unwrap().role, PinRole::Output);
        assert_eq!(detector.configured().count(), 1);
    }
}
