//! LED matrix displays and 7-segment digit rendering.
//!
//! Each display owns an eight-byte row buffer, one byte per column. Digit
//! groups carve contiguous ranges out of that buffer and render decimal
//! values into them. Groups of one display are expected not to overlap;
//! nothing checks this at runtime.

use std::collections::BTreeMap;
use std::ops::Range;

use pokeys_core::{DisplayId, ResourceKind};
use pokeys_core::constants::{BLANK_ROW, DIGIT_PATTERNS, MATRIX_LED_COLUMNS, MATRIX_LED_COUNT};
use pokeys_hardware::{HardwareError, MatrixLedConfig, Result};

/// Row buffer of one display.
pub type RowBuffer = [u8; MATRIX_LED_COLUMNS];

/// Value that blanks a group instead of rendering it.
pub const BLANK_VALUE: i32 = -1;

/// A contiguous run of cells rendering one numeric field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitGroup {
    pub name: String,
    pub position: usize,
    pub length: usize,
    /// Last value written into the group, after sign folding.
    pub last_value: Option<i64>,
}

impl DigitGroup {
    /// Create a group, checking that it fits inside the row buffer.
    pub fn new(name: impl Into<String>, position: usize, length: usize) -> Result<Self> {
        let name = name.into();
        if length == 0 {
            return Err(HardwareError::configuration(format!(
                "digit group {name} must have at least one cell"
            )));
        }
        if position.saturating_add(length) > MATRIX_LED_COLUMNS {
            return Err(HardwareError::configuration(format!(
                "digit group {name} at {position} with {length} cells exceeds {MATRIX_LED_COLUMNS} columns"
            )));
        }
        Ok(Self {
            name,
            position,
            length,
            last_value: None,
        })
    }

    fn cells(&self) -> Range<usize> {
        self.position..self.position + self.length
    }
}

/// What a render did to the group's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Group cleared with a single `0` in its last cell.
    Zero,
    /// This many digits written left-aligned; later cells untouched.
    Digits(usize),
    /// Group cleared.
    Blanked,
    /// Value needs this many digits, more than the group holds. Nothing
    /// written.
    Overflow(usize),
}

/// Renders decimal values into digit groups.
#[derive(Debug)]
pub struct DisplayRenderer;

impl DisplayRenderer {
    /// Render `value` into `group`'s cells of `buffer`.
    ///
    /// Values below `-1` are shown by magnitude. `-1` blanks the group. A
    /// positive value is written left-aligned when it fits; cells after the
    /// last digit keep whatever they showed before.
    ///
    /// ```
    /// use pokeys_device::display::{DigitGroup, DisplayRenderer, RenderOutcome};
    ///
    /// let mut buffer = [0u8; 8];
    /// let mut group = DigitGroup::new("ALT", 0, 4).unwrap();
    ///
    /// assert_eq!(DisplayRenderer::render(&mut buffer, &mut group, 42), RenderOutcome::Digits(2));
    /// assert_eq!(buffer[0], 0b0110_0110);
    /// assert_eq!(buffer[1], 0b1101_1010);
    /// ```
    pub fn render(buffer: &mut RowBuffer, group: &mut DigitGroup, value: i32) -> RenderOutcome {
        let mut value = i64::from(value);
        if value < i64::from(BLANK_VALUE) {
            value = -value;
        }

        let outcome = match value {
            -1 => {
                buffer[group.cells()].fill(BLANK_ROW);
                RenderOutcome::Blanked
            }
            0 => {
                buffer[group.cells()].fill(BLANK_ROW);
                buffer[group.position + group.length - 1] = DIGIT_PATTERNS[0];
                RenderOutcome::Zero
            }
            _ => {
                let digits = value.to_string();
                if digits.len() > group.length {
                    return RenderOutcome::Overflow(digits.len());
                }
                for (cell, digit) in buffer[group.position..].iter_mut().zip(digits.bytes()) {
                    *cell = DIGIT_PATTERNS[usize::from(digit - b'0')];
                }
                RenderOutcome::Digits(digits.len())
            }
        };

        group.last_value = Some(value);
        outcome
    }
}

/// Mirror of one LED matrix display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixDisplay {
    pub id: DisplayId,
    pub name: String,
    pub kind: String,
    pub config: MatrixLedConfig,
    /// Groups keyed by start position.
    groups: BTreeMap<usize, DigitGroup>,
    pub buffer: RowBuffer,
    /// Set when the buffer must be pushed to the hardware.
    pub refresh: bool,
}

impl MatrixDisplay {
    pub fn new(id: DisplayId, name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: kind.into(),
            config: MatrixLedConfig::default(),
            groups: BTreeMap::new(),
            buffer: [BLANK_ROW; MATRIX_LED_COLUMNS],
            refresh: false,
        }
    }

    /// Apply geometry, clear the buffer and request a refresh.
    pub fn configure(&mut self, rows: u8, columns: u8, enabled: bool) -> MatrixLedConfig {
        self.config = MatrixLedConfig {
            rows,
            columns,
            enabled,
        };
        self.buffer = [BLANK_ROW; MATRIX_LED_COLUMNS];
        self.refresh = true;
        self.config
    }

    /// Add a group, replacing any group starting at the same position.
    pub fn add_group(&mut self, group: DigitGroup) -> Option<DigitGroup> {
        self.groups.insert(group.position, group)
    }

    pub fn groups(&self) -> impl Iterator<Item = &DigitGroup> {
        self.groups.values()
    }

    /// Group addressed by `target`.
    ///
    /// The display's own name selects its first group.
    pub fn group(&self, target: &str) -> Option<&DigitGroup> {
        self.groups
            .values()
            .find(|g| g.name == target)
            .or_else(|| self.first_group_for(target))
    }

    fn first_group_for(&self, target: &str) -> Option<&DigitGroup> {
        (target == self.name).then(|| self.groups.values().next()).flatten()
    }

    fn position_of(&self, target: &str) -> Option<usize> {
        self.group(target).map(|g| g.position)
    }

    /// Render into the group addressed by `target` and request a refresh.
    pub fn render(&mut self, target: &str, value: i32) -> Result<RenderOutcome> {
        let missing = || HardwareError::unknown_target(ResourceKind::Display, target);
        let position = self.position_of(target).ok_or_else(missing)?;
        let group = self.groups.get_mut(&position).ok_or_else(missing)?;

        let outcome = DisplayRenderer::render(&mut self.buffer, group, value);
        self.refresh = true;
        Ok(outcome)
    }
}

/// All displays of one device.
#[derive(Debug, Clone, Default)]
pub struct DisplayBank {
    displays: [Option<MatrixDisplay>; MATRIX_LED_COUNT],
}

impl DisplayBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, display: MatrixDisplay) -> Option<MatrixDisplay> {
        let index = display.id.index();
        self.displays[index].replace(display)
    }

    pub fn get(&self, id: DisplayId) -> Option<&MatrixDisplay> {
        self.displays[id.index()].as_ref()
    }

    pub fn get_mut(&mut self, id: DisplayId) -> Option<&mut MatrixDisplay> {
        self.displays[id.index()].as_mut()
    }
}
