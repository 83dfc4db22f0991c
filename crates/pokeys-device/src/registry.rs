//! Name to index tables.
//!
//! Hosts address every resource by name. Each `add_*` configuration call
//! inserts one entry in the table for its kind; lookups return `None` on a
//! miss so the poll path never has to unwind.

use std::collections::HashMap;

use pokeys_core::{DisplayId, EncoderId, PinNumber, PwmChannel};

/// Append-only map from resource name to index.
///
/// Inserting a name twice keeps the latest index.
///
/// ```
/// use pokeys_device::registry::NameTable;
///
/// let mut table = NameTable::new();
/// table.insert("gear", 3u8);
/// assert_eq!(table.lookup("gear"), Some(3));
/// assert_eq!(table.lookup("flaps"), None);
/// ```
#[derive(Debug, Clone)]
pub struct NameTable<I> {
    entries: HashMap<String, I>,
}

impl<I> Default for NameTable<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<I: Copy> NameTable<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `name` to `index`, returning the index it replaced.
    pub fn insert(&mut self, name: impl Into<String>, index: I) -> Option<I> {
        self.entries.insert(name.into(), index)
    }

    pub fn lookup(&self, name: &str) -> Option<I> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The four tables a device keeps.
///
/// The display table holds both display names and digit group names; both
/// resolve to the display that owns them.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    pub pins: NameTable<PinNumber>,
    pub pwm: NameTable<PwmChannel>,
    pub encoders: NameTable<EncoderId>,
    pub displays: NameTable<DisplayId>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}
