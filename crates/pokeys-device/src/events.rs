//! Event records and their delivery to the host.
//!
//! Detectors produce [`Change`]s. The [`EventEmitter`] stamps them with the
//! owning plugin handle and pushes the resulting [`Event`]s into the host's
//! bounded channel. Delivery happens after the transport permit is released,
//! so a slow host never holds up hardware access.

use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use pokeys_core::{EventValue, PluginHandle};

/// A detected state change, not yet addressed to a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub value: EventValue,
    pub name: String,
    pub description: String,
    pub units: String,
}

/// Typed event delivered to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub owner: PluginHandle,
    pub value: EventValue,
    /// Size of the value in the host's record format.
    #[serde(rename = "byte_length")]
    pub byte_len: usize,
    pub name: String,
    pub description: String,
    pub units: String,
}

impl Event {
    pub fn from_change(owner: PluginHandle, change: Change) -> Self {
        Self {
            owner,
            byte_len: change.value.byte_len(),
            value: change.value,
            name: change.name,
            description: change.description,
            units: change.units,
        }
    }
}

#[derive(Debug)]
struct Sink {
    owner: PluginHandle,
    tx: mpsc::Sender<Event>,
}

/// Builds events and hands them to the host's channel.
#[derive(Debug, Default)]
pub struct EventEmitter {
    sink: Mutex<Option<Sink>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn sink(&self) -> MutexGuard<'_, Option<Sink>> {
        self.sink.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Route future events to `tx`, tagged with `owner`.
    ///
    /// Replaces any previous sink.
    pub fn attach(&self, owner: PluginHandle, tx: mpsc::Sender<Event>) {
        *self.sink() = Some(Sink { owner, tx });
    }

    pub fn detach(&self) {
        *self.sink() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sink().is_some()
    }

    /// Plugin handle events are currently tagged with.
    pub fn owner(&self) -> PluginHandle {
        self.sink().as_ref().map(|s| s.owner).unwrap_or_default()
    }

    pub fn build(&self, changes: Vec<Change>) -> Vec<Event> {
        let owner = self.owner();
        changes
            .into_iter()
            .map(|change| Event::from_change(owner, change))
            .collect()
    }

    /// Deliver events in order, waiting for room when the channel is full.
    ///
    /// Returns `false` if `shutdown` fired while waiting; the remaining
    /// events are dropped.
    pub async fn publish(&self, events: Vec<Event>, shutdown: &mut watch::Receiver<bool>) -> bool {
        if events.is_empty() {
            return true;
        }

        let Some(tx) = self.sink().as_ref().map(|s| s.tx.clone()) else {
            trace!("No event sink attached, dropping {} events", events.len());
            return true;
        };

        for event in events {
            trace!("Emitting {} = {:?}", event.name, event.value);

            let event = match tx.try_send(event) {
                Ok(()) => continue,
                Err(TrySendError::Closed(_)) => {
                    debug!("Host closed the event channel, detaching sink");
                    self.detach();
                    return true;
                }
                Err(TrySendError::Full(event)) => event,
            };

            warn!("Event channel full, waiting for host to catch up");
            if *shutdown.borrow() {
                return false;
            }
            tokio::select! {
                biased;
                _ = shutdown.changed() => return false,
                sent = tx.send(event) => {
                    if sent.is_err() {
                        debug!("Host closed the event channel, detaching sink");
                        self.detach();
                        return true;
                    }
                }
            }
        }

        true
    }
}
