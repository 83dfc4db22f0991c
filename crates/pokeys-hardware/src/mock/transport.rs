//! Instrumented transport coordinator.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::transport::{TransportCoordinator, TransportPermit};

/// Coordinator that records how it is used.
///
/// # Examples
///
/// ```
/// use pokeys_hardware::mock::RecordingTransport;
/// use pokeys_hardware::transport::TransportCoordinator;
///
/// let transport = RecordingTransport::new();
/// {
///     let _permit = transport.acquire();
///     assert_eq!(transport.holders(), 1);
/// }
/// assert_eq!(transport.holders(), 0);
/// assert_eq!(transport.acquisitions(), 1);
/// ```
#[derive(Debug)]
pub struct RecordingTransport {
    lock: Option<Mutex<()>>,
    counters: Arc<Counters>,
}

#[derive(Debug, Default)]
struct Counters {
    holders: AtomicUsize,
    max_holders: AtomicUsize,
    acquisitions: AtomicUsize,
}

struct Release(Arc<Counters>);

impl Drop for Release {
    fn drop(&mut self) {
        self.0.holders.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RecordingTransport {
    /// A coordinator that serializes permits like the real one.
    pub fn new() -> Self {
        Self {
            lock: Some(Mutex::new(())),
            counters: Arc::default(),
        }
    }

    /// A coordinator that hands out permits without excluding anyone.
    ///
    /// Useful as a negative control: with it, overlapping transactions
    /// become observable.
    pub fn passthrough() -> Self {
        Self {
            lock: None,
            counters: Arc::default(),
        }
    }

    /// Permits currently held.
    pub fn holders(&self) -> usize {
        self.counters.holders.load(Ordering::SeqCst)
    }

    /// Largest number of permits ever held at the same time.
    pub fn max_holders(&self) -> usize {
        self.counters.max_holders.load(Ordering::SeqCst)
    }

    /// Total permits handed out.
    pub fn acquisitions(&self) -> usize {
        self.counters.acquisitions.load(Ordering::SeqCst)
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportCoordinator for RecordingTransport {
    fn acquire(&self) -> TransportPermit<'_> {
        let guard = self
            .lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));

        let holders = self.counters.holders.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_holders.fetch_max(holders, Ordering::SeqCst);
        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);

        // Fields drop in order: the count falls before the lock is released.
        TransportPermit::new((Release(Arc::clone(&self.counters)), guard))
    }
}
