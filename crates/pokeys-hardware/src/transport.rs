//! Cross-device transport coordination.
//!
//! The driver SDK is not safe for concurrent use, not even across distinct
//! device handles. Every hardware transaction in the process therefore runs
//! while holding a permit from one [`TransportCoordinator`]. The coordinator
//! is injected into each device, so tests can substitute an instrumented one
//! (see [`RecordingTransport`](crate::mock::RecordingTransport)).
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use pokeys_hardware::transport::{GlobalTransport, TransportCoordinator};
//!
//! let a = GlobalTransport::shared();
//! let b = GlobalTransport::shared();
//! assert!(Arc::ptr_eq(&a, &b));
//!
//! {
//!     let _permit = a.acquire();
//!     // at most one hardware transaction, process-wide
//! }
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Grants exclusive access to the hardware transport.
pub trait TransportCoordinator: Send + Sync + fmt::Debug {
    /// Block until no other transaction is in flight.
    ///
    /// The transport stays reserved until the returned permit is dropped.
    fn acquire(&self) -> TransportPermit<'_>;
}

trait Held {}

impl<T> Held for T {}

/// Proof of exclusive transport access. Released on drop.
#[must_use = "the transport is released as soon as the permit is dropped"]
pub struct TransportPermit<'a> {
    _held: Box<dyn Held + 'a>,
}

impl<'a> TransportPermit<'a> {
    /// Wrap whatever keeps the transport reserved, typically a mutex guard.
    pub fn new<T: 'a>(held: T) -> Self {
        Self {
            _held: Box::new(held),
        }
    }
}

impl fmt::Debug for TransportPermit<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportPermit").finish_non_exhaustive()
    }
}

/// Mutex-backed coordinator.
///
/// [`GlobalTransport::shared`] returns the process-wide instance that real
/// devices use. [`GlobalTransport::new`] builds an isolated one, useful when
/// tests must not contend with each other.
#[derive(Debug, Default)]
pub struct GlobalTransport {
    lock: Mutex<()>,
}

impl GlobalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// The coordinator shared by every device in the process.
    pub fn shared() -> Arc<GlobalTransport> {
        static SHARED: OnceLock<Arc<GlobalTransport>> = OnceLock::new();
        Arc::clone(SHARED.get_or_init(|| Arc::new(GlobalTransport::new())))
    }
}

impl TransportCoordinator for GlobalTransport {
    fn acquire(&self) -> TransportPermit<'_> {
        // A panic inside a transaction leaves no shared state to repair.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        TransportPermit::new(guard)
    }
}
