//! Dispatcher activation.
//!
//! A process runs at most one dispatcher at a time. The entry point owns a
//! [`DispatcherLifecycle`] and every [`Dispatcher`](crate::Dispatcher) is
//! built against it; building a second while the first is alive fails with
//! [`DispatchError::AlreadyActive`]. Dropping the dispatcher frees the slot.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::error::{DispatchError, DispatchResult};

/// Tracks whether a dispatcher is active.
#[derive(Debug, Clone, Default)]
pub struct DispatcherLifecycle {
    active: Arc<AtomicBool>,
}

impl DispatcherLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claims the slot. The returned token releases it when dropped.
    pub(crate) fn activate(&self) -> DispatchResult<ActivationToken> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| DispatchError::AlreadyActive)?;
        debug!("Dispatcher activated");
        Ok(ActivationToken {
            active: self.active.clone(),
        })
    }
}

/// Held by the active dispatcher.
#[derive(Debug)]
pub(crate) struct ActivationToken {
    active: Arc<AtomicBool>,
}

impl Drop for ActivationToken {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
        debug!("Dispatcher released");
    }
}
