//! One-shot cancellation with an attached async teardown.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

use crate::error::Result;

type Teardown = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

/// Cancellation handle for a diagnostics stream.
///
/// Cheap to clone; all clones observe the same state. The state transitions
/// once, from live to aborted. [`trigger`](Self::trigger) runs the registered
/// teardown exactly once, even when called twice or from multiple clones —
/// the teardown is consumed behind a one-shot latch.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

struct Inner {
    aborted: AtomicBool,
    notify: Notify,
    teardown: Mutex<Option<Teardown>>,
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                aborted: AtomicBool::new(false),
                notify: Notify::new(),
                teardown: Mutex::new(None),
            }),
        }
    }

    /// Whether the token has been triggered. Idempotent query.
    #[must_use]
    pub fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Register the teardown that [`trigger`](Self::trigger) runs.
    ///
    /// Re-registration replaces the previous callback (last one wins);
    /// callers are expected to register exactly once, before first use.
    pub fn register_teardown<F, Fut>(&self, teardown: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let boxed: Teardown = Box::new(move || Box::pin(teardown()));
        *self.lock_teardown() = Some(boxed);
    }

    /// Mark the token aborted, wake all [`cancelled`](Self::cancelled)
    /// waiters, then run and await the registered teardown.
    ///
    /// Only the first call runs the teardown; later calls are idempotent
    /// no-ops. Teardown failures propagate to the caller.
    pub async fn trigger(&self) -> Result<()> {
        self.inner.aborted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();

        let teardown = self.lock_teardown().take();
        match teardown {
            Some(teardown) => {
                tracing::debug!("cancellation triggered, running teardown");
                teardown().await
            }
            None => Ok(()),
        }
    }

    /// Resolves once the token is aborted. Safe to call repeatedly.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag so a trigger landing
        // between the check and the await cannot be missed.
        notified.as_mut().enable();
        if self.aborted() {
            return;
        }
        notified.await;
    }

    fn lock_teardown(&self) -> MutexGuard<'_, Option<Teardown>> {
        self.inner
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
