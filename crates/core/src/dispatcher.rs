//! Coalescing dispatcher: single pending-timer slot with debounce/throttle policies

use crate::diagnostics::{DiagnosticsSink, TracingSink};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::Instant;

/// Boxed action payload, invoked at most once when the pending timer fires
type Action = Box<dyn FnOnce() + Send + 'static>;

/// Which coalescing policy opened the current window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Fire once, `interval` after the last call in a burst
    Debounce,
    /// Fire at most once per `interval`, at the start of each window
    Throttle,
}

/// Mutable scheduling state, guarded by a single lock
///
/// Invariant: at most one timer task is live per dispatcher. `epoch` is
/// bumped whenever the slot changes hands; a timer that woke before its
/// abort landed sees a stale epoch and returns without firing.
struct Inner {
    /// Cancellable handle of the pending timer task, if any
    pending: Option<AbortHandle>,
    /// Payload to invoke when the pending timer fires
    action: Option<Action>,
    /// When the current coalescing window opened
    window_started_at: Option<Instant>,
    /// Generation counter validating timer wakeups
    epoch: u64,
    /// Set once by `dispose()`; scheduling calls become no-ops
    disposed: bool,
}

/// State shared between the dispatcher handle and its timer tasks
struct Shared {
    state: Mutex<Inner>,
    /// Calls received without an invocation since the last fire
    suppressed: AtomicU64,
    sink: Arc<dyn DiagnosticsSink>,
}

/// Call-coalescing dispatcher
///
/// Receives a high-frequency stream of "run this action" requests and
/// reduces it to a bounded number of actual invocations. Owns a single
/// pending-timer slot: under debounce the slot is cancelled and replaced
/// on every call, under throttle it is left running and later calls are
/// dropped. `debounce`/`throttle` are fire-and-forget; the coalesced
/// action runs asynchronously on the runtime when the timer expires.
///
/// Must be created inside a Tokio runtime. Scheduling calls may then be
/// made from any thread.
pub struct Dispatcher {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl Dispatcher {
    /// Create a dispatcher reporting diagnostics through `tracing`
    pub fn new() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    /// Create a dispatcher with an injected diagnostics sink
    pub fn with_sink(sink: Arc<dyn DiagnosticsSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(Inner {
                    pending: None,
                    action: None,
                    window_started_at: None,
                    epoch: 0,
                    disposed: false,
                }),
                suppressed: AtomicU64::new(0),
                sink,
            }),
            runtime: Handle::current(),
        }
    }

    /// Restart the coalescing window with this call's action
    ///
    /// Cancels and replaces any pending timer, so the action fires once,
    /// `interval` after the last call in a burst, using the last call's
    /// payload. Every call increments the suppressed count until the
    /// fire resets it. No-op after `dispose()`.
    pub fn debounce<F>(&self, interval: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let opened;
        let suppressed;
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }

            opened = state.pending.is_none();
            // Cancel before installing the replacement so two timers never
            // race to fire.
            if let Some(handle) = state.pending.take() {
                handle.abort();
            }
            if opened {
                state.window_started_at = Some(Instant::now());
            }
            state.action = Some(Box::new(action));
            state.epoch += 1;
            suppressed = self.shared.suppressed.fetch_add(1, Ordering::Relaxed) + 1;

            let epoch = state.epoch;
            state.pending = Some(self.spawn_timer(PolicyKind::Debounce, interval, epoch));
        }

        // Sink callbacks run outside the lock: the sink is caller code and
        // may read the dispatcher.
        if opened {
            self.shared.sink.window_opened(PolicyKind::Debounce, interval);
        }
        self.shared.sink.call_suppressed(PolicyKind::Debounce, suppressed);
    }

    /// Open a coalescing window with this call's action, or drop the call
    ///
    /// If no timer is pending, starts one and this call's payload fires
    /// `interval` from now. If a timer is already pending the call is
    /// suppressed and its payload discarded: throttle always fires with
    /// the arguments of the call that opened the window. No-op after
    /// `dispose()`.
    pub fn throttle<F>(&self, interval: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let suppressed;
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }

            if state.pending.is_some() {
                suppressed = Some(self.shared.suppressed.fetch_add(1, Ordering::Relaxed) + 1);
            } else {
                suppressed = None;
                state.action = Some(Box::new(action));
                state.window_started_at = Some(Instant::now());
                state.epoch += 1;

                let epoch = state.epoch;
                state.pending = Some(self.spawn_timer(PolicyKind::Throttle, interval, epoch));
            }
        }

        match suppressed {
            Some(count) => self.shared.sink.call_suppressed(PolicyKind::Throttle, count),
            None => self.shared.sink.window_opened(PolicyKind::Throttle, interval),
        }
    }

    /// Release the timer resource
    ///
    /// Cancels the pending timer (if any) so it can never fire after this
    /// call, and drops the stored payload. Idempotent: repeated calls are
    /// no-ops. Subsequent `debounce`/`throttle` calls are silently dropped.
    pub fn dispose(&self) {
        let cancelled_pending;
        {
            let mut state = self.shared.state.lock();
            if state.disposed {
                return;
            }
            state.disposed = true;
            cancelled_pending = state.pending.is_some();
            if let Some(handle) = state.pending.take() {
                handle.abort();
            }
            state.action = None;
            state.window_started_at = None;
            self.shared.suppressed.store(0, Ordering::Relaxed);
        }
        self.shared.sink.disposed(cancelled_pending);
    }

    /// Calls received without an invocation since the last fire
    pub fn suppressed_count(&self) -> u64 {
        self.shared.suppressed.load(Ordering::Relaxed)
    }

    /// When the current coalescing window opened, if one is open
    pub fn window_started_at(&self) -> Option<Instant> {
        self.shared.state.lock().window_started_at
    }

    /// Whether `dispose()` has been called
    pub fn is_disposed(&self) -> bool {
        self.shared.state.lock().disposed
    }

    /// Spawn the timer task for the window identified by `epoch`
    fn spawn_timer(&self, kind: PolicyKind, interval: Duration, epoch: u64) -> AbortHandle {
        let shared = Arc::clone(&self.shared);
        let task = self.runtime.spawn(async move {
            // Duration::ZERO still yields to the runtime: the fire is
            // always asynchronous relative to the scheduling call.
            tokio::time::sleep(interval).await;
            Shared::fire(&shared, kind, epoch);
        });
        task.abort_handle()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Safety net for owners that tear down without calling dispose()
        self.dispose();
    }
}

impl Shared {
    /// Timer wakeup: validate-and-take under the lock, invoke outside it
    fn fire(shared: &Arc<Shared>, kind: PolicyKind, epoch: u64) {
        let (action, coalesced) = {
            let mut state = shared.state.lock();
            if state.disposed || state.epoch != epoch {
                // Slot changed hands between wakeup and lock acquisition.
                return;
            }
            state.pending = None;
            state.window_started_at = None;
            (
                state.action.take(),
                shared.suppressed.swap(0, Ordering::Relaxed),
            )
        };

        shared.sink.fired(kind, coalesced);

        // State is already reset: a panicking action is the action's
        // problem and unwinds only this timer task.
        if let Some(action) = action {
            action();
        }
    }
}
