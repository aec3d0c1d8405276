//! Process-launch utilities.
//!
//! The core's task instances never observe process-level shutdown
//! themselves; a supervisor owns a [`ShutdownSignal`], its signal handler
//! calls [`ShutdownSignal::trigger`], and each worker launched with
//! [`launch_timer_worker`] stops its timer once the signal fires.

use crate::prelude::*;
use crate::timer::timer_core::TimerControl;

use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::{Acquire, Release};
use std::thread::{Builder, JoinHandle};

// Repeated triggers inside this window are suppressed, so a held-down
// interrupt cannot flood the handler.
pub(crate) const TRIGGER_DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Cooperative shutdown signal shared between a supervisor and its timer
/// workers.
///
/// Clones observe the same signal. Triggering is sticky: once set, the
/// signal stays set for the lifetime of the process.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<SignalInner>,
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

struct SignalInner {
    triggered: AtomicBool,
    event: Event,
    rearm_at: Mutex<Option<Instant>>,
}

impl Default for SignalInner {
    fn default() -> Self {
        SignalInner {
            triggered: AtomicBool::new(false),
            event: Event::new(),
            rearm_at: Mutex::new(None),
        }
    }
}

impl ShutdownSignal {
    /// New an un-triggered signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the signal and wakes all waiters.
    ///
    /// The underlying flag is written exactly once per debounce window:
    /// repeated triggers inside the window return `false` and are otherwise
    /// ignored.
    pub fn trigger(&self) -> bool {
        let now = Instant::now();
        {
            let mut rearm_at = self
                .inner
                .rearm_at
                .lock()
                .expect("shutdown signal lock poisoned");
            if let Some(at) = *rearm_at {
                if now < at {
                    return false;
                }
            }
            *rearm_at = Some(now + TRIGGER_DEBOUNCE_WINDOW);
        }

        if !self.inner.triggered.swap(true, Release) {
            info!("shutdown signal triggered");
        }
        self.inner.event.notify(usize::MAX);
        true
    }

    /// Returns true iff the signal has been triggered.
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Acquire)
    }

    /// Resolves once the signal is triggered.
    pub async fn wait(&self) {
        loop {
            if self.is_triggered() {
                return;
            }
            let listener = self.inner.event.listen();
            // The trigger may have landed between the check and the listen.
            if self.is_triggered() {
                return;
            }
            listener.await;
        }
    }

    /// Blocking counterpart of [`wait`](Self::wait) for supervisor threads.
    pub fn wait_blocking(&self) {
        loop {
            if self.is_triggered() {
                return;
            }
            let listener = self.inner.event.listen();
            if self.is_triggered() {
                return;
            }
            listener.wait();
        }
    }
}

/// Runs a timer lifecycle in a dedicated, named worker thread.
///
/// `build` constructs (and, per `start_on_init`, starts) the task inside
/// the worker. The worker then parks on `shutdown` and stops the task once
/// the signal fires; joining the returned handle therefore observes a fully
/// drained schedule. A `build` error ends the worker and is logged.
pub fn launch_timer_worker<T, F>(
    worker_name: &str,
    shutdown: ShutdownSignal,
    build: F,
) -> Result<JoinHandle<()>, TaskError>
where
    T: TimerControl,
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
{
    let span = info_span!("timer_worker", name = %worker_name);

    Ok(Builder::new().name(worker_name.into()).spawn(move || {
        smol::block_on(
            async move {
                let timer = match build() {
                    Ok(timer) => timer,
                    Err(e) => {
                        error!("timer worker failed to build its task: {}", e);
                        return;
                    }
                };

                shutdown.wait().await;
                timer.stop().await;
                debug!("timer worker drained");
            }
            .instrument(span),
        )
    })?)
}
