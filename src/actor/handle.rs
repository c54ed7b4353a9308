//! Handles onto a started actor: stop requests, bounded joins and exit
//! reasons.

use super::actor::ExecutionContext;
use super::phase::{ActorStats, Counters, Phase};
use crate::error::{ActorError, TickError};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

const NO_REQUEST: u8 = 0;
const STOP_REQUEST: u8 = 1;
const INTERRUPT_REQUEST: u8 = 2;

/// Why an actor's loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// A cooperative stop was requested.
    Stopped,
    /// An interruption was requested (e.g. a termination signal).
    Interrupted,
    /// A tick failed and the actor terminated.
    Faulted {
        /// Phase in which the tick failed.
        phase: Phase,
        /// Rendered error.
        message: String,
    },
}

impl ExitReason {
    /// Whether the loop ended because of a failure.
    pub const fn is_fault(&self) -> bool {
        matches!(self, Self::Faulted { .. })
    }
}

impl From<&TickError> for ExitReason {
    fn from(err: &TickError) -> Self {
        Self::Faulted {
            phase: err.phase(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Faulted { phase, message } => write!(f, "faulted in {phase}: {message}"),
        }
    }
}

/// State shared between a loop and every handle onto it.
pub(crate) struct Shared {
    name: String,
    execution: ExecutionContext,
    running: AtomicBool,
    request: AtomicU8,
    exit: OnceLock<ExitReason>,
    counters: Counters,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Shared {
    pub(crate) fn new(name: String, execution: ExecutionContext) -> Self {
        // One slot is enough: a stop request is terminal.
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            name,
            execution,
            running: AtomicBool::new(false),
            request: AtomicU8::new(NO_REQUEST),
            exit: OnceLock::new(),
            counters: Counters::default(),
            wake_tx,
            wake_rx,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    /// The pending stop request, if any.
    pub(crate) fn requested(&self) -> Option<ExitReason> {
        match self.request.load(Ordering::SeqCst) {
            STOP_REQUEST => Some(ExitReason::Stopped),
            INTERRUPT_REQUEST => Some(ExitReason::Interrupted),
            _ => None,
        }
    }

    /// Sleep up to `timeout`, waking early on a stop request.
    pub(crate) fn sleep(&self, timeout: Duration) {
        let _ = self.wake_rx.recv_timeout(timeout);
    }

    pub(crate) fn finish(&self, reason: ExitReason) {
        let _ = self.exit.set(reason);
    }

    pub(crate) const fn counters(&self) -> &Counters {
        &self.counters
    }

    fn request(&self, kind: u8) {
        // First request wins; an interrupt does not overwrite a stop.
        if self
            .request
            .compare_exchange(NO_REQUEST, kind, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let _ = self.wake_tx.try_send(());
        }
    }
}

/// Cloneable handle that can stop an actor from any thread.
///
/// Usable before the actor starts; a request made early makes the loop
/// exit before its first tick.
#[derive(Clone)]
pub struct StopHandle {
    shared: Arc<Shared>,
}

impl StopHandle {
    pub(crate) const fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Name of the actor this handle stops.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Request a cooperative stop. Idempotent.
    pub fn stop(&self) {
        self.shared.request(STOP_REQUEST);
    }

    /// Request an interruption. Exits like a stop but is reported as
    /// [`ExitReason::Interrupted`].
    pub fn interrupt(&self) {
        self.shared.request(INTERRUPT_REQUEST);
    }

    /// Whether a stop or interrupt has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.shared.requested().is_some()
    }

    pub(crate) fn counters(&self) -> &Counters {
        self.shared.counters()
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("actor", &self.shared.name())
            .field("requested", &self.shared.requested())
            .finish()
    }
}

/// A worker thread plus the channel that disconnects when it ends.
pub(crate) struct Worker {
    pub(crate) thread: JoinHandle<()>,
    pub(crate) done: Receiver<()>,
}

/// Owner's handle onto a started actor.
///
/// Dropping the handle requests a stop but does not wait for it.
pub struct ActorHandle {
    shared: Arc<Shared>,
    worker: Mutex<Option<Worker>>,
}

impl ActorHandle {
    pub(crate) const fn new(shared: Arc<Shared>, worker: Option<Worker>) -> Self {
        Self {
            shared,
            worker: Mutex::new(worker),
        }
    }

    /// Actor name.
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Where the actor's loop executes.
    pub fn execution(&self) -> ExecutionContext {
        self.shared.execution
    }

    /// Whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Tick counters so far.
    pub fn stats(&self) -> ActorStats {
        self.shared.counters.snapshot()
    }

    /// Why the loop ended, once it has.
    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.shared.exit.get().cloned()
    }

    /// A cloneable stop handle for this actor.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Request a cooperative stop. The loop exits at its next tick
    /// boundary and releases its transport. Idempotent.
    pub fn stop(&self) {
        self.shared.request(STOP_REQUEST);
    }

    /// Request an interruption.
    pub fn interrupt(&self) {
        self.shared.request(INTERRUPT_REQUEST);
    }

    /// Wait up to `timeout` for the worker to finish.
    ///
    /// On timeout the worker keeps running detached and a later `join`
    /// may still succeed. Caller-thread actors have already finished when
    /// their handle exists, so this returns immediately for them.
    pub fn join(&self, timeout: Duration) -> Result<ExitReason, ActorError> {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(worker) = slot.take() {
            if let Err(RecvTimeoutError::Timeout) = worker.done.recv_timeout(timeout) {
                *slot = Some(worker);
                return Err(ActorError::JoinTimeout {
                    actor: self.name().to_string(),
                    timeout,
                });
            }
            if worker.thread.join().is_err() {
                return Err(ActorError::WorkerPanicked {
                    actor: self.name().to_string(),
                });
            }
        }
        drop(slot);

        self.exit_reason().ok_or_else(|| ActorError::WorkerPanicked {
            actor: self.name().to_string(),
        })
    }

    /// Stop the actor and wait up to `timeout` for it to finish.
    pub fn shutdown(&self, timeout: Duration) -> Result<ExitReason, ActorError> {
        self.stop();
        self.join(timeout)
    }
}

impl fmt::Debug for ActorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle")
            .field("name", &self.name())
            .field("execution", &self.execution())
            .field("running", &self.is_running())
            .field("exit", &self.exit_reason())
            .finish_non_exhaustive()
    }
}

impl Drop for ActorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
