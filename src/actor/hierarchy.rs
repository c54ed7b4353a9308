//! Lead actors: a caller-thread actor that owns and stops a set of
//! worker children.
//!
//! Children start on their own; registering one with a lead only decides
//! who stops it. The lead stops children in registration order, before
//! releasing its own transport, whatever ended its loop.

use super::actor::{Actor, ActorConfig, ExecutionContext};
use super::handle::{ActorHandle, ExitReason, StopHandle};
use super::hooks::Hooks;
use crate::error::ActorError;
use crate::transport::Transport;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Something a lead actor can stop.
pub trait ChildActor: Send {
    /// Child name, for diagnostics.
    fn name(&self) -> &str;

    /// Whether the child's loop is still running.
    fn is_running(&self) -> bool;

    /// Where the child runs. Only dedicated workers may be children.
    fn execution(&self) -> ExecutionContext {
        ExecutionContext::DedicatedWorker
    }

    /// Stop the child and wait up to `timeout` for it to finish.
    fn shutdown(&self, timeout: Duration) -> Result<ExitReason, ActorError>;
}

impl ChildActor for ActorHandle {
    fn name(&self) -> &str {
        Self::name(self)
    }

    fn is_running(&self) -> bool {
        Self::is_running(self)
    }

    fn execution(&self) -> ExecutionContext {
        Self::execution(self)
    }

    fn shutdown(&self, timeout: Duration) -> Result<ExitReason, ActorError> {
        Self::shutdown(self, timeout)
    }
}

#[derive(Default)]
struct Registry {
    children: Vec<Box<dyn ChildActor>>,
    closed: bool,
}

/// The children of one lead actor, shareable with its hooks.
#[derive(Clone)]
pub struct ChildRegistry {
    lead: Arc<str>,
    join_timeout: Duration,
    inner: Arc<Mutex<Registry>>,
}

impl ChildRegistry {
    fn new(lead: &str, join_timeout: Duration) -> Self {
        Self {
            lead: Arc::from(lead),
            join_timeout,
            inner: Arc::default(),
        }
    }

    /// Register a started worker.
    ///
    /// Once the lead has stopped its children, a late child is shut down
    /// on the spot and [`ActorError::LeadStopped`] is returned.
    pub fn add(&self, child: impl ChildActor + 'static) -> Result<(), ActorError> {
        if child.execution() != ExecutionContext::DedicatedWorker {
            return Err(ActorError::NotAWorker {
                actor: child.name().to_string(),
            });
        }

        let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if !registry.closed {
            log::debug!("{}: registered child {}", self.lead, child.name());
            registry.children.push(Box::new(child));
            return Ok(());
        }
        drop(registry);

        log::warn!("{}: child {} arrived after shutdown", self.lead, child.name());
        let actor = child.name().to_string();
        if let Err(err) = child.shutdown(self.join_timeout) {
            log::warn!("{}: {err}", self.lead);
        }
        Err(ActorError::LeadStopped { actor })
    }

    /// Number of registered children.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .len()
    }

    /// Whether no children are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the registered children, in registration order.
    pub fn names(&self) -> Vec<String> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Number of registered children still running.
    pub fn running(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .children
            .iter()
            .filter(|c| c.is_running())
            .count()
    }

    /// Shut every child down once, in registration order.
    ///
    /// A failing child is logged and skipped; the rest are still stopped.
    /// Returns the failures. Later calls find nothing left to stop.
    pub fn stop_all(&self) -> Vec<ActorError> {
        let children = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.closed = true;
            std::mem::take(&mut registry.children)
        };

        let mut failures = Vec::new();
        for child in children {
            match child.shutdown(self.join_timeout) {
                Ok(reason) => log::debug!("{}: child {} {reason}", self.lead, child.name()),
                Err(err) => {
                    log::warn!("{}: failed to stop child {}: {err}", self.lead, child.name());
                    failures.push(err);
                }
            }
        }
        failures
    }
}

impl fmt::Debug for ChildRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildRegistry")
            .field("lead", &self.lead)
            .field("children", &self.names())
            .finish()
    }
}

/// Cloneable handle that stops a lead and its children from any thread.
#[derive(Debug, Clone)]
pub struct LeadHandle {
    children: ChildRegistry,
    stop: StopHandle,
}

impl LeadHandle {
    /// Stop every child in registration order, then request the lead's
    /// own stop.
    pub fn stop(&self) -> Vec<ActorError> {
        let failures = self.children.stop_all();
        self.stop.stop();
        failures
    }

    /// Interrupt the lead. Children are stopped when its loop exits.
    pub fn interrupt(&self) {
        self.stop.interrupt();
    }

    /// The lead's children.
    pub const fn children(&self) -> &ChildRegistry {
        &self.children
    }
}

/// A caller-thread actor that owns child actors.
pub struct LeadActor {
    actor: Actor,
    children: ChildRegistry,
}

impl LeadActor {
    /// Build a lead actor. The config's execution context is forced to
    /// [`ExecutionContext::CallerThread`].
    pub fn new(
        mut config: ActorConfig,
        hooks: Hooks,
        transport: impl Transport + 'static,
    ) -> Result<Self, ActorError> {
        config.execution = ExecutionContext::CallerThread;
        let children = ChildRegistry::new(&config.name, config.join_timeout);
        let actor = Actor::new(config, hooks, transport)?;
        Ok(Self { actor, children })
    }

    /// Lead name.
    pub fn name(&self) -> &str {
        self.actor.name()
    }

    /// Register a started worker for stop propagation.
    pub fn add_child(&self, child: impl ChildActor + 'static) -> Result<(), ActorError> {
        self.children.add(child)
    }

    /// The child registry, for hooks that spawn children while running.
    pub fn children(&self) -> ChildRegistry {
        self.children.clone()
    }

    /// A handle that stops this lead from another thread.
    pub fn handle(&self) -> LeadHandle {
        LeadHandle {
            children: self.children.clone(),
            stop: self.actor.stop_handle(),
        }
    }

    /// Stop children in registration order, then request the lead's own
    /// stop.
    pub fn stop(&self) -> Vec<ActorError> {
        self.handle().stop()
    }

    /// Run setup and the loop on the calling thread.
    ///
    /// Whatever ends the loop, children are stopped before the lead's
    /// transport is released.
    pub fn start(self) -> Result<ExitReason, ActorError> {
        let children = self.children.clone();
        let handle = self.actor.launch(move || {
            children.stop_all();
        })?;
        handle.join(Duration::ZERO)
    }
}

impl fmt::Debug for LeadActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeadActor")
            .field("actor", &self.actor)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CallLog, RecordingTransport};
    use crate::transport::NullTransport;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const JOIN: Duration = Duration::from_secs(5);

    struct MockChild {
        name: &'static str,
        log: CallLog,
        calls: Arc<AtomicUsize>,
        running: AtomicBool,
        fail: bool,
    }

    impl MockChild {
        fn new(name: &'static str, log: &CallLog, fail: bool) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let child = Self {
                name,
                log: log.clone(),
                calls: Arc::clone(&calls),
                running: AtomicBool::new(true),
                fail,
            };
            (child, calls)
        }
    }

    impl ChildActor for MockChild {
        fn name(&self) -> &str {
            self.name
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn shutdown(&self, _timeout: Duration) -> Result<ExitReason, ActorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.push(self.name);
            self.running.store(false, Ordering::SeqCst);
            if self.fail {
                return Err(ActorError::WorkerPanicked {
                    actor: self.name.to_string(),
                });
            }
            Ok(ExitReason::Stopped)
        }
    }

    fn worker(name: &str) -> ActorHandle {
        let config = ActorConfig::worker(name).with_frequency(200);
        Actor::new(config, Hooks::new(), NullTransport)
            .unwrap()
            .start()
            .unwrap()
    }

    fn lead(name: &str) -> LeadActor {
        let config = ActorConfig::lead(name).with_frequency(200).with_join_timeout(JOIN);
        LeadActor::new(config, Hooks::new(), NullTransport).unwrap()
    }

    #[test]
    fn test_stop_order_survives_failing_child() {
        let log = CallLog::default();
        let lead = lead("lead");
        let names = ["a", "b", "c", "d", "e"];
        let mut counters = Vec::new();
        for (i, name) in names.into_iter().enumerate() {
            let (child, calls) = MockChild::new(name, &log, i == 2);
            lead.add_child(child).unwrap();
            counters.push(calls);
        }

        let failures = lead.stop();
        assert_eq!(failures.len(), 1);
        assert_eq!(log.entries(), names.to_vec());

        // A second stop must not touch the children again.
        assert!(lead.stop().is_empty());
        assert!(counters.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[test]
    fn test_lead_stop_stops_worker_children() {
        let lead = lead("coordinator");
        let children: Vec<ActorHandle> = (0..3).map(|i| worker(&format!("child-{i}"))).collect();
        let stops: Vec<StopHandle> = children.iter().map(ActorHandle::stop_handle).collect();
        let shared: Vec<Arc<ActorHandle>> = children.into_iter().map(Arc::new).collect();
        for child in &shared {
            lead.add_child(SharedChild(Arc::clone(child))).unwrap();
        }
        assert_eq!(lead.children().running(), 3);

        assert!(lead.stop().is_empty());
        for child in &shared {
            assert!(!child.is_running());
            assert_eq!(child.exit_reason(), Some(ExitReason::Stopped));
        }
        assert!(stops.iter().all(StopHandle::is_stop_requested));
    }

    #[test]
    fn test_lead_exit_cascades_to_children() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let lead_log = log.clone();
        let hooks = Hooks::new().on_update(|ctx| {
            if ctx.tick() == 3 {
                return Err("lead failed".into());
            }
            Ok(())
        });
        let config = ActorConfig::lead("failing-lead").with_frequency(200);
        let transport = transport.on_stop(move || lead_log.push("lead-release"));
        let lead = LeadActor::new(config, hooks, transport).unwrap();
        for name in ["x", "y"] {
            let (child, _) = MockChild::new(name, &log, false);
            lead.add_child(child).unwrap();
        }

        let reason = lead.start().unwrap();
        assert!(reason.is_fault());

        let entries: Vec<_> = log.entries().into_iter().filter(|e| *e != "poll").collect();
        assert_eq!(entries, vec!["x", "y", "lead-release"]);
    }

    #[test]
    fn test_lead_setup_error_still_stops_children() {
        let log = CallLog::default();
        let config = ActorConfig::lead("setup-lead").with_frequency(200);
        let hooks = Hooks::new().on_setup(|| Err("nope".into()));
        let lead = LeadActor::new(config, hooks, NullTransport).unwrap();
        let (child, calls) = MockChild::new("orphan", &log, false);
        lead.add_child(child).unwrap();

        assert!(matches!(lead.start(), Err(ActorError::Setup { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_caller_thread_child_rejected() {
        let lead = lead("picky");
        let config = ActorConfig::standalone("inline").with_frequency(200);
        let hooks = Hooks::new().on_update(|ctx| {
            ctx.stop();
            Ok(())
        });
        let finished = Actor::new(config, hooks, NullTransport).unwrap().start().unwrap();

        let err = lead.add_child(finished).unwrap_err();
        assert!(matches!(err, ActorError::NotAWorker { .. }));
        assert!(lead.children().is_empty());
    }

    #[test]
    fn test_unstarted_lead_releases_transport() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let stops = transport.stop_count();
        let config = ActorConfig::lead("idle-lead").with_frequency(200);
        let lead = LeadActor::new(config, Hooks::new(), transport).unwrap();
        let (child, calls) = MockChild::new("kid", &log, false);
        lead.add_child(child).unwrap();

        assert!(lead.stop().is_empty());
        drop(lead);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_late_child_is_stopped() {
        let log = CallLog::default();
        let lead = lead("closed");
        lead.stop();

        let (child, calls) = MockChild::new("late", &log, false);
        let err = lead.add_child(child).unwrap_err();
        assert!(matches!(err, ActorError::LeadStopped { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_lead_handle_from_another_thread() {
        let lead = lead("remote");
        let child = worker("remote-child");
        let child_stop = child.stop_handle();
        lead.add_child(child).unwrap();
        assert_eq!(lead.children().names(), vec!["remote-child".to_string()]);

        let handle = lead.handle();
        let stopper = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.stop()
        });

        assert_eq!(lead.start().unwrap(), ExitReason::Stopped);
        assert!(stopper.join().unwrap().is_empty());
        assert!(child_stop.is_stop_requested());
    }

    /// Lets a test keep observing a handle after registering it.
    struct SharedChild(Arc<ActorHandle>);

    impl ChildActor for SharedChild {
        fn name(&self) -> &str {
            self.0.name()
        }

        fn is_running(&self) -> bool {
            self.0.is_running()
        }

        fn execution(&self) -> ExecutionContext {
            self.0.execution()
        }

        fn shutdown(&self, timeout: Duration) -> Result<ExitReason, ActorError> {
            self.0.shutdown(timeout)
        }
    }
}
