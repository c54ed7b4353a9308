//! Actor: configuration, lifecycle and the fixed-rate loop.
//!
//! An actor is built from a config, a set of hooks and a transport. It
//! starts exactly once; `start` consumes it, so a finished actor cannot be
//! revived. The loop runs either on the caller's thread or on a dedicated
//! worker thread, depending on [`ExecutionContext`].

use super::clock::TickClock;
use super::handle::{ActorHandle, ExitReason, Shared, StopHandle, Worker};
use super::hooks::Hooks;
use super::phase::PhaseRunner;
use crate::error::{ActorError, TickError};
use crate::transport::{OwnedTransport, Transport};
use crossbeam_channel::bounded;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Where an actor's loop executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionContext {
    /// `start` blocks and runs the loop on the calling thread.
    CallerThread,
    /// `start` spawns a named worker thread and returns immediately.
    DedicatedWorker,
}

/// Configuration for an actor.
#[derive(Debug, Clone)]
pub struct ActorConfig {
    /// Name used in diagnostics and as the worker thread name.
    pub name: String,
    /// Fixed tick period.
    pub target_interval: Duration,
    /// Length of the throughput reporting window.
    pub report_period: Duration,
    /// Where the loop runs.
    pub execution: ExecutionContext,
    /// How long a lead waits for each child to finish during shutdown.
    pub join_timeout: Duration,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            name: "actor".to_string(),
            target_interval: Duration::from_secs(1) / 60,
            report_period: Duration::from_secs(60),
            execution: ExecutionContext::CallerThread,
            join_timeout: Duration::from_secs(1),
        }
    }
}

impl ActorConfig {
    /// A 60 Hz actor running on the caller's thread.
    pub fn standalone(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// A 60 Hz actor running on its own worker thread.
    pub fn worker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            execution: ExecutionContext::DedicatedWorker,
            ..Self::default()
        }
    }

    /// A 60 Hz coordinating actor running on the caller's thread.
    pub fn lead(name: impl Into<String>) -> Self {
        Self::standalone(name)
    }

    /// A 120 Hz worker reporting throughput every second.
    pub fn high_frequency(name: impl Into<String>) -> Self {
        Self {
            target_interval: Duration::from_secs(1) / 120,
            report_period: Duration::from_secs(1),
            ..Self::worker(name)
        }
    }

    /// Tick `hz` times per second. A zero frequency is rejected by
    /// [`validate`](Self::validate).
    #[must_use]
    pub fn with_frequency(mut self, hz: u32) -> Self {
        self.target_interval = if hz == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / hz
        };
        self
    }

    /// Tick every `interval`.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.target_interval = interval;
        self
    }

    /// Report throughput every `period`.
    #[must_use]
    pub const fn with_report_period(mut self, period: Duration) -> Self {
        self.report_period = period;
        self
    }

    /// Wait at most `timeout` for each child during shutdown.
    #[must_use]
    pub const fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Check that the configuration can drive a loop.
    pub fn validate(&self) -> Result<(), ActorError> {
        if self.name.is_empty() {
            return Err(ActorError::InvalidConfig("actor name is empty".into()));
        }
        if self.target_interval.is_zero() {
            return Err(ActorError::InvalidConfig(format!(
                "actor '{}' has a zero tick interval",
                self.name
            )));
        }
        if self.report_period.is_zero() {
            return Err(ActorError::InvalidConfig(format!(
                "actor '{}' has a zero report period",
                self.name
            )));
        }
        Ok(())
    }
}

/// A configured actor that has not started yet.
///
/// Dropping an actor that never started releases its transport.
pub struct Actor {
    config: ActorConfig,
    hooks: Hooks,
    transport: OwnedTransport,
    shared: Arc<Shared>,
}

impl Actor {
    /// Build an actor.
    pub fn new(
        config: ActorConfig,
        hooks: Hooks,
        transport: impl Transport + 'static,
    ) -> Result<Self, ActorError> {
        config.validate()?;
        let shared = Arc::new(Shared::new(config.name.clone(), config.execution));
        Ok(Self {
            config,
            hooks,
            transport: OwnedTransport::new(transport),
            shared,
        })
    }

    /// Actor name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// The actor's configuration.
    pub const fn config(&self) -> &ActorConfig {
        &self.config
    }

    /// A handle that can stop the actor once it runs.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle::new(Arc::clone(&self.shared))
    }

    /// Run setup, then run the loop.
    ///
    /// Caller-thread actors block here until the loop exits; the returned
    /// handle then carries the exit reason. Worker actors return as soon
    /// as their thread is spawned.
    pub fn start(self) -> Result<ActorHandle, ActorError> {
        self.launch(|| {})
    }

    /// Start the actor, running `teardown` after the loop exits but before
    /// the transport is released.
    pub(crate) fn launch<F>(self, teardown: F) -> Result<ActorHandle, ActorError>
    where
        F: FnOnce() + Send + 'static,
    {
        let Self {
            config,
            mut hooks,
            mut transport,
            shared,
        } = self;

        if let Some(setup) = hooks.take_setup() {
            if let Err(source) = setup() {
                log::error!("{}: setup failed: {source}", config.name);
                teardown();
                transport.release();
                return Err(ActorError::Setup {
                    actor: config.name,
                    source,
                });
            }
        }

        let runner = PhaseRunner::new(
            config.name.clone(),
            hooks,
            transport,
            StopHandle::new(Arc::clone(&shared)),
            config.target_interval,
            config.report_period,
        );
        let ticker = TickLoop {
            clock: TickClock::new(config.target_interval),
            runner,
            shared: Arc::clone(&shared),
        };

        shared.set_running(true);
        log::debug!(
            "{}: starting at {:.1} Hz on {:?}",
            config.name,
            ticker.clock.frequency(),
            config.execution
        );

        match config.execution {
            ExecutionContext::CallerThread => {
                ticker.run(teardown);
                Ok(ActorHandle::new(shared, None))
            }
            ExecutionContext::DedicatedWorker => {
                let (done_tx, done) = bounded::<()>(0);
                let spawned = thread::Builder::new()
                    .name(format!("pacer-{}", config.name))
                    .spawn(move || {
                        // Disconnects once the loop has fully finished.
                        let _done = done_tx;
                        ticker.run(teardown);
                    });

                match spawned {
                    Ok(thread) => Ok(ActorHandle::new(shared, Some(Worker { thread, done }))),
                    Err(source) => {
                        shared.set_running(false);
                        Err(ActorError::Spawn {
                            actor: config.name,
                            source,
                        })
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actor")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// The running loop: a clock and a runner, until a stop request or fault.
struct TickLoop {
    clock: TickClock,
    runner: PhaseRunner,
    shared: Arc<Shared>,
}

impl TickLoop {
    fn run(mut self, teardown: impl FnOnce()) {
        let reason = self.run_ticks();
        self.shared.set_running(false);

        let name = self.shared.name();
        let ticks = self.shared.counters().snapshot().ticks;
        match &reason {
            ExitReason::Stopped => log::info!("{name}: stopped after {ticks} ticks"),
            ExitReason::Interrupted => log::warn!("{name}: interrupted after {ticks} ticks"),
            ExitReason::Faulted { .. } => {
                log::error!("{name}: terminated after {ticks} ticks, {reason}");
            }
        }

        teardown();
        self.runner.release();
        self.shared.finish(reason);
    }

    fn run_ticks(&mut self) -> ExitReason {
        let mut deadline = self.clock.next_deadline(Instant::now());

        loop {
            if let Some(reason) = self.shared.requested() {
                return reason;
            }

            let budget = self.clock.remaining(deadline, Instant::now());
            let runner = &mut self.runner;
            match panic::catch_unwind(AssertUnwindSafe(|| runner.run_tick(budget))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return ExitReason::from(&err),
                Err(payload) => {
                    let err = TickError::Panicked {
                        phase: self.runner.current_phase(),
                        message: panic_message(payload.as_ref()),
                    };
                    return ExitReason::from(&err);
                }
            }

            // Time spent waiting inside the poll budget is not lateness.
            let now = Instant::now();
            let worked_until = now.checked_sub(self.runner.poll_time()).unwrap_or(now);
            if self.clock.is_overrun(deadline, worked_until) {
                self.shared.counters().record_overrun();
                log::debug!(
                    "{}: tick overran its {:?} budget by {:?}",
                    self.shared.name(),
                    self.clock.interval(),
                    worked_until - deadline
                );
            } else {
                let remaining = self.clock.remaining(deadline, now);
                if !remaining.is_zero() {
                    self.shared.sleep(remaining);
                }
            }

            deadline = self.clock.advance(deadline, Instant::now());
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
