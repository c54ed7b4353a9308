//! Phase runner: one full tick of an actor.
//!
//! A tick polls the transport, then walks the hook phases in a fixed
//! order. Transport state is therefore visible to `update` in the same
//! tick it arrived.
//!
//! ```text
//! poll ─▶ pre_update ─▶ update ─▶ post_update ─▶ pre_draw ─▶ draw ─▶ post_draw
//! ```

use super::handle::StopHandle;
use super::hooks::{Hooks, TickContext};
use crate::error::TickError;
use crate::transport::OwnedTransport;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A step of the tick sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Transport poll.
    Poll,
    /// Before update.
    PreUpdate,
    /// Update.
    Update,
    /// After update.
    PostUpdate,
    /// Before draw.
    PreDraw,
    /// Draw.
    Draw,
    /// After draw.
    PostDraw,
}

impl Phase {
    /// Every phase, in execution order.
    pub const ALL: [Self; 7] = [
        Self::Poll,
        Self::PreUpdate,
        Self::Update,
        Self::PostUpdate,
        Self::PreDraw,
        Self::Draw,
        Self::PostDraw,
    ];

    /// The phases that run user hooks, in execution order.
    pub const HOOKS: [Self; 6] = [
        Self::PreUpdate,
        Self::Update,
        Self::PostUpdate,
        Self::PreDraw,
        Self::Draw,
        Self::PostDraw,
    ];

    /// Lowercase name used in diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::PreUpdate => "pre_update",
            Self::Update => "update",
            Self::PostUpdate => "post_update",
            Self::PreDraw => "pre_draw",
            Self::Draw => "draw",
            Self::PostDraw => "post_draw",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an actor's tick counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActorStats {
    /// Ticks completed since start.
    pub ticks: u64,
    /// Ticks that finished past their deadline.
    pub overruns: u64,
}

/// Counters shared between a running loop and its handles.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    ticks: AtomicU64,
    overruns: AtomicU64,
}

impl Counters {
    pub(crate) fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_overrun(&self) {
        self.overruns.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ActorStats {
        ActorStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
        }
    }
}

/// Rolling ticks-per-second window.
#[derive(Debug, Clone)]
pub struct Throughput {
    period: Duration,
    window_start: Instant,
    ticks: u64,
}

impl Throughput {
    /// Start a window of length `period` at `now`.
    pub const fn new(period: Duration, now: Instant) -> Self {
        Self {
            period,
            window_start: now,
            ticks: 0,
        }
    }

    /// Count one tick at `now`.
    ///
    /// Returns the measured rate and resets the window once more than
    /// `period` has elapsed since the window opened.
    #[allow(clippy::cast_precision_loss)]
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.ticks += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed <= self.period {
            return None;
        }
        let rate = self.ticks as f64 / elapsed.as_secs_f64();
        self.window_start = now;
        self.ticks = 0;
        Some(rate)
    }

    /// Ticks counted in the current window.
    #[inline]
    pub const fn window_ticks(&self) -> u64 {
        self.ticks
    }
}

/// Executes the tick sequence for one actor.
pub(crate) struct PhaseRunner {
    name: String,
    hooks: Hooks,
    transport: OwnedTransport,
    throughput: Throughput,
    stop: StopHandle,
    started: Instant,
    interval: Duration,
    tick: u64,
    phase: Phase,
    poll_time: Duration,
}

impl PhaseRunner {
    pub(crate) fn new(
        name: String,
        hooks: Hooks,
        transport: OwnedTransport,
        stop: StopHandle,
        interval: Duration,
        report_period: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            name,
            hooks,
            transport,
            throughput: Throughput::new(report_period, now),
            stop,
            started: now,
            interval,
            tick: 0,
            phase: Phase::Poll,
            poll_time: Duration::ZERO,
        }
    }

    /// Phase currently (or most recently) executing.
    pub(crate) const fn current_phase(&self) -> Phase {
        self.phase
    }

    /// Time the last tick spent inside the transport poll, waiting
    /// included.
    pub(crate) const fn poll_time(&self) -> Duration {
        self.poll_time
    }

    /// Run one tick, giving the transport at most `poll_budget` to poll.
    ///
    /// Hook errors are returned untouched; the caller decides what a
    /// failed tick means.
    pub(crate) fn run_tick(&mut self, poll_budget: Duration) -> Result<(), TickError> {
        let now = Instant::now();

        self.phase = Phase::Poll;
        let polled = self.transport.poll(poll_budget);
        self.poll_time = now.elapsed();
        polled?;

        let ctx = TickContext {
            name: &self.name,
            tick: self.tick,
            started: self.started,
            now,
            interval: self.interval,
            stop: &self.stop,
        };

        for phase in Phase::HOOKS {
            self.phase = phase;
            if let Some(hook) = self.hooks.get_mut(phase) {
                hook(&ctx).map_err(|source| TickError::Hook { phase, source })?;
            }
        }

        self.tick += 1;
        self.stop.counters().record_tick();

        if let Some(rate) = self.throughput.record(Instant::now()) {
            log::info!("{}: {rate:.1} ticks/s", self.name);
        }

        Ok(())
    }

    /// Release the transport. Later calls do nothing.
    pub(crate) fn release(&mut self) {
        self.transport.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::handle::Shared;
    use crate::actor::ExecutionContext;
    use crate::testing::{CallLog, RecordingTransport};
    use std::sync::Arc;

    fn recording_hooks(log: &CallLog) -> Hooks {
        let mut hooks = Hooks::new();
        for phase in Phase::HOOKS {
            let log = log.clone();
            hooks = hooks.on(phase, move |_| {
                log.push(phase.as_str());
                Ok(())
            });
        }
        hooks
    }

    fn runner(hooks: Hooks, transport: RecordingTransport) -> PhaseRunner {
        let shared = Arc::new(Shared::new("runner".into(), ExecutionContext::CallerThread));
        PhaseRunner::new(
            "runner".into(),
            hooks,
            OwnedTransport::new(transport),
            StopHandle::new(shared),
            Duration::from_millis(16),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_phase_order() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let mut runner = runner(recording_hooks(&log), transport);

        runner.run_tick(Duration::ZERO).unwrap();
        assert_eq!(
            log.entries(),
            vec!["poll", "pre_update", "update", "post_update", "pre_draw", "draw", "post_draw"]
        );

        // Exactly once each per tick.
        runner.run_tick(Duration::ZERO).unwrap();
        assert_eq!(log.entries().len(), 14);
        assert_eq!(log.entries()[7], "poll");
    }

    #[test]
    fn test_missing_hooks_are_skipped() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let hook_log = log.clone();
        let hooks = Hooks::new().on_draw(move |_| {
            hook_log.push("draw");
            Ok(())
        });
        let mut runner = runner(hooks, transport);

        runner.run_tick(Duration::ZERO).unwrap();
        assert_eq!(log.entries(), vec!["poll", "draw"]);
    }

    #[test]
    fn test_hook_error_stops_sequence() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let hooks = recording_hooks(&log).on_post_update(|_| Err("bad state".into()));
        let mut runner = runner(hooks, transport);

        let err = runner.run_tick(Duration::ZERO).unwrap_err();
        assert_eq!(err.phase(), Phase::PostUpdate);
        assert!(err.to_string().contains("bad state"));
        assert_eq!(log.entries(), vec!["poll", "pre_update", "update"]);
        assert_eq!(runner.current_phase(), Phase::PostUpdate);
    }

    #[test]
    fn test_poll_error_is_transport_error() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log).failing_poll();
        let mut runner = runner(recording_hooks(&log), transport);

        let err = runner.run_tick(Duration::ZERO).unwrap_err();
        assert!(matches!(err, TickError::Transport(_)));
        assert_eq!(err.phase(), Phase::Poll);
        assert_eq!(log.entries(), vec!["poll"]);
    }

    #[test]
    fn test_tick_index_advances() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let seen = CallLog::default();
        let seen_hook = seen.clone();
        let hooks = Hooks::new().on_update(move |ctx| {
            seen_hook.push(if ctx.tick() == 0 { "first" } else { "later" });
            Ok(())
        });
        let mut runner = runner(hooks, transport);

        runner.run_tick(Duration::ZERO).unwrap();
        runner.run_tick(Duration::ZERO).unwrap();
        assert_eq!(seen.entries(), vec!["first", "later"]);
        assert_eq!(runner.stop.counters().snapshot().ticks, 2);
    }

    #[test]
    fn test_release_once() {
        let log = CallLog::default();
        let transport = RecordingTransport::new(&log);
        let stops = transport.stop_count();
        let mut runner = runner(Hooks::new(), transport);

        runner.release();
        runner.release();
        drop(runner);
        assert_eq!(stops.get(), 1);
    }

    #[test]
    fn test_throughput_window() {
        let start = Instant::now();
        let mut throughput = Throughput::new(Duration::from_secs(1), start);

        for i in 1..=59u64 {
            assert!(throughput.record(start + Duration::from_millis(i * 16)).is_none());
        }
        assert_eq!(throughput.window_ticks(), 59);

        let rate = throughput
            .record(start + Duration::from_millis(1200))
            .expect("window should close");
        assert!((rate - 50.0).abs() < 1e-9);
        assert_eq!(throughput.window_ticks(), 0);
    }
}
