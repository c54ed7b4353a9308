//! Hook callbacks and the per-tick context handed to them.

use super::handle::StopHandle;
use super::phase::Phase;
use crate::error::HookResult;
use std::fmt;
use std::time::{Duration, Instant};

/// One-shot setup callback.
pub type SetupHook = Box<dyn FnOnce() -> HookResult + Send>;

/// Per-tick phase callback.
pub type TickHook = Box<dyn FnMut(&TickContext<'_>) -> HookResult + Send>;

/// Read-only view of the current tick, passed to every phase hook.
pub struct TickContext<'a> {
    pub(crate) name: &'a str,
    pub(crate) tick: u64,
    pub(crate) started: Instant,
    pub(crate) now: Instant,
    pub(crate) interval: Duration,
    pub(crate) stop: &'a StopHandle,
}

impl TickContext<'_> {
    /// Name of the actor running this tick.
    #[inline]
    pub const fn name(&self) -> &str {
        self.name
    }

    /// Zero-based index of this tick.
    #[inline]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Instant at which this tick began.
    #[inline]
    pub const fn now(&self) -> Instant {
        self.now
    }

    /// Time since the actor's loop started.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.now.saturating_duration_since(self.started)
    }

    /// Target tick interval of the actor.
    #[inline]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Ask the actor to stop after this tick.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle that can stop this actor later, from any thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}

/// The set of callbacks an actor runs.
///
/// Every hook is optional. A missing hook is skipped without a trace.
///
/// ```ignore
/// let hooks = Hooks::new()
///     .on_setup(|| Ok(()))
///     .on_update(|ctx| {
///         if ctx.tick() == 600 {
///             ctx.stop();
///         }
///         Ok(())
///     });
/// ```
#[derive(Default)]
pub struct Hooks {
    setup: Option<SetupHook>,
    pre_update: Option<TickHook>,
    update: Option<TickHook>,
    post_update: Option<TickHook>,
    pre_draw: Option<TickHook>,
    draw: Option<TickHook>,
    post_draw: Option<TickHook>,
}

impl Hooks {
    /// An empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` once before the loop starts.
    #[must_use]
    pub fn on_setup<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> HookResult + Send + 'static,
    {
        self.setup = Some(Box::new(f));
        self
    }

    /// Run `f` before `update` on every tick.
    #[must_use]
    pub fn on_pre_update<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::PreUpdate, f)
    }

    /// Run `f` on every tick, after the transport poll.
    #[must_use]
    pub fn on_update<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::Update, f)
    }

    /// Run `f` after `update` on every tick.
    #[must_use]
    pub fn on_post_update<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::PostUpdate, f)
    }

    /// Run `f` before `draw` on every tick.
    #[must_use]
    pub fn on_pre_draw<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::PreDraw, f)
    }

    /// Run `f` on every tick, after the update phases.
    #[must_use]
    pub fn on_draw<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::Draw, f)
    }

    /// Run `f` after `draw` on every tick.
    #[must_use]
    pub fn on_post_draw<F>(self, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        self.on(Phase::PostDraw, f)
    }

    /// Install `f` for an arbitrary tick phase, replacing any previous hook.
    ///
    /// Installing a hook for [`Phase::Poll`] is ignored; polling belongs to
    /// the transport.
    #[must_use]
    pub fn on<F>(mut self, phase: Phase, f: F) -> Self
    where
        F: FnMut(&TickContext<'_>) -> HookResult + Send + 'static,
    {
        if let Some(slot) = self.slot_mut(phase) {
            *slot = Some(Box::new(f));
        }
        self
    }

    /// Whether a hook is installed for `phase`.
    pub fn has(&self, phase: Phase) -> bool {
        match phase {
            Phase::Poll => false,
            Phase::PreUpdate => self.pre_update.is_some(),
            Phase::Update => self.update.is_some(),
            Phase::PostUpdate => self.post_update.is_some(),
            Phase::PreDraw => self.pre_draw.is_some(),
            Phase::Draw => self.draw.is_some(),
            Phase::PostDraw => self.post_draw.is_some(),
        }
    }

    pub(crate) fn take_setup(&mut self) -> Option<SetupHook> {
        self.setup.take()
    }

    pub(crate) fn get_mut(&mut self, phase: Phase) -> Option<&mut TickHook> {
        self.slot_mut(phase).and_then(Option::as_mut)
    }

    fn slot_mut(&mut self, phase: Phase) -> Option<&mut Option<TickHook>> {
        match phase {
            Phase::Poll => None,
            Phase::PreUpdate => Some(&mut self.pre_update),
            Phase::Update => Some(&mut self.update),
            Phase::PostUpdate => Some(&mut self.post_update),
            Phase::PreDraw => Some(&mut self.pre_draw),
            Phase::Draw => Some(&mut self.draw),
            Phase::PostDraw => Some(&mut self.post_draw),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let installed: Vec<Phase> = Phase::HOOKS.into_iter().filter(|p| self.has(*p)).collect();
        f.debug_struct("Hooks")
            .field("setup", &self.setup.is_some())
            .field("installed", &installed)
            .finish()
    }
}
