//! Actor model: fixed-rate loops with a poll/update/draw tick sequence.
//!
//! Each actor owns a clock, a phase runner, its hooks and its transport.
//! Actors never share tick state; they talk through the signal bus.
//!
//! # Architecture
//!
//! ```text
//!                        ┌──────────────────────────────┐
//!                        │ LeadActor (caller thread)    │
//!                        │  TickClock + PhaseRunner     │
//!                        │  children: [A, B, ...]       │
//!                        └──────────────┬───────────────┘
//!                                       │ stop(), in registration order
//!                  ┌────────────────────┴─────────────────────┐
//!                  ▼                                          ▼
//!   ┌──────────────────────────────┐          ┌──────────────────────────────┐
//!   │ Child A (worker thread)      │          │ Child B (worker thread)      │
//!   │  poll ▶ update ▶ draw ▶ sleep│          │  poll ▶ update ▶ draw ▶ sleep│
//!   └──────────────────────────────┘          └──────────────────────────────┘
//! ```
//!
//! A tick error or hook panic ends only the failing actor. Stop requests
//! are cooperative and take effect at the next tick boundary.

#[allow(clippy::module_inception)]
mod actor;
mod clock;
mod handle;
mod hierarchy;
mod hooks;
mod phase;

pub use actor::{Actor, ActorConfig, ExecutionContext};
pub use clock::TickClock;
pub use handle::{ActorHandle, ExitReason, StopHandle};
pub use hierarchy::{ChildActor, ChildRegistry, LeadActor, LeadHandle};
pub use hooks::{Hooks, SetupHook, TickContext, TickHook};
pub use phase::{ActorStats, Phase, Throughput};
