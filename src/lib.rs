//! # Pacer
//!
//! Fixed-rate actors for frame-driven applications.
//!
//! Each actor runs a loop at a target rate: poll its transport, run the
//! update and draw hooks, then sleep until the next deadline. A lead actor
//! runs on the caller's thread and owns worker children that it stops when
//! it exits, however it exits.
//!
//! ## Core Concepts
//!
//! - **Tick clock**: deadline math with overrun detection
//! - **Phase runner**: poll, then pre/update/post, then pre/draw/post
//! - **Actor loop**: setup, ticks, teardown, with faults contained per actor
//! - **Hierarchy**: a lead on the caller thread, workers on their own threads
//! - **Signals**: named values actors publish, read and subscribe to
//!
//! ## Example
//!
//! ```rust
//! use pacer::{Actor, ActorConfig, ExitReason, Hooks, NullTransport};
//!
//! let hooks = Hooks::new().on_update(|ctx| {
//!     if ctx.tick() == 3 {
//!         ctx.stop();
//!     }
//!     Ok(())
//! });
//!
//! let config = ActorConfig::standalone("counter").with_frequency(500);
//! let handle = Actor::new(config, hooks, NullTransport)?.start()?;
//!
//! assert_eq!(handle.exit_reason(), Some(ExitReason::Stopped));
//! assert_eq!(handle.stats().ticks, 4);
//! # Ok::<(), pacer::ActorError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod actor;
pub mod canvas;
pub mod error;
pub mod signal;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use actor::{
    Actor, ActorConfig, ActorHandle, ActorStats, ChildActor, ExecutionContext, ExitReason, Hooks,
    LeadActor, LeadHandle, Phase, StopHandle, TickClock, TickContext,
};
pub use canvas::{Canvas, FrameId, FrameReceiver, Primitive, Rect, Rgb, Surface};
pub use error::{ActorError, HookError, HookResult, SignalError, TickError, TransportError};
pub use signal::{Access, Peer, PeerInbox, SignalBus, Value};
pub use transport::{ChannelTransport, NullTransport, Transport};
