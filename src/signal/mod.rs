//! Signals: named values that actors publish and subscribe to.
//!
//! This is the only channel between actors. A signal belongs to one
//! peer; other peers read it, write it or subscribe to its emissions
//! according to its [`Access`] mode.
//!
//! - [`SignalBus`]: the shared registry
//! - [`Peer`]: hook-side handle (register, set, emit, subscribe)
//! - [`PeerInbox`]: the actor's transport, applying delivered values
//! - [`Value`]: what a signal carries

mod access;
mod bus;
mod value;

pub use access::Access;
pub use bus::{Delivery, Peer, PeerInbox, SignalBus, SignalEvent, SignalHandler};
pub use value::Value;
