//! Error types shared by actors, transports and signals.

use crate::actor::Phase;
use std::time::Duration;
use thiserror::Error;

/// Error type returned by user hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by user hooks.
pub type HookResult = Result<(), HookError>;

/// Lifecycle errors surfaced to the owner of an actor.
#[derive(Debug, Error)]
pub enum ActorError {
    /// The setup hook failed; the loop never ran.
    #[error("actor '{actor}' failed during setup: {source}")]
    Setup {
        /// Actor name.
        actor: String,
        /// Error raised by the setup hook.
        #[source]
        source: HookError,
    },

    /// The OS refused to spawn the worker thread.
    #[error("actor '{actor}' could not spawn its worker thread: {source}")]
    Spawn {
        /// Actor name.
        actor: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The worker did not finish within the join timeout and was abandoned.
    #[error("actor '{actor}' did not stop within {timeout:?}")]
    JoinTimeout {
        /// Actor name.
        actor: String,
        /// Timeout that elapsed.
        timeout: Duration,
    },

    /// The worker thread panicked outside of a tick.
    #[error("worker thread of actor '{actor}' panicked")]
    WorkerPanicked {
        /// Actor name.
        actor: String,
    },

    /// A caller-thread actor was registered as a child.
    #[error("actor '{actor}' does not run on a dedicated worker and cannot be a child")]
    NotAWorker {
        /// Actor name.
        actor: String,
    },

    /// A child was registered after the lead already stopped its children.
    #[error("lead actor already stopped; child '{actor}' was shut down on registration")]
    LeadStopped {
        /// Child actor name.
        actor: String,
    },

    /// The actor configuration is unusable.
    #[error("invalid actor configuration: {0}")]
    InvalidConfig(String),
}

/// Errors that end a tick, and with it the actor's loop.
#[derive(Debug, Error)]
pub enum TickError {
    /// A hook returned an error.
    #[error("{phase} hook failed: {source}")]
    Hook {
        /// Phase whose hook failed.
        phase: Phase,
        /// Error returned by the hook.
        #[source]
        source: HookError,
    },

    /// The transport poll failed.
    #[error("transport poll failed: {0}")]
    Transport(#[from] TransportError),

    /// A hook or the transport poll panicked.
    #[error("panicked during {phase}: {message}")]
    Panicked {
        /// Phase that panicked.
        phase: Phase,
        /// Panic payload, if it was a string.
        message: String,
    },
}

impl TickError {
    /// Phase in which the tick failed.
    pub const fn phase(&self) -> Phase {
        match self {
            Self::Hook { phase, .. } | Self::Panicked { phase, .. } => *phase,
            Self::Transport(_) => Phase::Poll,
        }
    }
}

/// Errors raised by a [`Transport`](crate::transport::Transport) poll.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote side of the transport went away.
    #[error("transport disconnected")]
    Disconnected,

    /// An I/O error from the underlying connection.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the signal registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalError {
    /// No signal with this name is registered on the peer.
    #[error("peer '{peer}' has no signal '{signal}'")]
    UnknownSignal {
        /// Peer name.
        peer: String,
        /// Signal name.
        signal: String,
    },

    /// The signal's access mode forbids the operation.
    #[error("signal '{signal}' does not allow {operation}")]
    AccessDenied {
        /// Signal name.
        signal: String,
        /// Attempted operation.
        operation: &'static str,
    },

    /// The value does not match the registered signal type.
    #[error("signal '{signal}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Signal name.
        signal: String,
        /// Registered type.
        expected: &'static str,
        /// Offered type.
        found: &'static str,
    },

    /// A signal with this name already exists on the peer.
    #[error("signal '{0}' is already registered")]
    AlreadyRegistered(String),

    /// The named peer is not on the bus.
    #[error("unknown peer '{0}'")]
    UnknownPeer(String),

    /// A peer with this name already joined the bus.
    #[error("peer '{0}' already joined the bus")]
    PeerExists(String),
}
