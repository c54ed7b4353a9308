//! Transports: where an actor's inbound events come from.
//!
//! An actor polls its transport once at the start of every tick, giving
//! it the time left before the tick's deadline. A transport must not
//! block longer than that budget.

use crate::error::TransportError;
use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::fmt;
use std::time::Duration;

/// Source of inbound events for an actor.
pub trait Transport: Send {
    /// Process at most one batch of pending events, blocking no longer
    /// than `budget`.
    fn poll(&mut self, budget: Duration) -> Result<(), TransportError>;

    /// Release the transport. Must be safe to call more than once.
    fn stop(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll(&mut self, budget: Duration) -> Result<(), TransportError> {
        (**self).poll(budget)
    }

    fn stop(&mut self) {
        (**self).stop();
    }
}

/// An actor's transport, released exactly once.
///
/// Releases on drop if nobody released it first, so an actor that never
/// starts still gives its transport back.
pub(crate) struct OwnedTransport {
    inner: Box<dyn Transport>,
    released: bool,
}

impl OwnedTransport {
    pub(crate) fn new(transport: impl Transport + 'static) -> Self {
        Self {
            inner: Box::new(transport),
            released: false,
        }
    }

    pub(crate) fn poll(&mut self, budget: Duration) -> Result<(), TransportError> {
        self.inner.poll(budget)
    }

    /// Stop the transport. Later calls do nothing.
    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.stop();
        }
    }
}

impl Drop for OwnedTransport {
    fn drop(&mut self) {
        self.release();
    }
}

/// A transport with nothing to poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl Transport for NullTransport {
    fn poll(&mut self, _budget: Duration) -> Result<(), TransportError> {
        Ok(())
    }

    fn stop(&mut self) {}
}

/// Delivers messages from a crossbeam channel to a handler.
///
/// A poll waits up to the budget for the first message, then drains what
/// is already queued, up to `max_batch` messages.
pub struct ChannelTransport<T, F> {
    receiver: Option<Receiver<T>>,
    handler: F,
    max_batch: usize,
}

impl<T, F> ChannelTransport<T, F>
where
    T: Send,
    F: FnMut(T) + Send,
{
    /// Default upper bound on messages handled per poll.
    pub const DEFAULT_BATCH: usize = 256;

    /// Wrap `receiver`, passing each message to `handler`.
    pub const fn new(receiver: Receiver<T>, handler: F) -> Self {
        Self {
            receiver: Some(receiver),
            handler,
            max_batch: Self::DEFAULT_BATCH,
        }
    }

    /// Handle at most `max_batch` messages per poll (at least one).
    #[must_use]
    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    /// Whether the transport has been stopped.
    pub const fn is_stopped(&self) -> bool {
        self.receiver.is_none()
    }
}

impl<T, F> Transport for ChannelTransport<T, F>
where
    T: Send,
    F: FnMut(T) + Send,
{
    fn poll(&mut self, budget: Duration) -> Result<(), TransportError> {
        let Some(receiver) = &self.receiver else {
            return Ok(());
        };

        let first = match receiver.recv_timeout(budget) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Disconnected),
        };
        (self.handler)(first);

        for _ in 1..self.max_batch {
            match receiver.try_recv() {
                Ok(message) => (self.handler)(message),
                // A disconnect surfaces on the next poll.
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.receiver = None;
    }
}

impl<T, F> fmt::Debug for ChannelTransport<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelTransport")
            .field("stopped", &self.receiver.is_none())
            .field("max_batch", &self.max_batch)
            .finish_non_exhaustive()
    }
}
