//! In-process signal bus.
//!
//! Peers register named values with an access mode. Emitting a value
//! pushes it to every subscribed peer's inbox; the inbox is the peer's
//! transport, so delivered values land during the receiving actor's next
//! poll, before its `update` hook runs.

use super::{Access, Value};
use crate::error::{SignalError, TransportError};
use crate::transport::Transport;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Queued events per inbox before new ones are dropped.
const INBOX_CAPACITY: usize = 1024;

/// Events applied per inbox poll.
const INBOX_BATCH: usize = 256;

/// How a value reached an inbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Emitted by a peer this one subscribed to.
    Emitted,
    /// Written directly by another peer.
    Written,
}

/// A value delivered to a peer's inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalEvent {
    /// Sending peer.
    pub from: String,
    /// Signal name on the sending side.
    pub signal: String,
    /// Signal name on the receiving side.
    pub target: String,
    /// Delivered value.
    pub value: Value,
    /// How the value was delivered.
    pub delivery: Delivery,
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    access: Access,
}

type Slots = Arc<RwLock<HashMap<String, Slot>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    peer: String,
    signal: String,
}

struct PeerEntry {
    slots: Slots,
    inbox: Sender<SignalEvent>,
    /// Emitter signal name -> subscribed (peer, local signal) pairs.
    subscribers: HashMap<String, Vec<Route>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn unknown(peer: &str, signal: &str) -> SignalError {
    SignalError::UnknownSignal {
        peer: peer.to_string(),
        signal: signal.to_string(),
    }
}

fn check_type(signal: &str, current: &Value, offered: &Value) -> Result<(), SignalError> {
    if current.same_type(offered) {
        Ok(())
    } else {
        Err(SignalError::TypeMismatch {
            signal: signal.to_string(),
            expected: current.type_name(),
            found: offered.type_name(),
        })
    }
}

fn require(signal: &str, slot: &Slot, access: Access, operation: &'static str) -> Result<(), SignalError> {
    if slot.access.contains(access) {
        Ok(())
    } else {
        Err(SignalError::AccessDenied {
            signal: signal.to_string(),
            operation,
        })
    }
}

/// Shared registry of peers. Cheap to clone.
#[derive(Clone, Default)]
pub struct SignalBus {
    peers: Arc<RwLock<HashMap<String, PeerEntry>>>,
}

impl SignalBus {
    /// An empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the bus as `name`.
    ///
    /// Returns the hook-side [`Peer`] and the [`PeerInbox`] that the
    /// owning actor uses as its transport.
    pub fn join(&self, name: impl Into<String>) -> Result<(Peer, PeerInbox), SignalError> {
        let name = name.into();
        let mut peers = write(&self.peers);
        if peers.contains_key(&name) {
            return Err(SignalError::PeerExists(name));
        }

        let slots = Slots::default();
        let (tx, rx) = bounded(INBOX_CAPACITY);
        peers.insert(
            name.clone(),
            PeerEntry {
                slots: Arc::clone(&slots),
                inbox: tx,
                subscribers: HashMap::new(),
            },
        );
        drop(peers);
        log::debug!("signal bus: {name} joined");

        let name: Arc<str> = Arc::from(name);
        let peer = Peer {
            name: Arc::clone(&name),
            slots: Arc::clone(&slots),
            bus: self.clone(),
        };
        let inbox = PeerInbox {
            name,
            slots,
            receiver: Some(rx),
            bus: self.clone(),
            handler: None,
        };
        Ok((peer, inbox))
    }

    /// Names of the peers on the bus, sorted.
    pub fn peers(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.peers).keys().cloned().collect();
        names.sort();
        names
    }

    /// Remove `name` and every subscription that points at it.
    fn leave(&self, name: &str) {
        let mut peers = write(&self.peers);
        if peers.remove(name).is_none() {
            return;
        }
        for entry in peers.values_mut() {
            for routes in entry.subscribers.values_mut() {
                routes.retain(|r| r.peer != name);
            }
        }
        drop(peers);
        log::debug!("signal bus: {name} left");
    }

    fn deliver(&self, to: &str, event: SignalEvent) -> bool {
        let peers = read(&self.peers);
        let Some(entry) = peers.get(to) else {
            return false;
        };
        match entry.inbox.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                log::warn!(
                    "signal bus: inbox of {to} is full, dropping {} from {}",
                    event.signal,
                    event.from
                );
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl fmt::Debug for SignalBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBus").field("peers", &self.peers()).finish()
    }
}

/// Hook-side view of one peer: register, read, set and emit signals.
#[derive(Clone)]
pub struct Peer {
    name: Arc<str>,
    slots: Slots,
    bus: SignalBus,
}

impl Peer {
    /// Peer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a signal with an initial value and access mode.
    pub fn register(
        &self,
        signal: impl Into<String>,
        initial: impl Into<Value>,
        access: Access,
    ) -> Result<(), SignalError> {
        let signal = signal.into();
        let mut slots = write(&self.slots);
        if slots.contains_key(&signal) {
            return Err(SignalError::AlreadyRegistered(signal));
        }
        log::debug!("{}: registered signal {signal} ({access})", self.name);
        slots.insert(
            signal,
            Slot {
                value: initial.into(),
                access,
            },
        );
        Ok(())
    }

    /// Current value of one of this peer's signals.
    pub fn get(&self, signal: &str) -> Result<Value, SignalError> {
        read(&self.slots)
            .get(signal)
            .map(|slot| slot.value.clone())
            .ok_or_else(|| unknown(&self.name, signal))
    }

    /// Replace the value of one of this peer's signals without emitting.
    pub fn set(&self, signal: &str, value: impl Into<Value>) -> Result<(), SignalError> {
        let value = value.into();
        let mut slots = write(&self.slots);
        let slot = slots
            .get_mut(signal)
            .ok_or_else(|| unknown(&self.name, signal))?;
        check_type(signal, &slot.value, &value)?;
        slot.value = value;
        Ok(())
    }

    /// Set a signal and push it to every subscriber.
    ///
    /// Requires [`Access::EMIT`]. Returns how many inboxes accepted it.
    pub fn emit(&self, signal: &str, value: impl Into<Value>) -> Result<usize, SignalError> {
        let value = value.into();
        {
            let mut slots = write(&self.slots);
            let slot = slots
                .get_mut(signal)
                .ok_or_else(|| unknown(&self.name, signal))?;
            require(signal, slot, Access::EMIT, "emit")?;
            check_type(signal, &slot.value, &value)?;
            slot.value = value.clone();
        }

        let routes = read(&self.bus.peers)
            .get(&*self.name)
            .and_then(|entry| entry.subscribers.get(signal).cloned())
            .unwrap_or_default();

        let delivered = routes
            .into_iter()
            .filter(|route| {
                self.bus.deliver(
                    &route.peer,
                    SignalEvent {
                        from: self.name.to_string(),
                        signal: signal.to_string(),
                        target: route.signal.clone(),
                        value: value.clone(),
                        delivery: Delivery::Emitted,
                    },
                )
            })
            .count();
        Ok(delivered)
    }

    /// Receive `emitter`'s `signal` into this peer's `local` signal.
    ///
    /// The emitter's signal needs [`Access::EMIT`]; `local` needs
    /// [`Access::SIGNAL`].
    pub fn subscribe(&self, emitter: &str, signal: &str, local: &str) -> Result<(), SignalError> {
        {
            let slots = read(&self.slots);
            let slot = slots.get(local).ok_or_else(|| unknown(&self.name, local))?;
            require(local, slot, Access::SIGNAL, "subscription")?;
        }

        let mut peers = write(&self.bus.peers);
        let entry = peers
            .get_mut(emitter)
            .ok_or_else(|| SignalError::UnknownPeer(emitter.to_string()))?;
        {
            let slots = read(&entry.slots);
            let slot = slots.get(signal).ok_or_else(|| unknown(emitter, signal))?;
            require(signal, slot, Access::EMIT, "emit")?;
        }

        let route = Route {
            peer: self.name.to_string(),
            signal: local.to_string(),
        };
        let routes = entry.subscribers.entry(signal.to_string()).or_default();
        if !routes.contains(&route) {
            routes.push(route);
        }
        drop(peers);
        log::debug!("{}: subscribed {local} to {emitter}.{signal}", self.name);
        Ok(())
    }

    /// Drop a subscription. Returns whether one existed.
    pub fn unsubscribe(&self, emitter: &str, signal: &str, local: &str) -> bool {
        let mut peers = write(&self.bus.peers);
        let Some(routes) = peers
            .get_mut(emitter)
            .and_then(|entry| entry.subscribers.get_mut(signal))
        else {
            return false;
        };
        let before = routes.len();
        routes.retain(|r| !(r.peer == *self.name && r.signal == local));
        routes.len() != before
    }

    /// Read another peer's signal. Requires [`Access::READ`].
    pub fn read(&self, peer: &str, signal: &str) -> Result<Value, SignalError> {
        let peers = read(&self.bus.peers);
        let entry = peers
            .get(peer)
            .ok_or_else(|| SignalError::UnknownPeer(peer.to_string()))?;
        let slots = read(&entry.slots);
        let slot = slots.get(signal).ok_or_else(|| unknown(peer, signal))?;
        require(signal, slot, Access::READ, "reads")?;
        Ok(slot.value.clone())
    }

    /// Write another peer's signal. Requires [`Access::WRITE`].
    ///
    /// The value is queued in the target's inbox and applied on its next
    /// poll.
    pub fn write(&self, peer: &str, signal: &str, value: impl Into<Value>) -> Result<(), SignalError> {
        let value = value.into();
        {
            let peers = read(&self.bus.peers);
            let entry = peers
                .get(peer)
                .ok_or_else(|| SignalError::UnknownPeer(peer.to_string()))?;
            let slots = read(&entry.slots);
            let slot = slots.get(signal).ok_or_else(|| unknown(peer, signal))?;
            require(signal, slot, Access::WRITE, "writes")?;
            check_type(signal, &slot.value, &value)?;
        }

        self.bus.deliver(
            peer,
            SignalEvent {
                from: self.name.to_string(),
                signal: signal.to_string(),
                target: signal.to_string(),
                value,
                delivery: Delivery::Written,
            },
        );
        Ok(())
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut signals: Vec<String> = read(&self.slots).keys().cloned().collect();
        signals.sort();
        f.debug_struct("Peer")
            .field("name", &self.name)
            .field("signals", &signals)
            .finish()
    }
}

/// Callback invoked for every applied inbox event.
pub type SignalHandler = Box<dyn FnMut(&SignalEvent) + Send>;

/// Actor-side end of a peer: the transport that applies delivered values.
///
/// Stopping or dropping the inbox removes the peer from the bus.
pub struct PeerInbox {
    name: Arc<str>,
    slots: Slots,
    receiver: Option<Receiver<SignalEvent>>,
    bus: SignalBus,
    handler: Option<SignalHandler>,
}

impl PeerInbox {
    /// Call `f` for every event applied during a poll.
    #[must_use]
    pub fn on_signal<F>(mut self, f: F) -> Self
    where
        F: FnMut(&SignalEvent) + Send + 'static,
    {
        self.handler = Some(Box::new(f));
        self
    }

    fn apply(&mut self, event: &SignalEvent) {
        {
            let mut slots = write(&self.slots);
            match slots.get_mut(&event.target) {
                Some(slot) if slot.value.same_type(&event.value) => {
                    slot.value = event.value.clone();
                }
                Some(slot) => {
                    log::warn!(
                        "{}: ignoring {} for {}, expected {}",
                        self.name,
                        event.value.type_name(),
                        event.target,
                        slot.value.type_name()
                    );
                    return;
                }
                None => {
                    log::warn!("{}: event for unknown signal {}", self.name, event.target);
                    return;
                }
            }
        }
        if let Some(handler) = self.handler.as_mut() {
            handler(event);
        }
    }
}

impl Transport for PeerInbox {
    fn poll(&mut self, budget: Duration) -> Result<(), TransportError> {
        let Some(receiver) = self.receiver.clone() else {
            return Ok(());
        };

        match receiver.recv_timeout(budget) {
            Ok(event) => self.apply(&event),
            Err(RecvTimeoutError::Timeout) => return Ok(()),
            Err(RecvTimeoutError::Disconnected) => return Err(TransportError::Disconnected),
        }
        for _ in 1..INBOX_BATCH {
            match receiver.try_recv() {
                Ok(event) => self.apply(&event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.receiver.take().is_some() {
            self.bus.leave(&self.name);
        }
    }
}

impl Drop for PeerInbox {
    fn drop(&mut self) {
        self.stop();
    }
}

impl fmt::Debug for PeerInbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerInbox")
            .field("name", &self.name)
            .field("stopped", &self.receiver.is_none())
            .finish_non_exhaustive()
    }
}
