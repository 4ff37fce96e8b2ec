//! Broadcast node: the subscriber set shared by every pipeline stage.
//!
//! A [`Broadcaster`] holds an ordered, duplicate-free list of subscribers and
//! delivers each message to them one at a time, on the calling thread.
//! Every subscriber lives behind its own `Mutex` (see [`Shared`]), and delivery
//! takes that lock before calling [`Listener::receive`], so a stage fed by two
//! upstream producers is never entered concurrently.

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Consumer half of a stage: anything that can be attached to a [`Broadcaster`].
pub trait Listener<M>: Send {
    /// Handle one message. An error aborts the current broadcast and is
    /// propagated to whoever drove it (normally a source's reader loop).
    fn receive(&mut self, msg: &M) -> Result<()>;

    /// Human-readable name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Producer half of a stage: exposes the stage's own broadcast node.
pub trait Producer<M> {
    fn output(&self) -> &Broadcaster<M>;

    fn attach<L>(&self, subscriber: Shared<L>) -> Shared<L>
    where
        L: Listener<M> + 'static,
        Self: Sized,
    {
        self.output().attach(subscriber)
    }

    fn detach<L: ?Sized>(&self, subscriber: &Arc<Mutex<L>>)
    where
        Self: Sized,
    {
        self.output().detach(subscriber)
    }

    fn contains<L: ?Sized>(&self, subscriber: &Arc<Mutex<L>>) -> bool
    where
        Self: Sized,
    {
        self.output().contains(subscriber)
    }

    fn broadcast(&self, msg: &M) -> Result<()> {
        self.output().broadcast(msg)
    }
}

/// Shared, lockable handle to a stage. The mutex is the stage's exclusion guard.
pub type Shared<L> = Arc<Mutex<L>>;

/// Type-erased subscriber entry stored in a [`Broadcaster`].
pub type Subscriber<M> = Arc<Mutex<dyn Listener<M>>>;

/// Wrap a stage into a [`Shared`] handle.
pub fn shared<L>(stage: L) -> Shared<L> {
    Arc::new(Mutex::new(stage))
}

/// Lock a mutex, recovering the guard if a previous holder panicked.
pub fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn same_subscriber<M, L: ?Sized>(entry: &Subscriber<M>, candidate: &Arc<Mutex<L>>) -> bool {
    // Compare allocation addresses only; vtable pointers are not stable.
    Arc::as_ptr(entry) as *const () == Arc::as_ptr(candidate) as *const ()
}

/// Ordered, duplicate-free set of subscribers with synchronous delivery.
pub struct Broadcaster<M> {
    subscribers: Mutex<Vec<Subscriber<M>>>,
}

impl<M> Broadcaster<M> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Attach a subscriber and return it. Attaching twice is a no-op.
    pub fn attach<L>(&self, subscriber: Shared<L>) -> Shared<L>
    where
        L: Listener<M> + 'static,
    {
        let mut subscribers = lock(&self.subscribers);
        if !subscribers.iter().any(|s| same_subscriber(s, &subscriber)) {
            let entry: Subscriber<M> = subscriber.clone();
            subscribers.push(entry);
        }
        subscriber
    }

    /// Remove a subscriber. Detaching an absent subscriber is a no-op.
    pub fn detach<L: ?Sized>(&self, subscriber: &Arc<Mutex<L>>) {
        lock(&self.subscribers).retain(|s| !same_subscriber(s, subscriber));
    }

    pub fn contains<L: ?Sized>(&self, subscriber: &Arc<Mutex<L>>) -> bool {
        lock(&self.subscribers)
            .iter()
            .any(|s| same_subscriber(s, subscriber))
    }

    pub fn len(&self) -> usize {
        lock(&self.subscribers).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.subscribers).is_empty()
    }

    /// Deliver `msg` to every attached subscriber, in attachment order.
    ///
    /// The subscriber list is snapshotted under the node's lock, then each
    /// subscriber is locked in turn while it receives. The first subscriber
    /// error stops delivery and is returned; subscribers already reached keep
    /// the message.
    pub fn broadcast(&self, msg: &M) -> Result<()> {
        let snapshot: Vec<Subscriber<M>> = lock(&self.subscribers).clone();
        for subscriber in &snapshot {
            let mut listener = lock(subscriber.as_ref());
            listener.receive(msg)?;
        }
        Ok(())
    }
}

impl<M> Default for Broadcaster<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> std::fmt::Debug for Broadcaster<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.len())
            .finish()
    }
}
