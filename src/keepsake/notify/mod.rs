//! # Change Notifier
//!
//! Tells a session that something in its room changed so it can re-fetch. Notifications
//! carry no payload: receivers always reload the whole collection.
//!
//! - A session's own writes are delivered back to it.
//! - Bursts are not coalesced; a save that touches several rows may fire several times.
//! - Callbacks should only signal (set a flag, send on a channel). The realtime notifier
//!   runs them on its background thread.
//!
//! ## Implementations
//!
//! - [`realtime::RealtimeNotifier`]: Backend change feed over a websocket.
//! - [`hub::ChangeHub`]: In-process fan-out, fed by [`MemoryRepository`](crate::remote::memory::MemoryRepository).
//! - [`Disabled`]: No backend configured; subscriptions never fire.

use crate::model::RoomCode;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

pub mod hub;
pub mod realtime;

/// Invoked once per change notification.
pub type Invalidation = Arc<dyn Fn() + Send + Sync>;

pub trait ChangeNotifier {
    /// Start listening for changes in `room`. Listening stops when the returned
    /// subscription is unsubscribed or dropped.
    fn subscribe(&self, room: &RoomCode, on_change: Invalidation) -> Subscription;
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Box<N> {
    fn subscribe(&self, room: &RoomCode, on_change: Invalidation) -> Subscription {
        (**self).subscribe(room, on_change)
    }
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Rc<N> {
    fn subscribe(&self, room: &RoomCode, on_change: Invalidation) -> Subscription {
        (**self).subscribe(room, on_change)
    }
}

/// Handle to an active subscription.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription with nothing to cancel.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Stop listening. Calling this more than once does nothing.
    pub fn unsubscribe(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Disabled;

impl ChangeNotifier for Disabled {
    fn subscribe(&self, room: &RoomCode, _on_change: Invalidation) -> Subscription {
        tracing::debug!(room = %room, "change notifications disabled");
        Subscription::inert()
    }
}
