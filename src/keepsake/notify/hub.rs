use super::{ChangeNotifier, Invalidation, Subscription};
use crate::model::RoomCode;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type ListenerId = u64;

#[derive(Default)]
struct Listeners {
    entries: RefCell<Vec<(ListenerId, RoomCode, Invalidation)>>,
    next_id: Cell<ListenerId>,
}

/// In-process change fan-out, keyed by room.
///
/// Clones share the same listener list, so a repository can publish into the hub
/// that sessions subscribed to. Publishing snapshots the listeners first: a callback
/// may subscribe or unsubscribe without affecting the current round.
#[derive(Clone, Default)]
pub struct ChangeHub {
    inner: Rc<Listeners>,
}

impl ChangeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notify every listener of `room`.
    pub fn publish(&self, room: &RoomCode) {
        let snapshot: Vec<Invalidation> = self
            .inner
            .entries
            .borrow()
            .iter()
            .filter(|(_, r, _)| r == room)
            .map(|(_, _, cb)| cb.clone())
            .collect();
        tracing::trace!(room = %room, listeners = snapshot.len(), "publishing change");
        for cb in snapshot {
            cb();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }
}

impl ChangeNotifier for ChangeHub {
    fn subscribe(&self, room: &RoomCode, on_change: Invalidation) -> Subscription {
        let id = self.inner.next_id.get() + 1;
        self.inner.next_id.set(id);
        self.inner
            .entries
            .borrow_mut()
            .push((id, room.clone(), on_change));

        let weak: Weak<Listeners> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.entries.borrow_mut().retain(|(lid, _, _)| *lid != id);
            }
        })
    }
}
