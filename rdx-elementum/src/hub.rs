//! The synchronous signal hub that mediates all cross-component traffic.

use crate::common::SubscriptionId;
use crate::events::{GameEvent, Topic};
use slotmap::SlotMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace};

/// A shared handler invoked for every event on the topic it is subscribed to.
///
/// Handlers own their error policy: the hub never retries or inspects the
/// outcome of a call.
pub type Handler = Rc<dyn Fn(&GameEvent)>;

struct Subscriber {
    topic: Topic,
    handler: Handler,
    /// Live `Subscription` guards pointing at this entry.
    holds: usize,
}

#[derive(Default)]
struct Registry {
    subscribers: SlotMap<SubscriptionId, Subscriber>,
    topics: HashMap<Topic, Vec<SubscriptionId>>,
}

impl Registry {
    fn remove(&mut self, id: SubscriptionId) -> Option<Subscriber> {
        let removed = self.subscribers.remove(id)?;
        if let Some(ids) = self.topics.get_mut(&removed.topic) {
            ids.retain(|other| *other != id);
        }
        Some(removed)
    }

    fn release(&mut self, id: SubscriptionId) -> Option<Subscriber> {
        let subscriber = self.subscribers.get_mut(id)?;
        subscriber.holds = subscriber.holds.saturating_sub(1);
        if subscriber.holds == 0 {
            self.remove(id)
        } else {
            None
        }
    }
}

/// The Elementum signal hub.
///
/// Publishing an event synchronously invokes every handler currently
/// subscribed to its topic, in subscription order, before `publish` returns.
/// The hub is cheap to clone; clones share the same subscriber lists. It is
/// deliberately `!Send`: all dispatch happens on one thread.
#[derive(Clone, Default)]
pub struct EventHub {
    registry: Rc<RefCell<Registry>>,
}

/// A non-owning reference to an `EventHub`, held by handlers that publish.
#[derive(Clone, Default)]
pub struct WeakEventHub {
    registry: Weak<RefCell<Registry>>,
}

impl WeakEventHub {
    pub fn upgrade(&self) -> Option<EventHub> {
        self.registry.upgrade().map(|registry| EventHub { registry })
    }
}

/// A scoped registration on the hub.
///
/// Dropping the guard unsubscribes its handler. Guards only hold a weak
/// reference to the hub, so they may safely outlive it.
#[must_use = "dropping a Subscription immediately unsubscribes its handler"]
pub struct Subscription {
    id: SubscriptionId,
    topic: Topic,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Whether the handler is still registered (teardown clears it).
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.borrow().subscribers.contains_key(self.id))
    }

    /// Releases the subscription now instead of at the end of scope.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        // The removed handler may own guards of its own; drop it unborrowed.
        let released = registry.borrow_mut().release(self.id);
        if released.is_some() {
            trace!("Subscription {:?} on '{}' released.", self.id, self.topic);
        }
        drop(released);
    }
}

// Core implementation block for dispatch.
impl EventHub {
    /// Creates an empty hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a weak handle that does not keep the subscriber lists alive.
    pub fn downgrade(&self) -> WeakEventHub {
        WeakEventHub {
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Dispatches `event` to every handler subscribed to its topic.
    ///
    /// The handler list is snapshotted up front, so handlers are free to
    /// publish, subscribe or unsubscribe. A handler released by an earlier
    /// handler in the same dispatch is skipped. Zero subscribers is a no-op.
    pub fn publish(&self, event: GameEvent) {
        let topic = event.topic();
        let targets: Vec<(SubscriptionId, Handler)> = {
            let registry = self.registry.borrow();
            registry
                .topics
                .get(&topic)
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| {
                            registry
                                .subscribers
                                .get(*id)
                                .map(|subscriber| (*id, Rc::clone(&subscriber.handler)))
                        })
                        .collect()
                })
                .unwrap_or_default()
        };

        if targets.is_empty() {
            trace!("No subscribers for '{}'.", topic);
            return;
        }
        trace!("Dispatching {:?} to {} handler(s).", event, targets.len());

        for (id, handler) in targets {
            if !self.registry.borrow().subscribers.contains_key(id) {
                continue;
            }
            handler(&event);
        }
    }

    /// Drops every subscriber on every topic.
    ///
    /// Run this before discarding the components of a run so that a stale hub
    /// never calls into destroyed state. Outstanding `Subscription` guards
    /// become inert.
    pub fn teardown(&self) {
        let cleared = std::mem::take(&mut *self.registry.borrow_mut());
        let count = cleared.subscribers.len();
        drop(cleared);
        info!("EventHub torn down; {} subscriber(s) cleared.", count);
    }
}

// Public API implementation block.
impl EventHub {
    /// Subscribes a shared `handler` to `topic`.
    ///
    /// Subscribing the same `Rc` handler to the same topic again does not add
    /// a second dispatch; the returned guard refers to the existing entry,
    /// which stays registered until every guard for it is released.
    pub fn subscribe(&self, topic: Topic, handler: Handler) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let existing = registry.topics.get(&topic).and_then(|ids| {
            ids.iter().copied().find(|id| {
                registry
                    .subscribers
                    .get(*id)
                    .is_some_and(|subscriber| Rc::ptr_eq(&subscriber.handler, &handler))
            })
        });

        let id = match existing {
            Some(id) => {
                if let Some(subscriber) = registry.subscribers.get_mut(id) {
                    subscriber.holds += 1;
                }
                debug!("Handler already subscribed to '{}' as {:?}.", topic, id);
                id
            }
            None => {
                let id = registry.subscribers.insert(Subscriber {
                    topic,
                    handler,
                    holds: 1,
                });
                registry.topics.entry(topic).or_default().push(id);
                debug!("Subscribed {:?} to '{}'.", id, topic);
                id
            }
        };

        Subscription {
            id,
            topic,
            registry: Rc::downgrade(&self.registry),
        }
    }

    /// Convenience for subscribing a closure.
    pub fn on(&self, topic: Topic, handler: impl Fn(&GameEvent) + 'static) -> Subscription {
        self.subscribe(topic, Rc::new(handler))
    }

    /// Removes a subscriber regardless of outstanding guards.
    ///
    /// Returns `true` if the id was registered. Unknown or stale ids are
    /// ignored, so redundant calls are safe.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.borrow_mut().remove(id);
        let was_removed = removed.is_some();
        drop(removed);
        if was_removed {
            debug!("Unsubscribed {:?}.", id);
        }
        was_removed
    }

    /// Number of handlers currently subscribed to `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.registry
            .borrow()
            .topics
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Number of handlers across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }
}
