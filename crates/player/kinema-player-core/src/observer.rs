//! Ordered, fail-soft notification fan-out.
//!
//! The bus never owns a listener: it keeps a [`Weak`] back-reference per subscription,
//! so dropping the host's `Arc` is as good as unsubscribing. Each `emit` dispatches to
//! a snapshot taken before the first callback runs; subscribing or unsubscribing from
//! inside a callback takes effect from the next event on. A panicking listener is
//! isolated and reported to the remaining listeners through [`ObserverSink::on_fault`].

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle returned by [`ObserverBus::subscribe`].
    pub struct SubscriptionId;
}

/// A listener that faulted while handling an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerFault {
    pub subscription: SubscriptionId,
    pub message: String,
}

/// Receiver of notifications of type `E`.
pub trait ObserverSink<E>: Send + Sync {
    fn on_event(&self, event: &E);

    /// Another listener faulted during the dispatch that just finished.
    fn on_fault(&self, _fault: &ListenerFault) {}
}

impl<E, F> ObserverSink<E> for F
where
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        self(event)
    }
}

struct Entry<E> {
    order: u64,
    sink: Weak<dyn ObserverSink<E>>,
}

struct Table<E> {
    entries: SlotMap<SubscriptionId, Entry<E>>,
    next_order: u64,
}

pub struct ObserverBus<E> {
    table: Mutex<Table<E>>,
}

impl<E> Default for ObserverBus<E> {
    fn default() -> Self {
        Self {
            table: Mutex::new(Table {
                entries: SlotMap::with_key(),
                next_order: 0,
            }),
        }
    }
}

impl<E: 'static> std::fmt::Debug for ObserverBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "listener panicked".to_string()
    }
}

impl<E: 'static> ObserverBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. The caller keeps ownership of `sink`.
    pub fn subscribe<S>(&self, sink: &Arc<S>) -> SubscriptionId
    where
        S: ObserverSink<E> + 'static,
    {
        let sink: Arc<dyn ObserverSink<E>> = sink.clone();
        let mut table = self.table.lock();
        let order = table.next_order;
        table.next_order += 1;
        table.entries.insert(Entry {
            order,
            sink: Arc::downgrade(&sink),
        })
    }

    /// Remove a listener. Returns false when the handle is unknown or already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.table.lock().entries.remove(id).is_some()
    }

    /// Live listeners; dropped ones are not counted.
    pub fn listener_count(&self) -> usize {
        self.table
            .lock()
            .entries
            .values()
            .filter(|e| e.sink.strong_count() > 0)
            .count()
    }

    pub fn clear(&self) {
        self.table.lock().entries.clear();
    }

    /// Snapshot of live listeners in subscription order. Prunes dropped ones.
    fn snapshot(&self) -> Vec<(SubscriptionId, Arc<dyn ObserverSink<E>>)> {
        let mut table = self.table.lock();
        table.entries.retain(|_, e| e.sink.strong_count() > 0);
        let mut live: Vec<_> = table
            .entries
            .iter()
            .filter_map(|(id, e)| e.sink.upgrade().map(|s| (e.order, id, s)))
            .collect();
        live.sort_by_key(|(order, _, _)| *order);
        live.into_iter().map(|(_, id, s)| (id, s)).collect()
    }

    /// Deliver `event` to every listener subscribed before this call.
    /// Returns the faults raised during delivery.
    pub fn emit(&self, event: &E) -> Vec<ListenerFault> {
        let listeners = self.snapshot();
        let mut faults = Vec::new();
        for (id, sink) in &listeners {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| sink.on_event(event))) {
                let message = panic_message(payload.as_ref());
                log::warn!("listener {id:?} panicked: {message}");
                faults.push(ListenerFault {
                    subscription: *id,
                    message,
                });
            }
        }
        for fault in &faults {
            for (id, sink) in &listeners {
                if *id == fault.subscription {
                    continue;
                }
                let _ = catch_unwind(AssertUnwindSafe(|| sink.on_fault(fault)));
            }
        }
        faults
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> Arc<impl ObserverSink<u32>> {
        let log = log.clone();
        Arc::new(move |e: &u32| log.lock().push(format!("{tag}:{e}")))
    }

    #[test]
    fn delivers_in_subscription_order() {
        let bus = ObserverBus::<u32>::new();
        let log: Log = Arc::default();
        let a = recorder(&log, "a");
        let b = recorder(&log, "b");
        bus.subscribe(&a);
        bus.subscribe(&b);
        bus.emit(&1);
        bus.emit(&2);
        assert_eq!(*log.lock(), vec!["a:1", "b:1", "a:2", "b:2"]);
    }

    #[test]
    fn dropped_listener_is_pruned() {
        let bus = ObserverBus::<u32>::new();
        let log: Log = Arc::default();
        let a = recorder(&log, "a");
        bus.subscribe(&a);
        assert_eq!(bus.listener_count(), 1);
        drop(a);
        assert_eq!(bus.listener_count(), 0);
        bus.emit(&1);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn debug_reports_live_listener_count() {
        let bus = ObserverBus::<u32>::new();
        let log: Log = Arc::default();
        let a = recorder(&log, "a");
        bus.subscribe(&a);
        assert_eq!(format!("{bus:?}"), "ObserverBus { listeners: 1 }");
    }

    #[test]
    fn unsubscribe_twice_reports_false() {
        let bus = ObserverBus::<u32>::new();
        let log: Log = Arc::default();
        let a = recorder(&log, "a");
        let id = bus.subscribe(&a);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
    }

    struct Faulty;

    impl ObserverSink<u32> for Faulty {
        fn on_event(&self, _event: &u32) {
            panic!("boom");
        }
    }

    struct FaultWatcher {
        seen: Mutex<Vec<u32>>,
        faults: Mutex<Vec<String>>,
    }

    impl ObserverSink<u32> for FaultWatcher {
        fn on_event(&self, event: &u32) {
            self.seen.lock().push(*event);
        }

        fn on_fault(&self, fault: &ListenerFault) {
            self.faults.lock().push(fault.message.clone());
        }
    }

    #[test]
    fn panicking_listener_does_not_stop_dispatch() {
        let bus = ObserverBus::<u32>::new();
        let faulty = Arc::new(Faulty);
        let watcher = Arc::new(FaultWatcher {
            seen: Mutex::new(Vec::new()),
            faults: Mutex::new(Vec::new()),
        });
        let faulty_id = bus.subscribe(&faulty);
        bus.subscribe(&watcher);
        let faults = bus.emit(&7);
        assert_eq!(faults.len(), 1);
        assert_eq!(faults[0].subscription, faulty_id);
        assert_eq!(*watcher.seen.lock(), vec![7]);
        assert_eq!(*watcher.faults.lock(), vec!["boom".to_string()]);
    }
}
