//! [`Observers`] of state changes.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;

/// Callback invoked on every change of a `T` value.
type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// List of callbacks notified of changes in subscription order.
pub(crate) struct Observers<T> {
    /// Subscribed callbacks along with their [`Subscription`]s.
    list: Mutex<Vec<(Subscription, Callback<T>)>>,

    /// Counter of handed out [`Subscription`]s.
    last_id: AtomicU64,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            list: Mutex::new(Vec::new()),
            last_id: AtomicU64::new(0),
        }
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.list.lock().len())
            .finish_non_exhaustive()
    }
}

impl<T> Observers<T> {
    /// Subscribes the provided callback.
    pub(crate) fn subscribe(
        &self,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> Subscription {
        let sub = Subscription(self.last_id.fetch_add(1, Ordering::Relaxed));
        self.list.lock().push((sub, Arc::new(callback)));
        sub
    }

    /// Unsubscribes the callback of the provided [`Subscription`].
    ///
    /// Returns `false` if it has been unsubscribed already.
    pub(crate) fn unsubscribe(&self, sub: Subscription) -> bool {
        let mut list = self.list.lock();
        let len = list.len();
        list.retain(|(s, _)| *s != sub);
        list.len() != len
    }

    /// Notifies every subscribed callback about the provided `value`.
    ///
    /// Callbacks are invoked outside the lock, so they may (un)subscribe.
    pub(crate) fn notify(&self, value: &T) {
        let callbacks = self
            .list
            .lock()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect::<Vec<_>>();
        for cb in callbacks {
            cb(value);
        }
    }
}

/// Handle of a subscribed callback, used to unsubscribe it.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Subscription(u64);

#[cfg(test)]
mod spec {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::Observers;

    #[test]
    fn notifies_in_subscription_order() {
        let observers = Observers::<u8>::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for n in 0..3 {
            let seen = Arc::clone(&seen);
            _ = observers.subscribe(move |v| seen.lock().push((n, *v)));
        }

        observers.notify(&7);

        assert_eq!(*seen.lock(), [(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn stops_notifying_once_unsubscribed() {
        let observers = Observers::<u8>::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let first = {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |v| seen.lock().push(("first", *v)))
        };
        {
            let seen = Arc::clone(&seen);
            _ = observers.subscribe(move |v| seen.lock().push(("second", *v)));
        }

        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));
        observers.notify(&1);

        assert_eq!(*seen.lock(), [("second", 1)]);
    }
}
