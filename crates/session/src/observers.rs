use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle returned by [`Observers::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Synchronous callback registry.
///
/// Callbacks run on the notifying task, in subscription order, without any
/// internal lock held, so a callback may subscribe, unsubscribe, or read the
/// state of whatever is notifying it.
pub struct Observers<T> {
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, Callback<T>)>>,
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            callbacks: Mutex::new(Vec::new()),
        }
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish()
    }
}

impl<T> Observers<T> {
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(callback)));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut callbacks = self.lock();
        let before = callbacks.len();
        callbacks.retain(|(cid, _)| *cid != id);
        callbacks.len() != before
    }

    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self.lock().iter().map(|(_, cb)| cb.clone()).collect();
        for cb in snapshot {
            cb(value);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Callback<T>)>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifies_in_order_until_unsubscribed() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let observers = Observers::<u32>::default();

        let s1 = seen.clone();
        let first = observers.subscribe(move |v| s1.lock().unwrap().push(("a", *v)));
        let s2 = seen.clone();
        observers.subscribe(move |v| s2.lock().unwrap().push(("b", *v)));

        observers.notify(&1);
        assert!(observers.unsubscribe(first));
        assert!(!observers.unsubscribe(first));
        observers.notify(&2);

        assert_eq!(*seen.lock().unwrap(), [("a", 1), ("b", 1), ("b", 2)]);
    }

    #[test]
    fn callback_may_subscribe_during_notify() {
        let observers = Arc::new(Observers::<()>::default());
        let inner = observers.clone();
        observers.subscribe(move |_| {
            inner.subscribe(|_| {});
        });
        observers.notify(&());
        assert_eq!(observers.len(), 2);
    }
}
