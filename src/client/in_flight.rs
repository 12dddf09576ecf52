use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Booking ids with a charge currently outstanding in this process.
///
/// Advisory only: it stops a double click from charging twice, it does not
/// coordinate between processes.
#[derive(Debug, Default)]
pub struct InFlightCharges {
    ids: Mutex<HashSet<String>>,
}

impl InFlightCharges {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks `booking_id` as in flight. Returns `None` if it already is.
    /// The id is released when the returned guard is dropped.
    pub fn try_acquire(self: &Arc<Self>, booking_id: &str) -> Option<InFlightGuard> {
        if !self.lock().insert(booking_id.to_string()) {
            return None;
        }

        Some(InFlightGuard {
            set: Arc::clone(self),
            booking_id: booking_id.to_string(),
        })
    }

    pub fn contains(&self, booking_id: &str) -> bool {
        self.lock().contains(booking_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    set: Arc<InFlightCharges>,
    booking_id: String,
}

impl InFlightGuard {
    pub fn booking_id(&self) -> &str {
        &self.booking_id
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.booking_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_until_release() {
        let set = InFlightCharges::new();

        let guard = set.try_acquire("b-1").expect("first acquire");
        assert!(set.try_acquire("b-1").is_none());
        assert!(set.try_acquire("b-2").is_some());
        assert!(set.contains("b-1"));

        drop(guard);
        assert!(!set.contains("b-1"));
        assert!(set.try_acquire("b-1").is_some());
    }

    #[test]
    fn released_on_panic() {
        let set = InFlightCharges::new();
        let cloned = Arc::clone(&set);

        let result = std::panic::catch_unwind(move || {
            let _guard = cloned.try_acquire("b-9").unwrap();
            panic!("charge blew up");
        });

        assert!(result.is_err());
        assert!(set.is_empty());
    }
}
