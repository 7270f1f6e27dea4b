// Telemetry state store: the single latest verified reading plus the accepted-message counter.
// Invariants: replace-and-increment happens in one critical section; readers only see whole states.

use std::sync::{Mutex, MutexGuard, PoisonError};

use soilwatch_core::model::{CountedState, DecryptedReading};

#[derive(Debug, Default)]
pub struct TelemetryStore {
    state: Mutex<CountedState>,
}

impl TelemetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reading's `sequence` is set to the counter value that accepted it.
    pub fn accept(&self, mut reading: DecryptedReading) -> CountedState {
        let mut state = self.lock();
        state.message_count += 1;
        reading.sequence = state.message_count;
        state.reading = Some(reading);
        state.clone()
    }

    pub fn snapshot(&self) -> CountedState {
        self.lock().clone()
    }

    pub fn message_count(&self) -> u64 {
        self.lock().message_count
    }

    fn lock(&self) -> MutexGuard<'_, CountedState> {
        // no await or early return between field writes, so a poisoned state is still whole
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn reading(value: u64) -> DecryptedReading {
        DecryptedReading::new(
            value,
            "soil_moisture".to_string(),
            "%".to_string(),
            format!("{value:02x}"),
            1_000 + value,
        )
    }

    #[test]
    fn starts_empty() {
        let store = TelemetryStore::new();
        let snapshot = store.snapshot();
        assert_eq!(snapshot.message_count, 0);
        assert!(snapshot.reading.is_none());
    }

    #[test]
    fn accept_replaces_reading_and_counts() {
        let store = TelemetryStore::new();
        store.accept(reading(10));
        let state = store.accept(reading(20));

        assert_eq!(state.message_count, 2);
        assert_eq!(state.value(), Some(20));
        assert_eq!(state.reading.as_ref().map(|r| r.sequence), Some(2));
        assert_eq!(store.snapshot(), state);
    }

    #[test]
    fn concurrent_accepts_are_counted_exactly() {
        let store = Arc::new(TelemetryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..250 {
                        store.accept(reading(worker * 1_000 + i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.message_count, 2_000);
        let last = snapshot.reading.unwrap();
        assert_eq!(last.sequence, 2_000);
    }
}
