//! Contract for stateful components stored in a checkpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::{Serialize, de::DeserializeOwned};

use crate::blob::Blob;
use crate::error::OwnerError;

/// A stateful component whose state is saved into and restored from checkpoints.
///
/// Owners are shared with the coordinator through `Arc`, so both methods take
/// `&self` and implementations rely on interior mutability.
///
/// - `save` must be a pure snapshot of the current state.
/// - `load` replaces the state and may fail on malformed input.
pub trait Owner: Send + Sync {
    fn save(&self) -> Result<Blob, OwnerError>;

    fn load(&self, blob: Blob) -> Result<(), OwnerError>;

    /// Step number used to name rotated checkpoint files.
    ///
    /// Only the entry registered under [`crate::STEP_KEY`] is consulted.
    fn step(&self) -> Option<u64> {
        None
    }
}

/// Monotonic step counter, typically registered as the `step` entry.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new(initial: u64) -> Self {
        Self {
            value: AtomicU64::new(initial),
        }
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Increment by `by` and return the new value.
    pub fn increment(&self, by: u64) -> u64 {
        self.value.fetch_add(by, Ordering::SeqCst) + by
    }
}

impl Owner for Counter {
    fn save(&self) -> Result<Blob, OwnerError> {
        Blob::encode(&self.get())
    }

    fn load(&self, blob: Blob) -> Result<(), OwnerError> {
        self.set(blob.decode()?);
        Ok(())
    }

    fn step(&self) -> Option<u64> {
        Some(self.get())
    }
}

/// Any serde value behind a lock, saved with bincode.
#[derive(Debug, Default)]
pub struct Value<T> {
    inner: RwLock<T>,
}

impl<T> Value<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: RwLock::new(value),
        }
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set(&self, value: T) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Mutate the value in place.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<T> Owner for Value<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn save(&self) -> Result<Blob, OwnerError> {
        let guard = self.inner.read().map_err(|_| "value lock was poisoned")?;
        Blob::encode(&*guard)
    }

    fn load(&self, blob: Blob) -> Result<(), OwnerError> {
        let value: T = blob.decode()?;
        let mut guard = self.inner.write().map_err(|_| "value lock was poisoned")?;
        *guard = value;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_roundtrip_and_step() {
        let counter = Counter::new(7);
        assert_eq!(counter.increment(3), 10);
        let blob = counter.save().unwrap();

        let restored = Counter::default();
        restored.load(blob).unwrap();
        assert_eq!(restored.get(), 10);
        assert_eq!(restored.step(), Some(10));
    }

    #[test]
    fn test_value_roundtrip() {
        let weights = Value::new(vec![1.0f64, 2.0, 3.0]);
        weights.update(|w| w.push(4.0));
        let blob = weights.save().unwrap();

        let restored = Value::new(Vec::<f64>::new());
        restored.load(blob).unwrap();
        assert_eq!(restored.get(), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(restored.step(), None);
    }

    #[test]
    fn test_value_rejects_malformed_blob() {
        let value = Value::new(String::from("unchanged"));
        assert!(value.load(Blob::new(vec![0xff])).is_err());
        assert_eq!(value.get(), "unchanged");
    }
}
