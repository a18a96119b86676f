// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Memoized value tagged with the input generation it was computed from.

use std::sync::Arc;

use parking_lot::RwLock;

/// Holds at most one computed value; a lookup with a different generation
/// recomputes.
#[derive(Debug)]
pub struct GenerationCache<T> {
    slot: RwLock<Option<(u64, Arc<T>)>>,
}

impl<T> Default for GenerationCache<T> {
    fn default() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

impl<T> GenerationCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value if it was computed for `generation`
    pub fn get(&self, generation: u64) -> Option<Arc<T>> {
        match &*self.slot.read() {
            Some((cached, value)) if *cached == generation => Some(Arc::clone(value)),
            _ => None,
        }
    }

    /// Return the value for `generation`, computing it on a miss.
    ///
    /// A failed computation leaves the cache as it was.
    pub fn get_or_try_insert<E>(
        &self,
        generation: u64,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.get(generation) {
            return Ok(value);
        }
        let value = Arc::new(compute()?);
        *self.slot.write() = Some((generation, Arc::clone(&value)));
        Ok(value)
    }

    pub fn invalidate(&self) {
        *self.slot.write() = None;
    }

    pub fn is_populated(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_recomputes_on_new_generation() {
        let cache = GenerationCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>(calls.get())
        };

        assert_eq!(*cache.get_or_try_insert(0, compute).unwrap(), 1);
        assert_eq!(*cache.get_or_try_insert(0, compute).unwrap(), 1);
        assert_eq!(*cache.get_or_try_insert(1, compute).unwrap(), 2);
        assert!(cache.get(0).is_none());
    }

    #[test]
    fn test_failure_keeps_previous_value() {
        let cache = GenerationCache::new();
        cache.get_or_try_insert(3, || Ok::<_, &str>(7)).unwrap();
        assert!(cache.get_or_try_insert(4, || Err("boom")).is_err());
        assert_eq!(cache.get(3).as_deref(), Some(&7));

        cache.invalidate();
        assert!(!cache.is_populated());
    }
}
