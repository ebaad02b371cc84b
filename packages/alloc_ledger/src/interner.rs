//! Deduplication of the strings that allocations are made of.

use std::sync::Arc;

use foldhash::HashSet;

/// Hands out shared instances of structurally equal strings and frame sequences.
///
/// A benchmark has few distinct stack frames and descriptions but may record them millions of
/// times, so each distinct value is stored exactly once and handed out by reference count.
/// Interned values are retained for the lifetime of the interner.
#[derive(Debug, Default)]
pub(crate) struct Interner {
    strings: HashSet<Arc<str>>,
    locations: HashSet<Arc<[Arc<str>]>>,
}

impl Interner {
    /// Returns the shared instance of `value`, storing it first if it was not seen before.
    pub(crate) fn intern_str(&mut self, value: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(value) {
            return Arc::clone(existing);
        }

        let interned: Arc<str> = Arc::from(value);
        self.strings.insert(Arc::clone(&interned));
        interned
    }

    /// Returns the shared instance of a frame sequence whose frames are already interned.
    pub(crate) fn intern_location(&mut self, frames: &[Arc<str>]) -> Arc<[Arc<str>]> {
        if let Some(existing) = self.locations.get(frames) {
            return Arc::clone(existing);
        }

        let interned: Arc<[Arc<str>]> = Arc::from(frames);
        self.locations.insert(Arc::clone(&interned));
        interned
    }

    /// Number of distinct strings stored.
    pub(crate) fn string_count(&self) -> usize {
        self.strings.len()
    }
}
