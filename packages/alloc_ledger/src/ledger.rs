use std::sync::Arc;

use foldhash::HashMap;

use crate::{Allocation, Interner};

/// Counted aggregate of the allocations recorded during one benchmark trial.
///
/// Every call to [`record()`][Self::record] adds one occurrence of an allocation. Occurrences of
/// structurally equal allocations collapse into a single entry with a count, so the ledger grows
/// with the number of distinct allocation sites rather than the number of events.
///
/// The ledger has exactly one writer (the allocation tracking hook of the trial) and is read once
/// when the trial is finalized, after recording has stopped.
///
/// # Examples
///
/// ```
/// use alloc_ledger::AllocationLedger;
///
/// let mut ledger = AllocationLedger::new();
/// ledger.record("Vec<u8>", 64, ["bench::encode", "bench::main"]);
/// ledger.record("Vec<u8>", 64, ["bench::encode", "bench::main"]);
///
/// assert_eq!(ledger.distinct_allocations(), 1);
/// assert_eq!(ledger.total_size(), 128);
/// ```
#[derive(Debug, Default)]
pub struct AllocationLedger {
    counts: HashMap<Allocation, u64>,
    interner: Interner,

    // Reused between calls to `record()` so that recording a known site does not allocate.
    frames_scratch: Vec<Arc<str>>,
}

impl AllocationLedger {
    /// Creates an empty ledger.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one occurrence of an allocation.
    ///
    /// `location` is the stack of the allocation site, innermost frame first.
    ///
    /// # Panics
    ///
    /// Panics if the occurrence count of a single allocation overflows `u64`, which would
    /// indicate an unrealistic scenario.
    pub fn record<I>(&mut self, description: &str, size: u64, location: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let description = self.interner.intern_str(description);

        self.frames_scratch.clear();
        for frame in location {
            let frame = self.interner.intern_str(frame.as_ref());
            self.frames_scratch.push(frame);
        }

        let location = self.interner.intern_location(&self.frames_scratch);
        self.frames_scratch.clear();

        let count = self
            .counts
            .entry(Allocation::new(description, size, location))
            .or_insert(0);

        *count = count
            .checked_add(1)
            .expect("allocation count overflows u64 - this indicates an unrealistic scenario");
    }

    /// Total number of bytes allocated across all recorded occurrences.
    ///
    /// This is calculated on demand by a single pass over the distinct allocations.
    ///
    /// # Panics
    ///
    /// Panics if the total does not fit in `u64`, which would indicate an unrealistic scenario.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        Allocation::total_size(self.entries())
    }

    /// Total number of recorded occurrences, including repeated ones.
    ///
    /// # Panics
    ///
    /// Panics if the total does not fit in `u64`, which would indicate an unrealistic scenario.
    #[must_use]
    pub fn allocation_count(&self) -> u64 {
        self.counts.values().fold(0_u64, |total, count| {
            total
                .checked_add(*count)
                .expect("allocation count overflows u64 - this indicates an unrealistic scenario")
        })
    }

    /// Number of distinct allocations held by the ledger.
    #[must_use]
    pub fn distinct_allocations(&self) -> usize {
        self.counts.len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct description and frame strings stored by the ledger.
    ///
    /// This stays constant when already seen allocation sites are recorded again.
    #[must_use]
    pub fn interned_strings(&self) -> usize {
        self.interner.string_count()
    }

    /// Iterates over the distinct allocations and their occurrence counts, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (&Allocation, u64)> {
        self.counts
            .iter()
            .map(|(allocation, count)| (allocation, *count))
    }
}
