use std::fmt;
use std::sync::Arc;

/// One distinct class of memory allocation event performed by a benchmark.
///
/// An allocation is identified by a human-readable description of what was allocated (e.g.
/// `[u32; 23]`, `Box<u64>` or `Vec<u8>`), the size of the allocation in bytes and the
/// location of the allocation as a sequence of stack frames, innermost frame first.
///
/// Two allocations are equal if their description, size and full location are equal, regardless
/// of which ledger or which event produced them.
///
/// Instances are created by [`AllocationLedger::record()`][crate::AllocationLedger::record], which
/// interns the strings they are made of. Cloning an allocation only touches reference counts.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Allocation {
    description: Arc<str>,
    size: u64,
    location: Arc<[Arc<str>]>,
}

impl Allocation {
    pub(crate) fn new(description: Arc<str>, size: u64, location: Arc<[Arc<str>]>) -> Self {
        Self {
            description,
            size,
            location,
        }
    }

    /// Human-readable description of what was allocated.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Size of one such allocation, in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Stack frames of the allocation site, innermost frame first.
    #[must_use]
    pub fn location(&self) -> &[Arc<str>] {
        &self.location
    }

    /// Returns the total number of bytes represented by a set of counted allocations.
    ///
    /// Each item is an allocation and the number of times it occurred.
    ///
    /// # Panics
    ///
    /// Panics if the total does not fit in `u64`, which would indicate an unrealistic scenario.
    #[must_use]
    pub fn total_size<'a>(counted: impl IntoIterator<Item = (&'a Self, u64)>) -> u64 {
        counted.into_iter().fold(0_u64, |total, (allocation, count)| {
            let bytes = allocation
                .size
                .checked_mul(count)
                .expect("size * count overflows u64 - this indicates an unrealistic scenario");

            total
                .checked_add(bytes)
                .expect("total allocation size overflows u64 - this indicates an unrealistic scenario")
        })
    }

    // Used by tests to verify that interned storage is shared between allocations.
    #[cfg(test)]
    pub(crate) fn description_arc(&self) -> &Arc<str> {
        &self.description
    }

    #[cfg(test)]
    pub(crate) fn location_arc(&self) -> &Arc<[Arc<str>]> {
        &self.location
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.description, self.size)?;

        for frame in self.location.iter() {
            write!(f, "\n\tat {frame}")?;
        }

        Ok(())
    }
}
