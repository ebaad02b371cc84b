#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Compact counted aggregate of memory allocation events observed during a benchmark trial.
//!
//! A benchmark run produces a very large number of allocation events but only a small number of
//! distinct allocation sites. This package collapses repeated events into a counted multiset so
//! that the memory used by the aggregate grows with the number of distinct sites, not with the
//! number of events.
//!
//! The core functionality includes:
//! - [`Allocation`] - One distinct class of allocation event: description, size and call site
//! - [`AllocationLedger`] - Counted aggregate of allocations recorded during one trial
//!
//! Strings that make up allocation descriptions and stack frames are interned by the ledger,
//! so recording the millionth occurrence of a known allocation site allocates nothing new.
//!
//! # Example
//!
//! ```
//! use alloc_ledger::AllocationLedger;
//!
//! let mut ledger = AllocationLedger::new();
//!
//! for _ in 0..1000 {
//!     ledger.record("int[23]", 112, ["bench::run (src/bench.rs:12)", "worker::main (src/worker.rs:40)"]);
//! }
//!
//! ledger.record("Box<u64>", 16, ["bench::run (src/bench.rs:13)"]);
//!
//! assert_eq!(ledger.distinct_allocations(), 2);
//! assert_eq!(ledger.allocation_count(), 1001);
//! assert_eq!(ledger.total_size(), 112 * 1000 + 16);
//! ```
//!
//! # Ownership
//!
//! A ledger is owned by exactly one trial execution context. Concurrent trials each use their
//! own ledger; the type is `Send` so it can be handed to a finalizer on another thread, but
//! recording requires exclusive access.

mod allocation;
mod interner;
mod ledger;

pub use allocation::*;
pub(crate) use interner::*;
pub use ledger::*;
