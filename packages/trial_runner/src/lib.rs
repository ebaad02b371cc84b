#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Trial execution and measurement collection core of a benchmark harness.
//!
//! A harness run measures the benchmark routines of a [`BenchmarkSuite`] with one or more
//! [`Instrument`]s. Each pairing of an instrument with a routine it is able to measure is an
//! [`InstrumentedMethod`], the unit of scheduling. Running an instrumented method in a worker
//! produces a stream of [`LogMessage`]s, which the instrument's [`MeasurementCollector`] turns into
//! a finalized [`Trial`]. Trials are then delivered to every configured [`ResultProcessor`].
//!
//! The core functionality includes:
//! - [`select_instrumented_methods()`] - Maps instruments onto routines, optionally restricted to
//!   an allow-list of routine names
//! - [`RuntimeInstrument`] and [`AllocationInstrument`] - Built-in measurement strategies
//! - [`LogMessageParser`] - Parses the line-based worker message protocol
//! - [`collect_trial()`] - Turns worker messages into a [`Trial`]
//! - [`create_result_processor()`] - Instantiates result processors with a deterministic
//!   constructor selection policy
//! - [`ResultProcessorSet`] - Delivers trials to result processors and closes each exactly once
//! - [`RunConfig`] and [`RunPlan`] - TOML configuration of a run and the plan prepared from it
//!
//! Memory allocations observed by the [`AllocationInstrument`] are aggregated with
//! [`alloc_ledger::AllocationLedger`].
//!
//! # Example
//!
//! ```
//! use std::hint::black_box;
//!
//! use trial_runner::{
//!     BenchmarkSuite, LogMessageParser, Parser, ProcessorRegistry, Routine, RunConfig, RunPlan,
//!     TrialId, collect_trial,
//! };
//!
//! let suite = BenchmarkSuite::new("collections").routine(Routine::micro("vec_push", |reps| {
//!     for _ in 0..reps {
//!         black_box(vec![1, 2, 3]);
//!     }
//! }));
//!
//! let config = RunConfig::from_toml_str(
//!     r#"
//!     instruments = ["allocation"]
//!
//!     [results.log]
//!     class = "trial_runner::LoggingResultProcessor"
//!     "#,
//! )?;
//!
//! let plan = RunPlan::prepare(&config, &suite, &ProcessorRegistry::with_builtins())?;
//! let (methods, mut processors) = plan.into_parts();
//!
//! // This output would come from a worker process executing the routine.
//! let worker_output = ["start", "alloc\t24\tVec<i32>\tbench::vec_push", "stop\t1\t180"];
//!
//! let parser = LogMessageParser::new();
//! let messages = worker_output
//!     .iter()
//!     .map(|line| parser.parse(line))
//!     .collect::<Result<Vec<_>, _>>()?;
//!
//! let method = methods.first().expect("the allocation instrument measures vec_push");
//! let trial = collect_trial(TrialId::new(0), method, messages)?;
//!
//! processors.process_trial(&trial)?;
//! processors.close()?;
//! # Ok::<(), trial_runner::Error>(())
//! ```

mod allocation_instrument;
mod collection;
mod config;
mod error;
mod instrument;
mod log_message;
mod processor_config;
mod processor_creator;
mod result_processor;
mod routine;
mod run_plan;
mod runtime_instrument;
mod selection;
mod trial;

pub use allocation_instrument::*;
pub use collection::*;
pub use config::*;
pub use error::*;
pub use instrument::*;
pub use log_message::*;
pub use processor_config::*;
pub use processor_creator::*;
pub use result_processor::*;
pub use routine::*;
pub use run_plan::*;
pub use runtime_instrument::*;
pub use selection::*;
pub use trial::*;
