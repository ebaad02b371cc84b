use std::collections::BTreeSet;
use std::sync::Arc;

use itertools::Itertools;
use tracing::debug;

use crate::{Error, Instrument, InstrumentedMethod, Result, Routine, create_instrumented_method};

/// Computes the instrumented methods to run for a set of instruments and benchmark routines.
///
/// If `requested_names` is empty, every routine is a candidate. Otherwise only routines whose name
/// is requested are candidates. Each candidate routine is paired with every instrument that
/// declares it eligible; pairs an instrument rejects are silently skipped.
///
/// Methods are returned with instruments in configured order and, for each instrument, routines in
/// discovery order.
///
/// # Errors
///
/// Returns [`Error::InvalidBenchmarkNames`] listing every requested name (sorted) that matches
/// none of the routines. Whether any instrument accepts a matching routine is irrelevant here.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use std::sync::Arc;
///
/// use trial_runner::{
///     AllocationInstrument, BenchmarkSuite, Instrument, Routine, RuntimeInstrument,
///     select_instrumented_methods,
/// };
///
/// let suite = BenchmarkSuite::new("strings")
///     .routine(Routine::micro("concat", |_reps| {}))
///     .routine(Routine::macro_benchmark("load_dictionary", || {}));
///
/// let instruments: Vec<Arc<dyn Instrument>> = vec![
///     Arc::new(RuntimeInstrument::new()),
///     Arc::new(AllocationInstrument::new()),
/// ];
///
/// // The allocation instrument does not measure macrobenchmarks.
/// let methods = select_instrumented_methods(&instruments, suite.routines(), &BTreeSet::new())?;
/// assert_eq!(methods.len(), 3);
///
/// let only_concat = BTreeSet::from(["concat".to_string()]);
/// let methods = select_instrumented_methods(&instruments, suite.routines(), &only_concat)?;
/// assert_eq!(methods.len(), 2);
/// # Ok::<(), trial_runner::Error>(())
/// ```
pub fn select_instrumented_methods(
    instruments: &[Arc<dyn Instrument>],
    routines: &[Arc<Routine>],
    requested_names: &BTreeSet<String>,
) -> Result<Vec<InstrumentedMethod>> {
    let invalid_names = requested_names
        .iter()
        .filter(|name| !routines.iter().any(|routine| routine.name() == name.as_str()))
        .sorted()
        .cloned()
        .collect_vec();

    if !invalid_names.is_empty() {
        return Err(Error::InvalidBenchmarkNames {
            names: invalid_names,
        });
    }

    let candidates = routines
        .iter()
        .filter(|routine| requested_names.is_empty() || requested_names.contains(routine.name()))
        .collect_vec();

    let methods = instruments
        .iter()
        .flat_map(|instrument| {
            candidates
                .iter()
                .filter(|routine| instrument.is_eligible(routine))
                .map(|routine| create_instrumented_method(instrument, routine))
        })
        .collect_vec();

    debug!(
        instruments = instruments.len(),
        routines = routines.len(),
        requested = requested_names.len(),
        selected = methods.len(),
        "selected instrumented methods"
    );

    Ok(methods)
}
