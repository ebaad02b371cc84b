use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::{LogMessage, Measurement, Routine};

/// Whether trials measured by an instrument may execute their measured regions concurrently.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TrialSchedulingPolicy {
    /// No two trials of the instrument may run their measured regions at the same time, as
    /// concurrent activity would distort the measurement.
    Serial,

    /// Trials of the instrument may run concurrently.
    Parallel,
}

/// A measurement strategy that can be applied to benchmark routines.
///
/// Instruments are constructed once per harness run from configuration and are shared read-only
/// by every trial afterwards. The scheduling policy of an instrument is fixed when it is
/// constructed.
#[cfg_attr(test, mockall::automock)]
pub trait Instrument: fmt::Debug + Send + Sync {
    /// Name of the instrument, as used in configuration and in trial records.
    fn name(&self) -> &'static str;

    /// Whether the instrument is able to measure the routine.
    ///
    /// Rejecting a routine is not an error, the pair is simply not measured.
    fn is_eligible(&self, routine: &Routine) -> bool;

    /// Whether trials measured by this instrument may run concurrently.
    fn scheduling_policy(&self) -> TrialSchedulingPolicy;

    /// Creates a fresh collector for the measurements of one trial.
    ///
    /// Every trial gets its own collector, so collectors never need to be shared between threads.
    fn measurement_collector(&self) -> Box<dyn MeasurementCollector>;
}

/// Consumes the log messages a worker emits for one trial and turns them into measurements.
pub trait MeasurementCollector: fmt::Debug + Send {
    /// Inspects one log message emitted by the worker.
    fn visit(&mut self, message: &LogMessage);

    /// Whether the collector has all the measurements it needs for the trial.
    fn is_done(&self) -> bool;

    /// Returns the collected measurements, consuming the collector.
    fn into_measurements(self: Box<Self>) -> Vec<Measurement>;
}

/// The pairing of one instrument with one benchmark routine, the unit of scheduling.
///
/// Two instrumented methods are equal if they pair the same instrument instance with the same
/// routine. Methods that pair different instruments with the same routine are distinct and are
/// both measured.
#[derive(Clone, Debug)]
pub struct InstrumentedMethod {
    instrument: Arc<dyn Instrument>,
    routine: Arc<Routine>,
}

impl InstrumentedMethod {
    /// The instrument that measures the routine.
    #[must_use]
    pub fn instrument(&self) -> &Arc<dyn Instrument> {
        &self.instrument
    }

    /// The routine being measured.
    #[must_use]
    pub fn routine(&self) -> &Arc<Routine> {
        &self.routine
    }

    /// The scheduling policy declared by the instrument.
    #[must_use]
    pub fn scheduling_policy(&self) -> TrialSchedulingPolicy {
        self.instrument.scheduling_policy()
    }

    /// Creates a fresh collector for the measurements of one trial of this method.
    #[must_use]
    pub fn measurement_collector(&self) -> Box<dyn MeasurementCollector> {
        self.instrument.measurement_collector()
    }

    fn instrument_address(&self) -> *const () {
        Arc::as_ptr(&self.instrument).cast::<()>()
    }
}

impl PartialEq for InstrumentedMethod {
    fn eq(&self, other: &Self) -> bool {
        self.instrument_address() == other.instrument_address() && self.routine == other.routine
    }
}

impl Eq for InstrumentedMethod {}

impl Hash for InstrumentedMethod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instrument_address().hash(state);
        self.routine.hash(state);
    }
}

impl fmt::Display for InstrumentedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.instrument.name(), self.routine.name())
    }
}

/// Pairs an instrument with a routine for measurement.
///
/// Eligibility is not checked here, see [`select_instrumented_methods()`][crate::select_instrumented_methods]
/// for selecting only the pairs an instrument accepts.
#[must_use]
pub fn create_instrumented_method(
    instrument: &Arc<dyn Instrument>,
    routine: &Arc<Routine>,
) -> InstrumentedMethod {
    InstrumentedMethod {
        instrument: Arc::clone(instrument),
        routine: Arc::clone(routine),
    }
}
