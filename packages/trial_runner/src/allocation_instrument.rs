use std::collections::BTreeMap;
use std::num::NonZero;

use alloc_ledger::AllocationLedger;

use crate::{
    BENCHMARK_MARKER, Error, Instrument, LogMessage, Measurement, MeasurementCollector, Routine,
    TrialSchedulingPolicy, parse_measurements_option,
};

const DEFAULT_MEASUREMENTS: NonZero<u32> = NonZero::new(1).unwrap();

/// Measures the memory allocations performed in the measured region of a routine.
///
/// Allocation counts are not distorted by concurrent activity in other trials, so trials of this
/// instrument may be scheduled in parallel. Each trial aggregates its allocation events in its
/// own [`AllocationLedger`].
///
/// Only routines that loop over a repetition count are eligible, as the allocations of a
/// long-running macrobenchmark are too numerous to report one by one.
///
/// Options:
///
/// * `measurements` - number of measured regions per trial (default 1).
#[derive(Debug)]
pub struct AllocationInstrument {
    measurements: NonZero<u32>,
}

impl AllocationInstrument {
    /// Name of the instrument in configuration.
    pub const NAME: &'static str = "allocation";

    /// Creates the instrument with the default number of measurements per trial.
    #[must_use]
    pub fn new() -> Self {
        Self::with_measurements(DEFAULT_MEASUREMENTS)
    }

    /// Creates the instrument with the given number of measurements per trial.
    #[must_use]
    pub fn with_measurements(measurements: NonZero<u32>) -> Self {
        Self { measurements }
    }

    pub(crate) fn from_options(options: &BTreeMap<String, String>) -> Result<Self, Error> {
        let measurements =
            parse_measurements_option(Self::NAME, options)?.unwrap_or(DEFAULT_MEASUREMENTS);

        Ok(Self::with_measurements(measurements))
    }

    /// Number of measured regions per trial.
    #[must_use]
    pub fn measurements(&self) -> NonZero<u32> {
        self.measurements
    }
}

impl Default for AllocationInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for AllocationInstrument {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_eligible(&self, routine: &Routine) -> bool {
        routine.has_marker(BENCHMARK_MARKER)
    }

    fn scheduling_policy(&self) -> TrialSchedulingPolicy {
        TrialSchedulingPolicy::Parallel
    }

    fn measurement_collector(&self) -> Box<dyn MeasurementCollector> {
        Box::new(AllocationCollector {
            target: self.measurements,
            ledger: None,
            completed_regions: 0,
            measurements: Vec::new(),
        })
    }
}

/// Aggregates the allocations of each measured region in a fresh ledger.
///
/// Allocations reported outside a measured region (e.g. during warmup) are ignored.
#[derive(Debug)]
struct AllocationCollector {
    target: NonZero<u32>,

    // Present while inside a measured region.
    ledger: Option<AllocationLedger>,

    completed_regions: u32,
    measurements: Vec<Measurement>,
}

impl MeasurementCollector for AllocationCollector {
    fn visit(&mut self, message: &LogMessage) {
        match message {
            LogMessage::StartMeasurement => {
                self.ledger = Some(AllocationLedger::new());
            }
            LogMessage::Allocation {
                description,
                size,
                location,
            } => {
                if let Some(ledger) = self.ledger.as_mut() {
                    ledger.record(description, *size, location);
                }
            }
            LogMessage::StopMeasurement { reps, .. } => {
                let Some(ledger) = self.ledger.take() else {
                    return;
                };

                #[expect(
                    clippy::cast_precision_loss,
                    reason = "measurements are statistical values, precision loss above 2^53 is acceptable"
                )]
                let (bytes, objects, weight) = (
                    ledger.total_size() as f64,
                    ledger.allocation_count() as f64,
                    *reps as f64,
                );

                self.measurements
                    .push(Measurement::new("bytes", bytes, "B", weight));
                self.measurements
                    .push(Measurement::new("objects", objects, "objects", weight));

                self.completed_regions = self.completed_regions.saturating_add(1);
            }
            _ => {}
        }
    }

    fn is_done(&self) -> bool {
        self.completed_regions >= self.target.get()
    }

    fn into_measurements(self: Box<Self>) -> Vec<Measurement> {
        self.measurements
    }
}
