use std::collections::BTreeMap;
use std::num::NonZero;

use crate::{
    BENCHMARK_MARKER, Error, Instrument, LogMessage, MACROBENCHMARK_MARKER, Measurement,
    MeasurementCollector, Routine, TrialSchedulingPolicy, parse_measurements_option,
};

const DEFAULT_MEASUREMENTS: NonZero<u32> = NonZero::new(9).unwrap();

/// Measures the wall time spent in the measured region of a routine.
///
/// Concurrent trials would compete for processors and caches, so trials of this instrument are
/// scheduled serially.
///
/// Options:
///
/// * `measurements` - number of timed measured regions per trial (default 9).
#[derive(Debug)]
pub struct RuntimeInstrument {
    measurements: NonZero<u32>,
}

impl RuntimeInstrument {
    /// Name of the instrument in configuration.
    pub const NAME: &'static str = "runtime";

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

    /// Number of timed measured regions per trial.
    #[must_use]
    pub fn measurements(&self) -> NonZero<u32> {
        self.measurements
    }
}

impl Default for RuntimeInstrument {
    fn default() -> Self {
        Self::new()
    }
}

impl Instrument for RuntimeInstrument {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_eligible(&self, routine: &Routine) -> bool {
        routine.has_marker(BENCHMARK_MARKER) || routine.has_marker(MACROBENCHMARK_MARKER)
    }

    fn scheduling_policy(&self) -> TrialSchedulingPolicy {
        TrialSchedulingPolicy::Serial
    }

    fn measurement_collector(&self) -> Box<dyn MeasurementCollector> {
        Box::new(RuntimeCollector {
            target: self.measurements,
            measuring: false,
            measurements: Vec::new(),
        })
    }
}

#[derive(Debug)]
struct RuntimeCollector {
    target: NonZero<u32>,
    measuring: bool,
    measurements: Vec<Measurement>,
}

impl MeasurementCollector for RuntimeCollector {
    fn visit(&mut self, message: &LogMessage) {
        match message {
            LogMessage::StartMeasurement => self.measuring = true,
            LogMessage::StopMeasurement {
                reps,
                elapsed_nanos,
            } if self.measuring => {
                self.measuring = false;

                #[expect(
                    clippy::cast_precision_loss,
                    reason = "measurements are statistical values, precision loss above 2^53 is acceptable"
                )]
                let (magnitude, weight) = (*elapsed_nanos as f64, *reps as f64);

                self.measurements
                    .push(Measurement::new("runtime", magnitude, "ns", weight));
            }
            _ => {}
        }
    }

    fn is_done(&self) -> bool {
        self.measurements.len() >= self.target.get() as usize
    }

    fn into_measurements(self: Box<Self>) -> Vec<Measurement> {
        self.measurements
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::float_cmp,
        reason = "measurements in these tests are small exact values"
    )]

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(RuntimeInstrument: Send, Sync);

    #[test]
    fn accepts_micro_and_macro_routines() {
        let instrument = RuntimeInstrument::new();

        assert!(instrument.is_eligible(&Routine::micro("a", |_| {})));
        assert!(instrument.is_eligible(&Routine::macro_benchmark("b", || {})));
    }

    #[test]
    fn is_serial() {
        assert_eq!(
            RuntimeInstrument::new().scheduling_policy(),
            TrialSchedulingPolicy::Serial
        );
    }

    #[test]
    fn collects_configured_number_of_measurements() {
        let instrument = RuntimeInstrument::with_measurements(NonZero::new(2).unwrap());
        let mut collector = instrument.measurement_collector();

        for elapsed_nanos in [1000, 1200] {
            assert!(!collector.is_done());
            collector.visit(&LogMessage::StartMeasurement);
            collector.visit(&LogMessage::StopMeasurement {
                reps: 10,
                elapsed_nanos,
            });
        }

        assert!(collector.is_done());

        let measurements = collector.into_measurements();
        assert_eq!(measurements.len(), 2);

        let first = measurements.first().unwrap();
        assert_eq!(first.description(), "runtime");
        assert_eq!(first.unit(), "ns");
        assert_eq!(first.magnitude(), 1000.0);
        assert_eq!(first.weight(), 10.0);
    }

    #[test]
    fn stop_without_start_is_ignored() {
        let mut collector = RuntimeInstrument::new().measurement_collector();

        collector.visit(&LogMessage::StopMeasurement {
            reps: 10,
            elapsed_nanos: 100,
        });

        assert!(collector.into_measurements().is_empty());
    }

    #[test]
    fn options_set_measurement_count() {
        let options = BTreeMap::from([("measurements".to_string(), "3".to_string())]);

        let instrument = RuntimeInstrument::from_options(&options).unwrap();

        assert_eq!(instrument.measurements().get(), 3);
    }

    #[test]
    fn default_measurement_count() {
        let instrument = RuntimeInstrument::from_options(&BTreeMap::new()).unwrap();

        assert_eq!(instrument.measurements().get(), 9);
    }
}
