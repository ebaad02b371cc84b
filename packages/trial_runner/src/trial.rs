use std::fmt;

use crate::TrialSchedulingPolicy;

/// Identifies one trial within a harness run.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TrialId(u64);

impl TrialId {
    /// Creates an identifier from its numeric value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// The numeric value of the identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The identifier that follows this one.
    ///
    /// # Panics
    ///
    /// Panics if the identifier space is exhausted, which would indicate an unrealistic scenario.
    #[must_use]
    pub fn next(self) -> Self {
        Self(
            self.0
                .checked_add(1)
                .expect("trial identifier overflows u64 - this indicates an unrealistic scenario"),
        )
    }
}

impl fmt::Display for TrialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One value measured by an instrument during a trial.
///
/// The weight is the number of repetitions the magnitude covers, so the per-repetition value
/// is `magnitude / weight`.
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    description: String,
    magnitude: f64,
    unit: String,
    weight: f64,
}

impl Measurement {
    /// Creates a measurement.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        magnitude: f64,
        unit: impl Into<String>,
        weight: f64,
    ) -> Self {
        Self {
            description: description.into(),
            magnitude,
            unit: unit.into(),
            weight,
        }
    }

    /// What was measured, for example `runtime` or `bytes`.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The measured value, covering `weight` repetitions.
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// The unit of the magnitude, for example `ns`.
    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Number of repetitions covered by the magnitude.
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// The magnitude of a single repetition.
    #[must_use]
    pub fn per_repetition(&self) -> f64 {
        self.magnitude / self.weight
    }
}

/// The finalized record of one trial, as delivered to result processors.
#[derive(Clone, Debug, PartialEq)]
pub struct Trial {
    id: TrialId,
    instrument: String,
    routine: String,
    scheduling_policy: TrialSchedulingPolicy,
    measurements: Vec<Measurement>,
}

impl Trial {
    pub(crate) fn new(
        id: TrialId,
        instrument: impl Into<String>,
        routine: impl Into<String>,
        scheduling_policy: TrialSchedulingPolicy,
        measurements: Vec<Measurement>,
    ) -> Self {
        Self {
            id,
            instrument: instrument.into(),
            routine: routine.into(),
            scheduling_policy,
            measurements,
        }
    }

    /// Identifier of the trial within the run.
    #[must_use]
    pub fn id(&self) -> TrialId {
        self.id
    }

    /// Name of the instrument that measured the trial.
    #[must_use]
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Name of the routine that was measured.
    #[must_use]
    pub fn routine(&self) -> &str {
        &self.routine
    }

    /// The scheduling policy the trial was subject to.
    #[must_use]
    pub fn scheduling_policy(&self) -> TrialSchedulingPolicy {
        self.scheduling_policy
    }

    /// The measurements collected during the trial, in the order they were taken.
    #[must_use]
    pub fn measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    #![allow(
        clippy::float_cmp,
        reason = "measurements in these tests are small exact values"
    )]

    use super::*;

    #[test]
    fn trial_ids_are_sequential() {
        let first = TrialId::new(0);
        let second = first.next();

        assert_eq!(second.get(), 1);
        assert!(first < second);
        assert_eq!(second.to_string(), "#1");
    }

    #[test]
    fn per_repetition_divides_by_weight() {
        let measurement = Measurement::new("runtime", 1000.0, "ns", 4.0);

        assert_eq!(measurement.per_repetition(), 250.0);
        assert_eq!(measurement.description(), "runtime");
        assert_eq!(measurement.unit(), "ns");
    }
}
