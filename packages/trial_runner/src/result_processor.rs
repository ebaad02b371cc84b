use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};

use tracing::{info, warn};

use crate::{
    Error, ProcessorError, ProcessorType, Result, ResultProcessorConfig, Trial, Visibility,
    panic_message,
};

/// A sink that receives finalized trials, for example to print or store them.
///
/// Result processors are created from configuration by
/// [`create_result_processor()`][crate::create_result_processor]. Once created, a processor is
/// owned by a [`ResultProcessorSet`], which calls [`close()`][Self::close] exactly once.
#[cfg_attr(test, mockall::automock)]
pub trait ResultProcessor: fmt::Debug + Send {
    /// Receives one finalized trial.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller of [`ResultProcessorSet::process_trial()`].
    fn process_trial(&mut self, trial: &Trial) -> Result<(), ProcessorError>;

    /// Flushes and releases whatever the processor holds. No trials are delivered afterwards.
    ///
    /// # Errors
    ///
    /// Any error is reported to the caller of [`ResultProcessorSet::close()`], or logged if the
    /// set is dropped without being closed.
    fn close(&mut self) -> Result<(), ProcessorError>;
}

#[derive(Debug)]
struct Entry {
    processor_type: String,
    processor: Box<dyn ResultProcessor>,
}

/// Owns the result processors of a run and delivers every finalized trial to all of them.
///
/// Every processor is closed exactly once: either by [`close()`][Self::close] or, if the set is
/// dropped without being closed, when it is dropped.
///
/// # Examples
///
/// ```
/// use trial_runner::{LoggingResultProcessor, ResultProcessorSet};
///
/// let mut processors = ResultProcessorSet::new();
/// processors.push(
///     LoggingResultProcessor::TYPE_NAME,
///     Box::new(LoggingResultProcessor::new()),
/// );
///
/// // ... deliver trials via processors.process_trial(&trial) ...
///
/// processors.close()?;
/// # Ok::<(), trial_runner::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct ResultProcessorSet {
    entries: Vec<Entry>,
}

impl ResultProcessorSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a processor, identified in errors by the name of its type.
    pub fn push(&mut self, processor_type: impl Into<String>, processor: Box<dyn ResultProcessor>) {
        self.entries.push(Entry {
            processor_type: processor_type.into(),
            processor,
        });
    }

    /// Number of processors in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set contains no processors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delivers a trial to every processor in the set, in the order they were added.
    ///
    /// A failing processor does not prevent delivery to the processors after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processor`] for the first processor that failed.
    pub fn process_trial(&mut self, trial: &Trial) -> Result<()> {
        let mut first_error = None;

        for entry in &mut self.entries {
            if let Err(source) = entry.processor.process_trial(trial) {
                first_error.get_or_insert(Error::Processor {
                    processor_type: entry.processor_type.clone(),
                    source,
                });
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Closes every processor in the set, in the order they were added.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Processor`] for the first processor that failed to close. A processor
    /// whose `close()` panics counts as failed. The remaining processors are still closed.
    pub fn close(mut self) -> Result<()> {
        let mut first_error = None;

        for entry in mem::take(&mut self.entries) {
            if let Err(error) = entry.close() {
                first_error.get_or_insert(error);
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl Entry {
    fn close(mut self) -> Result<()> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.processor.close()));

        let source = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(source)) => source,
            Err(payload) => panic_message("close", payload.as_ref()).into(),
        };

        Err(Error::Processor {
            processor_type: self.processor_type,
            source,
        })
    }
}

impl Drop for ResultProcessorSet {
    fn drop(&mut self) {
        for entry in mem::take(&mut self.entries) {
            if let Err(error) = entry.close() {
                warn!(
                    error = %error,
                    "result processor failed to close when its set was dropped"
                );
            }
        }
    }
}

/// A result processor that emits one `info` level `tracing` event per trial.
///
/// Options:
///
/// * `label` - included in every event, for telling runs apart in shared logs.
#[derive(Debug, Default)]
pub struct LoggingResultProcessor {
    label: Option<String>,
    trials: u64,
}

impl LoggingResultProcessor {
    /// The name under which the processor is registered in
    /// [`ProcessorRegistry::with_builtins()`][crate::ProcessorRegistry::with_builtins].
    pub const TYPE_NAME: &'static str = "trial_runner::LoggingResultProcessor";

    /// Creates a processor without a label.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a processor from its configuration.
    #[must_use]
    pub fn from_config(config: &ResultProcessorConfig) -> Self {
        Self {
            label: config.option("label").map(str::to_string),
            trials: 0,
        }
    }

    /// The label included in every event, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Number of trials processed so far.
    #[must_use]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub(crate) fn processor_type() -> ProcessorType {
        ProcessorType::new(Self::TYPE_NAME)
            .with_config_constructor(Visibility::Public, |config| {
                Ok(Box::new(Self::from_config(config)))
            })
            .no_arg_constructor(Visibility::Public, || Ok(Box::new(Self::new())))
    }
}

impl ResultProcessor for LoggingResultProcessor {
    fn process_trial(&mut self, trial: &Trial) -> Result<(), ProcessorError> {
        self.trials = self
            .trials
            .checked_add(1)
            .expect("trial count overflows u64 - this indicates an unrealistic scenario");

        let label = self.label.as_deref().unwrap_or_default();

        for measurement in trial.measurements() {
            info!(
                label,
                trial = %trial.id(),
                instrument = trial.instrument(),
                routine = trial.routine(),
                description = measurement.description(),
                magnitude = measurement.magnitude(),
                unit = measurement.unit(),
                weight = measurement.weight(),
                "measurement"
            );
        }

        Ok(())
    }

    #[cfg_attr(test, mutants::skip)] // Only emits a log event, nothing to observe.
    fn close(&mut self) -> Result<(), ProcessorError> {
        info!(
            label = self.label.as_deref().unwrap_or_default(),
            trials = self.trials,
            "result processing complete"
        );

        Ok(())
    }
}
