use tracing::trace;

use crate::{
    Error, InstrumentedMethod, LogMessage, LogMessageParser, Parser, Result, Trial, TrialId,
};

/// Collects the measurements of one trial of an instrumented method from the messages its worker
/// emitted, producing the finalized trial record.
///
/// Messages are fed to a fresh measurement collector until it has all the measurements it needs.
/// Messages after that point are not consumed.
///
/// # Errors
///
/// Returns [`Error::TrialFailed`] if the worker reports a failure before the trial is complete,
/// and [`Error::IncompleteTrial`] if the messages run out first.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use trial_runner::{
///     Instrument, LogMessage, Routine, RuntimeInstrument, TrialId, collect_trial,
///     create_instrumented_method,
/// };
///
/// let instrument: Arc<dyn Instrument> = Arc::new(RuntimeInstrument::new());
/// let routine = Arc::new(Routine::micro("sum_vec", |_reps| {}));
/// let method = create_instrumented_method(&instrument, &routine);
///
/// let messages = (0..9).flat_map(|_| {
///     [
///         LogMessage::StartMeasurement,
///         LogMessage::StopMeasurement {
///             reps: 100,
///             elapsed_nanos: 2500,
///         },
///     ]
/// });
///
/// let trial = collect_trial(TrialId::new(0), &method, messages)?;
///
/// assert_eq!(trial.routine(), "sum_vec");
/// assert_eq!(trial.measurements().len(), 9);
/// # Ok::<(), trial_runner::Error>(())
/// ```
pub fn collect_trial(
    id: TrialId,
    method: &InstrumentedMethod,
    messages: impl IntoIterator<Item = LogMessage>,
) -> Result<Trial> {
    let mut collector = method.measurement_collector();

    for message in messages {
        trace!(trial = %id, method = %method, message = %message, "worker message");

        if let LogMessage::Failure { message: failure } = &message {
            return Err(Error::TrialFailed {
                method: method.to_string(),
                message: failure.clone(),
            });
        }

        collector.visit(&message);

        if collector.is_done() {
            let measurements = collector.into_measurements();

            trace!(
                trial = %id,
                method = %method,
                measurements = measurements.len(),
                "trial complete"
            );

            return Ok(Trial::new(
                id,
                method.instrument().name(),
                method.routine().name(),
                method.scheduling_policy(),
                measurements,
            ));
        }
    }

    Err(Error::IncompleteTrial {
        method: method.to_string(),
    })
}

/// Collects one trial from the raw text output of a worker, one message per line.
///
/// Empty lines are skipped. Lines after the trial is complete are not parsed.
///
/// # Errors
///
/// Returns [`Error::Parse`] for the first line that is not a valid message, in addition to the
/// errors of [`collect_trial()`].
pub fn collect_trial_output(
    id: TrialId,
    method: &InstrumentedMethod,
    output: &str,
) -> Result<Trial> {
    let parser = LogMessageParser::new();
    let mut parse_error = None;

    let messages = output
        .lines()
        .filter(|line| !line.is_empty())
        .map_while(|line| match parser.parse(line) {
            Ok(message) => Some(message),
            Err(error) => {
                parse_error = Some(error);
                None
            }
        });

    let outcome = collect_trial(id, method, messages);

    match (outcome, parse_error) {
        (Err(Error::IncompleteTrial { .. }), Some(error)) => Err(error.into()),
        (outcome, _) => outcome,
    }
}
