use thiserror::Error;

use crate::ParseError;

/// Error raised by a result processor or its factory.
///
/// Result processors are user code, so any error type is accepted and preserved as the source
/// of the [`Error`] that reports the failure.
pub type ProcessorError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when preparing or collecting benchmark trials.
///
/// The variants fall into three groups:
///
/// * configuration errors ([`InvalidBenchmarkNames`][Self::InvalidBenchmarkNames],
///   [`InvalidConfig`][Self::InvalidConfig],
///   [`UnknownResultProcessor`][Self::UnknownResultProcessor]), which mean the harness was
///   misconfigured and retrying will not help;
/// * plugin construction errors ([`NoValidConstructor`][Self::NoValidConstructor]), which mean a
///   result processor type cannot be instantiated by the harness at all;
/// * user code errors ([`UserCode`][Self::UserCode], [`Processor`][Self::Processor],
///   [`TrialFailed`][Self::TrialFailed]), which mean user-supplied code broke at runtime. The
///   original cause is preserved.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Some of the requested benchmark method names do not match any benchmark routine.
    #[error("Invalid benchmark method(s) specified in options: [{}]", .names.join(", "))]
    InvalidBenchmarkNames {
        /// Every requested name that matched no routine, in ascending order.
        names: Vec<String>,
    },

    /// The run configuration is malformed or refers to something that does not exist.
    #[error("invalid run configuration: {problem}")]
    InvalidConfig {
        /// A human-readable description of the problem.
        problem: String,
    },

    /// No result processor type is registered under the configured class name.
    #[error("no result processor is registered as '{class_name}'")]
    UnknownResultProcessor {
        /// The class name from the result processor configuration.
        class_name: String,
    },

    /// The result processor type has no public constructor of a supported shape.
    #[error("No valid constructor found for {processor_type}.")]
    NoValidConstructor {
        /// Fully qualified name of the result processor type.
        processor_type: String,
    },

    /// A result processor constructor failed.
    #[error("constructing result processor {processor_type} failed")]
    UserCode {
        /// Fully qualified name of the result processor type.
        processor_type: String,

        /// The error (or panic message) raised by the constructor.
        #[source]
        source: ProcessorError,
    },

    /// A result processor failed while processing a trial or while closing.
    #[error("result processor {processor_type} failed")]
    Processor {
        /// Fully qualified name of the result processor type.
        processor_type: String,

        /// The error raised by the result processor.
        #[source]
        source: ProcessorError,
    },

    /// The benchmark code reported a failure while a trial was running.
    #[error("trial of {method} failed: {message}")]
    TrialFailed {
        /// The instrumented method whose trial failed.
        method: String,

        /// The failure reported by the worker.
        message: String,
    },

    /// The worker output ended before the trial collected all of its measurements.
    #[error("worker output ended before the trial of {method} was complete")]
    IncompleteTrial {
        /// The instrumented method whose trial is incomplete.
        method: String,
    },

    /// A worker log message could not be parsed.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Error {
    pub(crate) fn invalid_config(problem: impl Into<String>) -> Self {
        Self::InvalidConfig {
            problem: problem.into(),
        }
    }
}

/// A specialized `Result` type for trial runner operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::error::Error as _;
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn invalid_names_are_listed_in_brackets() {
        let error = Error::InvalidBenchmarkNames {
            names: vec!["bad".to_string(), "worse".to_string()],
        };

        assert_eq!(
            error.to_string(),
            "Invalid benchmark method(s) specified in options: [bad, worse]"
        );
    }

    #[test]
    fn no_valid_constructor_names_type() {
        let error = Error::NoValidConstructor {
            processor_type: "my_crate::CsvResultProcessor".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "No valid constructor found for my_crate::CsvResultProcessor."
        );
    }

    #[test]
    fn user_code_error_preserves_cause() {
        let error = Error::UserCode {
            processor_type: "my_crate::CsvResultProcessor".to_string(),
            source: "disk full".into(),
        };

        let source = error.source().expect("user code errors always have a source");
        assert_eq!(source.to_string(), "disk full");
    }
}
