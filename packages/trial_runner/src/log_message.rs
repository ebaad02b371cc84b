//! Structured messages that a worker process emits while it executes a trial.
//!
//! Each message is a single line of text made of tab-separated fields, the first of which names
//! the message kind:
//!
//! | Line                                              | Message                                |
//! |---------------------------------------------------|----------------------------------------|
//! | `start`                                           | [`LogMessage::StartMeasurement`]       |
//! | `alloc<TAB>size<TAB>description[<TAB>frame]*`     | [`LogMessage::Allocation`]             |
//! | `stop<TAB>reps<TAB>elapsed_nanos`                 | [`LogMessage::StopMeasurement`]        |
//! | `fail<TAB>message`                                | [`LogMessage::Failure`]                |
//!
//! Fields must not contain tabs or line breaks. Stack frames are listed innermost first.

use std::fmt;

use thiserror::Error;

const START: &str = "start";
const ALLOC: &str = "alloc";
const STOP: &str = "stop";
const FAIL: &str = "fail";

const FIELD_SEPARATOR: char = '\t';

/// One structured message emitted by a worker.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum LogMessage {
    /// The worker is about to enter the measured region.
    StartMeasurement,

    /// The benchmark performed one allocation inside the measured region.
    Allocation {
        /// Human-readable description of what was allocated.
        description: String,

        /// Size of the allocation in bytes.
        size: u64,

        /// Stack frames of the allocation site, innermost first.
        location: Vec<String>,
    },

    /// The worker left the measured region.
    StopMeasurement {
        /// Number of repetitions executed in the measured region. Never zero when parsed.
        reps: u64,

        /// Wall time spent in the measured region.
        elapsed_nanos: u64,
    },

    /// The benchmark code failed.
    Failure {
        /// Description of the failure.
        message: String,
    },
}

impl fmt::Display for LogMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartMeasurement => f.write_str(START),
            Self::Allocation {
                description,
                size,
                location,
            } => {
                write!(f, "{ALLOC}{FIELD_SEPARATOR}{size}{FIELD_SEPARATOR}{description}")?;

                for frame in location {
                    write!(f, "{FIELD_SEPARATOR}{frame}")?;
                }

                Ok(())
            }
            Self::StopMeasurement {
                reps,
                elapsed_nanos,
            } => write!(
                f,
                "{STOP}{FIELD_SEPARATOR}{reps}{FIELD_SEPARATOR}{elapsed_nanos}"
            ),
            Self::Failure { message } => write!(f, "{FAIL}{FIELD_SEPARATOR}{message}"),
        }
    }
}

/// A worker log line could not be parsed into a [`LogMessage`].
#[derive(Clone, Debug, Eq, Error, PartialEq)]
#[error("invalid worker log message '{line}': {problem}")]
pub struct ParseError {
    line: String,
    problem: String,
}

impl ParseError {
    fn new(line: &str, problem: impl Into<String>) -> Self {
        Self {
            line: line.to_string(),
            problem: problem.into(),
        }
    }

    /// The line that could not be parsed.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// A human-readable description of the problem.
    #[must_use]
    pub fn problem(&self) -> &str {
        &self.problem
    }
}

/// Parses text into a value of type `T`.
pub trait Parser<T> {
    /// Parses one unit of text, such as one line of worker output.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid representation of `T`.
    fn parse(&self, text: &str) -> Result<T, ParseError>;
}

/// Parses single lines of worker output into [`LogMessage`]s.
///
/// # Examples
///
/// ```
/// use trial_runner::{LogMessage, LogMessageParser, Parser};
///
/// let parser = LogMessageParser::new();
///
/// let message = parser.parse("stop\t1000\t52000").unwrap();
///
/// assert_eq!(
///     message,
///     LogMessage::StopMeasurement {
///         reps: 1000,
///         elapsed_nanos: 52000
///     }
/// );
/// ```
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct LogMessageParser;

impl LogMessageParser {
    /// Creates a parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Parser<LogMessage> for LogMessageParser {
    fn parse(&self, text: &str) -> Result<LogMessage, ParseError> {
        let line = text.trim_end_matches(['\r', '\n']);

        let mut fields = line.split(FIELD_SEPARATOR);

        // `split` always yields at least one item, possibly empty.
        let kind = fields.next().unwrap_or_default();

        match kind {
            START => {
                if fields.next().is_some() {
                    return Err(ParseError::new(line, "start message takes no fields"));
                }

                Ok(LogMessage::StartMeasurement)
            }
            ALLOC => {
                let size = parse_number(line, fields.next(), "allocation size")?;

                let description = fields
                    .next()
                    .filter(|description| !description.is_empty())
                    .ok_or_else(|| ParseError::new(line, "allocation description is missing"))?;

                Ok(LogMessage::Allocation {
                    description: description.to_string(),
                    size,
                    location: fields.map(str::to_string).collect(),
                })
            }
            STOP => {
                let reps = parse_number(line, fields.next(), "repetition count")?;
                if reps == 0 {
                    return Err(ParseError::new(line, "repetition count must be positive"));
                }

                let elapsed_nanos = parse_number(line, fields.next(), "elapsed time")?;

                if fields.next().is_some() {
                    return Err(ParseError::new(line, "stop message has too many fields"));
                }

                Ok(LogMessage::StopMeasurement {
                    reps,
                    elapsed_nanos,
                })
            }
            FAIL => {
                let message = line
                    .split_once(FIELD_SEPARATOR)
                    .map(|(_, message)| message)
                    .unwrap_or_default();

                Ok(LogMessage::Failure {
                    message: message.to_string(),
                })
            }
            "" => Err(ParseError::new(line, "message is empty")),
            other => Err(ParseError::new(
                line,
                format!("unknown message kind '{other}'"),
            )),
        }
    }
}

fn parse_number(line: &str, field: Option<&str>, what: &str) -> Result<u64, ParseError> {
    let field = field.ok_or_else(|| ParseError::new(line, format!("{what} is missing")))?;

    field.parse::<u64>().map_err(|inner| {
        ParseError::new(
            line,
            format!("{what} '{field}' could not be parsed as an integer: {inner}"),
        )
    })
}
