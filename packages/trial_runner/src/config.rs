//! Run configuration, read from TOML.
//!
//! ```toml
//! # Instruments to measure with, in order. Defaults to ["runtime"].
//! instruments = ["runtime", "allocation"]
//!
//! # Benchmark routines to measure. All routines are measured if omitted.
//! benchmark_methods = ["concat", "parse"]
//!
//! # Options of individual instruments.
//! [instrument.runtime]
//! measurements = 5
//!
//! # Result processors, created in key order.
//! [results.log]
//! class = "trial_runner::LoggingResultProcessor"
//!
//! [results.log.options]
//! label = "nightly"
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZero;
use std::sync::Arc;

use toml::{Table, Value};

use crate::{
    AllocationInstrument, Error, Instrument, Result, ResultProcessorConfig, RuntimeInstrument,
};

const INSTRUMENTS: &str = "instruments";
const BENCHMARK_METHODS: &str = "benchmark_methods";
const INSTRUMENT: &str = "instrument";
const RESULTS: &str = "results";
const CLASS: &str = "class";
const OPTIONS: &str = "options";

const MEASUREMENTS_OPTION: &str = "measurements";

/// The instruments, benchmark name filter and result processors of one harness run.
///
/// # Examples
///
/// ```
/// use trial_runner::RunConfig;
///
/// let config = RunConfig::from_toml_str(
///     r#"
///     instruments = ["runtime", "allocation"]
///     benchmark_methods = ["concat"]
///
///     [instrument.runtime]
///     measurements = 3
///     "#,
/// )?;
///
/// assert_eq!(config.instruments().len(), 2);
/// assert!(config.benchmark_names().contains("concat"));
/// # Ok::<(), trial_runner::Error>(())
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
    instruments: Vec<InstrumentConfig>,
    benchmark_names: BTreeSet<String>,
    result_processors: Vec<ResultProcessorConfig>,
}

/// The name and options of one configured instrument.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstrumentConfig {
    name: String,
    options: BTreeMap<String, String>,
}

impl InstrumentConfig {
    /// Name of the instrument.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options of the instrument.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }
}

impl RunConfig {
    /// Parses a run configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the text is not valid TOML, contains unknown keys or
    /// if a value has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let mut table = toml::from_str::<Table>(text)
            .map_err(|error| Error::invalid_config(error.to_string()))?;

        let instrument_names = match table.remove(INSTRUMENTS) {
            Some(value) => string_array(INSTRUMENTS, value)?,
            None => vec![RuntimeInstrument::NAME.to_string()],
        };

        let benchmark_names: BTreeSet<String> = match table.remove(BENCHMARK_METHODS) {
            Some(value) => string_array(BENCHMARK_METHODS, value)?.into_iter().collect(),
            None => BTreeSet::new(),
        };

        let mut instrument_options = match table.remove(INSTRUMENT) {
            Some(value) => into_table(INSTRUMENT, value)?,
            None => Table::new(),
        };

        let instruments = instrument_names
            .into_iter()
            .map(|name| {
                let options = match instrument_options.remove(&name) {
                    Some(value) => {
                        let path = format!("{INSTRUMENT}.{name}");
                        string_map(&path, into_table(&path, value)?)?
                    }
                    None => BTreeMap::new(),
                };

                Ok(InstrumentConfig { name, options })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(name) = instrument_options.keys().next() {
            return Err(Error::invalid_config(format!(
                "options are configured for instrument '{name}' which is not in '{INSTRUMENTS}'"
            )));
        }

        let result_processors = match table.remove(RESULTS) {
            Some(value) => into_table(RESULTS, value)?
                .into_iter()
                .map(|(key, value)| result_processor(&key, value))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        if let Some(key) = table.keys().next() {
            return Err(Error::invalid_config(format!("unknown key '{key}'")));
        }

        Ok(Self {
            instruments,
            benchmark_names,
            result_processors,
        })
    }

    /// The configured instruments, in configured order.
    #[must_use]
    pub fn instruments(&self) -> &[InstrumentConfig] {
        &self.instruments
    }

    /// Names of the benchmark routines to measure. Empty if all routines are to be measured.
    #[must_use]
    pub fn benchmark_names(&self) -> &BTreeSet<String> {
        &self.benchmark_names
    }

    /// The configured result processors, in key order.
    #[must_use]
    pub fn result_processors(&self) -> &[ResultProcessorConfig] {
        &self.result_processors
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            instruments: vec![InstrumentConfig {
                name: RuntimeInstrument::NAME.to_string(),
                options: BTreeMap::new(),
            }],
            benchmark_names: BTreeSet::new(),
            result_processors: Vec::new(),
        }
    }
}

/// Creates the instruments named by the configuration, in configured order.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if an instrument is unknown, configured more than once or has
/// invalid options.
pub fn instruments_from_config(config: &RunConfig) -> Result<Vec<Arc<dyn Instrument>>> {
    let mut seen = BTreeSet::new();

    config
        .instruments()
        .iter()
        .map(|instrument| {
            if !seen.insert(instrument.name()) {
                return Err(Error::invalid_config(format!(
                    "instrument '{}' is configured more than once",
                    instrument.name()
                )));
            }

            let created: Arc<dyn Instrument> = match instrument.name() {
                RuntimeInstrument::NAME => {
                    Arc::new(RuntimeInstrument::from_options(instrument.options())?)
                }
                AllocationInstrument::NAME => {
                    Arc::new(AllocationInstrument::from_options(instrument.options())?)
                }
                other => {
                    return Err(Error::invalid_config(format!(
                        "unknown instrument '{other}'"
                    )));
                }
            };

            Ok(created)
        })
        .collect()
}

/// Reads the `measurements` option shared by the built-in instruments, rejecting any other option.
pub(crate) fn parse_measurements_option(
    instrument: &str,
    options: &BTreeMap<String, String>,
) -> Result<Option<NonZero<u32>>> {
    if let Some(key) = options.keys().find(|key| *key != MEASUREMENTS_OPTION) {
        return Err(Error::invalid_config(format!(
            "instrument '{instrument}' has no option '{key}'"
        )));
    }

    options
        .get(MEASUREMENTS_OPTION)
        .map(|value| {
            value.parse::<NonZero<u32>>().map_err(|error| {
                Error::invalid_config(format!(
                    "option '{MEASUREMENTS_OPTION}' of instrument '{instrument}' must be a positive integer, got '{value}': {error}"
                ))
            })
        })
        .transpose()
}

fn result_processor(key: &str, value: Value) -> Result<ResultProcessorConfig> {
    let path = format!("{RESULTS}.{key}");
    let mut table = into_table(&path, value)?;

    let class_name = match table.remove(CLASS) {
        Some(Value::String(class_name)) => class_name,
        Some(_) => {
            return Err(Error::invalid_config(format!(
                "'{path}.{CLASS}' must be a string"
            )));
        }
        None => return Err(Error::invalid_config(format!("'{path}.{CLASS}' is missing"))),
    };

    let options = match table.remove(OPTIONS) {
        Some(value) => string_map(&format!("{path}.{OPTIONS}"), into_table(&path, value)?)?,
        None => BTreeMap::new(),
    };

    if let Some(unknown) = table.keys().next() {
        return Err(Error::invalid_config(format!(
            "unknown key '{unknown}' in '{path}'"
        )));
    }

    let builder = options.into_iter().fold(
        ResultProcessorConfig::builder().class_name(class_name),
        |builder, (key, value)| builder.option(key, value),
    );

    Ok(builder.build())
}

fn into_table(path: &str, value: Value) -> Result<Table> {
    match value {
        Value::Table(table) => Ok(table),
        _ => Err(Error::invalid_config(format!("'{path}' must be a table"))),
    }
}

fn string_array(path: &str, value: Value) -> Result<Vec<String>> {
    let Value::Array(items) = value else {
        return Err(Error::invalid_config(format!(
            "'{path}' must be an array of strings"
        )));
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(item) => Ok(item),
            _ => Err(Error::invalid_config(format!(
                "'{path}' must be an array of strings"
            ))),
        })
        .collect()
}

// Option values are passed on as strings, so scalar TOML values are converted to their text form.
fn string_map(path: &str, table: Table) -> Result<BTreeMap<String, String>> {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(value) => value,
                Value::Integer(value) => value.to_string(),
                Value::Float(value) => value.to_string(),
                Value::Boolean(value) => value.to_string(),
                _ => {
                    return Err(Error::invalid_config(format!(
                        "'{path}.{key}' must be a string, number or boolean"
                    )));
                }
            };

            Ok((key, value))
        })
        .collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::TrialSchedulingPolicy;

    fn problem(error: &Error) -> &str {
        match error {
            Error::InvalidConfig { problem } => problem,
            other => panic!("expected a configuration error, got {other}"),
        }
    }

    #[test]
    fn empty_config_uses_runtime_instrument() {
        let config = RunConfig::from_toml_str("").unwrap();

        assert_eq!(config, RunConfig::default());
        assert_eq!(config.instruments().first().unwrap().name(), "runtime");
        assert!(config.benchmark_names().is_empty());
        assert!(config.result_processors().is_empty());
    }

    #[test]
    fn full_config() {
        let config = RunConfig::from_toml_str(
            r#"
            instruments = ["allocation", "runtime"]
            benchmark_methods = ["c", "a"]

            [instrument.runtime]
            measurements = 4

            [results.log]
            class = "trial_runner::LoggingResultProcessor"

            [results.log.options]
            label = "nightly"
            verbose = true
            "#,
        )
        .unwrap();

        let names: Vec<_> = config.instruments().iter().map(InstrumentConfig::name).collect();
        assert_eq!(names, ["allocation", "runtime"]);

        let runtime = config.instruments().get(1).unwrap();
        assert_eq!(
            runtime.options().get("measurements").map(String::as_str),
            Some("4")
        );

        assert_eq!(
            config.benchmark_names().iter().collect::<Vec<_>>(),
            ["a", "c"]
        );

        let processor = config.result_processors().first().unwrap();
        assert_eq!(
            processor.class_name(),
            "trial_runner::LoggingResultProcessor"
        );
        assert_eq!(processor.option("label"), Some("nightly"));
        assert_eq!(processor.option("verbose"), Some("true"));
    }

    #[test]
    fn result_processors_are_in_key_order() {
        let config = RunConfig::from_toml_str(
            r#"
            [results.zebra]
            class = "z::Z"

            [results.alpha]
            class = "a::A"
            "#,
        )
        .unwrap();

        let classes: Vec<_> = config
            .result_processors()
            .iter()
            .map(ResultProcessorConfig::class_name)
            .collect();
        assert_eq!(classes, ["a::A", "z::Z"]);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        let error = RunConfig::from_toml_str("instruments = [").unwrap_err();

        assert!(matches!(error, Error::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let error = RunConfig::from_toml_str("trials = 5").unwrap_err();

        assert_eq!(problem(&error), "unknown key 'trials'");
    }

    #[test]
    fn instruments_must_be_strings() {
        let error = RunConfig::from_toml_str("instruments = [1]").unwrap_err();

        assert_eq!(problem(&error), "'instruments' must be an array of strings");
    }

    #[test]
    fn instrument_options_must_be_a_table() {
        let error = RunConfig::from_toml_str(
            r#"
            instruments = ["runtime"]
            instrument = { runtime = 3 }
            "#,
        )
        .unwrap_err();

        assert_eq!(problem(&error), "'instrument.runtime' must be a table");
    }

    #[test]
    fn options_of_unlisted_instrument_are_rejected() {
        let error = RunConfig::from_toml_str(
            r#"
            instruments = ["runtime"]

            [instrument.allocation]
            measurements = 2
            "#,
        )
        .unwrap_err();

        assert!(problem(&error).contains("'allocation'"));
    }

    #[test]
    fn result_processor_requires_class() {
        let error = RunConfig::from_toml_str(
            r#"
            [results.log.options]
            label = "x"
            "#,
        )
        .unwrap_err();

        assert_eq!(problem(&error), "'results.log.class' is missing");
    }

    #[test]
    fn builds_instruments_in_order() {
        let config = RunConfig::from_toml_str(
            r#"
            instruments = ["allocation", "runtime"]

            [instrument.allocation]
            measurements = "3"
            "#,
        )
        .unwrap();

        let instruments = instruments_from_config(&config).unwrap();

        let names: Vec<_> = instruments.iter().map(|i| i.name()).collect();
        assert_eq!(names, ["allocation", "runtime"]);
        assert_eq!(
            instruments.first().unwrap().scheduling_policy(),
            TrialSchedulingPolicy::Parallel
        );
    }

    #[test]
    fn unknown_instrument_is_rejected() {
        let config = RunConfig::from_toml_str(r#"instruments = ["cpu_cycles"]"#).unwrap();

        let error = instruments_from_config(&config).unwrap_err();

        assert_eq!(problem(&error), "unknown instrument 'cpu_cycles'");
    }

    #[test]
    fn duplicate_instrument_is_rejected() {
        let config = RunConfig::from_toml_str(r#"instruments = ["runtime", "runtime"]"#).unwrap();

        let error = instruments_from_config(&config).unwrap_err();

        assert!(problem(&error).contains("more than once"));
    }

    #[test]
    fn unknown_instrument_option_is_rejected() {
        let options = BTreeMap::from([("warmup".to_string(), "1".to_string())]);

        let error = parse_measurements_option("runtime", &options).unwrap_err();

        assert_eq!(problem(&error), "instrument 'runtime' has no option 'warmup'");
    }

    #[test]
    fn zero_measurements_are_rejected() {
        let options = BTreeMap::from([("measurements".to_string(), "0".to_string())]);

        let error = parse_measurements_option("runtime", &options).unwrap_err();

        assert!(problem(&error).contains("must be a positive integer"));
    }

    #[test]
    fn measurements_option_is_optional() {
        assert_eq!(
            parse_measurements_option("runtime", &BTreeMap::new()).unwrap(),
            None
        );
    }
}
