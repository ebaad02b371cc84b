//! Integration tests for `trial_runner` that walk through a harness run: configuration, method
//! selection, trial collection from worker output and delivery to result processors.

#![allow(
    clippy::float_cmp,
    clippy::arithmetic_side_effects,
    reason = "test values are small and exact"
)]

use std::any::type_name;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::thread;

use trial_runner::{
    BenchmarkSuite, Error, Instrument, InstrumentedMethod, LogMessage, Measurement,
    MeasurementCollector, ProcessorError, ProcessorRegistry, ProcessorType, ResultProcessor,
    Routine, RunConfig, RunPlan, Trial, TrialId, TrialSchedulingPolicy, Visibility,
    collect_trial, collect_trial_output, select_instrumented_methods,
};

/// Accepts every routine and counts the stop messages it sees.
#[derive(Debug)]
struct CountingInstrument {
    name: &'static str,
}

#[derive(Debug, Default)]
struct StopCounter {
    stops: u32,
}

impl Instrument for CountingInstrument {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_eligible(&self, _routine: &Routine) -> bool {
        true
    }

    fn scheduling_policy(&self) -> TrialSchedulingPolicy {
        TrialSchedulingPolicy::Serial
    }

    fn measurement_collector(&self) -> Box<dyn MeasurementCollector> {
        Box::new(StopCounter::default())
    }
}

impl MeasurementCollector for StopCounter {
    fn visit(&mut self, message: &LogMessage) {
        if matches!(message, LogMessage::StopMeasurement { .. }) {
            self.stops = self.stops.saturating_add(1);
        }
    }

    fn is_done(&self) -> bool {
        self.stops >= 1
    }

    fn into_measurements(self: Box<Self>) -> Vec<Measurement> {
        vec![Measurement::new("stops", f64::from(self.stops), "stops", 1.0)]
    }
}

/// Keeps every trial it receives, for inspection after the run.
#[derive(Debug)]
struct CapturingProcessor {
    trials: Arc<Mutex<Vec<Trial>>>,
    closed: Arc<Mutex<u32>>,
}

impl ResultProcessor for CapturingProcessor {
    fn process_trial(&mut self, trial: &Trial) -> Result<(), ProcessorError> {
        self.trials.lock().unwrap().push(trial.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), ProcessorError> {
        *self.closed.lock().unwrap() += 1;
        Ok(())
    }
}

fn abc_suite() -> BenchmarkSuite {
    BenchmarkSuite::new("abc")
        .routine(Routine::micro("a", |_| {}))
        .routine(Routine::micro("b", |_| {}))
        .routine(Routine::micro("c", |_| {}))
}

fn names(requested: &[&str]) -> BTreeSet<String> {
    requested.iter().map(|name| (*name).to_string()).collect()
}

fn labels(methods: &[InstrumentedMethod]) -> Vec<String> {
    methods.iter().map(ToString::to_string).collect()
}

#[test]
fn method_selection_scenario() {
    let instruments: Vec<Arc<dyn Instrument>> = vec![
        Arc::new(CountingInstrument { name: "A" }),
        Arc::new(CountingInstrument { name: "B" }),
    ];
    let suite = abc_suite();

    let all =
        select_instrumented_methods(&instruments, suite.routines(), &BTreeSet::new()).unwrap();
    assert_eq!(labels(&all), ["A/a", "A/b", "A/c", "B/a", "B/b", "B/c"]);

    let only_b =
        select_instrumented_methods(&instruments, suite.routines(), &names(&["b"])).unwrap();
    assert_eq!(labels(&only_b), ["A/b", "B/b"]);

    let error =
        select_instrumented_methods(&instruments, suite.routines(), &names(&["a", "c", "bad"]))
            .unwrap_err();

    let message = error.to_string();
    assert!(message.contains("[bad]"), "{message}");
    assert!(!message.contains("a,"), "{message}");
}

#[test]
fn same_routine_under_two_instruments_is_two_methods() {
    let instruments: Vec<Arc<dyn Instrument>> = vec![
        Arc::new(CountingInstrument { name: "same" }),
        Arc::new(CountingInstrument { name: "same" }),
    ];
    let suite = abc_suite();

    let methods =
        select_instrumented_methods(&instruments, suite.routines(), &names(&["a"])).unwrap();

    assert_eq!(methods.len(), 2);
    assert_ne!(methods.first(), methods.get(1));
}

#[test]
fn configured_run_delivers_trials_to_processors() {
    let trials = Arc::new(Mutex::new(Vec::new()));
    let closed = Arc::new(Mutex::new(0));

    let mut registry = ProcessorRegistry::with_builtins();
    {
        let trials = Arc::clone(&trials);
        let closed = Arc::clone(&closed);

        registry.register(ProcessorType::of::<CapturingProcessor>().no_arg_constructor(
            Visibility::Public,
            move || {
                Ok(Box::new(CapturingProcessor {
                    trials: Arc::clone(&trials),
                    closed: Arc::clone(&closed),
                }))
            },
        ));
    }

    let suite = BenchmarkSuite::new("parsing")
        .routine(Routine::micro("parse_small", |_| {}))
        .routine(Routine::micro("parse_large", |_| {}))
        .routine(Routine::macro_benchmark("load_corpus", || {}));

    let config = RunConfig::from_toml_str(&format!(
        r#"
        instruments = ["runtime", "allocation"]
        benchmark_methods = ["parse_large", "load_corpus"]

        [instrument.runtime]
        measurements = 2

        [results.capture]
        class = "{}"

        [results.log]
        class = "trial_runner::LoggingResultProcessor"

        [results.log.options]
        label = "integration"
        "#,
        type_name::<CapturingProcessor>()
    ))
    .unwrap();

    let plan = RunPlan::prepare(&config, &suite, &registry).unwrap();

    // The allocation instrument does not measure macrobenchmarks.
    assert_eq!(
        labels(plan.methods()),
        [
            "runtime/parse_large",
            "runtime/load_corpus",
            "allocation/parse_large"
        ]
    );

    let (methods, mut processors) = plan.into_parts();
    assert_eq!(processors.len(), 2);

    let mut id = TrialId::new(0);

    for method in &methods {
        let output = match method.instrument().name() {
            "runtime" => "start\nstop\t10\t1000\nstart\nstop\t10\t1100\n",
            _ => {
                "start\n\
                 alloc\t4096\tVec<u8>\tparse_large\n\
                 alloc\t32\tString\tparse_large\n\
                 stop\t10\t1\n"
            }
        };

        let trial = collect_trial_output(id, method, output).unwrap();
        processors.process_trial(&trial).unwrap();

        id = id.next();
    }

    processors.close().unwrap();

    assert_eq!(*closed.lock().unwrap(), 1);

    let trials = trials.lock().unwrap();
    assert_eq!(trials.len(), 3);

    let allocation_trial = trials.get(2).unwrap();
    assert_eq!(allocation_trial.id(), TrialId::new(2));
    assert_eq!(
        allocation_trial.scheduling_policy(),
        TrialSchedulingPolicy::Parallel
    );

    let descriptions: Vec<_> = allocation_trial
        .measurements()
        .iter()
        .map(|m| (m.description(), m.magnitude()))
        .collect();
    assert_eq!(descriptions, [("bytes", 4128.0), ("objects", 2.0)]);

    let runtime_trial = trials.first().unwrap();
    assert_eq!(runtime_trial.measurements().len(), 2);
}

#[test]
fn parallel_allocation_trials_do_not_share_ledgers() {
    let config = RunConfig::from_toml_str(r#"instruments = ["allocation"]"#).unwrap();
    let suite = abc_suite();

    let plan = RunPlan::prepare(&config, &suite, &ProcessorRegistry::new()).unwrap();
    let (methods, _processors) = plan.into_parts();

    let trials: Vec<Trial> = thread::scope(|scope| {
        let handles: Vec<_> = methods
            .iter()
            .zip(1_u64..)
            .map(|(method, scale)| {
                scope.spawn(move || {
                    let mut messages = vec![LogMessage::StartMeasurement];

                    for _ in 0..1000 {
                        messages.push(LogMessage::Allocation {
                            description: "Vec<u8>".to_string(),
                            size: scale * 8,
                            location: vec![format!("bench::{}", method.routine().name())],
                        });
                    }

                    messages.push(LogMessage::StopMeasurement {
                        reps: 1000,
                        elapsed_nanos: 1,
                    });

                    collect_trial(TrialId::new(scale), method, messages).unwrap()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    for (trial, scale) in trials.iter().zip(1_u64..) {
        let bytes = trial
            .measurements()
            .iter()
            .find(|m| m.description() == "bytes")
            .unwrap();

        #[expect(
            clippy::cast_precision_loss,
            reason = "test values are far below 2^53"
        )]
        let expected = (scale * 8 * 1000) as f64;

        assert_eq!(bytes.magnitude(), expected);
        assert_eq!(bytes.per_repetition(), expected / 1000.0);
    }
}

#[test]
fn failing_trial_is_reported_as_user_code_failure() {
    let config = RunConfig::default();
    let suite = abc_suite();

    let plan = RunPlan::prepare(&config, &suite, &ProcessorRegistry::new()).unwrap();
    let method = plan.methods().first().unwrap();

    let error =
        collect_trial_output(TrialId::new(0), method, "start\nfail\tassertion failed: x > 0\n")
            .unwrap_err();

    assert!(matches!(
        error,
        Error::TrialFailed { ref message, .. } if message == "assertion failed: x > 0"
    ));
}
