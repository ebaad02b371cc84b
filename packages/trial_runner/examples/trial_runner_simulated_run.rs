//! Runs a small benchmark suite with an in-process stand-in for the worker.
//!
//! A real harness executes each instrumented method in a separate worker process and reads the
//! messages from its output. Here the "worker" is a function that runs the routine and writes the
//! same message lines.

use std::fmt::Write as _;
use std::hint::black_box;
use std::time::Instant;

use trial_runner::{
    BenchmarkSuite, InstrumentedMethod, ProcessorRegistry, Routine, RunConfig, RunPlan, TrialId,
    collect_trial_output,
};

const REPS: u64 = 10_000;

fn main() {
    let suite = BenchmarkSuite::new("numbers")
        .routine(Routine::micro("sum_range", |reps| {
            for _ in 0..reps {
                black_box((0..100_u64).sum::<u64>());
            }
        }))
        .routine(Routine::micro("format_number", |reps| {
            for i in 0..reps {
                black_box(i.to_string());
            }
        }));

    let config = RunConfig::from_toml_str(
        r#"
        instruments = ["runtime"]

        [instrument.runtime]
        measurements = 3

        [results.log]
        class = "trial_runner::LoggingResultProcessor"

        [results.log.options]
        label = "example"
        "#,
    )
    .unwrap();

    let plan = RunPlan::prepare(&config, &suite, &ProcessorRegistry::with_builtins()).unwrap();
    let (methods, mut processors) = plan.into_parts();

    let mut id = TrialId::new(0);

    for method in &methods {
        let output = simulate_worker(method, 3);
        let trial = collect_trial_output(id, method, &output).unwrap();

        for measurement in trial.measurements() {
            println!(
                "{method} {id}: {:.2} {} per repetition",
                measurement.per_repetition(),
                measurement.unit()
            );
        }

        processors.process_trial(&trial).unwrap();
        id = id.next();
    }

    processors.close().unwrap();
}

fn simulate_worker(method: &InstrumentedMethod, measurements: u32) -> String {
    let mut output = String::new();

    for _ in 0..measurements {
        let start = Instant::now();
        output.push_str("start\n");

        method.routine().invoke(REPS);

        let elapsed_nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
        writeln!(output, "stop\t{REPS}\t{elapsed_nanos}").unwrap();
    }

    output
}
