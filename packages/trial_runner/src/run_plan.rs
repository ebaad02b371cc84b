use tracing::debug;

use crate::{
    BenchmarkSuite, InstrumentedMethod, ProcessorRegistry, Result, ResultProcessorSet, RunConfig,
    create_configured_result_processor, instruments_from_config, select_instrumented_methods,
};

/// Everything a harness run needs before the first trial: the instrumented methods to measure and
/// the result processors to deliver trials to.
///
/// # Examples
///
/// ```
/// use trial_runner::{BenchmarkSuite, ProcessorRegistry, Routine, RunConfig, RunPlan};
///
/// let suite = BenchmarkSuite::new("strings")
///     .routine(Routine::micro("concat", |_reps| {}))
///     .routine(Routine::micro("split", |_reps| {}));
///
/// let config = RunConfig::from_toml_str(
///     r#"
///     instruments = ["runtime", "allocation"]
///     benchmark_methods = ["split"]
///
///     [results.log]
///     class = "trial_runner::LoggingResultProcessor"
///     "#,
/// )?;
///
/// let plan = RunPlan::prepare(&config, &suite, &ProcessorRegistry::with_builtins())?;
///
/// assert_eq!(plan.methods().len(), 2);
///
/// let (_methods, processors) = plan.into_parts();
/// processors.close()?;
/// # Ok::<(), trial_runner::Error>(())
/// ```
#[derive(Debug)]
pub struct RunPlan {
    methods: Vec<InstrumentedMethod>,
    processors: ResultProcessorSet,
}

impl RunPlan {
    /// Creates the configured instruments, selects the instrumented methods of the suite and
    /// creates the configured result processors.
    ///
    /// # Errors
    ///
    /// Returns any error from creating instruments, selecting methods or creating result
    /// processors. Result processors created before the failure are closed.
    pub fn prepare(
        config: &RunConfig,
        suite: &BenchmarkSuite,
        registry: &ProcessorRegistry,
    ) -> Result<Self> {
        let instruments = instruments_from_config(config)?;

        let methods =
            select_instrumented_methods(&instruments, suite.routines(), config.benchmark_names())?;

        let mut processors = ResultProcessorSet::new();

        for processor_config in config.result_processors() {
            let processor = create_configured_result_processor(registry, processor_config)?;
            processors.push(processor_config.class_name(), processor);
        }

        debug!(
            suite = suite.name(),
            methods = methods.len(),
            processors = processors.len(),
            "run plan prepared"
        );

        Ok(Self {
            methods,
            processors,
        })
    }

    /// The instrumented methods to measure, instruments in configured order and routines in
    /// discovery order.
    #[must_use]
    pub fn methods(&self) -> &[InstrumentedMethod] {
        &self.methods
    }

    /// The result processors that receive the finalized trials.
    #[must_use]
    pub fn processors_mut(&mut self) -> &mut ResultProcessorSet {
        &mut self.processors
    }

    /// Splits the plan into its instrumented methods and result processors.
    #[must_use]
    pub fn into_parts(self) -> (Vec<InstrumentedMethod>, ResultProcessorSet) {
        (self.methods, self.processors)
    }
}
