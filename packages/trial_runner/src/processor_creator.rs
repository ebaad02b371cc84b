use std::any::{Any, type_name};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use foldhash::{HashMap, HashMapExt};
use tracing::debug;

use crate::{
    Error, LoggingResultProcessor, ProcessorError, Result, ResultProcessor, ResultProcessorConfig,
};

type ProcessorResult = Result<Box<dyn ResultProcessor>, ProcessorError>;

/// Whether the harness may use a constructor of a result processor type.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum Visibility {
    /// The harness may use the constructor.
    Public,

    /// The constructor exists but is reserved for the processor's own crate. The harness never
    /// uses it.
    Restricted,
}

#[derive(Clone)]
enum Constructor {
    WithConfig(Arc<dyn Fn(&ResultProcessorConfig) -> ProcessorResult + Send + Sync>),
    NoArgs(Arc<dyn Fn() -> ProcessorResult + Send + Sync>),
}

impl fmt::Debug for Constructor {
    #[cfg_attr(test, mutants::skip)] // Only shows up in log output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WithConfig(_) => f.write_str("WithConfig"),
            Self::NoArgs(_) => f.write_str("NoArgs"),
        }
    }
}

/// A result processor type, registered with the constructors the harness may choose from.
///
/// When creating a processor, a public constructor that takes the configuration is preferred over
/// a public constructor without arguments. Restricted constructors are never used.
///
/// # Examples
///
/// ```
/// use trial_runner::{
///     LoggingResultProcessor, ProcessorType, ResultProcessorConfig, Visibility,
///     create_result_processor,
/// };
///
/// let processor_type = ProcessorType::new("my_crate::QuietProcessor")
///     .no_arg_constructor(Visibility::Public, || Ok(Box::new(LoggingResultProcessor::new())));
///
/// let config = ResultProcessorConfig::builder()
///     .class_name("my_crate::QuietProcessor")
///     .build();
///
/// let processor = create_result_processor(&processor_type, &config)?;
/// # drop(processor);
/// # Ok::<(), trial_runner::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct ProcessorType {
    name: String,
    constructors: Vec<(Visibility, Constructor)>,
}

impl ProcessorType {
    /// Registers a type by its fully qualified name, initially without any constructor.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
        }
    }

    /// Registers a type named after the Rust type `T`, initially without any constructor.
    #[must_use]
    pub fn of<T: ResultProcessor + 'static>() -> Self {
        Self::new(type_name::<T>())
    }

    /// Adds a constructor that receives the result processor configuration.
    #[must_use]
    pub fn with_config_constructor<F>(mut self, visibility: Visibility, factory: F) -> Self
    where
        F: Fn(&ResultProcessorConfig) -> ProcessorResult + Send + Sync + 'static,
    {
        self.constructors
            .push((visibility, Constructor::WithConfig(Arc::new(factory))));
        self
    }

    /// Adds a constructor that takes no arguments.
    #[must_use]
    pub fn no_arg_constructor<F>(mut self, visibility: Visibility, factory: F) -> Self
    where
        F: Fn() -> ProcessorResult + Send + Sync + 'static,
    {
        self.constructors
            .push((visibility, Constructor::NoArgs(Arc::new(factory))));
        self
    }

    /// The fully qualified name of the type.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    fn public_constructor(&self) -> Option<&Constructor> {
        let public = || {
            self.constructors
                .iter()
                .filter(|(visibility, _)| *visibility == Visibility::Public)
                .map(|(_, constructor)| constructor)
        };

        public()
            .find(|constructor| matches!(constructor, Constructor::WithConfig(_)))
            .or_else(|| public().find(|constructor| matches!(constructor, Constructor::NoArgs(_))))
    }
}

/// Maps the class names used in configuration to result processor types.
#[derive(Debug, Default)]
pub struct ProcessorRegistry {
    types: HashMap<String, ProcessorType>,
}

impl ProcessorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: HashMap::new(),
        }
    }

    /// Creates a registry that contains the result processors built into this crate.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(LoggingResultProcessor::processor_type());
        registry
    }

    /// Registers a type under its name, replacing any type previously registered under that name.
    pub fn register(&mut self, processor_type: ProcessorType) {
        self.types
            .insert(processor_type.name().to_string(), processor_type);
    }

    /// The type registered under a class name, if any.
    #[must_use]
    pub fn get(&self, class_name: &str) -> Option<&ProcessorType> {
        self.types.get(class_name)
    }
}

/// Creates a result processor of the given type.
///
/// The constructor is chosen in this order:
///
/// 1. a public constructor that takes the configuration;
/// 2. a public constructor without arguments.
///
/// # Errors
///
/// Returns [`Error::NoValidConstructor`] if the type has neither, and [`Error::UserCode`] if the
/// chosen constructor returns an error or panics.
pub fn create_result_processor(
    processor_type: &ProcessorType,
    config: &ResultProcessorConfig,
) -> Result<Box<dyn ResultProcessor>> {
    let constructor =
        processor_type
            .public_constructor()
            .ok_or_else(|| Error::NoValidConstructor {
                processor_type: processor_type.name().to_string(),
            })?;

    debug!(
        processor_type = processor_type.name(),
        constructor = ?constructor,
        "creating result processor"
    );

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match constructor {
        Constructor::WithConfig(factory) => factory(config),
        Constructor::NoArgs(factory) => factory(),
    }));

    let source = match outcome {
        Ok(Ok(processor)) => return Ok(processor),
        Ok(Err(source)) => source,
        Err(payload) => panic_message("constructor", payload.as_ref()).into(),
    };

    Err(Error::UserCode {
        processor_type: processor_type.name().to_string(),
        source,
    })
}

/// Creates the result processor named by the configuration's class name.
///
/// # Errors
///
/// Returns [`Error::UnknownResultProcessor`] if no type is registered under the class name, or
/// any error of [`create_result_processor()`].
pub fn create_configured_result_processor(
    registry: &ProcessorRegistry,
    config: &ResultProcessorConfig,
) -> Result<Box<dyn ResultProcessor>> {
    let processor_type =
        registry
            .get(config.class_name())
            .ok_or_else(|| Error::UnknownResultProcessor {
                class_name: config.class_name().to_string(),
            })?;

    create_result_processor(processor_type, config)
}

/// Describes a caught panic of user code, using the panic message if it carries one.
pub(crate) fn panic_message(what: &str, payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("{what} panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("{what} panicked: {message}")
    } else {
        format!("{what} panicked")
    }
}
