use std::collections::BTreeMap;

/// Configuration of one result processor: which type to create and the options to create it with.
///
/// # Examples
///
/// ```
/// use trial_runner::ResultProcessorConfig;
///
/// let config = ResultProcessorConfig::builder()
///     .class_name("trial_runner::LoggingResultProcessor")
///     .option("label", "nightly")
///     .build();
///
/// assert_eq!(config.option("label"), Some("nightly"));
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResultProcessorConfig {
    class_name: String,
    options: BTreeMap<String, String>,
}

impl ResultProcessorConfig {
    /// Starts building a result processor configuration.
    #[must_use]
    #[cfg_attr(test, mutants::skip)] // Gets replaced with itself by different name, bad mutation.
    pub fn builder() -> ResultProcessorConfigBuilder {
        ResultProcessorConfigBuilder::default()
    }

    /// The name under which the result processor type is registered.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// All options of the result processor.
    #[must_use]
    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    /// The value of one option, if set.
    #[must_use]
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Builder for [`ResultProcessorConfig`].
#[derive(Debug, Default)]
#[must_use]
pub struct ResultProcessorConfigBuilder {
    class_name: Option<String>,
    options: BTreeMap<String, String>,
}

impl ResultProcessorConfigBuilder {
    /// Sets the name under which the result processor type is registered.
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Sets one option, replacing any previous value of the same option.
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Panics
    ///
    /// Panics if no class name was set.
    #[must_use]
    pub fn build(self) -> ResultProcessorConfig {
        ResultProcessorConfig {
            class_name: self
                .class_name
                .expect("result processor configuration requires a class name"),
            options: self.options,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn later_option_replaces_earlier() {
        let config = ResultProcessorConfig::builder()
            .class_name("x::Y")
            .option("path", "a.csv")
            .option("path", "b.csv")
            .build();

        assert_eq!(config.class_name(), "x::Y");
        assert_eq!(config.option("path"), Some("b.csv"));
        assert_eq!(config.options().len(), 1);
        assert_eq!(config.option("missing"), None);
    }

    #[test]
    #[should_panic(expected = "requires a class name")]
    fn class_name_is_required() {
        let _config = ResultProcessorConfig::builder().option("a", "b").build();
    }
}
