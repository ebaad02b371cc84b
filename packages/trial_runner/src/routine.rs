use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Marker declared by routines that measure a batch of repetitions per invocation.
pub const BENCHMARK_MARKER: &str = "benchmark";

/// Marker declared by routines that perform one long-running operation per invocation.
pub const MACROBENCHMARK_MARKER: &str = "macrobenchmark";

/// How a benchmark routine expects to be invoked.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum RoutineKind {
    /// The routine receives a repetition count and loops internally.
    Micro,

    /// The routine performs one operation per call and is called once per repetition.
    Macro,
}

#[derive(Clone)]
enum RoutineBody {
    Micro(Arc<dyn Fn(u64) + Send + Sync>),
    Macro(Arc<dyn Fn() + Send + Sync>),
}

/// A benchmark routine discovered in user code.
///
/// A routine has a name that is unique within its [`BenchmarkSuite`], the markers it was declared
/// with and an invocable body. Instruments inspect the kind and markers to decide whether they
/// can measure the routine.
///
/// # Examples
///
/// ```
/// use std::hint::black_box;
///
/// use trial_runner::{BENCHMARK_MARKER, Routine, RoutineKind};
///
/// let routine = Routine::micro("sum_vec", |reps| {
///     for _ in 0..reps {
///         black_box((0..100_u64).sum::<u64>());
///     }
/// });
///
/// assert_eq!(routine.name(), "sum_vec");
/// assert_eq!(routine.kind(), RoutineKind::Micro);
/// assert!(routine.has_marker(BENCHMARK_MARKER));
///
/// routine.invoke(10);
/// ```
#[derive(derive_more::Debug)]
pub struct Routine {
    name: String,
    kind: RoutineKind,
    markers: Vec<String>,

    #[debug(ignore)]
    body: RoutineBody,
}

impl Routine {
    /// Creates a routine that receives the repetition count and loops internally.
    ///
    /// The routine is declared with the [`BENCHMARK_MARKER`] marker.
    #[must_use]
    pub fn micro(name: impl Into<String>, body: impl Fn(u64) + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            kind: RoutineKind::Micro,
            markers: vec![BENCHMARK_MARKER.to_string()],
            body: RoutineBody::Micro(Arc::new(body)),
        }
    }

    /// Creates a routine that performs one operation per call.
    ///
    /// The routine is declared with the [`MACROBENCHMARK_MARKER`] marker.
    #[must_use]
    pub fn macro_benchmark(
        name: impl Into<String>,
        body: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RoutineKind::Macro,
            markers: vec![MACROBENCHMARK_MARKER.to_string()],
            body: RoutineBody::Macro(Arc::new(body)),
        }
    }

    /// Declares an additional marker on the routine.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        let marker = marker.into();

        if !self.has_marker(&marker) {
            self.markers.push(marker);
        }

        self
    }

    /// The name of the routine, unique within its suite.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the routine expects to be invoked.
    #[must_use]
    pub fn kind(&self) -> RoutineKind {
        self.kind
    }

    /// The markers the routine was declared with.
    #[must_use]
    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// Whether the routine was declared with the given marker.
    #[must_use]
    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| m == marker)
    }

    /// Executes `reps` repetitions of the routine.
    pub fn invoke(&self, reps: u64) {
        match &self.body {
            RoutineBody::Micro(body) => body(reps),
            RoutineBody::Macro(body) => {
                for _ in 0..reps {
                    body();
                }
            }
        }
    }
}

// Names are unique within a suite, so the name identifies the routine.
impl PartialEq for Routine {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Routine {}

impl Hash for Routine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Routine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The benchmark routines found on one user type, in discovery order.
///
/// # Examples
///
/// ```
/// use trial_runner::{BenchmarkSuite, Routine};
///
/// let suite = BenchmarkSuite::new("collections")
///     .routine(Routine::micro("vec_push", |_reps| {}))
///     .routine(Routine::macro_benchmark("build_index", || {}));
///
/// assert_eq!(suite.routines().len(), 2);
/// ```
#[derive(Debug)]
pub struct BenchmarkSuite {
    name: String,
    routines: Vec<Arc<Routine>>,
}

impl BenchmarkSuite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routines: Vec::new(),
        }
    }

    /// Adds a routine to the suite, after all previously added routines.
    ///
    /// # Panics
    ///
    /// Panics if the suite already contains a routine with the same name.
    #[must_use]
    pub fn routine(mut self, routine: Routine) -> Self {
        assert!(
            !self.routines.iter().any(|r| r.name() == routine.name()),
            "benchmark suite '{}' already contains a routine named '{}'",
            self.name,
            routine.name()
        );

        self.routines.push(Arc::new(routine));
        self
    }

    /// The name of the suite.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The routines of the suite, in discovery order.
    #[must_use]
    pub fn routines(&self) -> &[Arc<Routine>] {
        &self.routines
    }
}
