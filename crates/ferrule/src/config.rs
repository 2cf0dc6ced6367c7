use std::collections::HashSet;

/// How materialized instances relate to the identity map.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackingBehavior {
    /// Instances are registered with the query context's identity map and
    /// reused across executions against the same context.
    #[default]
    TrackAll,

    /// Instances are built fresh for every row.
    NoTracking,

    /// Rows sharing a key resolve to one instance within a single
    /// execution, but nothing is tracked afterwards.
    NoTrackingWithIdentityResolution,
}

impl TrackingBehavior {
    /// Returns `true` when rows sharing a key must resolve to one instance.
    pub fn resolves_identity(self) -> bool {
        !matches!(self, Self::NoTracking)
    }
}

/// What the compiler does with schema handles embedded in a plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstantMode {
    /// Resolve every handle at compile time and embed the result.
    #[default]
    Inline,

    /// Hoist every handle into a named slot resolved when the plan runs,
    /// so the plan can be exported as source.
    Lift,
}

/// Configuration for a [`QueryCompiler`](crate::QueryCompiler).
#[derive(Debug, Clone)]
pub struct Config {
    /// The tracking behavior of queries that don't ask for another one.
    pub tracking: TrackingBehavior,

    pub constant_mode: ConstantMode,

    /// Whether compiled plans are cached and reused.
    pub cache_plans: bool,

    /// Names lifted slots must not take.
    pub reserved_names: HashSet<String>,
}

impl Config {
    /// Create a new Config with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tracking(mut self, tracking: TrackingBehavior) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn constant_mode(mut self, constant_mode: ConstantMode) -> Self {
        self.constant_mode = constant_mode;
        self
    }

    pub fn cache_plans(mut self, cache_plans: bool) -> Self {
        self.cache_plans = cache_plans;
        self
    }

    /// Adds a name lifted slots must avoid.
    pub fn reserve_name(mut self, name: impl Into<String>) -> Self {
        self.reserved_names.insert(name.into());
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tracking: TrackingBehavior::default(),
            constant_mode: ConstantMode::default(),
            cache_plans: true,
            // The parameters of the compiled plan itself.
            reserved_names: ["query_context", "value_buffer", "lift_context"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
