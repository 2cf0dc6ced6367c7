mod config;
pub use config::{Config, ConstantMode, TrackingBehavior};

pub mod engine;
pub use engine::{
    CompiledQuery, LiftableConstant, PlanCacheKey, ProjectionBinding, QueryCompilationContext,
    QueryCompiler, ResultCardinality, ShapedQuery, StructuralTypeShaper,
};

pub mod provider;

mod runtime;
pub use runtime::{CancellationToken, ExecutionContext, LiftContext, QueryContext};

pub use ferrule_core::{expr, schema, tracking, Error, Result, Schema};
