mod cache;
pub use cache::{PlanCache, PlanCacheKey};

mod compile;
pub use compile::{CompiledShaper, ShapedQueryCompiler};

mod context;
pub use context::{Builder, QueryCompilationContext, QueryCompiler};

mod dispatch;
pub use dispatch::{strip_terminating_operators, QueryableMethodTranslator, QueryableTranslator};

mod exec;

pub mod export;

pub mod lift;
pub use lift::{ConstantLifter, LiftableConstant, LiftedConstant, LiftedConstants};

mod parameterize;
pub use parameterize::{parameter_names, parameterize};

mod plan;
pub use plan::CompiledQuery;

mod projection_binding;
pub use projection_binding::ProjectionBinding;

mod query_root;
pub use query_root::{EntityQueryRoot, InlineQueryRoot, ParameterQueryRoot, QueryRootProcessor};

mod shaped_query;
pub use shaped_query::{ResultCardinality, ShapedQuery};

mod shaper;
pub use shaper::StructuralTypeShaper;
