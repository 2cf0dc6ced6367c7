pub mod memory;

use crate::{
    engine::{QueryCompilationContext, QueryableTranslator},
    ExecutionContext,
};
use ferrule_core::{
    expr::{Expr, Param, ValueBuffer},
    Result,
};
use std::{fmt, sync::Arc};

/// The rows a query expression produced, in store order.
pub type Rows = Box<dyn Iterator<Item = Result<ValueBuffer>> + Send>;

/// The store a [`QueryCompiler`](crate::QueryCompiler) compiles queries for.
///
/// The provider decides which sequence arguments become query roots, may
/// rewrite the query before and after translation, translates sequence
/// operators into its own query expressions, and runs those expressions.
pub trait Provider: Send + Sync + fmt::Debug {
    /// Whether a constant list or array argument becomes an inline query
    /// root.
    fn should_convert_to_inline_query_root(&self, candidate: &Expr) -> bool {
        let _ = candidate;
        false
    }

    /// Whether a free sequence parameter becomes a parameter query root.
    fn should_convert_to_parameter_query_root(&self, param: &Param) -> bool {
        let _ = param;
        false
    }

    /// Runs before translation, after query roots were processed.
    fn preprocess(&self, expr: Expr, cx: &mut QueryCompilationContext) -> Result<Expr> {
        let _ = cx;
        Ok(expr)
    }

    /// Runs on the translated shaped query, before its shaper is compiled.
    fn postprocess(&self, expr: Expr, cx: &mut QueryCompilationContext) -> Result<Expr> {
        let _ = cx;
        Ok(expr)
    }

    /// A translator for one compilation.
    fn queryable_translator<'a>(
        &'a self,
        cx: &'a mut QueryCompilationContext,
    ) -> Box<dyn QueryableTranslator + 'a>;

    fn executor(&self) -> Arc<dyn QueryExecutor>;
}

/// Runs the store half of compiled queries.
pub trait QueryExecutor: Send + Sync + fmt::Debug {
    /// Starts executing `query`. Runtime values of the query are evaluated
    /// through `cx`.
    fn execute(&self, query: &Expr, cx: &ExecutionContext) -> Result<Rows>;
}
