use super::{LiftedConstants, ResultCardinality};
use crate::{provider::QueryExecutor, TrackingBehavior};
use ferrule_core::expr::{Expr, Param, Type};
use std::{fmt, sync::Arc};

/// A query compiled for execution.
///
/// Plans are immutable and shared through the plan cache. Each execution
/// resolves the lifted slots, runs the prologue, then feeds every row of
/// the store half through the shaper.
pub struct CompiledQuery {
    /// The store half, handed to the executor
    pub(super) query_expression: Expr,

    /// `|query_context, value_buffer| result`
    pub(super) shaper: Expr,

    /// Statements run before the store half, such as runtime parameter
    /// extraction
    pub(super) prologue: Vec<Expr>,

    pub(super) cardinality: ResultCardinality,

    pub(super) is_async: bool,

    pub(super) tracking: TrackingBehavior,

    /// Slots resolved once per execution. Empty when constants were
    /// inlined.
    pub(super) lifted: LiftedConstants,

    /// The parameter slot bodies read the lift context through
    pub(super) lift_context: Param,

    /// The parameter the plan reads the query context through
    pub(super) query_context: Param,

    /// The type of one result
    pub(super) result_ty: Type,

    pub(super) executor: Arc<dyn QueryExecutor>,
}

impl CompiledQuery {
    pub fn query_expression(&self) -> &Expr {
        &self.query_expression
    }

    pub fn shaper(&self) -> &Expr {
        &self.shaper
    }

    pub fn prologue(&self) -> &[Expr] {
        &self.prologue
    }

    pub fn cardinality(&self) -> ResultCardinality {
        self.cardinality
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn tracking(&self) -> TrackingBehavior {
        self.tracking
    }

    pub fn lifted(&self) -> &LiftedConstants {
        &self.lifted
    }

    pub fn lift_context(&self) -> &Param {
        &self.lift_context
    }

    pub fn query_context(&self) -> &Param {
        &self.query_context
    }

    pub fn result_ty(&self) -> &Type {
        &self.result_ty
    }
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledQuery")
            .field("query_expression", &self.query_expression)
            .field("cardinality", &self.cardinality)
            .field("is_async", &self.is_async)
            .field("tracking", &self.tracking)
            .field("slots", &self.lifted.slots().len())
            .finish()
    }
}
