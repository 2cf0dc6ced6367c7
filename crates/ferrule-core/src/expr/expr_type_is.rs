use super::{Expr, ExprKind, Type};
use crate::schema::ModelId;

/// `operand is Model`, true for instances of the model and of models
/// derived from it.
#[derive(Debug, Clone)]
pub struct ExprTypeIs {
    pub operand: Expr,
    pub model: ModelId,
}

impl Expr {
    pub fn type_is(operand: impl Into<Self>, model: ModelId) -> Self {
        Expr::from_parts(
            Type::Bool,
            ExprKind::TypeIs(ExprTypeIs {
                operand: operand.into(),
                model,
            }),
        )
    }
}
