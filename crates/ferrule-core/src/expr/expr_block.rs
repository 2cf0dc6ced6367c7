use super::{Expr, ExprKind, Param, Type};

/// A sequence of expressions evaluated in order, with scoped variables.
///
/// The block evaluates to its last expression. Variables start out as the
/// default value of their type.
#[derive(Debug, Clone)]
pub struct ExprBlock {
    pub variables: Vec<Param>,
    pub exprs: Vec<Expr>,
}

impl Expr {
    pub fn block(variables: Vec<Param>, exprs: Vec<Expr>) -> Self {
        let ty = exprs.last().map(|expr| expr.ty().clone()).unwrap_or(Type::Unit);
        Expr::from_parts(ty, ExprKind::Block(ExprBlock { variables, exprs }))
    }

    pub fn as_block(&self) -> Option<&ExprBlock> {
        match self.kind() {
            ExprKind::Block(block) => Some(block),
            _ => None,
        }
    }
}
