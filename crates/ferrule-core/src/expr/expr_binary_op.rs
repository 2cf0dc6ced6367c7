use super::{BinaryOp, Expr, ExprKind, Param, Type};

/// A binary operation between two expressions.
///
/// # Examples
///
/// ```text
/// a + b
/// a == b
/// a && b
/// a ?? b     // b when a is null
/// x = a      // assigns to the variable x, evaluates to a
/// ```
#[derive(Debug, Clone)]
pub struct ExprBinaryOp {
    pub op: BinaryOp,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Expr {
    pub fn binary_op(lhs: impl Into<Self>, op: BinaryOp, rhs: impl Into<Self>) -> Self {
        let lhs = lhs.into();
        let rhs = rhs.into();

        let ty = if op.is_comparison() || op.is_logical() {
            Type::Bool
        } else {
            lhs.ty().clone()
        };

        Expr::from_parts(ty, ExprKind::Binary(ExprBinaryOp { op, lhs, rhs }))
    }

    pub fn add(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::Add, rhs)
    }

    pub fn eq(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::Eq, rhs)
    }

    pub fn ne(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::Ne, rhs)
    }

    pub fn lt(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::Lt, rhs)
    }

    pub fn gt(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::Gt, rhs)
    }

    pub fn and_also(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::AndAlso, rhs)
    }

    pub fn or_else(lhs: impl Into<Self>, rhs: impl Into<Self>) -> Self {
        Expr::binary_op(lhs, BinaryOp::OrElse, rhs)
    }

    /// Combines the operands with `&&`, or `true` when there are none.
    pub fn and_all(operands: impl IntoIterator<Item = Expr>) -> Self {
        operands
            .into_iter()
            .reduce(Expr::and_also)
            .unwrap_or_else(|| Expr::constant(true))
    }

    /// Assigns `value` to a block variable.
    pub fn assign(variable: &Param, value: impl Into<Self>) -> Self {
        Expr::binary_op(variable, BinaryOp::Assign, value)
    }

    pub fn as_binary_op(&self) -> Option<&ExprBinaryOp> {
        match self.kind() {
            ExprKind::Binary(binary) => Some(binary),
            _ => None,
        }
    }
}
