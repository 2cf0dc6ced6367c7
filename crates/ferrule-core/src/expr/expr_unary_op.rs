use super::{Expr, ExprKind, Type, UnaryOp};

#[derive(Debug, Clone)]
pub struct ExprUnaryOp {
    pub op: UnaryOp,
    pub operand: Expr,
}

impl Expr {
    pub fn not(operand: impl Into<Self>) -> Self {
        Expr::from_parts(
            Type::Bool,
            ExprKind::Unary(ExprUnaryOp {
                op: UnaryOp::Not,
                operand: operand.into(),
            }),
        )
    }

    pub fn negate(operand: impl Into<Self>) -> Self {
        let operand = operand.into();
        Expr::from_parts(
            operand.ty().clone(),
            ExprKind::Unary(ExprUnaryOp {
                op: UnaryOp::Negate,
                operand,
            }),
        )
    }

    /// Converts `operand` to `ty`.
    pub fn convert(operand: impl Into<Self>, ty: Type) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Unary(ExprUnaryOp {
                op: UnaryOp::Convert,
                operand: operand.into(),
            }),
        )
    }

    pub fn is_null(operand: impl Into<Self>) -> Self {
        Expr::from_parts(
            Type::Bool,
            ExprKind::Unary(ExprUnaryOp {
                op: UnaryOp::IsNull,
                operand: operand.into(),
            }),
        )
    }

    /// Strips one level of conversion, if any.
    pub fn unwrap_convert(&self) -> &Expr {
        match self.kind() {
            ExprKind::Unary(ExprUnaryOp {
                op: UnaryOp::Convert,
                operand,
            }) => operand,
            _ => self,
        }
    }
}
