use super::{Expr, ExprKind, Type, Value};

#[derive(Debug, Clone)]
pub struct ExprConstant {
    pub value: Value,
}

impl Expr {
    /// A constant whose type is inferred from the value.
    pub fn constant(value: impl Into<Value>) -> Self {
        let value = value.into();
        Expr::from_parts(value.infer_ty(), ExprKind::Constant(ExprConstant { value }))
    }

    pub fn constant_typed(value: impl Into<Value>, ty: Type) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Constant(ExprConstant {
                value: value.into(),
            }),
        )
    }

    pub fn null(ty: Type) -> Self {
        Expr::constant_typed(Value::Null, ty)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::constant(value)
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::constant(value)
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::constant(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::constant(value)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Expr::constant(value)
    }
}
