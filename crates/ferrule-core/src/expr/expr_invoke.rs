use super::{Expr, ExprKind, Type};

/// Invokes a function value with arguments.
#[derive(Debug, Clone)]
pub struct ExprInvoke {
    pub func: Expr,
    pub args: Vec<Expr>,
}

impl Expr {
    pub fn invoke(func: impl Into<Self>, args: Vec<Expr>) -> Self {
        let func = func.into();
        let ty = func.ty().ret().cloned().unwrap_or(Type::Any);
        Expr::from_parts(ty, ExprKind::Invoke(ExprInvoke { func, args }))
    }
}
