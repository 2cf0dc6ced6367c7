use super::{Expr, ExprKind};

/// `test ? if_true : if_false`
#[derive(Debug, Clone)]
pub struct ExprConditional {
    pub test: Expr,
    pub if_true: Expr,
    pub if_false: Expr,
}

impl Expr {
    /// The type of the conditional is the type of `if_true`.
    pub fn condition(test: impl Into<Self>, if_true: impl Into<Self>, if_false: impl Into<Self>) -> Self {
        let if_true = if_true.into();
        Expr::from_parts(
            if_true.ty().clone(),
            ExprKind::Conditional(ExprConditional {
                test: test.into(),
                if_true,
                if_false: if_false.into(),
            }),
        )
    }
}
