use super::{Expr, ExprKind, Type};

/// Evaluates the first case with a test value equal to `value`, else the
/// default. Without a default, an unmatched switch evaluates to the zero
/// value of its type.
#[derive(Debug, Clone)]
pub struct ExprSwitch {
    pub value: Expr,
    pub cases: Vec<SwitchCase>,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub tests: Vec<Expr>,
    pub body: Expr,
}

impl SwitchCase {
    pub fn new(tests: Vec<Expr>, body: impl Into<Expr>) -> Self {
        Self {
            tests,
            body: body.into(),
        }
    }
}

impl Expr {
    pub fn switch(ty: Type, value: impl Into<Self>, cases: Vec<SwitchCase>, default: Option<Expr>) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Switch(ExprSwitch {
                value: value.into(),
                cases,
                default,
            }),
        )
    }

    pub fn as_switch(&self) -> Option<&ExprSwitch> {
        match self.kind() {
            ExprKind::Switch(switch) => Some(switch),
            _ => None,
        }
    }
}
