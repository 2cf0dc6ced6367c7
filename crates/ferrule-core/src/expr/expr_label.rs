use super::{Expr, ExprKind, LabelTarget};

/// Marks a position jumps can target. Falling through evaluates `default`;
/// a jump here evaluates to the jump's value.
#[derive(Debug, Clone)]
pub struct ExprLabel {
    pub target: LabelTarget,
    pub default: Option<Expr>,
}

impl Expr {
    pub fn label(target: &LabelTarget, default: Option<Expr>) -> Self {
        Expr::from_parts(
            target.ty().clone(),
            ExprKind::Label(ExprLabel {
                target: target.clone(),
                default,
            }),
        )
    }
}
