use super::{Expr, ExprKind, LabelTarget, Type};

/// Evaluates `body` repeatedly until a break to `break_label`.
#[derive(Debug, Clone)]
pub struct ExprLoop {
    pub body: Expr,
    pub break_label: Option<LabelTarget>,
    pub continue_label: Option<LabelTarget>,
}

impl Expr {
    pub fn loop_(
        body: impl Into<Self>,
        break_label: Option<LabelTarget>,
        continue_label: Option<LabelTarget>,
    ) -> Self {
        let ty = break_label
            .as_ref()
            .map(|label| label.ty().clone())
            .unwrap_or(Type::Unit);
        Expr::from_parts(
            ty,
            ExprKind::Loop(ExprLoop {
                body: body.into(),
                break_label,
                continue_label,
            }),
        )
    }
}
