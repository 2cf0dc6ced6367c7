use super::{Expr, ExprKind, Type};

/// Reads the named member of `target`.
#[derive(Debug, Clone)]
pub struct ExprMember {
    pub target: Expr,
    pub name: String,
}

impl Expr {
    pub fn member(target: impl Into<Self>, name: impl Into<String>, ty: Type) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Member(ExprMember {
                target: target.into(),
                name: name.into(),
            }),
        )
    }

    pub fn as_member(&self) -> Option<&ExprMember> {
        match self.kind() {
            ExprKind::Member(member) => Some(member),
            _ => None,
        }
    }
}
