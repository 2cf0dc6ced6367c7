use super::{Expr, ExprKind, Type};

/// `target[index]` over a list, record or row.
#[derive(Debug, Clone)]
pub struct ExprIndex {
    pub target: Expr,
    pub index: Expr,
}

impl Expr {
    pub fn index(target: impl Into<Self>, index: usize, ty: Type) -> Self {
        Expr::from_parts(
            ty,
            ExprKind::Index(ExprIndex {
                target: target.into(),
                index: Expr::constant(index as i64),
            }),
        )
    }

    /// Reads a field of a record, taking the type from the record type.
    pub fn record_field(target: impl Into<Self>, index: usize) -> Self {
        let target = target.into();
        let ty = match target.ty() {
            Type::Record(fields) => fields.get(index).cloned().unwrap_or(Type::Any),
            _ => Type::Any,
        };
        Expr::index(target, index, ty)
    }
}
