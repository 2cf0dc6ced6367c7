use super::{Expr, ExprKind, Type};

#[derive(Debug, Clone)]
pub struct ExprNewArray {
    pub items: Vec<Expr>,
}

impl Expr {
    pub fn new_array(item_ty: Type, items: Vec<Expr>) -> Self {
        Expr::from_parts(Type::list(item_ty), ExprKind::NewArray(ExprNewArray { items }))
    }

    pub fn as_new_array(&self) -> Option<&ExprNewArray> {
        match self.kind() {
            ExprKind::NewArray(new_array) => Some(new_array),
            _ => None,
        }
    }
}
