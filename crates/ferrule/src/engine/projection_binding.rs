use ferrule_core::{
    expr::{Expr, ExprComparer, ExprHasher, Extension, Printer, Type},
    Result,
};
use std::any::Any;

/// A reference, inside a shaper, to the current row of the store's result.
///
/// Lowering replaces bindings with reads of the row the compiled shaper is
/// called with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectionBinding {
    /// `None` binds the whole row.
    index: Option<usize>,
    ty: Type,
}

impl ProjectionBinding {
    /// Binds the whole row buffer.
    pub fn row() -> Expr {
        Expr::extension(ProjectionBinding {
            index: None,
            ty: Type::ValueBuffer,
        })
    }

    /// Binds column `index` of the row, read as `ty`.
    pub fn column(index: usize, ty: Type) -> Expr {
        Expr::extension(ProjectionBinding {
            index: Some(index),
            ty,
        })
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    /// The expression the binding stands for, given the row.
    pub fn bind(&self, row: Expr) -> Expr {
        match self.index {
            Some(index) => Expr::read_value(row, index, self.ty.clone()),
            None => row,
        }
    }
}

impl Extension for ProjectionBinding {
    fn name(&self) -> &str {
        "projection_binding"
    }

    fn ty(&self) -> Type {
        self.ty.clone()
    }

    fn print(&self, printer: &mut Printer) {
        match self.index {
            Some(index) => printer.text(&format!("row[{index}]")),
            None => printer.text("row"),
        }
    }

    fn eq_extension(&self, other: &dyn Extension, _: &mut ExprComparer) -> Result<bool> {
        Ok(other.as_any().downcast_ref::<ProjectionBinding>() == Some(self))
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(self);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
