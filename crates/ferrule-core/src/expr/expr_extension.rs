use super::{Expr, ExprComparer, ExprHasher, Printer, Rewrite, Type, Visit};
use crate::{Error, Result};
use std::{any::Any, fmt};

/// A node kind defined outside of the core expression model.
///
/// Shaped queries, shapers, query roots and provider query expressions are
/// extensions. The core passes reach them only through this capability
/// object. Structural equality and hashing are opt-in: an extension that
/// doesn't implement them makes the comparer fail with an
/// "unhandled node kind" error rather than guess.
pub trait Extension: fmt::Debug + Send + Sync + 'static {
    /// The name of the node kind, used by diagnostics.
    fn name(&self) -> &str;

    fn ty(&self) -> Type;

    fn visit_children(&self, visit: &mut dyn Visit) {
        let _ = visit;
    }

    /// Rewrites the children of the node. Returns `None` when nothing
    /// changed.
    fn rewrite_children(&self, rewrite: &mut dyn Rewrite) -> Result<Option<Expr>> {
        let _ = rewrite;
        Ok(None)
    }

    fn print(&self, printer: &mut Printer) {
        printer.text(self.name());
    }

    /// Compares with an extension node of the same name.
    fn eq_extension(&self, other: &dyn Extension, comparer: &mut ExprComparer) -> Result<bool> {
        let _ = (other, comparer);
        Err(Error::unhandled_node(self.name()))
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        let _ = hasher;
        Err(Error::unhandled_node(self.name()))
    }

    fn as_any(&self) -> &dyn Any;
}
