use ferrule_core::{
    expr::{rewrite, Expr, ExprComparer, ExprHasher, Extension, Printer, Rewrite, Type, Visit},
    Result,
};
use std::any::Any;

/// How many results a shaped query produces.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCardinality {
    #[default]
    Sequence,

    /// Exactly one result; zero or several rows are errors.
    Single,

    /// At most one result; zero rows produce the zero value of the type.
    SingleOrDefault,
}

/// A query split into the part the store runs and the part that shapes the
/// store's rows into results.
///
/// A sequence query has the type `Queryable(shaper type)`; single-result
/// queries have the shaper's type.
#[derive(Debug, Clone)]
pub struct ShapedQuery {
    query_expression: Expr,
    shaper: Expr,
    cardinality: ResultCardinality,
}

impl ShapedQuery {
    pub fn new(query_expression: Expr, shaper: Expr) -> Self {
        Self {
            query_expression,
            shaper,
            cardinality: ResultCardinality::Sequence,
        }
    }

    /// Returns the shaped query carried by `expr`, if any.
    pub fn from_expr(expr: &Expr) -> Option<&ShapedQuery> {
        expr.downcast_ref::<ShapedQuery>()
    }

    pub fn query_expression(&self) -> &Expr {
        &self.query_expression
    }

    pub fn shaper(&self) -> &Expr {
        &self.shaper
    }

    pub fn cardinality(&self) -> ResultCardinality {
        self.cardinality
    }

    pub fn with_query_expression(&self, query_expression: Expr) -> Self {
        Self {
            query_expression,
            ..self.clone()
        }
    }

    pub fn with_shaper(&self, shaper: Expr) -> Self {
        Self {
            shaper,
            ..self.clone()
        }
    }

    pub fn with_cardinality(&self, cardinality: ResultCardinality) -> Self {
        Self {
            cardinality,
            ..self.clone()
        }
    }

    pub fn into_expr(self) -> Expr {
        Expr::extension(self)
    }
}

impl Extension for ShapedQuery {
    fn name(&self) -> &str {
        "shaped_query"
    }

    fn ty(&self) -> Type {
        match self.cardinality {
            ResultCardinality::Sequence => Type::queryable(self.shaper.ty().clone()),
            _ => self.shaper.ty().clone(),
        }
    }

    fn visit_children(&self, visit: &mut dyn Visit) {
        visit.visit_expr(&self.query_expression);
        visit.visit_expr(&self.shaper);
    }

    fn rewrite_children(&self, r: &mut dyn Rewrite) -> Result<Option<Expr>> {
        let Some(mut children) = rewrite::rewrite_all(r, &[&self.query_expression, &self.shaper])?
        else {
            return Ok(None);
        };
        let shaper = children.pop();
        let query_expression = children.pop();

        Ok(match (query_expression, shaper) {
            (Some(query_expression), Some(shaper)) => Some(
                ShapedQuery {
                    query_expression,
                    shaper,
                    cardinality: self.cardinality,
                }
                .into_expr(),
            ),
            _ => None,
        })
    }

    fn print(&self, printer: &mut Printer) {
        printer.text("shaped<");
        printer.text(match self.cardinality {
            ResultCardinality::Sequence => "sequence",
            ResultCardinality::Single => "single",
            ResultCardinality::SingleOrDefault => "single_or_default",
        });
        printer.text(">(");
        printer.expr(&self.query_expression);
        printer.text(", ");
        printer.expr(&self.shaper);
        printer.text(")");
    }

    fn eq_extension(&self, other: &dyn Extension, comparer: &mut ExprComparer) -> Result<bool> {
        let Some(other) = other.as_any().downcast_ref::<ShapedQuery>() else {
            return Ok(false);
        };
        Ok(self.cardinality == other.cardinality
            && comparer.equals_expr(&self.query_expression, &other.query_expression)?
            && comparer.equals_expr(&self.shaper, &other.shaper)?)
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.cardinality);
        hasher.hash_expr(&self.query_expression)?;
        hasher.hash_expr(&self.shaper)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ProjectionBinding;

    #[test]
    fn type_follows_cardinality() {
        let query = ShapedQuery::new(Expr::constant(0), ProjectionBinding::column(0, Type::String));
        assert_eq!(query.ty(), Type::queryable(Type::String));
        assert_eq!(
            query.with_cardinality(ResultCardinality::Single).ty(),
            Type::String
        );
    }

    #[test]
    fn updates_allocate_new_instances() {
        let query = ShapedQuery::new(Expr::constant(0), ProjectionBinding::column(0, Type::I32));
        let updated = query.with_cardinality(ResultCardinality::SingleOrDefault);

        assert_eq!(query.cardinality(), ResultCardinality::Sequence);
        assert_eq!(updated.cardinality(), ResultCardinality::SingleOrDefault);
        assert!(Expr::ptr_eq(query.shaper(), updated.shaper()));
    }
}
