use ferrule_core::{
    expr::{visit, Expr, ExprKind, Method, Param, Rewrite},
    Result,
};
use std::collections::HashSet;

/// Replaces every free parameter of `expr` with a read of the runtime
/// parameter of the same name from `query_context`.
///
/// Parameters bound by a lambda or block inside `expr` are left alone.
pub fn parameterize(expr: &Expr, query_context: &Param) -> Result<Expr> {
    Parameterize {
        query_context,
        bound: HashSet::new(),
    }
    .rewrite_expr(expr)
}

/// The names of the parameters `expr` reads from `query_context`.
pub fn parameter_names(expr: &Expr, query_context: &Param) -> HashSet<String> {
    let mut names = HashSet::new();
    visit::for_each_expr(expr, |expr| {
        let Some(call) = expr.as_call() else {
            return;
        };
        if call.method != Method::GetParameter
            || call.target.as_ref().and_then(Expr::as_parameter) != Some(query_context)
        {
            return;
        }
        if let Some(name) = call.args.first().and_then(Expr::as_constant).and_then(|v| v.as_str()) {
            names.insert(name.to_string());
        }
    });
    names
}

struct Parameterize<'a> {
    query_context: &'a Param,
    bound: HashSet<Param>,
}

impl Parameterize<'_> {
    fn scoped(&mut self, params: &[Param], expr: &Expr) -> Result<Expr> {
        let added: Vec<_> = params
            .iter()
            .filter(|param| self.bound.insert((*param).clone()))
            .cloned()
            .collect();
        let ret = expr.rewrite_children(self);
        for param in &added {
            self.bound.remove(param);
        }
        ret
    }
}

impl Rewrite for Parameterize<'_> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        match expr.kind() {
            ExprKind::Lambda(lambda) => self.scoped(&lambda.params, expr),
            ExprKind::Block(block) => self.scoped(&block.variables, expr),
            ExprKind::Try(e) => {
                let params: Vec<_> = e.catch.iter().filter_map(|c| c.param.clone()).collect();
                self.scoped(&params, expr)
            }
            ExprKind::Parameter(param)
                if param != self.query_context && !self.bound.contains(param) =>
            {
                Ok(Expr::get_parameter(
                    self.query_context,
                    param.name(),
                    param.ty().clone(),
                ))
            }
            _ => expr.rewrite_children(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::expr::{Method, Type};

    #[test]
    fn free_parameters_read_the_query_context() {
        let qc = Param::new("query_context", Type::QueryContext);
        let min = Param::new("min", Type::I32);
        let predicate = Expr::lambda1("x", Type::I32, |x| Expr::gt(x, &min));

        let rewritten = parameterize(&predicate, &qc).unwrap();
        let body = &rewritten.as_lambda().unwrap().body;
        let rhs = &body.as_binary_op().unwrap().rhs;
        let call = rhs.as_call().unwrap();

        assert_eq!(call.method, Method::GetParameter);
        assert_eq!(call.target.as_ref().unwrap().as_parameter(), Some(&qc));
        assert_eq!(call.args[0].as_constant().unwrap().as_str(), Some("min"));
        assert!(body.as_binary_op().unwrap().lhs.is_parameter());
    }

    #[test]
    fn parameter_names_are_collected_once() {
        let qc = Param::new("query_context", Type::QueryContext);
        let min = Param::new("min", Type::I32);
        let tree = Expr::lambda1("x", Type::I32, |x| {
            Expr::and_also(Expr::gt(x.clone(), &min), Expr::lt(x, &min))
        });

        let rewritten = parameterize(&tree, &qc).unwrap();
        let names = parameter_names(&rewritten, &qc);
        assert_eq!(names, HashSet::from(["min".to_string()]));
    }

    #[test]
    fn closed_trees_are_returned_as_is() {
        let qc = Param::new("query_context", Type::QueryContext);
        let tree = Expr::lambda1("x", Type::I32, |x| Expr::add(x, 1));

        assert!(Expr::ptr_eq(&tree, &parameterize(&tree, &qc).unwrap()));
    }
}
