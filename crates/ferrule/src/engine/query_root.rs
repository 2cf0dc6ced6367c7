use crate::provider::Provider;
use ferrule_core::{
    expr::{
        rewrite, Expr, ExprComparer, ExprHasher, ExprKind, Extension, Param, Printer, Rewrite,
        Type, Value, Visit,
    },
    schema::ModelRef,
    Result,
};
use std::{any::Any, collections::HashSet};
use tracing::trace;

/// The set of all instances of a mapped model.
#[derive(Debug, Clone)]
pub struct EntityQueryRoot {
    model: ModelRef,
}

/// A sequence given inline in the query, such as a constant list or an
/// array of captured values.
#[derive(Debug, Clone)]
pub struct InlineQueryRoot {
    values: Vec<Expr>,
    element: Type,
}

/// A sequence supplied at execution time through a named parameter.
#[derive(Debug, Clone)]
pub struct ParameterQueryRoot {
    name: String,
    element: Type,
}

impl EntityQueryRoot {
    pub fn new(model: &ModelRef) -> Expr {
        Expr::extension(EntityQueryRoot {
            model: model.clone(),
        })
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }
}

impl InlineQueryRoot {
    pub fn new(element: Type, values: Vec<Expr>) -> Expr {
        Expr::extension(InlineQueryRoot { values, element })
    }

    pub fn values(&self) -> &[Expr] {
        &self.values
    }

    pub fn element(&self) -> &Type {
        &self.element
    }
}

impl ParameterQueryRoot {
    pub fn new(name: impl Into<String>, element: Type) -> Expr {
        Expr::extension(ParameterQueryRoot {
            name: name.into(),
            element,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self) -> &Type {
        &self.element
    }
}

/// Returns `true` if `expr` is one of the query roots.
pub(crate) fn is_query_root(expr: &Expr) -> bool {
    expr.is::<EntityQueryRoot>() || expr.is::<InlineQueryRoot>() || expr.is::<ParameterQueryRoot>()
}

/// Promotes sequence arguments of query operators into query roots.
///
/// Constant lists and arrays of simple values become inline roots, free
/// parameters become parameter roots. Sequences of mapped models are never
/// promoted, and the provider decides whether promotion applies at all.
pub struct QueryRootProcessor<'a> {
    provider: &'a dyn Provider,

    /// Parameters bound by an enclosing lambda or block
    bound: HashSet<Param>,
}

impl<'a> QueryRootProcessor<'a> {
    pub fn new(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            bound: HashSet::new(),
        }
    }

    pub fn process(&mut self, expr: &Expr) -> Result<Expr> {
        self.rewrite_expr(expr)
    }

    fn promote(&self, arg: &Expr) -> Option<Expr> {
        let candidate = arg.unwrap_convert();
        let element = candidate.ty().element()?;
        if element.is_model() {
            return None;
        }

        let root = match candidate.kind() {
            ExprKind::Constant(constant) => {
                let Value::List(items) = &constant.value else {
                    return None;
                };
                if !self.provider.should_convert_to_inline_query_root(candidate) {
                    return None;
                }
                let values = items
                    .iter()
                    .map(|item| Expr::constant_typed(item.clone(), element.clone()))
                    .collect();
                InlineQueryRoot::new(element.clone(), values)
            }
            ExprKind::NewArray(array) => {
                let simple = array.items.iter().all(|item| {
                    matches!(
                        item.unwrap_convert().kind(),
                        ExprKind::Constant(_) | ExprKind::Parameter(_) | ExprKind::Member(_)
                    )
                });
                if !simple || !self.provider.should_convert_to_inline_query_root(candidate) {
                    return None;
                }
                InlineQueryRoot::new(element.clone(), array.items.clone())
            }
            ExprKind::Parameter(param) => {
                if self.bound.contains(param)
                    || !self.provider.should_convert_to_parameter_query_root(param)
                {
                    return None;
                }
                ParameterQueryRoot::new(param.name(), element.clone())
            }
            _ => return None,
        };

        trace!(root = %Printer::print(&root), "promoted sequence argument to query root");
        Some(root)
    }

    fn with_bound(&mut self, params: &[Param], expr: &Expr) -> Result<Expr> {
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

impl Rewrite for QueryRootProcessor<'_> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        let call = match expr.kind() {
            ExprKind::Lambda(lambda) => return self.with_bound(&lambda.params, expr),
            ExprKind::Block(block) => return self.with_bound(&block.variables, expr),
            ExprKind::Try(e) => {
                let params: Vec<_> = e.catch.iter().filter_map(|c| c.param.clone()).collect();
                return self.with_bound(&params, expr);
            }
            ExprKind::Call(call) if call.queryable_method().is_some() => call,
            _ => return expr.rewrite_children(self),
        };

        let mut changed = false;
        let mut args = Vec::with_capacity(call.args.len());

        for arg in &call.args {
            let processed = match self.promote(arg) {
                Some(root) => root,
                None => self.rewrite_expr(arg)?,
            };
            changed |= !Expr::ptr_eq(&processed, arg);
            args.push(processed);
        }

        if !changed {
            return Ok(expr.clone());
        }

        Ok(Expr::call(
            call.method.clone(),
            call.target.clone(),
            args,
            expr.ty().clone(),
        ))
    }
}

impl Extension for EntityQueryRoot {
    fn name(&self) -> &str {
        "entity_query_root"
    }

    fn ty(&self) -> Type {
        Type::queryable(Type::Model(self.model.id()))
    }

    fn print(&self, printer: &mut Printer) {
        printer.text(self.model.name());
    }

    fn eq_extension(&self, other: &dyn Extension, _: &mut ExprComparer) -> Result<bool> {
        Ok(other
            .as_any()
            .downcast_ref::<EntityQueryRoot>()
            .is_some_and(|other| self.model == other.model))
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.model.id());
        hasher.write(self.model.name());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Extension for InlineQueryRoot {
    fn name(&self) -> &str {
        "inline_query_root"
    }

    fn ty(&self) -> Type {
        Type::queryable(self.element.clone())
    }

    fn visit_children(&self, visit: &mut dyn Visit) {
        for value in &self.values {
            visit.visit_expr(value);
        }
    }

    fn rewrite_children(&self, r: &mut dyn Rewrite) -> Result<Option<Expr>> {
        let values: Vec<_> = self.values.iter().collect();
        Ok(rewrite::rewrite_all(r, &values)?.map(|values| {
            Expr::extension(InlineQueryRoot {
                values,
                element: self.element.clone(),
            })
        }))
    }

    fn print(&self, printer: &mut Printer) {
        printer.text("inline[");
        printer.list(&self.values);
        printer.text("]");
    }

    fn eq_extension(&self, other: &dyn Extension, comparer: &mut ExprComparer) -> Result<bool> {
        let Some(other) = other.as_any().downcast_ref::<InlineQueryRoot>() else {
            return Ok(false);
        };
        Ok(self.element == other.element && comparer.equals_all(&self.values, &other.values)?)
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.element);
        hasher.hash_all(&self.values)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Extension for ParameterQueryRoot {
    fn name(&self) -> &str {
        "parameter_query_root"
    }

    fn ty(&self) -> Type {
        Type::queryable(self.element.clone())
    }

    fn print(&self, printer: &mut Printer) {
        printer.text("@");
        printer.text(&self.name);
    }

    fn eq_extension(&self, other: &dyn Extension, _: &mut ExprComparer) -> Result<bool> {
        Ok(other
            .as_any()
            .downcast_ref::<ParameterQueryRoot>()
            .is_some_and(|other| self.name == other.name && self.element == other.element))
    }

    fn hash_extension(&self, hasher: &mut ExprHasher) -> Result<()> {
        hasher.write(&self.name);
        hasher.write(&self.element);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{memory::MemoryProvider, Provider};
    use ferrule_core::{
        expr::{ExprCatch, QueryableMethod},
        Schema,
    };
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        let mut builder = Schema::builder();
        builder.model("Customer", |m| {
            m.key("Id", Type::I32).field("Name", Type::String);
        });
        Arc::new(builder.build().unwrap())
    }

    /// A provider keeping the default root policy.
    #[derive(Debug)]
    struct OptOut;

    impl Provider for OptOut {
        fn queryable_translator<'a>(
            &'a self,
            _: &'a mut crate::QueryCompilationContext,
        ) -> Box<dyn crate::engine::QueryableTranslator + 'a> {
            unreachable!()
        }

        fn executor(&self) -> Arc<dyn crate::provider::QueryExecutor> {
            unreachable!()
        }
    }

    /// `customers.where(|c| ids.contains(c.Id))`
    fn contains_query(schema: &Arc<Schema>, ids: Expr) -> Expr {
        let customer = schema.find_model_ref("Customer").unwrap();
        let root = EntityQueryRoot::new(&customer);
        let predicate = Expr::lambda1("c", Type::Model(customer.id()), |c| {
            Expr::queryable(
                QueryableMethod::Contains,
                ids,
                vec![Expr::property(c, "Id", Type::I32)],
                Type::Bool,
            )
        });
        Expr::queryable(
            QueryableMethod::Where,
            root.clone(),
            vec![predicate],
            root.ty().clone(),
        )
    }

    fn contains_source(query: &Expr) -> Expr {
        let predicate = query.as_call().unwrap().args[1].as_lambda().unwrap();
        predicate.body.as_call().unwrap().args[0].clone()
    }

    #[test]
    fn constant_lists_become_inline_roots() {
        let schema = schema();
        let provider = MemoryProvider::new(schema.clone());
        let ids = Expr::constant(Value::List(vec![Value::I32(1), Value::I32(2)]));
        let ids = Expr::convert(ids.clone(), Type::list(Type::I32));

        let processed = QueryRootProcessor::new(&provider)
            .process(&contains_query(&schema, ids))
            .unwrap();

        let source = contains_source(&processed);
        let root = source.downcast_ref::<InlineQueryRoot>().unwrap();
        assert_eq!(root.values().len(), 2);
        assert_eq!(*root.element(), Type::I32);
    }

    #[test]
    fn free_parameters_become_parameter_roots() {
        let schema = schema();
        let provider = MemoryProvider::new(schema.clone());
        let ids = Param::new("ids", Type::list(Type::I32));

        let processed = QueryRootProcessor::new(&provider)
            .process(&contains_query(&schema, Expr::parameter(&ids)))
            .unwrap();

        let source = contains_source(&processed);
        assert_eq!(source.downcast_ref::<ParameterQueryRoot>().unwrap().name(), "ids");
    }

    #[test]
    fn catch_parameters_are_bound() {
        let provider = MemoryProvider::new(schema());
        let errors = Param::new("errors", Type::list(Type::String));
        let handler = Expr::queryable(
            QueryableMethod::Contains,
            Expr::parameter(&errors),
            vec![Expr::constant("timeout")],
            Type::Bool,
        );
        let tree = Expr::try_catch(
            Expr::constant(false),
            Some(ExprCatch {
                param: Some(errors.clone()),
                body: handler.clone(),
            }),
            None,
        );

        let processed = QueryRootProcessor::new(&provider).process(&tree).unwrap();
        assert!(Expr::ptr_eq(&tree, &processed));

        // Outside the handler the same parameter is free and promoted.
        let processed = QueryRootProcessor::new(&provider).process(&handler).unwrap();
        assert!(processed.as_call().unwrap().args[0].is::<ParameterQueryRoot>());
    }

    #[test]
    fn default_policy_leaves_the_tree_untouched() {
        let schema = schema();
        let ids = Param::new("ids", Type::list(Type::I32));
        let query = contains_query(&schema, Expr::parameter(&ids));

        let processed = QueryRootProcessor::new(&OptOut).process(&query).unwrap();
        assert!(Expr::ptr_eq(&query, &processed));
    }

    #[test]
    fn model_sequences_are_never_promoted() {
        let schema = schema();
        let provider = MemoryProvider::new(schema.clone());
        let customer = schema.find_model_ref("Customer").unwrap();
        let others = Param::new("others", Type::list(Type::Model(customer.id())));
        let root = EntityQueryRoot::new(&customer);
        let query = Expr::queryable(
            QueryableMethod::Concat,
            root.clone(),
            vec![Expr::parameter(&others)],
            root.ty().clone(),
        );

        let processed = QueryRootProcessor::new(&provider).process(&query).unwrap();
        assert!(Expr::ptr_eq(&query, &processed));
    }
}
