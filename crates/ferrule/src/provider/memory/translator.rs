use super::{Aggregate, MemoryQueryExpression, Operation, OrderKey, SetKind, Source};
use crate::engine::{
    EntityQueryRoot, InlineQueryRoot, ParameterQueryRoot, ProjectionBinding,
    QueryCompilationContext, QueryableTranslator, ResultCardinality, ShapedQuery,
    StructuralTypeShaper,
};
use ferrule_core::{
    bail,
    expr::{
        visit, Expr, ExprComparer, ExprKind, Method, Param, Printer, QueryableMethod, Rewrite,
        Type, Value,
    },
    schema::ModelRef,
    Result,
};
use std::collections::HashMap;
use tracing::trace;

/// Translates sequence operators into [`MemoryQueryExpression`]s.
///
/// Lambdas over elements are rebound as lambdas over rows: the element
/// parameter is replaced by the source's shaper, and property reads on
/// entity shapers become column reads.
pub(super) struct MemoryTranslator<'a> {
    cx: &'a mut QueryCompilationContext,
    details: Vec<String>,
}

impl<'a> MemoryTranslator<'a> {
    pub(super) fn new(cx: &'a mut QueryCompilationContext) -> Self {
        Self { cx, details: vec![] }
    }

    fn fail<T>(&mut self, details: impl Into<String>) -> Option<T> {
        let details = details.into();
        trace!(%details, "operator not translated");
        self.details.push(details);
        None
    }

    fn query<'q>(&mut self, source: &'q ShapedQuery) -> Option<&'q MemoryQueryExpression> {
        match source
            .query_expression()
            .downcast_ref::<MemoryQueryExpression>()
        {
            Some(query) if query.is_aggregated() => {
                self.fail("no operator can follow an aggregate")
            }
            Some(query) => Some(query),
            None => self.fail(format!(
                "`{}` is not a query against the in-memory store",
                Printer::print(source.query_expression())
            )),
        }
    }

    fn push(&mut self, source: ShapedQuery, operation: Operation) -> Option<ShapedQuery> {
        let query = self.query(&source)?.with(operation);
        Some(source.with_query_expression(query.into_expr()))
    }

    /// Rebinds a lambda over the elements of `source` as a lambda over its
    /// rows.
    fn row_function(&mut self, source: &ShapedQuery, lambda: &Expr) -> Option<Expr> {
        let bound = rebind(source.shaper(), lambda, self.cx.query_context()).and_then(
            |(row, body)| {
                if visit::any_expr(&body, |expr| expr.is::<StructuralTypeShaper>()) {
                    bail!(
                        "`{}` uses whole entity instances, which rows cannot provide",
                        Printer::print(lambda)
                    );
                }
                Ok(Expr::lambda(vec![row], body))
            },
        );

        match bound {
            Ok(function) => Some(function),
            Err(err) => self.fail(err.to_string()),
        }
    }

    /// The element of `source` as a function of its row. Entity elements
    /// have no such function.
    fn element_function(&mut self, source: &ShapedQuery) -> Option<Expr> {
        let row = Param::new("row", Type::ValueBuffer);
        let element = match over_row(source.shaper(), &row) {
            Ok(element) => element,
            Err(err) => return self.fail(err.to_string()),
        };

        if visit::any_expr(&element, |expr| expr.is::<StructuralTypeShaper>()) {
            return self.fail(format!(
                "elements of type `{}` cannot be computed from a row",
                source.shaper().ty()
            ));
        }
        Some(Expr::lambda(vec![row], element))
    }

    /// The key telling elements of `source` apart. `None` compares whole
    /// rows, which entity elements occupy.
    fn element_key(&mut self, source: &ShapedQuery) -> Option<Option<Expr>> {
        if visit::any_expr(source.shaper(), |expr| expr.is::<StructuralTypeShaper>()) {
            return Some(None);
        }
        self.element_function(source).map(Some)
    }

    /// A skip or take count. Counts computed from parameters are extracted
    /// once per execution.
    fn count(&mut self, name: &str, count: &Expr) -> Option<Expr> {
        if count.is_constant() {
            return Some(count.clone());
        }

        let extractor = Expr::lambda(vec![self.cx.query_context().clone()], count.clone());
        match self.cx.register_runtime_parameter(name, extractor) {
            Ok(read) => Some(read),
            Err(err) => self.fail(err.to_string()),
        }
    }

    fn filtered(&mut self, source: ShapedQuery, predicate: Option<&Expr>) -> Option<ShapedQuery> {
        match predicate {
            Some(predicate) => self.translate_where(source, predicate),
            None => Some(source),
        }
    }

    fn aggregate(
        &mut self,
        source: ShapedQuery,
        aggregate: Aggregate,
        ty: &Type,
    ) -> Option<ShapedQuery> {
        let aggregated = self.push(source, Operation::Aggregate(aggregate))?;
        Some(
            aggregated
                .with_shaper(ProjectionBinding::column(0, ty.clone()))
                .with_cardinality(ResultCardinality::Single),
        )
    }

    fn selected(&mut self, source: &ShapedQuery, selector: Option<&Expr>) -> Option<Expr> {
        match selector {
            Some(selector) => self.row_function(source, selector),
            None => self.element_function(source),
        }
    }

    fn set(&mut self, source: ShapedQuery, other: ShapedQuery, kind: SetKind) -> Option<ShapedQuery> {
        let same_shape = ExprComparer::equals(source.shaper(), other.shaper()).unwrap_or(false);
        if !same_shape {
            return self.fail(format!(
                "both sides of `{kind:?}` must produce the same shape",
            ));
        }

        let other = self.query(&other)?.clone().into_expr();
        let key = self.element_key(&source)?;
        self.push(source, Operation::Set { kind, other, key })
    }

    fn unsupported<T>(&mut self, operator: &str) -> Option<T> {
        self.fail(format!("`{operator}` is not supported by the in-memory store"))
    }
}

impl QueryableTranslator for MemoryTranslator<'_> {
    fn create_shaped_query(&mut self, root: &EntityQueryRoot) -> Option<ShapedQuery> {
        let model = root.model();
        let table = model.schema().root_of(model.id());

        let mut query = MemoryQueryExpression::new(Source::Table(table));
        if table != model.id() {
            let Some(filter) = discriminator_filter(model) else {
                return self.fail(format!("`{}` has no discriminator", model.name()));
            };
            query = query.with(Operation::Filter(filter));
        }

        Some(ShapedQuery::new(
            query.into_expr(),
            StructuralTypeShaper::new(model, ProjectionBinding::row(), false),
        ))
    }

    fn translate_inline_query_root(&mut self, root: &InlineQueryRoot) -> Option<ShapedQuery> {
        Some(ShapedQuery::new(
            MemoryQueryExpression::new(Source::Values(root.values().to_vec())).into_expr(),
            ProjectionBinding::column(0, root.element().clone()),
        ))
    }

    fn translate_parameter_query_root(&mut self, root: &ParameterQueryRoot) -> Option<ShapedQuery> {
        let list = Expr::get_parameter(
            self.cx.query_context(),
            root.name(),
            Type::list(root.element().clone()),
        );
        Some(ShapedQuery::new(
            MemoryQueryExpression::new(Source::List(list)).into_expr(),
            ProjectionBinding::column(0, root.element().clone()),
        ))
    }

    fn translate_all(&mut self, source: ShapedQuery, predicate: &Expr) -> Option<ShapedQuery> {
        let predicate = self.row_function(&source, predicate)?;
        self.aggregate(source, Aggregate::All(predicate), &Type::Bool)
    }

    fn translate_any(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        self.aggregate(source, Aggregate::Any, &Type::Bool)
    }

    fn translate_average(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery> {
        let selector = self.selected(&source, selector)?;
        self.aggregate(source, Aggregate::Average(selector), result_ty)
    }

    fn translate_cast(&mut self, source: ShapedQuery, ty: &Type) -> Option<ShapedQuery> {
        let element = source.shaper().ty().clone();
        let upcast = match (&element, ty) {
            (Type::Model(from), Type::Model(to)) => self.cx.schema().is_assignable(*from, *to),
            _ => false,
        };

        if element == *ty || upcast {
            return Some(source);
        }
        self.fail(format!("cannot cast elements of type `{element}` to `{ty}`"))
    }

    fn translate_concat(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery> {
        self.set(source, other, SetKind::Concat)
    }

    fn translate_contains(&mut self, source: ShapedQuery, item: &Expr) -> Option<ShapedQuery> {
        let element = self.element_function(&source)?;
        self.aggregate(
            source,
            Aggregate::Contains {
                element,
                item: item.clone(),
            },
            &Type::Bool,
        )
    }

    fn translate_count(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        self.aggregate(source, Aggregate::Count, &Type::I32)
    }

    fn translate_default_if_empty(
        &mut self,
        _: ShapedQuery,
        _: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        self.unsupported("default_if_empty")
    }

    fn translate_distinct(&mut self, source: ShapedQuery) -> Option<ShapedQuery> {
        let key = self.element_key(&source)?;
        self.push(source, Operation::Distinct(key))
    }

    fn translate_element_at(
        &mut self,
        source: ShapedQuery,
        index: &Expr,
        _: bool,
    ) -> Option<ShapedQuery> {
        let index = self.count("index", index)?;
        let source = self.push(source, Operation::Skip(index))?;
        self.push(source, Operation::Take(Expr::constant(1)))
    }

    fn translate_except(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery> {
        self.set(source, other, SetKind::Except)
    }

    fn translate_first_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        _: &Type,
        _: bool,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        self.push(source, Operation::Take(Expr::constant(1)))
    }

    fn translate_group_by(
        &mut self,
        _: ShapedQuery,
        _: &Expr,
        _: Option<&Expr>,
        _: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        self.unsupported("group_by")
    }

    fn translate_group_join(
        &mut self,
        _: ShapedQuery,
        _: ShapedQuery,
        _: &Expr,
        _: &Expr,
        _: &Expr,
    ) -> Option<ShapedQuery> {
        self.unsupported("group_join")
    }

    fn translate_intersect(
        &mut self,
        source: ShapedQuery,
        other: ShapedQuery,
    ) -> Option<ShapedQuery> {
        self.set(source, other, SetKind::Intersect)
    }

    fn translate_join(
        &mut self,
        _: ShapedQuery,
        _: ShapedQuery,
        _: &Expr,
        _: &Expr,
        _: &Expr,
    ) -> Option<ShapedQuery> {
        self.unsupported("join")
    }

    fn translate_last_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        _: &Type,
        _: bool,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        let source = self.push(source, Operation::Reverse)?;
        self.push(source, Operation::Take(Expr::constant(1)))
    }

    fn translate_left_join(
        &mut self,
        _: ShapedQuery,
        _: ShapedQuery,
        _: &Expr,
        _: &Expr,
        _: &Expr,
    ) -> Option<ShapedQuery> {
        self.unsupported("left_join")
    }

    fn translate_long_count(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        self.aggregate(source, Aggregate::LongCount, &Type::I64)
    }

    fn translate_max(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery> {
        let selector = self.selected(&source, selector)?;
        self.aggregate(source, Aggregate::Max(selector), result_ty)
    }

    fn translate_min(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery> {
        let selector = self.selected(&source, selector)?;
        self.aggregate(source, Aggregate::Min(selector), result_ty)
    }

    fn translate_of_type(&mut self, source: ShapedQuery, ty: &Type) -> Option<ShapedQuery> {
        let (Type::Model(target), Some(shaper)) =
            (ty, source.shaper().downcast_ref::<StructuralTypeShaper>())
        else {
            return self.fail(format!(
                "only entity sequences can be narrowed to `{ty}`"
            ));
        };

        let model = shaper.model();
        if model.id() == *target {
            return Some(source);
        }

        let schema = model.schema();
        if !schema.is_assignable(*target, model.id()) {
            return self.fail(format!(
                "`{}` does not derive from `{}`",
                schema.model(*target).name,
                model.name()
            ));
        }

        let target = schema.model_ref(*target);
        let Some(filter) = discriminator_filter(&target) else {
            return self.fail(format!("`{}` has no discriminator", target.name()));
        };
        let narrowed = source.with_shaper(StructuralTypeShaper::new(
            &target,
            shaper.value_buffer().clone(),
            shaper.is_nullable(),
        ));
        self.push(narrowed, Operation::Filter(filter))
    }

    fn translate_order_by(
        &mut self,
        source: ShapedQuery,
        key_selector: &Expr,
        ascending: bool,
    ) -> Option<ShapedQuery> {
        let key = self.row_function(&source, key_selector)?;
        self.push(source, Operation::OrderBy(vec![OrderKey { key, ascending }]))
    }

    fn translate_reverse(&mut self, source: ShapedQuery) -> Option<ShapedQuery> {
        self.push(source, Operation::Reverse)
    }

    fn translate_select(&mut self, source: ShapedQuery, selector: &Expr) -> Option<ShapedQuery> {
        self.query(&source)?;

        match rebind(source.shaper(), selector, self.cx.query_context()) {
            Ok((row, body)) => {
                let rows = HashMap::from([(row, ProjectionBinding::row())]);
                match body.replace_params(&rows) {
                    Ok(shaper) => Some(source.with_shaper(shaper)),
                    Err(err) => self.fail(err.to_string()),
                }
            }
            Err(err) => self.fail(err.to_string()),
        }
    }

    fn translate_select_many(
        &mut self,
        _: ShapedQuery,
        _: &Expr,
        _: Option<&Expr>,
    ) -> Option<ShapedQuery> {
        self.unsupported("select_many")
    }

    fn translate_single_or_default(
        &mut self,
        source: ShapedQuery,
        predicate: Option<&Expr>,
        _: &Type,
        _: bool,
    ) -> Option<ShapedQuery> {
        let source = self.filtered(source, predicate)?;
        self.push(source, Operation::Take(Expr::constant(2)))
    }

    fn translate_skip(&mut self, source: ShapedQuery, count: &Expr) -> Option<ShapedQuery> {
        let count = self.count("skip", count)?;
        self.push(source, Operation::Skip(count))
    }

    fn translate_skip_while(
        &mut self,
        source: ShapedQuery,
        predicate: &Expr,
    ) -> Option<ShapedQuery> {
        let predicate = self.row_function(&source, predicate)?;
        self.push(source, Operation::SkipWhile(predicate))
    }

    fn translate_sum(
        &mut self,
        source: ShapedQuery,
        selector: Option<&Expr>,
        result_ty: &Type,
    ) -> Option<ShapedQuery> {
        let selector = self.selected(&source, selector)?;
        self.aggregate(source, Aggregate::Sum(selector), result_ty)
    }

    fn translate_take(&mut self, source: ShapedQuery, count: &Expr) -> Option<ShapedQuery> {
        let count = self.count("take", count)?;
        self.push(source, Operation::Take(count))
    }

    fn translate_take_while(
        &mut self,
        source: ShapedQuery,
        predicate: &Expr,
    ) -> Option<ShapedQuery> {
        let predicate = self.row_function(&source, predicate)?;
        self.push(source, Operation::TakeWhile(predicate))
    }

    fn translate_then_by(
        &mut self,
        source: ShapedQuery,
        key_selector: &Expr,
        ascending: bool,
    ) -> Option<ShapedQuery> {
        let key = self.row_function(&source, key_selector)?;
        match self.query(&source)?.then_by(OrderKey { key, ascending }) {
            Some(query) => Some(source.with_query_expression(query.into_expr())),
            None => self.fail("`then_by` must directly follow an ordering"),
        }
    }

    fn translate_union(&mut self, source: ShapedQuery, other: ShapedQuery) -> Option<ShapedQuery> {
        self.set(source, other, SetKind::Union)
    }

    fn translate_where(&mut self, source: ShapedQuery, predicate: &Expr) -> Option<ShapedQuery> {
        let predicate = self.row_function(&source, predicate)?;
        self.push(source, Operation::Filter(predicate))
    }

    fn take_translation_error_details(&mut self) -> Vec<String> {
        std::mem::take(&mut self.details)
    }
}

/// `|row| [values...].contains(row[discriminator])` over the discriminator
/// values of the concrete types of `model`.
fn discriminator_filter(model: &ModelRef) -> Option<Expr> {
    let schema = model.schema();
    let discriminator = model.model().discriminator.as_ref()?;
    let field = schema.field(discriminator.field);

    let values = schema
        .concrete_types(model.id())
        .into_iter()
        .filter_map(|concrete| concrete.discriminator.as_ref()?.value.clone())
        .map(Expr::constant)
        .collect();

    Some(Expr::lambda1("row", Type::ValueBuffer, |row| {
        Expr::call(
            Method::Contains,
            Some(Expr::new_array(field.ty.clone(), values)),
            vec![Expr::read_value(row, field.storage_index, field.ty.clone())],
            Type::Bool,
        )
    }))
}

/// The shaper with its projection bindings reading from `row`.
fn over_row(shaper: &Expr, row: &Param) -> Result<Expr> {
    shaper.transform(|expr| {
        Ok(expr
            .downcast_ref::<ProjectionBinding>()
            .map(|binding| binding.bind(Expr::parameter(row))))
    })
}

/// Substitutes the element of `shaper` for the parameter of `lambda` and
/// binds the body to a fresh row parameter.
fn rebind(shaper: &Expr, lambda: &Expr, query_context: &Param) -> Result<(Param, Expr)> {
    let Some(function) = lambda.as_lambda() else {
        bail!("expected a lambda; found `{}`", Printer::print(lambda));
    };
    let [param] = &function.params[..] else {
        bail!(
            "expected a lambda of one parameter; found `{}`",
            Printer::print(lambda)
        );
    };

    let row = Param::new("row", Type::ValueBuffer);
    let element = over_row(shaper, &row)?;
    let body = function
        .body
        .replace_params(&HashMap::from([(param.clone(), element)]))?;
    let body = RowBinder { query_context }.rewrite_expr(&body)?;
    Ok((row, body))
}

/// Rewrites reads through entity shapers into column reads, and
/// membership tests against query roots into list lookups.
struct RowBinder<'a> {
    query_context: &'a Param,
}

impl RowBinder<'_> {
    fn list(&mut self, source: &Expr) -> Result<Expr> {
        if let Some(root) = source.downcast_ref::<InlineQueryRoot>() {
            let values = root
                .values()
                .iter()
                .map(|value| self.rewrite_expr(value))
                .collect::<Result<_>>()?;
            return Ok(Expr::new_array(root.element().clone(), values));
        }

        if let Some(root) = source.downcast_ref::<ParameterQueryRoot>() {
            return Ok(Expr::get_parameter(
                self.query_context,
                root.name(),
                Type::list(root.element().clone()),
            ));
        }

        bail!(
            "the subquery `{}` cannot be evaluated per row",
            Printer::print(source)
        )
    }
}

impl Rewrite for RowBinder<'_> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        if let Some(call) = expr.as_call() {
            match (call.queryable_method(), call.args.as_slice()) {
                (Some(QueryableMethod::Contains), [source, item]) => {
                    let list = self.list(source)?;
                    let item = self.rewrite_expr(item)?;
                    return Ok(Expr::call(Method::Contains, Some(list), vec![item], Type::Bool));
                }
                (Some(_), _) => bail!(
                    "the subquery `{}` cannot be evaluated per row",
                    Printer::print(expr)
                ),
                _ => {}
            }
        }

        let expr = expr.rewrite_children(self)?;
        match expr.kind() {
            ExprKind::Call(call) => match (&call.method, call.args.as_slice()) {
                (Method::Property(name), [target]) => read_member(&expr, target, name),
                _ => Ok(expr.clone()),
            },
            ExprKind::Member(member) => read_member(&expr, &member.target, &member.name),
            ExprKind::Index(index) => {
                let (Some(record), Some(Value::I64(position))) =
                    (index.target.as_new(), index.index.as_constant())
                else {
                    return Ok(expr.clone());
                };
                if !record.members.is_empty() {
                    return Ok(expr.clone());
                }
                let position = *position as usize;
                Ok(record.args.get(position).cloned().unwrap_or(expr.clone()))
            }
            _ => Ok(expr.clone()),
        }
    }
}

/// `target.name` where `target` is an entity shaper reads the property's
/// column from the shaper's row.
fn read_member(expr: &Expr, target: &Expr, name: &str) -> Result<Expr> {
    let Some(shaper) = target.downcast_ref::<StructuralTypeShaper>() else {
        return Ok(expr.clone());
    };

    let model = shaper.model();
    let Some(field) = model.model().field_by_name(name) else {
        bail!(
            "`{}.{name}` is not a stored property and cannot be read from a row",
            model.name()
        );
    };
    Ok(Expr::read_value(
        shaper.value_buffer().clone(),
        field.storage_index,
        field.ty.clone(),
    ))
}
