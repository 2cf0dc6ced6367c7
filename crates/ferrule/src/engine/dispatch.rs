mod operator;
use operator::Operator;

mod translator;
pub use translator::QueryableTranslator;

use super::{
    query_root::is_query_root, EntityQueryRoot, InlineQueryRoot, ParameterQueryRoot,
    ResultCardinality, ShapedQuery,
};
use ferrule_core::{
    expr::{visit, Expr, ExprCall, ExprKind, Method, Printer, QueryableMethod, Type},
    Error, Result,
};
use tracing::debug;

/// The first query root left in `expr`.
fn remaining_query_root(expr: &Expr) -> Option<Expr> {
    let mut found = None;
    visit::for_each_expr(expr, |expr| {
        if found.is_none() && is_query_root(expr) {
            found = Some(expr.clone());
        }
    });
    found
}

/// Translates composed sequence operators into shaped queries.
///
/// The tree is walked bottom-up along operator sources. Each operator whose
/// source translated is parsed once and handed to the matching hook of the
/// store's [`QueryableTranslator`]. An operator the store cannot express is
/// left as it is; only the top-level translation turns that into an error.
pub struct QueryableMethodTranslator<'a> {
    translator: &'a mut dyn QueryableTranslator,

    /// Subquery translations never fail; the caller inspects the result.
    subquery: bool,

    details: Vec<String>,
}

impl<'a> QueryableMethodTranslator<'a> {
    pub fn new(translator: &'a mut dyn QueryableTranslator, subquery: bool) -> Self {
        Self {
            translator,
            subquery,
            details: vec![],
        }
    }

    /// Translates `expr`.
    ///
    /// At the top level, a result that is not a shaped query fails with
    /// "unhandled query root" when it is a bare root, and with "translation
    /// failed" carrying the collected details otherwise. A shaped query
    /// still holding a query root anywhere fails with "unhandled query
    /// root".
    pub fn translate(&mut self, expr: &Expr) -> Result<Expr> {
        let translated = self.visit(expr)?;

        if self.subquery {
            return Ok(translated);
        }

        if ShapedQuery::from_expr(&translated).is_some() {
            return match remaining_query_root(&translated) {
                Some(root) => Err(Error::unhandled_query_root(Printer::print(&root))),
                None => Ok(translated),
            };
        }

        if is_query_root(&translated) {
            return Err(Error::unhandled_query_root(Printer::print(&translated)));
        }

        let printed = Printer::print(expr);
        let details = self.details.join("\n");
        debug!(query = %printed, %details, "query translation failed");
        Err(Error::translation_failed(printed, details))
    }

    /// Records why part of the query could not be translated.
    pub fn add_translation_error_details(&mut self, details: impl Into<String>) {
        let details = details.into();
        if !details.is_empty() && !self.details.contains(&details) {
            self.details.push(details);
        }
    }

    pub fn translation_error_details(&self) -> &[String] {
        &self.details
    }

    fn collect_details(&mut self) {
        for details in self.translator.take_translation_error_details() {
            self.add_translation_error_details(details);
        }
    }

    fn untranslated(&mut self, expr: &Expr) -> Result<Expr> {
        self.collect_details();
        Ok(expr.clone())
    }

    fn visit(&mut self, expr: &Expr) -> Result<Expr> {
        if let Some(root) = expr.downcast_ref::<EntityQueryRoot>() {
            return match self.translator.create_shaped_query(root) {
                Some(shaped) => Ok(shaped.into_expr()),
                None => self.untranslated(expr),
            };
        }
        if let Some(root) = expr.downcast_ref::<InlineQueryRoot>() {
            return match self.translator.translate_inline_query_root(root) {
                Some(shaped) => Ok(shaped.into_expr()),
                None => self.untranslated(expr),
            };
        }
        if let Some(root) = expr.downcast_ref::<ParameterQueryRoot>() {
            return match self.translator.translate_parameter_query_root(root) {
                Some(shaped) => Ok(shaped.into_expr()),
                None => self.untranslated(expr),
            };
        }

        match expr.kind() {
            ExprKind::Call(call) => match call.queryable_method() {
                Some(method) => self.visit_operator(expr, call, method),
                None => self.visit_property(expr, call),
            },
            ExprKind::Member(member) if expr.ty().is_sequence() => {
                self.visit_member_access(expr, &member.target, &member.name)
            }
            _ => Ok(expr.clone()),
        }
    }

    fn visit_property(&mut self, expr: &Expr, call: &ExprCall) -> Result<Expr> {
        let (Method::Property(name), Some(receiver)) = (&call.method, call.args.first()) else {
            return Ok(expr.clone());
        };
        self.visit_member_access(expr, receiver, name)
    }

    fn visit_member_access(&mut self, expr: &Expr, receiver: &Expr, member: &str) -> Result<Expr> {
        if ShapedQuery::from_expr(receiver).is_some() {
            return Ok(expr.clone());
        }

        match self
            .translator
            .translate_member_access(receiver, member, expr.ty())
        {
            Some(shaped) => Ok(shaped.into_expr()),
            None => self.untranslated(expr),
        }
    }

    fn visit_operator(
        &mut self,
        expr: &Expr,
        call: &ExprCall,
        method: QueryableMethod,
    ) -> Result<Expr> {
        let Some((source, args)) = call.args.split_first() else {
            return Ok(expr.clone());
        };

        let source = self.visit(source)?;
        let Some(source) = ShapedQuery::from_expr(&source).cloned() else {
            return Ok(expr.clone());
        };

        let Some(operator) = Operator::parse(method, args) else {
            self.add_translation_error_details(format!(
                "`{}` with {} argument(s) is not a supported sequence operator",
                method.name(),
                args.len()
            ));
            return Ok(expr.clone());
        };

        let other = match operator.second_source() {
            Some(other) => match ShapedQuery::from_expr(&self.visit(other)?) {
                Some(other) => Some(other.clone()),
                None => {
                    self.add_translation_error_details(format!(
                        "the second source of `{}` could not be translated",
                        method.name()
                    ));
                    return Ok(expr.clone());
                }
            },
            None => None,
        };

        match self.dispatch(source, operator, other, expr.ty()) {
            Some(shaped) => Ok(shaped.into_expr()),
            None => self.untranslated(expr),
        }
    }

    fn dispatch(
        &mut self,
        source: ShapedQuery,
        operator: Operator<'_>,
        other: Option<ShapedQuery>,
        ty: &Type,
    ) -> Option<ShapedQuery> {
        let t = &mut *self.translator;
        let element = ty.element().cloned().unwrap_or(Type::Any);

        match operator {
            Operator::All { predicate } => t.translate_all(source, predicate),
            Operator::Any { predicate } => t.translate_any(source, predicate),
            Operator::Average { selector } => t.translate_average(source, selector, ty),
            Operator::Cast => t.translate_cast(source, &element),
            Operator::Concat { .. } => t.translate_concat(source, other?),
            Operator::Contains { item } => t.translate_contains(source, item),
            Operator::Count { predicate } => t.translate_count(source, predicate),
            Operator::DefaultIfEmpty { default } => t.translate_default_if_empty(source, default),
            Operator::Distinct => t.translate_distinct(source),
            Operator::ElementAt { index, or_default } => {
                t.translate_element_at(zero_or_one(source, or_default), index, or_default)
            }
            Operator::Except { .. } => t.translate_except(source, other?),
            Operator::First {
                predicate,
                or_default,
            } => t.translate_first_or_default(
                zero_or_one(source, or_default),
                predicate,
                ty,
                or_default,
            ),
            Operator::GroupBy {
                key,
                element,
                result,
            } => t.translate_group_by(source, key, element, result),
            Operator::GroupJoin {
                outer_key,
                inner_key,
                result,
                ..
            } => t.translate_group_join(source, other?, outer_key, inner_key, result),
            Operator::Intersect { .. } => t.translate_intersect(source, other?),
            Operator::Join {
                outer_key,
                inner_key,
                result,
                ..
            } => t.translate_join(source, other?, outer_key, inner_key, result),
            Operator::Last {
                predicate,
                or_default,
            } => t.translate_last_or_default(
                zero_or_one(source, or_default),
                predicate,
                ty,
                or_default,
            ),
            Operator::LeftJoin {
                outer_key,
                inner_key,
                result,
                ..
            } => t.translate_left_join(source, other?, outer_key, inner_key, result),
            Operator::LongCount { predicate } => t.translate_long_count(source, predicate),
            Operator::Max { selector } => t.translate_max(source, selector, ty),
            Operator::Min { selector } => t.translate_min(source, selector, ty),
            Operator::OfType => t.translate_of_type(source, &element),
            Operator::OrderBy { key, ascending } => t.translate_order_by(source, key, ascending),
            Operator::Reverse => t.translate_reverse(source),
            Operator::Select { selector } => t.translate_select(source, selector),
            Operator::SelectMany { collection, result } => {
                t.translate_select_many(source, collection, result)
            }
            Operator::Single {
                predicate,
                or_default,
            } => t.translate_single_or_default(
                zero_or_one(source, or_default),
                predicate,
                ty,
                or_default,
            ),
            Operator::Skip { count } => t.translate_skip(source, count),
            Operator::SkipWhile { predicate } => t.translate_skip_while(source, predicate),
            Operator::Sum { selector } => t.translate_sum(source, selector, ty),
            Operator::Take { count } => t.translate_take(source, count),
            Operator::TakeWhile { predicate } => t.translate_take_while(source, predicate),
            Operator::ThenBy { key, ascending } => t.translate_then_by(source, key, ascending),
            Operator::Union { .. } => t.translate_union(source, other?),
            Operator::Where { predicate } => t.translate_where(source, predicate),
        }
    }
}

fn zero_or_one(source: ShapedQuery, or_default: bool) -> ShapedQuery {
    source.with_cardinality(if or_default {
        ResultCardinality::SingleOrDefault
    } else {
        ResultCardinality::Single
    })
}

/// Removes materializing terminators such as `to_list`; they inject nothing
/// into the query.
pub fn strip_terminating_operators(expr: &Expr) -> Result<Expr> {
    expr.transform(|expr| {
        let Some(call) = expr.as_call() else {
            return Ok(None);
        };
        match (call.queryable_method(), call.args.first()) {
            (Some(method), Some(source)) if method.is_terminating() => {
                Ok(Some(strip_terminating_operators(source)?))
            }
            _ => Ok(None),
        }
    })
}

#[cfg(test)]
mod tests;
