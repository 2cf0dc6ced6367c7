use super::*;
use crate::{
    engine::QueryCompilationContext,
    provider::{
        memory::{Aggregate, MemoryProvider, MemoryQueryExpression, Operation},
        Provider,
    },
    TrackingBehavior,
};
use ferrule_core::{
    expr::{visit, Param},
    Schema,
};
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder
        .model("Customer", |m| {
            m.key("Id", Type::I32).field("Name", Type::String);
        })
        .model("Order", |m| {
            m.key("Id", Type::I32).field("CustomerId", Type::I32);
        });
    Arc::new(builder.build().unwrap())
}

fn root(schema: &Arc<Schema>, name: &str) -> Expr {
    EntityQueryRoot::new(&schema.find_model_ref(name).unwrap())
}

fn customer_ty(schema: &Arc<Schema>) -> Type {
    Type::Model(schema.find_model("Customer").unwrap().id)
}

fn op(method: QueryableMethod, source: Expr, args: Vec<Expr>, ty: Type) -> Expr {
    Expr::queryable(method, source, args, ty)
}

/// Translates `expr` for the in-memory store.
fn translate(schema: &Arc<Schema>, expr: &Expr) -> Result<Expr> {
    let provider = MemoryProvider::new(schema.clone());
    let mut cx = QueryCompilationContext::new(schema.clone(), TrackingBehavior::TrackAll, false);
    let mut translator = provider.queryable_translator(&mut cx);
    QueryableMethodTranslator::new(&mut *translator, false).translate(expr)
}

fn shaped(expr: &Expr) -> &ShapedQuery {
    ShapedQuery::from_expr(expr).unwrap()
}

fn operations(shaped: &ShapedQuery) -> &[Operation] {
    shaped
        .query_expression()
        .downcast_ref::<MemoryQueryExpression>()
        .unwrap()
        .operations()
}

/// `customers.join(orders, |c| c.Id, |o| o.CustomerId, |c, o| c)`
fn join(schema: &Arc<Schema>) -> Expr {
    let customers = root(schema, "Customer");
    let orders = root(schema, "Order");
    let order_ty = Type::Model(schema.find_model("Order").unwrap().id);

    let outer_key = Expr::lambda1("c", customer_ty(schema), |c| {
        Expr::property(c, "Id", Type::I32)
    });
    let inner_key = Expr::lambda1("o", order_ty.clone(), |o| {
        Expr::property(o, "CustomerId", Type::I32)
    });
    let c = Param::new("c", customer_ty(schema));
    let o = Param::new("o", order_ty);
    let result = Expr::lambda(vec![c.clone(), o], &c);

    let ty = customers.ty().clone();
    op(
        QueryableMethod::Join,
        customers,
        vec![orders, outer_key, inner_key, result],
        ty,
    )
}

macro_rules! refuse {
    ($($name:ident($($arg:ty),*);)*) => {
        $(
            fn $name(&mut self, $(_: $arg),*) -> Option<ShapedQuery> {
                None
            }
        )*
    };
}

/// Refuses every operator except `where`.
macro_rules! refuse_operators {
    () => {
        refuse! {
            translate_all(ShapedQuery, &Expr);
            translate_any(ShapedQuery, Option<&Expr>);
            translate_average(ShapedQuery, Option<&Expr>, &Type);
            translate_cast(ShapedQuery, &Type);
            translate_concat(ShapedQuery, ShapedQuery);
            translate_contains(ShapedQuery, &Expr);
            translate_count(ShapedQuery, Option<&Expr>);
            translate_default_if_empty(ShapedQuery, Option<&Expr>);
            translate_distinct(ShapedQuery);
            translate_element_at(ShapedQuery, &Expr, bool);
            translate_except(ShapedQuery, ShapedQuery);
            translate_first_or_default(ShapedQuery, Option<&Expr>, &Type, bool);
            translate_group_by(ShapedQuery, &Expr, Option<&Expr>, Option<&Expr>);
            translate_group_join(ShapedQuery, ShapedQuery, &Expr, &Expr, &Expr);
            translate_intersect(ShapedQuery, ShapedQuery);
            translate_join(ShapedQuery, ShapedQuery, &Expr, &Expr, &Expr);
            translate_last_or_default(ShapedQuery, Option<&Expr>, &Type, bool);
            translate_left_join(ShapedQuery, ShapedQuery, &Expr, &Expr, &Expr);
            translate_long_count(ShapedQuery, Option<&Expr>);
            translate_max(ShapedQuery, Option<&Expr>, &Type);
            translate_min(ShapedQuery, Option<&Expr>, &Type);
            translate_of_type(ShapedQuery, &Type);
            translate_order_by(ShapedQuery, &Expr, bool);
            translate_reverse(ShapedQuery);
            translate_select(ShapedQuery, &Expr);
            translate_select_many(ShapedQuery, &Expr, Option<&Expr>);
            translate_single_or_default(ShapedQuery, Option<&Expr>, &Type, bool);
            translate_skip(ShapedQuery, &Expr);
            translate_skip_while(ShapedQuery, &Expr);
            translate_sum(ShapedQuery, Option<&Expr>, &Type);
            translate_take(ShapedQuery, &Expr);
            translate_take_while(ShapedQuery, &Expr);
            translate_then_by(ShapedQuery, &Expr, bool);
            translate_union(ShapedQuery, ShapedQuery);
        }
    };
}

/// Refuses every root and operator.
struct Refuse;

impl QueryableTranslator for Refuse {
    refuse_operators!();

    refuse! {
        create_shaped_query(&EntityQueryRoot);
        translate_where(ShapedQuery, &Expr);
    }
}

/// Accepts entity roots and stores `where` predicates untranslated.
struct KeepPredicates;

impl QueryableTranslator for KeepPredicates {
    refuse_operators!();

    fn create_shaped_query(&mut self, _: &EntityQueryRoot) -> Option<ShapedQuery> {
        Some(ShapedQuery::new(Expr::null(Type::Any), Expr::null(Type::Any)))
    }

    fn translate_where(&mut self, source: ShapedQuery, predicate: &Expr) -> Option<ShapedQuery> {
        Some(source.with_query_expression(predicate.clone()))
    }
}

#[test]
fn entity_roots_become_shaped_queries() {
    let schema = schema();
    let translated = translate(&schema, &root(&schema, "Customer")).unwrap();

    let shaped = shaped(&translated);
    assert!(operations(shaped).is_empty());
    assert_eq!(shaped.cardinality(), ResultCardinality::Sequence);
    assert!(shaped.shaper().downcast_ref::<crate::StructuralTypeShaper>().is_some());
}

#[test]
fn predicates_read_row_columns() {
    let schema = schema();
    let customers = root(&schema, "Customer");
    let predicate = Expr::lambda1("c", customer_ty(&schema), |c| {
        Expr::eq(Expr::property(c, "Name", Type::String), "Ann")
    });
    let ty = customers.ty().clone();
    let query = op(QueryableMethod::Where, customers, vec![predicate], ty);

    let translated = translate(&schema, &query).unwrap();
    let [Operation::Filter(predicate)] = operations(shaped(&translated)) else {
        panic!("expected a single filter");
    };

    assert!(visit::any_expr(predicate, |expr| {
        matches!(expr.as_call(), Some(call) if call.method == Method::ReadValue)
    }));
    assert!(!visit::any_expr(predicate, |expr| {
        matches!(expr.as_call(), Some(call) if matches!(call.method, Method::Property(_)))
    }));
}

#[test]
fn zero_or_one_operators_set_the_cardinality() {
    let schema = schema();
    let customer = customer_ty(&schema);

    let first = op(QueryableMethod::First, root(&schema, "Customer"), vec![], customer.clone());
    let translated = translate(&schema, &first).unwrap();
    assert_eq!(shaped(&translated).cardinality(), ResultCardinality::Single);
    assert!(matches!(operations(shaped(&translated)), [Operation::Take(_)]));

    let first = op(
        QueryableMethod::FirstOrDefault,
        root(&schema, "Customer"),
        vec![],
        customer,
    );
    let translated = translate(&schema, &first).unwrap();
    assert_eq!(
        shaped(&translated).cardinality(),
        ResultCardinality::SingleOrDefault
    );
}

#[test]
fn aggregates_collapse_to_one_value() {
    let schema = schema();
    let count = op(QueryableMethod::Count, root(&schema, "Customer"), vec![], Type::I32);

    let translated = translate(&schema, &count).unwrap();
    let shaped = shaped(&translated);
    assert_eq!(shaped.cardinality(), ResultCardinality::Single);
    assert!(matches!(
        operations(shaped),
        [Operation::Aggregate(Aggregate::Count)]
    ));
    assert_eq!(*shaped.shaper().ty(), Type::I32);
}

#[test]
fn unsupported_operators_report_why() {
    let schema = schema();
    let err = translate(&schema, &join(&schema)).unwrap_err();

    assert!(err.is_translation_failed());
    assert!(err
        .to_string()
        .contains("`join` is not supported by the in-memory store"));
}

#[test]
fn unknown_overloads_report_their_argument_count() {
    let schema = schema();
    let customers = root(&schema, "Customer");
    let ty = customers.ty().clone();
    let query = op(QueryableMethod::Where, customers, vec![], ty);

    let err = translate(&schema, &query).unwrap_err();
    assert!(err.is_translation_failed());
    assert!(err.to_string().contains("`where` with 0 argument(s)"));
}

#[test]
fn subqueries_never_fail() {
    let schema = schema();
    let provider = MemoryProvider::new(schema.clone());
    let mut cx = QueryCompilationContext::new(schema.clone(), TrackingBehavior::TrackAll, false);
    let mut translator = provider.queryable_translator(&mut cx);
    let mut dispatcher = QueryableMethodTranslator::new(&mut *translator, true);

    let translated = dispatcher.translate(&join(&schema)).unwrap();
    assert!(ShapedQuery::from_expr(&translated).is_none());
    assert_eq!(
        dispatcher.translation_error_details(),
        ["`join` is not supported by the in-memory store"]
    );
}

#[test]
fn bare_roots_are_unhandled() {
    let schema = schema();
    let mut refuse = Refuse;

    let err = QueryableMethodTranslator::new(&mut refuse, false)
        .translate(&root(&schema, "Customer"))
        .unwrap_err();
    assert!(err.is_unhandled_query_root());

    let customers = root(&schema, "Customer");
    let ty = customers.ty().clone();
    let query = op(QueryableMethod::Distinct, customers, vec![], ty);
    let err = QueryableMethodTranslator::new(&mut refuse, false)
        .translate(&query)
        .unwrap_err();
    assert!(err.is_translation_failed());
}

#[test]
fn roots_left_inside_shaped_queries_are_unhandled() {
    let schema = schema();
    let customers = root(&schema, "Customer");
    let ty = customers.ty().clone();
    let has_orders = Expr::lambda1("c", customer_ty(&schema), |_| {
        op(QueryableMethod::Any, root(&schema, "Order"), vec![], Type::Bool)
    });
    let query = op(QueryableMethod::Where, customers.clone(), vec![has_orders], ty);

    let mut keep = KeepPredicates;
    let err = QueryableMethodTranslator::new(&mut keep, false)
        .translate(&query)
        .unwrap_err();
    assert!(err.is_unhandled_query_root());

    let translated = QueryableMethodTranslator::new(&mut keep, false)
        .translate(&customers)
        .unwrap();
    assert!(ShapedQuery::from_expr(&translated).is_some());
}

#[test]
fn details_are_recorded_once() {
    let mut refuse = Refuse;
    let mut dispatcher = QueryableMethodTranslator::new(&mut refuse, false);

    dispatcher.add_translation_error_details("no key");
    dispatcher.add_translation_error_details("no key");
    dispatcher.add_translation_error_details("");
    assert_eq!(dispatcher.translation_error_details(), ["no key"]);
}

#[test]
fn terminating_operators_are_stripped() {
    let schema = schema();
    let customers = root(&schema, "Customer");
    let ty = customers.ty().clone();
    let distinct = op(QueryableMethod::Distinct, customers, vec![], ty.clone());
    let query = op(
        QueryableMethod::ToList,
        op(QueryableMethod::AsEnumerable, distinct, vec![], ty.clone()),
        vec![],
        ty,
    );

    let stripped = strip_terminating_operators(&query).unwrap();
    assert_eq!(
        stripped.as_call().unwrap().queryable_method(),
        Some(QueryableMethod::Distinct)
    );
}
