use ferrule_core::{
    expr::{visit, Expr, ExprComparer, ExprHasher, Method, Param, Printer, Type, Value},
    Schema,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std_util::prelude::*;

fn schema() -> std::sync::Arc<Schema> {
    let mut builder = Schema::builder();
    builder.model("Customer", |m| {
        m.key("Id", Type::I32).field("Name", Type::String);
    });
    std::sync::Arc::new(assert_ok!(builder.build()))
}

#[test]
fn substituted_parameters_evaluate() {
    let x = Param::new("x", Type::I32);
    let limit = Param::new("limit", Type::I32);
    let expr = Expr::lt(Expr::add(&x, 1), &limit);

    let bound = assert_ok!(expr.replace_params(&HashMap::from([(limit, Expr::constant(10))])));
    assert_eq!(Printer::print(&bound), "((x + 1) < 10)");

    let nine = assert_ok!(bound.replace_params(&HashMap::from([(x.clone(), Expr::constant(9))])));
    assert_eq!(assert_ok!(nine.eval_const()), Value::Bool(false));

    let eight = assert_ok!(bound.replace_params(&HashMap::from([(x, Expr::constant(8))])));
    assert_eq!(assert_ok!(eight.eval_const()), Value::Bool(true));
}

#[test]
fn list_membership() {
    let list = Expr::new_array(Type::I32, vec![Expr::constant(1), Expr::constant(2)]);
    let contains = |item: i32| {
        Expr::call(
            Method::Contains,
            Some(list.clone()),
            vec![Expr::constant(item)],
            Type::Bool,
        )
    };

    assert_eq!(assert_ok!(contains(2).eval_const()), Value::Bool(true));
    assert_eq!(assert_ok!(contains(3).eval_const()), Value::Bool(false));
}

#[test]
fn records_index_by_position() {
    let record = Expr::record(vec![Expr::constant("Ann"), Expr::constant(7)]);
    let field = Expr::record_field(record, 1);

    assert_eq!(*field.ty(), Type::I32);
    assert_eq!(assert_ok!(field.eval_const()), Value::I32(7));
}

#[test]
fn transform_replaces_top_down() {
    let expr = Expr::add(Expr::add(1, 2), 3);
    let folded = assert_ok!(expr.transform(|expr| {
        if expr.as_binary_op().is_none() {
            return Ok(None);
        }
        expr.eval_const().map(|value| Some(Expr::constant(value)))
    }));

    assert_eq!(folded.as_constant(), Some(&Value::I32(6)));
    assert!(!visit::any_expr(&folded, |expr| expr.as_binary_op().is_some()));
}

#[test]
fn structural_identity_ignores_lambda_names() {
    let predicate = |name: &str| {
        Expr::lambda1(name, Type::String, |c| Expr::eq(c, "Ann"))
    };

    let a = predicate("c");
    let b = predicate("customer");
    assert!(assert_ok!(ExprComparer::equals(&a, &b)));
    assert_eq!(assert_ok!(ExprHasher::hash(&a)), assert_ok!(ExprHasher::hash(&b)));

    let other = Expr::lambda1("c", Type::String, |c| Expr::eq(c, "Bea"));
    assert!(!assert_ok!(ExprComparer::equals(&a, &other)));
}

#[test]
fn unknown_names_are_reported() {
    let schema = schema();

    let err = assert_err!(schema.find_model("Order"));
    assert_eq!(err.to_string(), "entity type `Order` is not part of the schema");

    let customer = assert_ok!(schema.find_model_ref("Customer"));
    assert_err!(customer.find_field("Email"));
    assert_ok!(customer.find_field("Name"));
}
