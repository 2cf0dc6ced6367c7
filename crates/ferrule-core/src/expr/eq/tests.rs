use super::*;
use crate::expr::{Extension, QueryableMethod, Type};
use std::any::Any;

fn name_of(param: &Param) -> Expr {
    Expr::property(param, "name", Type::String)
}

fn filter(source: &Param, predicate: Expr) -> Expr {
    Expr::queryable(
        QueryableMethod::Where,
        Expr::parameter(source),
        vec![predicate],
        source.ty().clone(),
    )
}

#[test]
fn renamed_lambdas_are_equal_and_hash_equal() {
    let x = Param::new("x", Type::Any);
    let y = Param::new("y", Type::Any);

    let a = Expr::lambda(vec![x.clone()], Expr::eq(name_of(&x), "Ann"));
    let b = Expr::lambda(vec![y.clone()], Expr::eq(name_of(&y), "Ann"));

    assert!(ExprComparer::equals(&a, &b).unwrap());
    assert_eq!(ExprHasher::hash(&a).unwrap(), ExprHasher::hash(&b).unwrap());
}

#[test]
fn different_constants_differ() {
    let x = Param::new("x", Type::Any);
    let a = Expr::lambda(vec![x.clone()], Expr::eq(name_of(&x), "Ann"));
    let b = Expr::lambda(vec![x.clone()], Expr::eq(name_of(&x), "Bob"));

    assert!(!ExprComparer::equals(&a, &b).unwrap());
}

#[test]
fn free_parameters_compare_by_name_and_type() {
    let customers = Param::new("customers", Type::queryable(Type::Any));
    let same_name = Param::new("customers", Type::queryable(Type::Any));
    let other_name = Param::new("orders", Type::queryable(Type::Any));

    let x = Param::new("x", Type::Any);
    let predicate = Expr::lambda(vec![x.clone()], Expr::constant(true));

    assert!(ExprComparer::equals(
        &filter(&customers, predicate.clone()),
        &filter(&same_name, predicate.clone())
    )
    .unwrap());
    assert!(!ExprComparer::equals(
        &filter(&customers, predicate.clone()),
        &filter(&other_name, predicate)
    )
    .unwrap());
}

#[test]
fn free_parameter_does_not_match_bound_one() {
    let x = Param::new("x", Type::Any);
    let free = Param::new("x", Type::Any);
    let y = Param::new("y", Type::Any);

    // `|x| x` against `|y| x`: the right-hand `x` is free.
    let a = Expr::lambda(vec![x.clone()], Expr::parameter(&x));
    let b = Expr::lambda(vec![y], Expr::parameter(&free));

    assert!(!ExprComparer::equals(&a, &b).unwrap());
}

#[test]
fn parameter_reuse_with_conflicting_partner_fails() {
    let p = Param::new("p", Type::Any);
    let a = Param::new("a", Type::Any);
    let b = Param::new("b", Type::Any);

    let left = Expr::lambda(
        vec![p.clone()],
        Expr::lambda(vec![p.clone()], Expr::parameter(&p)),
    );
    let right = Expr::lambda(
        vec![a.clone()],
        Expr::lambda(vec![b.clone()], Expr::parameter(&b)),
    );

    let err = ExprComparer::equals(&left, &right).unwrap_err();
    assert!(err.is_invalid_shape());
}

#[test]
fn nested_rebinding_of_a_parameter_fails() {
    let p = Param::new("p", Type::Any);
    let q = Param::new("q", Type::Any);

    let left = Expr::lambda(
        vec![p.clone()],
        Expr::lambda(vec![p.clone()], Expr::parameter(&p)),
    );
    let right = Expr::lambda(
        vec![q.clone()],
        Expr::lambda(vec![q.clone()], Expr::parameter(&q)),
    );

    let err = ExprComparer::equals(&left, &right).unwrap_err();
    assert!(err.is_invalid_shape());
    assert!(err.to_string().contains("`p` is rebound by a nested lambda"));
}

#[test]
fn float_constants_compare_bitwise() {
    assert!(!ExprComparer::equals(&Expr::constant(0.0), &Expr::constant(-0.0)).unwrap());
    assert!(ExprComparer::equals(&Expr::constant(f64::NAN), &Expr::constant(f64::NAN)).unwrap());
}

#[test]
fn shared_subtree_short_circuits() {
    let x = Param::new("x", Type::Any);
    let body = Expr::eq(name_of(&x), "Ann");
    assert!(ExprComparer::equals(&body, &body).unwrap());
}

#[test]
fn unsupported_extension_is_an_error() {
    #[derive(Debug)]
    struct Opaque;

    impl Extension for Opaque {
        fn name(&self) -> &str {
            "opaque"
        }

        fn ty(&self) -> Type {
            Type::Any
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    let a = Expr::extension(Opaque);
    let b = Expr::extension(Opaque);

    assert!(ExprComparer::equals(&a, &b).unwrap_err().is_unhandled_node());
    assert!(ExprHasher::hash(&a).unwrap_err().is_unhandled_node());
}

#[test]
fn integer_widths_hash_consistently() {
    let mut a = ExprHasher::new();
    a.hash_value(&Value::I32(7));
    let mut b = ExprHasher::new();
    b.hash_value(&Value::I64(7));

    assert!(Value::I32(7).same_as(&Value::I64(7)));
    assert_eq!(a.finish(), b.finish());
}
