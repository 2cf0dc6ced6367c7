use super::*;
use ferrule_core::{
    expr::{Printer, Value},
    Schema,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn schema() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder
        .model("Customer", |m| {
            m.key("Id", Type::I32).field("Name", Type::String);
        })
        .model("Order", |m| {
            m.key("Id", Type::I32).field("Total", Type::F64);
        });
    Arc::new(builder.build().unwrap())
}

fn customer(schema: &Arc<Schema>) -> ModelRef {
    schema.find_model_ref("Customer").unwrap()
}

fn lift_all(exprs: Vec<Expr>) -> (LiftedConstants, Vec<Expr>) {
    let mut lifter = ConstantLifter::new();
    let lifted: Vec<_> = exprs.iter().map(|expr| lifter.lift(expr).unwrap()).collect();
    lifter.finish(&lifted, &HashSet::new()).unwrap()
}

fn rendered(lifted: &LiftedConstants) -> Vec<String> {
    lifted
        .slots()
        .iter()
        .map(|slot| format!("{} = {}", slot.name(), Printer::print(slot.body())))
        .collect()
}

#[test]
fn identical_resolvers_share_one_slot() {
    let schema = schema();
    let customer = customer(&schema);

    let (lifted, exprs) = lift_all(vec![Expr::record(vec![
        LiftableConstant::field(&customer, "Name"),
        LiftableConstant::field(&customer, "Name"),
    ])]);

    assert_eq!(
        rendered(&lifted),
        ["name_field = lift_context.find_model(\"Customer\").find_field(\"Name\")"]
    );

    let slot = lifted.slots()[0].param();
    let record = exprs[0].as_new().unwrap();
    for arg in &record.args {
        assert_eq!(arg.as_parameter(), Some(slot));
    }
}

#[test]
fn shared_fragments_are_hoisted_before_their_users() {
    let schema = schema();
    let customer = customer(&schema);

    let (lifted, _) = lift_all(vec![
        LiftableConstant::field(&customer, "Name"),
        LiftableConstant::primary_key(&customer),
    ]);

    assert_eq!(
        rendered(&lifted),
        [
            "customer_model = lift_context.find_model(\"Customer\")",
            "name_field = customer_model.find_field(\"Name\")",
            "customer_key = customer_model.find_primary_key()",
        ]
    );
}

#[test]
fn whole_body_matching_a_hoisted_fragment_is_redirected() {
    let schema = schema();
    let customer = customer(&schema);

    let (lifted, exprs) = lift_all(vec![
        LiftableConstant::field(&customer, "Name"),
        LiftableConstant::model(&customer),
    ]);

    assert_eq!(
        rendered(&lifted),
        [
            "customer_model = lift_context.find_model(\"Customer\")",
            "name_field = customer_model.find_field(\"Name\")",
        ]
    );
    assert_eq!(exprs[1].as_parameter(), Some(lifted.slots()[0].param()));
}

#[test]
fn optimizing_twice_changes_nothing() {
    let schema = schema();
    let customer = customer(&schema);

    let mut lifter = ConstantLifter::new();
    for expr in [
        LiftableConstant::field(&customer, "Name"),
        LiftableConstant::field(&customer, "Id"),
        LiftableConstant::primary_key(&customer),
        LiftableConstant::model(&schema.find_model_ref("Order").unwrap()),
    ] {
        lifter.lift(&expr).unwrap();
    }
    let lift_context = lifter.lift_context().clone();
    let (first, _) = lifter.finish(&[], &HashSet::new()).unwrap();

    let second = optimize(&lift_context, first.slots().to_vec(), &HashSet::new()).unwrap();

    assert_eq!(rendered(&first), rendered(&second));
    assert!(second.substitutions().is_empty());
    for (a, b) in first.slots().iter().zip(second.slots()) {
        assert_eq!(a.param(), b.param());
    }
}

#[test]
fn slots_never_reference_later_slots() {
    let schema = schema();
    let customer = customer(&schema);
    let order = schema.find_model_ref("Order").unwrap();

    let mut lifter = ConstantLifter::new();
    for expr in [
        LiftableConstant::primary_key(&order),
        LiftableConstant::field(&customer, "Name"),
        LiftableConstant::field(&order, "Total"),
        LiftableConstant::primary_key(&customer),
        LiftableConstant::navigation(&customer, "Orders"),
    ] {
        lifter.lift(&expr).unwrap();
    }
    let lift_context = lifter.lift_context().clone();
    let (lifted, _) = lifter.finish(&[], &HashSet::new()).unwrap();

    let mut defined = vec![lift_context];
    for slot in lifted.slots() {
        ferrule_core::expr::visit::for_each_expr(slot.body(), |expr| {
            if let Some(param) = expr.as_parameter() {
                assert!(defined.contains(param), "`{}` used before definition", param.name());
            }
        });
        defined.push(slot.param().clone());
    }
}

#[test]
fn forward_references_are_rejected() {
    let lift_context = Param::new("lift_context", Type::LiftContext);
    let model = Param::new("customer_model", Type::TypeDescriptor);
    let slots = vec![
        LiftedConstant::new(
            Param::new("name_field", Type::Descriptor),
            Expr::find_field(&model, "Name"),
        ),
        LiftedConstant::new(model.clone(), Expr::find_model(&lift_context, "Customer")),
    ];

    let err = optimize::verify_no_forward_references(&lift_context, &slots).unwrap_err();
    assert!(err.is_invalid_shape());
}

#[test]
fn names_avoid_reserved_and_each_other() {
    let schema = schema();
    let customer = customer(&schema);
    let order = schema.find_model_ref("Order").unwrap();

    let mut lifter = ConstantLifter::new();
    let a = lifter.lift(&LiftableConstant::field(&customer, "Id")).unwrap();
    let b = lifter.lift(&LiftableConstant::field(&order, "Id")).unwrap();

    let reserved = HashSet::from(["id_field".to_string()]);
    let (lifted, exprs) = lifter.finish(&[a, b], &reserved).unwrap();

    let names: Vec<_> = lifted.slots().iter().map(LiftedConstant::name).collect();
    assert_eq!(names, ["id_field0", "id_field1"]);
    assert_eq!(exprs[0].as_parameter().unwrap().name(), "id_field0");
    assert_eq!(exprs[1].as_parameter().unwrap().name(), "id_field1");
}

#[test]
fn inline_mode_embeds_resolved_handles() {
    let schema = schema();
    let customer = customer(&schema);
    let cx = LiftContext::new(schema.clone());

    let inlined = inline_constants(&LiftableConstant::field(&customer, "Name"), &cx).unwrap();
    let Some(Value::Descriptor(descriptor)) = inlined.as_constant() else {
        panic!("expected a descriptor constant; got {inlined:?}");
    };
    assert_eq!(descriptor.to_string(), "Customer.Name");
}

#[test]
fn resolver_must_take_the_lift_context() {
    let err = LiftableConstant::new(
        Expr::lambda1("x", Type::I32, |x| x),
        "bad",
        Type::I32,
    )
    .unwrap_err();
    assert!(err.is_invalid_shape());
}
