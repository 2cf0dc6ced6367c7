use super::*;
use crate::{engine::lift::inline_constants, LiftContext, QueryContext};
use ferrule_core::expr::{Object, Value, ValueBuffer};

fn customers() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder
        .model("Customer", |m| {
            m.key("Id", Type::I32)
                .field("Name", Type::String)
                .navigation("Address", "Address");
        })
        .model("Address", |m| {
            m.shadow_key("CustomerId", Type::I32)
                .field("Street", Type::String)
                .owned_by("Customer", "Address");
        });
    Arc::new(builder.build().unwrap())
}

fn animals() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder
        .model("Animal", |m| {
            m.key("Id", Type::I32)
                .field("Name", Type::String)
                .discriminator("Kind")
                .abstract_model();
        })
        .model("Dog", |m| {
            m.base("Animal").discriminator_value("Dog");
        })
        .model("Cat", |m| {
            m.base("Animal").discriminator_value("Cat");
        })
        .model("Bird", |m| {
            m.base("Animal").discriminator_value("Bird");
        });
    Arc::new(builder.build().unwrap())
}

fn entity(schema: &Arc<Schema>, name: &str) -> Expr {
    let model = schema.find_model_ref(name).unwrap();
    StructuralTypeShaper::new(&model, ProjectionBinding::row(), false)
}

fn compile(schema: &Arc<Schema>, tracking: TrackingBehavior, shaper: Expr) -> Result<Expr> {
    let cx = QueryCompilationContext::new(schema.clone(), tracking, false);
    let shaped = ShapedQuery::new(Expr::null(Type::Any), shaper);
    let compiled = ShapedQueryCompiler::new(&cx).compile(&shaped)?;
    inline_constants(compiled.lambda(), &LiftContext::new(schema.clone()))
}

/// Shapes each row with the compiled shaper, keeping every row's outcome.
fn shape_each(
    schema: &Arc<Schema>,
    tracking: TrackingBehavior,
    shaper: Expr,
    cx: &QueryContext,
    rows: Vec<Vec<Value>>,
) -> Result<Vec<Result<Value>>> {
    let Value::Function(shaper) = compile(schema, tracking, shaper)?.eval(cx)? else {
        panic!("shapers compile to functions");
    };
    Ok(rows
        .into_iter()
        .map(|row| shaper.call(cx, vec![Value::Context, Value::Buffer(ValueBuffer::new(row))]))
        .collect())
}

/// Shapes each row with the compiled shaper.
fn shape(
    schema: &Arc<Schema>,
    tracking: TrackingBehavior,
    shaper: Expr,
    cx: &QueryContext,
    rows: Vec<Vec<Value>>,
) -> Result<Vec<Value>> {
    shape_each(schema, tracking, shaper, cx, rows)?
        .into_iter()
        .collect()
}

fn object(value: &Value) -> &Object {
    value.as_object().unwrap()
}

fn ann() -> Vec<Value> {
    vec![Value::I32(1), Value::from("Ann")]
}

#[test]
fn tracked_rows_resolve_to_one_instance() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let results = shape(
        &schema,
        TrackingBehavior::TrackAll,
        entity(&schema, "Customer"),
        &cx,
        vec![ann(), ann()],
    )
    .unwrap();

    assert!(Object::ptr_eq(object(&results[0]), object(&results[1])));
    assert_eq!(object(&results[0]).get("Name"), Some(&Value::from("Ann")));

    // A later execution against the same context reuses the tracked instance.
    let again = shape(
        &schema,
        TrackingBehavior::TrackAll,
        entity(&schema, "Customer"),
        &cx,
        vec![ann()],
    )
    .unwrap();
    assert!(Object::ptr_eq(object(&results[0]), object(&again[0])));
}

#[test]
fn untracked_rows_build_fresh_instances() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let results = shape(
        &schema,
        TrackingBehavior::NoTracking,
        entity(&schema, "Customer"),
        &cx,
        vec![ann(), ann()],
    )
    .unwrap();

    assert!(!Object::ptr_eq(object(&results[0]), object(&results[1])));
    assert_eq!(object(&results[0]).model_name(), "Customer");
}

#[test]
fn null_keys_are_rejected_without_identity_resolution() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let err = shape(
        &schema,
        TrackingBehavior::NoTracking,
        entity(&schema, "Customer"),
        &cx,
        vec![vec![Value::Null, Value::from("Ann")]],
    )
    .unwrap_err();

    assert!(err.is_invalid_key_value());
    assert_eq!(
        err.to_string(),
        "invalid key value: property `Id` of entity type `Customer` is null"
    );
}

#[test]
fn a_null_key_fails_only_its_own_row() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let results = shape_each(
        &schema,
        TrackingBehavior::NoTracking,
        entity(&schema, "Customer"),
        &cx,
        vec![
            ann(),
            vec![Value::Null, Value::from("Bea")],
            vec![Value::I32(3), Value::from("Cid")],
        ],
    )
    .unwrap();

    assert_eq!(object(results[0].as_ref().unwrap()).get("Name"), Some(&Value::from("Ann")));
    assert!(results[1].as_ref().unwrap_err().is_invalid_key_value());
    assert_eq!(object(results[2].as_ref().unwrap()).get("Id"), Some(&Value::I32(3)));
}

#[test]
fn nullable_shapers_yield_null_for_null_keys() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let customer = schema.find_model_ref("Customer").unwrap();
    let shaper = StructuralTypeShaper::new(&customer, ProjectionBinding::row(), true);

    for tracking in [TrackingBehavior::TrackAll, TrackingBehavior::NoTracking] {
        let results = shape(
            &schema,
            tracking,
            shaper.clone(),
            &cx,
            vec![vec![Value::Null, Value::Null]],
        )
        .unwrap();
        assert_eq!(results, [Value::Null]);
    }
}

#[test]
fn concrete_types_are_chosen_by_discriminator() {
    let schema = animals();
    let cx = QueryContext::new(schema.clone());
    let results = shape(
        &schema,
        TrackingBehavior::NoTracking,
        entity(&schema, "Animal"),
        &cx,
        vec![
            vec![Value::I32(1), Value::from("Rex"), Value::from("Dog")],
            vec![Value::I32(2), Value::from("Tom"), Value::from("Cat")],
            vec![Value::I32(3), Value::from("Tweety"), Value::from("Bird")],
        ],
    )
    .unwrap();

    let names: Vec<_> = results.iter().map(|r| object(r).model_name()).collect();
    assert_eq!(names, ["Dog", "Cat", "Bird"]);
}

#[test]
fn unknown_discriminators_fail() {
    let schema = animals();
    let cx = QueryContext::new(schema.clone());
    let err = shape(
        &schema,
        TrackingBehavior::NoTracking,
        entity(&schema, "Animal"),
        &cx,
        vec![vec![Value::I32(1), Value::from("Nemo"), Value::from("Fish")]],
    )
    .unwrap_err();

    assert!(err.is_unable_to_discriminate());
    let message = err.to_string();
    assert!(message.contains("`Animal`"), "{message}");
    assert!(message.contains("Fish"), "{message}");
}

#[test]
fn projection_bindings_read_columns() {
    let schema = customers();
    let cx = QueryContext::new(schema.clone());
    let shaper = Expr::record(vec![
        ProjectionBinding::column(1, Type::String),
        ProjectionBinding::column(0, Type::I64),
    ]);

    let results = shape(&schema, TrackingBehavior::TrackAll, shaper, &cx, vec![ann()]).unwrap();
    assert_eq!(
        results,
        [Value::Record(vec![Value::from("Ann"), Value::I64(1)])]
    );
}

#[test]
fn owned_types_need_their_owner_when_tracked() {
    let schema = customers();

    let err = compile(&schema, TrackingBehavior::TrackAll, entity(&schema, "Address")).unwrap_err();
    assert!(err.is_owned_without_owner());

    compile(&schema, TrackingBehavior::NoTracking, entity(&schema, "Address")).unwrap();

    let both = Expr::record(vec![entity(&schema, "Customer"), entity(&schema, "Address")]);
    compile(&schema, TrackingBehavior::TrackAll, both).unwrap();
}

#[test]
fn client_constants_are_rejected() {
    let schema = customers();
    let customer = schema.find_model_ref("Customer").unwrap();
    let shaper = Expr::record(vec![
        ProjectionBinding::column(0, Type::I32),
        Expr::constant(Value::Model(customer)),
    ]);

    let err = compile(&schema, TrackingBehavior::NoTracking, shaper).unwrap_err();
    assert!(err.is_client_constant());
}

#[test]
fn the_lambda_takes_the_query_context_and_the_row() {
    let schema = customers();
    let cx = QueryCompilationContext::new(schema.clone(), TrackingBehavior::TrackAll, false);
    let shaped = ShapedQuery::new(Expr::null(Type::Any), entity(&schema, "Customer"))
        .with_cardinality(ResultCardinality::SingleOrDefault);

    let compiled = ShapedQueryCompiler::new(&cx).compile(&shaped).unwrap();
    let lambda = compiled.lambda().as_lambda().unwrap();

    assert_eq!(lambda.params[0], *cx.query_context());
    assert_eq!(*lambda.params[1].ty(), Type::ValueBuffer);
    assert_eq!(compiled.cardinality(), ResultCardinality::SingleOrDefault);
    assert_eq!(compiled.result_ty(), Type::Model(schema.find_model("Customer").unwrap().id));
}
