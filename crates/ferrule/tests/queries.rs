mod support;
use support::*;

use ferrule::{
    expr::{Expr, Object, Param, QueryableMethod as M, Type, Value},
    provider::memory::MemoryProvider,
    QueryContext, Schema, TrackingBehavior,
};
use std::sync::Arc;

#[test]
fn filter_by_name() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let query = chain(M::Where, root(&schema, "Customer"), vec![named(&schema, "Ann")]);
    let plan = assert_ok!(compiler.create_executor(&query, false));
    let result = assert_ok!(plan.execute(&QueryContext::new(schema)));

    let customers = objects(&result);
    assert_eq!(customers.len(), 1);
    assert_eq!(customers[0].model_name(), "Customer");
    assert_eq!(customers[0].get("Id"), Some(&Value::I32(1)));
    assert_eq!(customers[0].get("Name"), Some(&Value::from("Ann")));
}

#[test]
fn untracked_customers_materialize_in_row_order() {
    let provider = MemoryProvider::new(customers());
    provider
        .insert(
            "Customer",
            [
                vec![Value::I32(1), Value::from("Ann")],
                vec![Value::I32(2), Value::from("Bea")],
            ],
        )
        .unwrap();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let plan = assert_ok!(compiler.create_executor_with(
        &root(&schema, "Customer"),
        false,
        TrackingBehavior::NoTracking,
    ));
    let result = assert_ok!(plan.execute(&QueryContext::new(schema)));

    let customers = objects(&result);
    let fields: Vec<_> = customers
        .iter()
        .map(|customer| {
            (
                customer.model_name().to_string(),
                customer.get("Id").cloned(),
                customer.get("Name").cloned(),
            )
        })
        .collect();
    assert_eq!(
        fields,
        [
            ("Customer".to_string(), Some(Value::I32(1)), Some(Value::from("Ann"))),
            ("Customer".to_string(), Some(Value::I32(2)), Some(Value::from("Bea"))),
        ]
    );
    assert!(!Object::ptr_eq(customers[0], customers[1]));
}

#[test]
fn order_skip_and_take() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let id = property(&schema, "Customer", "Id", Type::I32);
    let query = chain(M::OrderByDescending, root(&schema, "Customer"), vec![id]);
    let query = chain(M::Skip, query, vec![Expr::constant(1)]);
    let query = chain(M::Take, query, vec![Expr::constant(1)]);

    let result = assert_ok!(assert_ok!(compiler.create_executor(&query, false))
        .execute(&QueryContext::new(schema)));
    assert_eq!(names(&result), ["Bea"]);
}

#[test]
fn then_by_breaks_ties() {
    let provider = customer_store();
    provider
        .insert("Customer", [vec![Value::I32(4), Value::from("Ann")]])
        .unwrap();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let name = property(&schema, "Customer", "Name", Type::String);
    let id = property(&schema, "Customer", "Id", Type::I32);
    let query = chain(M::OrderBy, root(&schema, "Customer"), vec![name]);
    let query = chain(M::ThenByDescending, query, vec![id]);

    let result = assert_ok!(assert_ok!(compiler.create_executor(&query, false))
        .execute(&QueryContext::new(schema)));
    let ids: Vec<_> = objects(&result)
        .iter()
        .map(|customer| customer.get("Id").cloned())
        .collect();
    assert_eq!(
        ids,
        [4, 1, 2, 3].map(|id| Some(Value::I32(id)))
    );
}

#[test]
fn captured_counts_are_read_per_execution() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let n = Param::new("n", Type::I32);
    let query = chain(M::Take, root(&schema, "Customer"), vec![Expr::parameter(&n)]);
    let plan = assert_ok!(compiler.create_executor(&query, false));

    let cx = QueryContext::new(schema.clone());
    cx.add_parameter("n", 2);
    assert_eq!(names(&assert_ok!(plan.execute(&cx))), ["Ann", "Bea"]);

    cx.add_parameter("n", 1);
    assert_eq!(names(&assert_ok!(plan.execute(&cx))), ["Ann"]);
}

#[test]
fn extracted_counts_leave_caller_parameters_alone() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    // The caller's names collide with the names extracted counts would use.
    let take = Param::new("take", Type::I32);
    let skipped = Param::new("__take", Type::I32);
    let n = Param::new("n", Type::I32);
    let predicate = Expr::lambda1("c", model(&schema, "Customer"), |c| {
        let id = Expr::property(c, "Id", Type::I32);
        Expr::and_also(Expr::gt(id.clone(), &take), Expr::ne(id, &skipped))
    });
    let query = chain(M::Where, root(&schema, "Customer"), vec![predicate]);
    let query = chain(M::Take, query, vec![Expr::parameter(&n)]);
    let plan = assert_ok!(compiler.create_executor(&query, false));

    let cx = QueryContext::new(schema.clone());
    cx.add_parameter("take", 1);
    cx.add_parameter("__take", 2);
    cx.add_parameter("n", 1);
    assert_eq!(names(&assert_ok!(plan.execute(&cx))), ["Cid"]);

    assert_eq!(cx.parameter("take"), Some(Value::I32(1)));
    assert_eq!(cx.parameter("__take"), Some(Value::I32(2)));
    assert_eq!(cx.parameter("__take_0"), None);
}

#[test]
fn contains_over_a_list_parameter() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let ids = Param::new("ids", Type::list(Type::I32));
    let predicate = Expr::lambda1("c", model(&schema, "Customer"), |c| {
        Expr::queryable(
            M::Contains,
            Expr::parameter(&ids),
            vec![Expr::property(c, "Id", Type::I32)],
            Type::Bool,
        )
    });
    let query = chain(M::Where, root(&schema, "Customer"), vec![predicate]);
    let plan = assert_ok!(compiler.create_executor(&query, false));

    let cx = QueryContext::new(schema);
    cx.add_parameter("ids", Value::List(vec![Value::I32(3), Value::I32(1)]));
    assert_eq!(names(&assert_ok!(plan.execute(&cx))), ["Ann", "Cid"]);
}

#[test]
fn contains_over_a_constant_list() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let ids = Expr::constant(Value::List(vec![Value::I32(2)]));
    let predicate = Expr::lambda1("c", model(&schema, "Customer"), |c| {
        Expr::queryable(
            M::Contains,
            ids,
            vec![Expr::property(c, "Id", Type::I32)],
            Type::Bool,
        )
    });
    let query = chain(M::Where, root(&schema, "Customer"), vec![predicate]);

    let result = assert_ok!(assert_ok!(compiler.create_executor(&query, false))
        .execute(&QueryContext::new(schema)));
    assert_eq!(names(&result), ["Bea"]);
}

#[test]
fn projections_produce_plain_values() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let name = property(&schema, "Customer", "Name", Type::String);
    let query = Expr::queryable(
        M::Select,
        root(&schema, "Customer"),
        vec![name],
        Type::queryable(Type::String),
    );
    let query = chain(M::Reverse, query, vec![]);

    let result = assert_ok!(assert_ok!(compiler.create_executor(&query, false))
        .execute(&QueryContext::new(schema)));
    assert_eq!(
        result,
        Value::List(vec![
            Value::from("Cid"),
            Value::from("Bea"),
            Value::from("Ann"),
        ])
    );
}

#[test]
fn aggregates() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);
    let cx = QueryContext::new(schema.clone());

    let run = |query: Expr| compiler.create_executor(&query, false)?.execute(&cx);

    let count = Expr::queryable(M::Count, root(&schema, "Customer"), vec![], Type::I32);
    assert_eq!(assert_ok!(run(count)), Value::I32(3));

    let count = Expr::queryable(
        M::LongCount,
        root(&schema, "Customer"),
        vec![named(&schema, "Bea")],
        Type::I64,
    );
    assert_eq!(assert_ok!(run(count)), Value::I64(1));

    let sum = Expr::queryable(
        M::Sum,
        root(&schema, "Customer"),
        vec![property(&schema, "Customer", "Id", Type::I32)],
        Type::I64,
    );
    assert_eq!(assert_ok!(run(sum)), Value::I64(6));

    let max = Expr::queryable(
        M::Max,
        root(&schema, "Customer"),
        vec![property(&schema, "Customer", "Name", Type::String)],
        Type::String,
    );
    assert_eq!(assert_ok!(run(max)), Value::from("Cid"));

    let average = Expr::queryable(
        M::Average,
        root(&schema, "Customer"),
        vec![property(&schema, "Customer", "Id", Type::I32)],
        Type::F64,
    );
    assert_eq!(assert_ok!(run(average)), Value::F64(2.0));

    let any = Expr::queryable(
        M::Any,
        root(&schema, "Customer"),
        vec![named(&schema, "Zed")],
        Type::Bool,
    );
    assert_eq!(assert_ok!(run(any)), Value::Bool(false));

    let all = Expr::queryable(
        M::All,
        root(&schema, "Customer"),
        vec![Expr::lambda1("c", model(&schema, "Customer"), |c| {
            Expr::gt(Expr::property(c, "Id", Type::I32), 0)
        })],
        Type::Bool,
    );
    assert_eq!(assert_ok!(run(all)), Value::Bool(true));
}

#[test]
fn aggregates_over_nothing() {
    let provider = MemoryProvider::new(customers());
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let average = Expr::queryable(
        M::Average,
        root(&schema, "Customer"),
        vec![property(&schema, "Customer", "Id", Type::I32)],
        Type::F64,
    );
    let plan = assert_ok!(compiler.create_executor(&average, false));
    assert!(assert_err!(plan.execute(&QueryContext::new(schema.clone()))).is_no_elements());

    let count = Expr::queryable(M::Count, root(&schema, "Customer"), vec![], Type::I32);
    let plan = assert_ok!(compiler.create_executor(&count, false));
    assert_eq!(assert_ok!(plan.execute(&QueryContext::new(schema))), Value::I32(0));
}

fn readings() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder.model("Reading", |m| {
        m.key("Id", Type::I32).nullable("Level", Type::I32);
    });
    Arc::new(builder.build().unwrap())
}

#[test]
fn aggregates_over_only_nulls_are_null() {
    let provider = MemoryProvider::new(readings());
    provider
        .insert(
            "Reading",
            [1, 2].map(|id| vec![Value::I32(id), Value::Null]),
        )
        .unwrap();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);
    let cx = QueryContext::new(schema.clone());

    let level = || property(&schema, "Reading", "Level", Type::I32);
    for (method, ty) in [(M::Min, Type::I32), (M::Max, Type::I32), (M::Average, Type::F64)] {
        let query = Expr::queryable(method, root(&schema, "Reading"), vec![level()], ty);
        let plan = assert_ok!(compiler.create_executor(&query, false));
        assert_eq!(assert_ok!(plan.execute(&cx)), Value::Null);
    }

    let sum = Expr::queryable(M::Sum, root(&schema, "Reading"), vec![level()], Type::I64);
    let plan = assert_ok!(compiler.create_executor(&sum, false));
    assert_eq!(assert_ok!(plan.execute(&cx)), Value::I64(0));
}

#[test]
fn single_results() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);
    let cx = QueryContext::new(schema.clone());
    let customer = model(&schema, "Customer");

    let run = |method, args| {
        let query = Expr::queryable(method, root(&schema, "Customer"), args, customer.clone());
        compiler.create_executor(&query, false)?.execute(&cx)
    };

    let first = assert_ok!(run(M::First, vec![]));
    assert_eq!(first.as_object().unwrap().get("Name"), Some(&Value::from("Ann")));

    let last = assert_ok!(run(M::Last, vec![]));
    assert_eq!(last.as_object().unwrap().get("Name"), Some(&Value::from("Cid")));

    let bea = assert_ok!(run(M::Single, vec![named(&schema, "Bea")]));
    assert_eq!(bea.as_object().unwrap().get("Id"), Some(&Value::I32(2)));

    let second = assert_ok!(run(M::ElementAt, vec![Expr::constant(1)]));
    assert_eq!(second.as_object().unwrap().get("Name"), Some(&Value::from("Bea")));

    assert!(assert_err!(run(M::Single, vec![])).is_too_many_elements());
    assert!(assert_err!(run(M::Single, vec![named(&schema, "Zed")])).is_no_elements());
    assert_eq!(
        assert_ok!(run(M::SingleOrDefault, vec![named(&schema, "Zed")])),
        Value::Null
    );
    assert!(assert_err!(run(M::First, vec![named(&schema, "Zed")])).is_no_elements());
    assert_eq!(
        assert_ok!(run(M::FirstOrDefault, vec![named(&schema, "Zed")])),
        Value::Null
    );
}

#[test]
fn derived_types_are_filtered_by_discriminator() {
    let provider = animal_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);
    let cx = QueryContext::new(schema.clone());

    let dogs = root(&schema, "Dog");
    let result = assert_ok!(assert_ok!(compiler.create_executor(&dogs, false)).execute(&cx));
    assert_eq!(names(&result), ["Rex", "Fido"]);

    let animals = assert_ok!(
        assert_ok!(compiler.create_executor(&root(&schema, "Animal"), false)).execute(&cx)
    );
    let kinds: Vec<_> = objects(&animals)
        .iter()
        .map(|animal| animal.model_name().to_string())
        .collect();
    assert_eq!(kinds, ["Dog", "Dog", "Cat"]);

    let cats = Expr::queryable(
        M::OfType,
        root(&schema, "Animal"),
        vec![],
        Type::queryable(model(&schema, "Cat")),
    );
    let result = assert_ok!(assert_ok!(compiler.create_executor(&cats, false)).execute(&cx));
    assert_eq!(names(&result), ["Tom"]);
}

#[test]
fn set_operators() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);
    let cx = QueryContext::new(schema.clone());

    let ann = chain(M::Where, root(&schema, "Customer"), vec![named(&schema, "Ann")]);
    let union = chain(M::Union, root(&schema, "Customer"), vec![ann.clone()]);
    let result = assert_ok!(assert_ok!(compiler.create_executor(&union, false)).execute(&cx));
    assert_eq!(names(&result), ["Ann", "Bea", "Cid"]);

    let except = chain(M::Except, root(&schema, "Customer"), vec![ann]);
    let result = assert_ok!(assert_ok!(compiler.create_executor(&except, false)).execute(&cx));
    assert_eq!(names(&result), ["Bea", "Cid"]);
}

#[test]
fn untranslatable_queries_fail() {
    let provider = customer_store();
    let schema = provider.schema().clone();
    let compiler = compiler(&provider);

    let key = property(&schema, "Customer", "Id", Type::I32);
    let query = Expr::queryable(
        M::GroupBy,
        root(&schema, "Customer"),
        vec![key],
        Type::queryable(Type::Any),
    );

    let err = assert_err!(compiler.create_executor(&query, false));
    assert!(err.is_translation_failed());
    assert!(err
        .to_string()
        .contains("`group_by` is not supported by the in-memory store"));
}
