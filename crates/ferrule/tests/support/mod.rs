#![allow(dead_code)]

use ferrule::{
    engine::EntityQueryRoot,
    expr::{Expr, Object, QueryableMethod, Type, Value},
    provider::memory::MemoryProvider,
    Config, QueryCompiler, Schema,
};
use std::sync::Arc;

pub use std_util::prelude::*;

pub fn customers() -> Arc<Schema> {
    let mut builder = Schema::builder();
    builder.model("Customer", |m| {
        m.key("Id", Type::I32).field("Name", Type::String);
    });
    Arc::new(builder.build().unwrap())
}

pub fn animals() -> Arc<Schema> {
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
        });
    Arc::new(builder.build().unwrap())
}

/// A store holding Ann, Bea and Cid with ids 1, 2 and 3.
pub fn customer_store() -> MemoryProvider {
    let provider = MemoryProvider::new(customers());
    provider
        .insert(
            "Customer",
            [(1, "Ann"), (2, "Bea"), (3, "Cid")]
                .map(|(id, name)| vec![Value::I32(id), Value::from(name)]),
        )
        .unwrap();
    provider
}

/// A store holding Rex and Fido the dogs and Tom the cat.
pub fn animal_store() -> MemoryProvider {
    let provider = MemoryProvider::new(animals());
    provider
        .insert(
            "Dog",
            [(1, "Rex"), (3, "Fido")]
                .map(|(id, name)| vec![Value::I32(id), Value::from(name), Value::from("Dog")]),
        )
        .unwrap();
    provider
        .insert(
            "Cat",
            [vec![Value::I32(2), Value::from("Tom"), Value::from("Cat")]],
        )
        .unwrap();
    provider
}

pub fn compiler(provider: &MemoryProvider) -> QueryCompiler {
    compiler_with(provider, Config::new())
}

pub fn compiler_with(provider: &MemoryProvider, config: Config) -> QueryCompiler {
    QueryCompiler::builder()
        .schema(provider.schema().clone())
        .provider(Arc::new(provider.clone()))
        .config(config)
        .build()
        .unwrap()
}

pub fn root(schema: &Arc<Schema>, name: &str) -> Expr {
    EntityQueryRoot::new(&schema.find_model_ref(name).unwrap())
}

pub fn model(schema: &Arc<Schema>, name: &str) -> Type {
    Type::Model(schema.find_model(name).unwrap().id)
}

/// Applies a sequence operator that keeps the element type of `source`.
pub fn chain(method: QueryableMethod, source: Expr, args: Vec<Expr>) -> Expr {
    let ty = source.ty().clone();
    Expr::queryable(method, source, args, ty)
}

/// `|c| c.<property>` over instances of `model`.
pub fn property(schema: &Arc<Schema>, model_name: &str, property: &str, ty: Type) -> Expr {
    Expr::lambda1("c", model(schema, model_name), |c| {
        Expr::property(c, property, ty)
    })
}

/// `|c| c.Name == name` over customers.
pub fn named(schema: &Arc<Schema>, name: &str) -> Expr {
    Expr::lambda1("c", model(schema, "Customer"), |c| {
        Expr::eq(Expr::property(c, "Name", Type::String), name)
    })
}

pub fn objects(value: &Value) -> Vec<&Object> {
    let Value::List(items) = value else {
        panic!("expected a list; found {value:?}");
    };
    items.iter().map(|item| item.as_object().unwrap()).collect()
}

pub fn names(value: &Value) -> Vec<String> {
    objects(value)
        .into_iter()
        .map(|object| match object.get("Name") {
            Some(Value::String(name)) => name.clone(),
            other => panic!("expected a name; found {other:?}"),
        })
        .collect()
}
