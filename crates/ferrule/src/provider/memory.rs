//! A provider keeping rows in memory.
//!
//! Rows are stored per inheritance hierarchy, in insertion order, with one
//! column per storage slot of the hierarchy. Derived types are told apart
//! by their discriminator column.

mod executor;
use executor::MemoryExecutor;

mod query_expression;
pub use query_expression::{
    Aggregate, MemoryQueryExpression, Operation, OrderKey, SetKind, Source,
};

mod translator;
use translator::MemoryTranslator;

use super::{Provider, QueryExecutor};
use crate::engine::{QueryCompilationContext, QueryableTranslator};
use ferrule_core::{
    bail,
    expr::{Expr, Param, Value, ValueBuffer},
    schema::ModelId,
    Result, Schema,
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// An in-memory store and its query provider.
///
/// Cloning shares the rows. Plans compiled against the provider see rows
/// inserted after compilation.
#[derive(Debug, Clone)]
pub struct MemoryProvider {
    store: Arc<Store>,
}

#[derive(Debug)]
struct Store {
    schema: Arc<Schema>,

    /// Rows by hierarchy root
    tables: RwLock<HashMap<ModelId, Vec<ValueBuffer>>>,
}

impl MemoryProvider {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            store: Arc::new(Store {
                schema,
                tables: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.store.schema
    }

    /// Appends rows for `model`.
    ///
    /// Each row holds one value per storage column of the model's
    /// hierarchy, including the discriminator and shadow columns. Either
    /// every row is inserted or none is.
    pub fn insert(&self, model: &str, rows: impl IntoIterator<Item = Vec<Value>>) -> Result<()> {
        let schema = &self.store.schema;
        let model = schema.find_model(model)?;
        let root = schema.root_of(model.id);
        let width = self.store.width(root);

        let mut buffers = vec![];
        for row in rows {
            if row.len() != width {
                bail!(
                    "a row of `{}` has {} columns; expected {width}",
                    model.name,
                    row.len()
                );
            }
            buffers.push(ValueBuffer::new(row));
        }

        debug!(model = %model.name, rows = buffers.len(), "inserted rows");
        self.store
            .tables
            .write()
            .entry(root)
            .or_default()
            .extend(buffers);
        Ok(())
    }

    /// Removes every row.
    pub fn clear(&self) {
        self.store.tables.write().clear();
    }
}

impl Store {
    /// The rows of the hierarchy rooted at `root`.
    fn rows(&self, root: ModelId) -> Vec<ValueBuffer> {
        self.tables.read().get(&root).cloned().unwrap_or_default()
    }

    /// The number of storage columns of the hierarchy rooted at `root`.
    fn width(&self, root: ModelId) -> usize {
        self.schema
            .models()
            .filter(|model| self.schema.root_of(model.id) == root)
            .flat_map(|model| &model.fields)
            .map(|field| field.storage_index + 1)
            .max()
            .unwrap_or(0)
    }
}

impl Provider for MemoryProvider {
    fn should_convert_to_inline_query_root(&self, _: &Expr) -> bool {
        true
    }

    fn should_convert_to_parameter_query_root(&self, _: &Param) -> bool {
        true
    }

    fn queryable_translator<'a>(
        &'a self,
        cx: &'a mut QueryCompilationContext,
    ) -> Box<dyn QueryableTranslator + 'a> {
        Box::new(MemoryTranslator::new(cx))
    }

    fn executor(&self) -> Arc<dyn QueryExecutor> {
        Arc::new(MemoryExecutor::new(self.store.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrule_core::expr::Type;

    fn schema() -> Arc<Schema> {
        let mut builder = Schema::builder();
        builder
            .model("Animal", |m| {
                m.key("Id", Type::I32)
                    .field("Name", Type::String)
                    .discriminator("Kind")
                    .discriminator_value("Animal");
            })
            .model("Dog", |m| {
                m.base("Animal")
                    .field("Breed", Type::String)
                    .discriminator_value("Dog");
            });
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn rows_span_the_whole_hierarchy() {
        let provider = MemoryProvider::new(schema());
        let dog = vec![
            Value::I32(1),
            Value::from("Rex"),
            Value::from("Dog"),
            Value::from("Collie"),
        ];
        provider.insert("Dog", [dog]).unwrap();

        let err = provider
            .insert("Animal", [vec![Value::I32(2), Value::from("Tom")]])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "a row of `Animal` has 2 columns; expected 4"
        );

        let root = provider.schema().find_model("Animal").unwrap().id;
        assert_eq!(provider.store.rows(root).len(), 1);
    }

    #[test]
    fn failed_inserts_keep_no_rows() {
        let provider = MemoryProvider::new(schema());
        let valid = vec![Value::I32(1), Value::from("Tom"), Value::from("Animal"), Value::Null];

        assert!(provider.insert("Animal", [valid, vec![]]).is_err());
        assert!(provider.insert("Cat", Vec::<Vec<Value>>::new()).is_err());

        let root = provider.schema().find_model("Animal").unwrap().id;
        assert!(provider.store.rows(root).is_empty());
    }

    #[test]
    fn clones_share_rows() {
        let provider = MemoryProvider::new(schema());
        let clone = provider.clone();
        clone
            .insert(
                "Animal",
                [vec![Value::I32(1), Value::from("Tom"), Value::from("Animal"), Value::Null]],
            )
            .unwrap();

        let root = provider.schema().find_model("Animal").unwrap().id;
        assert_eq!(provider.store.rows(root).len(), 1);

        provider.clear();
        assert!(clone.store.rows(root).is_empty());
    }
}
