mod builder;
pub use builder::{Builder, ModelBuilder};

mod field;
pub use field::{Field, FieldId};

mod handle;
pub use handle::{Descriptor, DescriptorKind, ModelRef};

mod model;
pub use model::{Discriminator, Model, ModelId, Ownership, PrimaryKey};

mod navigation;
pub use navigation::Navigation;

use crate::Result;
use indexmap::IndexMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// The mapped object model: entity types, their properties and navigations,
/// keys, inheritance and ownership.
///
/// A schema is immutable once built. Every schema gets a process-unique id
/// so that plans compiled against one schema are never reused for another.
#[derive(Debug)]
pub struct Schema {
    id: SchemaId,

    /// Models in declaration order, indexed by `ModelId`
    models: Vec<Model>,

    by_name: IndexMap<String, ModelId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaId(u64);

static NEXT_SCHEMA_ID: AtomicU64 = AtomicU64::new(0);

impl SchemaId {
    fn next() -> Self {
        Self(NEXT_SCHEMA_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    fn from_models(models: Vec<Model>) -> Self {
        let by_name = models
            .iter()
            .map(|model| (model.name.clone(), model.id))
            .collect();

        Self {
            id: SchemaId::next(),
            models,
            by_name,
        }
    }

    pub fn id(&self) -> SchemaId {
        self.id
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    /// Get a model by ID
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        &self.models[id.into().0]
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.by_name.get(name).map(|id| self.model(*id))
    }

    /// Resolves a model by name, failing when the schema does not map it.
    pub fn find_model(&self, name: &str) -> Result<&Model> {
        self.model_by_name(name)
            .ok_or_else(|| crate::err!("entity type `{name}` is not part of the schema"))
    }

    /// Resolves a model by name into a handle that keeps the schema alive.
    pub fn find_model_ref(self: &Arc<Self>, name: &str) -> Result<ModelRef> {
        let id = self.find_model(name)?.id;
        Ok(ModelRef::new(self.clone(), id))
    }

    pub fn model_ref(self: &Arc<Self>, id: ModelId) -> ModelRef {
        ModelRef::new(self.clone(), id)
    }

    /// Get a field by ID
    pub fn field(&self, id: FieldId) -> &Field {
        &self.model(id.model).fields[id.index]
    }

    /// The root of the inheritance hierarchy `id` belongs to.
    pub fn root_of(&self, id: ModelId) -> ModelId {
        let mut current = id;
        while let Some(base) = self.model(current).base {
            current = base;
        }
        current
    }

    /// Returns `true` if instances of `from` are instances of `to`.
    pub fn is_assignable(&self, from: ModelId, to: ModelId) -> bool {
        let mut current = Some(from);
        while let Some(id) = current {
            if id == to {
                return true;
            }
            current = self.model(id).base;
        }
        false
    }

    /// The non-abstract models assignable to `id`, including `id` itself,
    /// in declaration order.
    pub fn concrete_types(&self, id: ModelId) -> Vec<&Model> {
        self.models
            .iter()
            .filter(|model| !model.is_abstract && self.is_assignable(model.id, id))
            .collect()
    }

    /// Returns `true` if `id` has derived models.
    pub fn has_derived(&self, id: ModelId) -> bool {
        self.models.iter().any(|model| model.base == Some(id))
    }
}
