use super::{Field, FieldId, Navigation};
use crate::expr::Value;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Name of the model, used by lifted resolvers to find it again
    pub name: String,

    /// The model this one derives from
    pub base: Option<ModelId>,

    /// Abstract models are never materialized directly
    pub is_abstract: bool,

    /// Inherited fields first, in the base's order, then the model's own
    pub fields: Vec<Field>,

    pub navigations: Vec<Navigation>,

    pub primary_key: Option<PrimaryKey>,

    /// Set on every model of a hierarchy
    pub discriminator: Option<Discriminator>,

    /// Set when the model is owned by another and only reachable through it
    pub owner: Option<Ownership>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ModelId(pub usize);

#[derive(Debug, Clone)]
pub struct PrimaryKey {
    pub fields: Vec<FieldId>,
}

#[derive(Debug, Clone)]
pub struct Discriminator {
    /// The shadow column holding the discriminator
    pub field: FieldId,

    /// The value identifying this model. Abstract models have none.
    pub value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct Ownership {
    pub owner: ModelId,

    /// The owner's navigation that reaches this model
    pub navigation: String,
}

impl Model {
    pub fn field(&self, id: FieldId) -> &Field {
        assert_eq!(self.id, id.model);
        &self.fields[id.index]
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn navigation_by_name(&self, name: &str) -> Option<&Navigation> {
        self.navigations.iter().find(|navigation| navigation.name == name)
    }

    /// Fields stored on the instance itself.
    pub fn properties(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| !field.shadow)
    }

    /// Fields kept only in the shadow snapshot, in shadow order.
    pub fn shadow_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.fields.iter().filter(|field| field.shadow)
    }

    /// Position of a shadow field within the shadow snapshot.
    pub fn shadow_position(&self, id: FieldId) -> Option<usize> {
        self.shadow_fields().position(|field| field.id == id)
    }

    pub fn primary_key_fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.primary_key
            .iter()
            .flat_map(|pk| pk.fields.iter())
            .map(|id| self.field(*id))
    }

    pub fn is_owned(&self) -> bool {
        self.owner.is_some()
    }
}

impl From<&Model> for ModelId {
    fn from(value: &Model) -> Self {
        value.id
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
