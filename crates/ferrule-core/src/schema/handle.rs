use super::{Field, FieldId, Model, ModelId, Navigation, Schema};
use crate::Result;
use std::{fmt, sync::Arc};

/// A type descriptor: a model together with the schema that defines it.
///
/// Handles keep the schema alive, so they can be stored in values and
/// carried by compiled plans.
#[derive(Clone)]
pub struct ModelRef {
    schema: Arc<Schema>,
    id: ModelId,
}

/// A property, navigation or primary key descriptor.
#[derive(Clone)]
pub struct Descriptor {
    schema: Arc<Schema>,
    kind: DescriptorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorKind {
    Field(FieldId),
    Navigation { model: ModelId, index: usize },
    Key(ModelId),
}

impl ModelRef {
    pub fn new(schema: Arc<Schema>, id: ModelId) -> Self {
        Self { schema, id }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn model(&self) -> &Model {
        self.schema.model(self.id)
    }

    pub fn name(&self) -> &str {
        &self.model().name
    }

    pub fn find_field(&self, name: &str) -> Result<Descriptor> {
        let Some(field) = self.model().field_by_name(name) else {
            crate::bail!("entity type `{}` has no property `{name}`", self.name());
        };
        Ok(self.descriptor(DescriptorKind::Field(field.id)))
    }

    pub fn find_navigation(&self, name: &str) -> Result<Descriptor> {
        let model = self.model();
        let Some(index) = model.navigations.iter().position(|nav| nav.name == name) else {
            crate::bail!("entity type `{}` has no navigation `{name}`", self.name());
        };
        Ok(self.descriptor(DescriptorKind::Navigation {
            model: self.id,
            index,
        }))
    }

    pub fn find_primary_key(&self) -> Result<Descriptor> {
        if self.model().primary_key.is_none() {
            crate::bail!("entity type `{}` has no primary key", self.name());
        }
        Ok(self.descriptor(DescriptorKind::Key(self.id)))
    }

    fn descriptor(&self, kind: DescriptorKind) -> Descriptor {
        Descriptor {
            schema: self.schema.clone(),
            kind,
        }
    }
}

impl Descriptor {
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn kind(&self) -> &DescriptorKind {
        &self.kind
    }

    /// The model declaring the described member.
    pub fn model(&self) -> &Model {
        let id = match self.kind {
            DescriptorKind::Field(field) => field.model,
            DescriptorKind::Navigation { model, .. } | DescriptorKind::Key(model) => model,
        };
        self.schema.model(id)
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self.kind {
            DescriptorKind::Field(id) => Some(self.schema.field(id)),
            _ => None,
        }
    }

    pub fn as_navigation(&self) -> Option<&Navigation> {
        match self.kind {
            DescriptorKind::Navigation { model, index } => {
                self.schema.model(model).navigations.get(index)
            }
            _ => None,
        }
    }

    /// The key fields, in key order, when this describes a primary key.
    pub fn key_fields(&self) -> Vec<&Field> {
        match self.kind {
            DescriptorKind::Key(_) => self.model().primary_key_fields().collect(),
            _ => vec![],
        }
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id() == other.schema.id() && self.id == other.id
    }
}

impl PartialEq for Descriptor {
    fn eq(&self, other: &Self) -> bool {
        self.schema.id() == other.schema.id() && self.kind == other.kind
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelRef({})", self.name())
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = &self.model().name;
        match self.kind {
            DescriptorKind::Field(id) => write!(f, "{model}.{}", self.schema.field(id).name),
            DescriptorKind::Navigation { .. } => match self.as_navigation() {
                Some(navigation) => write!(f, "{model}.{}", navigation.name),
                None => write!(f, "{model}.<navigation>"),
            },
            DescriptorKind::Key(_) => write!(f, "{model}.key"),
        }
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Descriptor({self})")
    }
}
