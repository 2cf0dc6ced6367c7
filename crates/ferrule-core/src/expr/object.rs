use super::Value;
use crate::schema::ModelId;
use indexmap::IndexMap;
use std::{fmt, sync::Arc};

/// A materialized model instance.
///
/// Objects compare structurally with `==`; use [`Object::ptr_eq`] to check
/// whether two handles refer to the same instance, which is what identity
/// resolution guarantees.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    model: ModelId,
    name: String,
    fields: IndexMap<String, Value>,
}

impl Object {
    pub fn new(model: ModelId, name: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                model,
                name: name.into(),
                fields,
            }),
        }
    }

    /// The concrete model this instance was materialized as.
    pub fn model(&self) -> ModelId {
        self.inner.model
    }

    pub fn model_name(&self) -> &str {
        &self.inner.name
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.inner.fields.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.inner.fields.iter().map(|(name, value)| (&name[..], value))
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Object::ptr_eq(self, other)
            || (self.inner.model == other.inner.model && self.inner.fields == other.inner.fields)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{ ", self.inner.name)?;
        for (i, (name, value)) in self.inner.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str(" }")
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.inner.name);
        for (name, value) in &self.inner.fields {
            s.field(name, value);
        }
        s.finish()
    }
}
