use super::{Entry, StateManager};
use crate::{
    expr::Value,
    schema::{Descriptor, DescriptorKind, ModelId, ModelRef},
    Error, Result,
};
use parking_lot::Mutex;
use std::collections::HashMap;

/// The default [`StateManager`]: tracked instances keyed by hierarchy root
/// and primary key values.
///
/// Keys are per hierarchy root, so a `Cat` and a `Dog` with the same key
/// are the same animal.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: Mutex<HashMap<IdentityKey, Entry>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct IdentityKey {
    root: ModelId,
    values: Vec<KeyValue>,
}

/// Hashable form of a key value. Integers of every width map to the same
/// variant, matching how values compare.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum KeyValue {
    Bool(bool),
    Int(i64),
    Float(u64),
    String(String),
    Other(String),
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> Vec<Entry> {
        self.entries.lock().values().cloned().collect()
    }
}

impl StateManager for IdentityMap {
    fn try_get_entry(
        &self,
        key: &Descriptor,
        key_values: &[Value],
        throw_on_null: bool,
    ) -> Result<(Option<Entry>, bool)> {
        let DescriptorKind::Key(model) = *key.kind() else {
            crate::bail!("`{key}` is not a primary key");
        };

        if let Some(position) = key_values.iter().position(Value::is_null) {
            if throw_on_null {
                let fields = key.key_fields();
                let property = fields
                    .get(position)
                    .map(|field| field.name.as_str())
                    .unwrap_or_default();
                return Err(Error::invalid_key_value(&key.model().name, property));
            }
            return Ok((None, true));
        }

        let identity = IdentityKey {
            root: key.schema().root_of(model),
            values: key_values.iter().map(KeyValue::from).collect(),
        };

        Ok((self.entries.lock().get(&identity).cloned(), false))
    }

    fn start_tracking(&self, model: &ModelRef, instance: Value, shadow: Value) -> Result<Entry> {
        let definition = model.model();
        if definition.primary_key.is_none() {
            crate::bail!("entity type `{}` has no key and cannot be tracked", model.name());
        }

        let mut key = vec![];
        for field in definition.primary_key_fields() {
            let value = if field.shadow {
                let position = definition.shadow_position(field.id);
                let shadow_values = shadow.as_list().unwrap_or_default();
                position.and_then(|position| shadow_values.get(position))
            } else {
                instance.as_object().and_then(|object| object.get(&field.name))
            };

            match value {
                Some(value) if !value.is_null() => key.push(value.clone()),
                _ => return Err(Error::invalid_key_value(model.name(), &field.name)),
            }
        }

        let identity = IdentityKey {
            root: model.schema().root_of(model.id()),
            values: key.iter().map(KeyValue::from).collect(),
        };

        let mut entries = self.entries.lock();
        let entry = entries
            .entry(identity)
            .or_insert_with(|| {
                tracing::trace!(model = %model, key = ?key, "start tracking");
                Entry::new(model.clone(), instance, shadow, key)
            })
            .clone();

        Ok(entry)
    }
}

impl From<&Value> for KeyValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Bool(v) => Self::Bool(*v),
            Value::I32(v) => Self::Int(i64::from(*v)),
            Value::I64(v) => Self::Int(*v),
            Value::F64(v) => Self::Float(v.to_bits()),
            Value::String(v) => Self::String(v.clone()),
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{expr::Object, expr::Type, Schema};
    use indexmap::IndexMap;
    use std::sync::Arc;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .model("Customer", |m| {
                    m.key("Id", Type::I32).field("Name", Type::String);
                })
                .build()
                .unwrap(),
        )
    }

    fn customer(model: &ModelRef, id: i32, name: &str) -> Value {
        let mut fields = IndexMap::new();
        fields.insert("Id".to_string(), Value::I32(id));
        fields.insert("Name".to_string(), Value::from(name));
        Value::Object(Object::new(model.id(), model.name(), fields))
    }

    #[test]
    fn first_tracked_instance_wins() {
        let schema = schema();
        let model = schema.find_model_ref("Customer").unwrap();
        let map = IdentityMap::new();

        let first = map
            .start_tracking(&model, customer(&model, 1, "Ann"), Value::Record(vec![]))
            .unwrap();
        let second = map
            .start_tracking(&model, customer(&model, 1, "Other"), Value::Record(vec![]))
            .unwrap();

        assert!(Entry::ptr_eq(&first, &second));
        assert_eq!(map.len(), 1);

        let key = model.find_primary_key().unwrap();
        let (hit, has_null) = map.try_get_entry(&key, &[Value::I64(1)], true).unwrap();
        assert!(!has_null);
        assert!(Entry::ptr_eq(&hit.unwrap(), &first));
    }

    #[test]
    fn null_key_values() {
        let schema = schema();
        let model = schema.find_model_ref("Customer").unwrap();
        let key = model.find_primary_key().unwrap();
        let map = IdentityMap::new();

        let (entry, has_null) = map.try_get_entry(&key, &[Value::Null], false).unwrap();
        assert!(entry.is_none());
        assert!(has_null);

        let err = map.try_get_entry(&key, &[Value::Null], true).unwrap_err();
        assert!(err.is_invalid_key_value());
        assert_eq!(
            err.to_string(),
            "invalid key value: property `Id` of entity type `Customer` is null"
        );
    }
}
