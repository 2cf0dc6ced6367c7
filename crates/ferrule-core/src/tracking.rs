mod identity_map;
pub use identity_map::IdentityMap;

use crate::{
    expr::Value,
    schema::{Descriptor, ModelRef},
    Result,
};
use std::{fmt, sync::Arc};

/// The change-tracking service materialization talks to.
///
/// Implementations are used from one query execution at a time but must be
/// shareable with the stream that drives it.
pub trait StateManager: Send + Sync {
    /// Looks up the tracked instance with the given key values.
    ///
    /// Returns the entry, if any, and whether one of the key values is null.
    /// With `throw_on_null`, a null key value is an "invalid key value"
    /// error instead.
    fn try_get_entry(
        &self,
        key: &Descriptor,
        key_values: &[Value],
        throw_on_null: bool,
    ) -> Result<(Option<Entry>, bool)>;

    /// Starts tracking a freshly materialized instance.
    ///
    /// If an instance with the same key is already tracked, its entry is
    /// returned and `instance` is discarded.
    fn start_tracking(&self, model: &ModelRef, instance: Value, shadow: Value) -> Result<Entry>;
}

/// A tracked instance with its shadow snapshot.
#[derive(Clone)]
pub struct Entry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    model: ModelRef,
    instance: Value,
    shadow: Value,
    key: Vec<Value>,
}

impl Entry {
    pub fn new(model: ModelRef, instance: Value, shadow: Value, key: Vec<Value>) -> Self {
        Self {
            inner: Arc::new(EntryInner {
                model,
                instance,
                shadow,
                key,
            }),
        }
    }

    pub fn model(&self) -> &ModelRef {
        &self.inner.model
    }

    pub fn instance(&self) -> &Value {
        &self.inner.instance
    }

    /// Shadow property values, in shadow order.
    pub fn shadow(&self) -> &Value {
        &self.inner.shadow
    }

    pub fn key(&self) -> &[Value] {
        &self.inner.key
    }

    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        Entry::ptr_eq(self, other)
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("model", &self.inner.model)
            .field("key", &self.inner.key)
            .finish()
    }
}
