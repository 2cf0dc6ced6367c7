use super::CompiledQuery;
use crate::TrackingBehavior;
use ferrule_core::{
    expr::{Expr, ExprComparer, ExprHasher},
    schema::SchemaId,
    Result, Schema,
};
use parking_lot::RwLock;
use std::{collections::HashMap, sync::Arc};
use tracing::trace;

/// Identifies a compiled plan.
///
/// Trees that differ only by a consistent renaming of lambda parameters get
/// the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlanCacheKey {
    hash: u64,
    schema: SchemaId,
    tracking: TrackingBehavior,
    is_async: bool,
}

impl PlanCacheKey {
    pub fn new(
        tree: &Expr,
        schema: &Schema,
        tracking: TrackingBehavior,
        is_async: bool,
    ) -> Result<Self> {
        Ok(Self {
            hash: ExprHasher::hash(tree)?,
            schema: schema.id(),
            tracking,
            is_async,
        })
    }

    /// The structural hash of the tree.
    pub fn tree_hash(&self) -> u64 {
        self.hash
    }
}

/// Compiled plans by key.
///
/// Keys only narrow the search. A hit also requires the cached tree to
/// equal the requested one structurally.
#[derive(Debug, Default)]
pub struct PlanCache {
    entries: RwLock<HashMap<PlanCacheKey, Vec<Entry>>>,
}

#[derive(Debug)]
struct Entry {
    tree: Expr,
    plan: Arc<CompiledQuery>,
}

impl PlanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PlanCacheKey, tree: &Expr) -> Result<Option<Arc<CompiledQuery>>> {
        let entries = self.entries.read();
        let Some(bucket) = entries.get(key) else {
            return Ok(None);
        };
        find(bucket, tree)
    }

    /// Publishes `plan` under `key`.
    ///
    /// When another compilation already published a plan for an equal tree,
    /// that plan is kept and returned instead.
    pub fn insert(
        &self,
        key: PlanCacheKey,
        tree: Expr,
        plan: Arc<CompiledQuery>,
    ) -> Result<Arc<CompiledQuery>> {
        let mut entries = self.entries.write();
        let bucket = entries.entry(key).or_default();

        if let Some(published) = find(bucket, &tree)? {
            trace!(hash = key.hash, "discarding redundant compilation");
            return Ok(published);
        }

        bucket.push(Entry {
            tree,
            plan: plan.clone(),
        });
        Ok(plan)
    }

    /// The number of cached plans.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

fn find(bucket: &[Entry], tree: &Expr) -> Result<Option<Arc<CompiledQuery>>> {
    for entry in bucket {
        if ExprComparer::equals(&entry.tree, tree)? {
            return Ok(Some(entry.plan.clone()));
        }
    }
    Ok(None)
}
