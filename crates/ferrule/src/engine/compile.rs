use super::{
    LiftableConstant, ProjectionBinding, QueryCompilationContext, ResultCardinality, ShapedQuery,
    StructuralTypeShaper,
};
use crate::TrackingBehavior;
use ferrule_core::{
    expr::{visit, Exception, Expr, Param, Printer, Rewrite, SwitchCase, Type},
    schema::{Field, Model, ModelId, ModelRef},
    Error, Result, Schema,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, trace};

/// The lowered shaper of a query: a lambda from the query context and one
/// row to one result.
#[derive(Debug, Clone)]
pub struct CompiledShaper {
    lambda: Expr,
    cardinality: ResultCardinality,
}

impl CompiledShaper {
    /// `|query_context, value_buffer| ...`
    pub fn lambda(&self) -> &Expr {
        &self.lambda
    }

    pub fn cardinality(&self) -> ResultCardinality {
        self.cardinality
    }

    /// The type of one result.
    pub fn result_ty(&self) -> Type {
        self.lambda.ty().ret().cloned().unwrap_or(Type::Any)
    }
}

/// Lowers the shaper of a shaped query into plain expressions.
///
/// Projection bindings become reads of the row. Every structural type
/// shaper becomes a block materializing an instance from the row, resolving
/// identity and tracking the instance as the tracking behavior requires.
pub struct ShapedQueryCompiler<'a> {
    schema: &'a Arc<Schema>,
    tracking: TrackingBehavior,
    query_context: &'a Param,
}

/// Rewrites one shaper.
struct Lowering<'a> {
    schema: &'a Arc<Schema>,
    tracking: TrackingBehavior,
    query_context: &'a Param,
    value_buffer: &'a Param,

    /// Suffix of the next block variable
    next_variable: usize,

    /// Models materialized by the shaper
    visited: HashSet<ModelId>,
}

/// Where the row of one materialization comes from.
struct Materialization<'a> {
    model: &'a ModelRef,
    condition: &'a Expr,
    buffer: Expr,
    context: Expr,
}

impl<'a> ShapedQueryCompiler<'a> {
    pub fn new(cx: &'a QueryCompilationContext) -> Self {
        Self {
            schema: cx.schema(),
            tracking: cx.tracking(),
            query_context: cx.query_context(),
        }
    }

    pub fn compile(&self, shaped: &ShapedQuery) -> Result<CompiledShaper> {
        verify_no_client_constant(shaped.shaper())?;

        let value_buffer = Param::new("value_buffer", Type::ValueBuffer);
        let mut lowering = Lowering {
            schema: self.schema,
            tracking: self.tracking,
            query_context: self.query_context,
            value_buffer: &value_buffer,
            next_variable: 0,
            visited: HashSet::new(),
        };

        let body = lowering.rewrite_expr(shaped.shaper())?;

        if self.tracking == TrackingBehavior::TrackAll {
            lowering.verify_owners()?;
        }

        let lambda = Expr::lambda(vec![self.query_context.clone(), value_buffer], body);
        debug!(
            cardinality = ?shaped.cardinality(),
            tracking = ?self.tracking,
            "compiled shaper"
        );
        trace!(shaper = %Printer::print(&lambda));

        Ok(CompiledShaper {
            lambda,
            cardinality: shaped.cardinality(),
        })
    }
}

/// Rejects constants holding values that cannot be reproduced outside of
/// the current execution. Such values must be wrapped in a liftable
/// constant instead.
pub(crate) fn verify_no_client_constant(expr: &Expr) -> Result<()> {
    let mut leaked = None;
    visit::for_each_expr(expr, |expr| {
        if leaked.is_some() {
            return;
        }
        if let Some(value) = expr.as_constant() {
            if !value.is_literal() {
                leaked = Some(format!("{} constant `{value}`", value.kind_name()));
            }
        }
    });

    match leaked {
        Some(description) => Err(Error::client_constant(description)),
        None => Ok(()),
    }
}

impl Rewrite for Lowering<'_> {
    fn rewrite_expr(&mut self, expr: &Expr) -> Result<Expr> {
        if let Some(binding) = expr.downcast_ref::<ProjectionBinding>() {
            return Ok(binding.bind(Expr::parameter(self.value_buffer)));
        }

        if let Some(shaper) = expr.downcast_ref::<StructuralTypeShaper>() {
            let row = self.rewrite_expr(shaper.value_buffer())?;
            return self.lower_shaper(shaper, row);
        }

        expr.rewrite_children(self)
    }
}

impl Lowering<'_> {
    fn variable(&mut self, name: &str, ty: Type) -> Param {
        let param = Param::new(format!("{name}{}", self.next_variable), ty);
        self.next_variable += 1;
        param
    }

    fn lower_shaper(&mut self, shaper: &StructuralTypeShaper, row: Expr) -> Result<Expr> {
        let model = shaper.model();
        self.visited.insert(model.id());

        let materialization_context =
            self.variable("materialization_context", Type::MaterializationContext);
        let mut variables = vec![materialization_context.clone()];
        let mut exprs = vec![Expr::assign(
            &materialization_context,
            Expr::materialization_context(row, self.query_context),
        )];

        let m = Materialization {
            model,
            condition: shaper.condition(),
            buffer: Expr::member(&materialization_context, "value_buffer", Type::ValueBuffer),
            context: Expr::member(&materialization_context, "context", Type::QueryContext),
        };

        let keyed = model.model().primary_key.is_some();
        let body = match (keyed, self.tracking.resolves_identity(), shaper.is_nullable()) {
            (false, ..) => materialize(&m, false),
            (true, true, nullable) => {
                let probe = self.variable("entry", Type::Record(vec![Type::Entry, Type::Bool]));
                variables.push(probe.clone());
                exprs.push(Expr::assign(&probe, probe_identity_map(&m, !nullable)));
                resolve_identity(&m, &probe)
            }
            (true, false, false) => {
                exprs.extend(reject_null_keys(&m));
                materialize(&m, false)
            }
            (true, false, true) => Expr::condition(
                Expr::and_all(
                    key_reads(&m)
                        .into_iter()
                        .map(|read| Expr::not(Expr::is_null(read))),
                ),
                materialize(&m, false),
                Expr::default_of(Type::Model(model.id())),
            ),
        };
        exprs.push(body);

        Ok(Expr::block(variables, exprs))
    }

    /// Every owned model must be materialized together with its owner.
    fn verify_owners(&self) -> Result<()> {
        let visited_roots: HashSet<_> = self
            .visited
            .iter()
            .map(|id| self.schema.root_of(*id))
            .collect();

        for id in &self.visited {
            let mut current = self.schema.model(*id);
            while let Some(ownership) = &current.owner {
                let owner = self.schema.model(ownership.owner);
                if !visited_roots.contains(&self.schema.root_of(owner.id)) {
                    return Err(Error::owned_without_owner(
                        &self.schema.model(*id).name,
                        &owner.name,
                    ));
                }
                current = owner;
            }
        }

        Ok(())
    }
}

fn read(m: &Materialization<'_>, field: &Field) -> Expr {
    Expr::read_value(m.buffer.clone(), field.storage_index, field.ty.clone())
}

fn key_reads(m: &Materialization<'_>) -> Vec<Expr> {
    m.model
        .model()
        .primary_key_fields()
        .map(|field| read(m, field))
        .collect()
}

/// `context.try_get_entry(key, (key columns...), throw_on_null)`
fn probe_identity_map(m: &Materialization<'_>, throw_on_null: bool) -> Expr {
    Expr::try_get_entry(
        m.context.clone(),
        LiftableConstant::primary_key(m.model),
        Expr::record(key_reads(m)),
        throw_on_null,
    )
}

/// A hit reuses the tracked instance, a null key yields null, and a miss
/// materializes and starts tracking.
fn resolve_identity(m: &Materialization<'_>, probe: &Param) -> Expr {
    let ty = Type::Model(m.model.id());
    let entry = Expr::record_field(probe, 0);
    let has_null_key = Expr::record_field(probe, 1);

    Expr::condition(
        Expr::not(Expr::is_null(entry.clone())),
        Expr::entry_instance(entry, ty.clone()),
        Expr::condition(has_null_key, Expr::default_of(ty), materialize(m, true)),
    )
}

/// One check per key column, raising "invalid key value" on a null.
fn reject_null_keys(m: &Materialization<'_>) -> Vec<Expr> {
    let model = m.model.model();
    model
        .primary_key_fields()
        .map(|field| {
            Expr::condition(
                Expr::is_null(read(m, field)),
                Expr::throw(
                    Exception::InvalidKeyValue {
                        entity: model.name.clone(),
                        property: field.name.clone(),
                    },
                    None,
                    Type::Unit,
                ),
                Expr::default_of(Type::Unit),
            )
        })
        .collect()
}

/// Switches over the concrete type the condition picks for the row.
fn materialize(m: &Materialization<'_>, tracked: bool) -> Expr {
    let schema = m.model.schema();
    let model = m.model.model();

    let cases = schema
        .concrete_types(model.id)
        .into_iter()
        .map(|concrete| {
            let concrete = schema.model_ref(concrete.id);
            SwitchCase::new(
                vec![LiftableConstant::model(&concrete)],
                construct(m, &concrete, tracked),
            )
        })
        .collect();

    let discriminator = match &model.discriminator {
        Some(discriminator) => read(m, schema.field(discriminator.field)),
        None => Expr::null(Type::String),
    };

    Expr::switch(
        Type::Model(model.id),
        Expr::invoke(m.condition.clone(), vec![m.buffer.clone()]),
        cases,
        Some(Expr::throw(
            Exception::UnableToDiscriminate {
                entity: model.name.clone(),
            },
            Some(discriminator),
            Type::Model(model.id),
        )),
    )
}

/// Builds the instance from its non-shadow properties. Tracked instances
/// are registered together with their shadow snapshot.
fn construct(m: &Materialization<'_>, concrete: &ModelRef, tracked: bool) -> Expr {
    let definition: &Model = concrete.model();
    let (members, args): (Vec<_>, Vec<_>) = definition
        .properties()
        .map(|field| (field.name.clone(), read(m, field)))
        .unzip();
    let instance = Expr::new_model(definition.id, members, args);

    if !tracked {
        return instance;
    }

    let shadow = Expr::record(
        definition
            .shadow_fields()
            .map(|field| read(m, field))
            .collect(),
    );

    Expr::entry_instance(
        Expr::start_tracking(
            m.context.clone(),
            LiftableConstant::model(concrete),
            instance,
            shadow,
        ),
        Type::Model(m.model.id()),
    )
}

#[cfg(test)]
mod tests;
