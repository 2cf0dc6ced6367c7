use super::{CompiledQuery, ResultCardinality};
use crate::{provider::Rows, ExecutionContext, LiftContext, QueryContext, TrackingBehavior};
use async_stream::try_stream;
use ferrule_core::{
    bail,
    expr::{Closure, Param, Value, ValueStream},
    Error, Result, Schema,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, instrument};

impl CompiledQuery {
    /// Runs the plan to completion.
    ///
    /// Sequence plans produce a list; single-result plans produce the one
    /// result.
    #[instrument(level = "debug", skip_all, fields(cardinality = ?self.cardinality))]
    pub fn execute(&self, cx: &QueryContext) -> Result<Value> {
        if self.is_async {
            bail!("the plan was compiled for asynchronous execution; use `execute_async`");
        }

        let (exec, shaper, mut rows) = self.start(cx)?;

        if self.cardinality != ResultCardinality::Sequence {
            return self.single(&exec, &shaper, &mut rows);
        }

        let mut results = vec![];
        while let Some(result) = next(&exec, &shaper, &mut rows)? {
            results.push(result);
        }
        debug!(rows = results.len(), "materialized results");
        Ok(Value::List(results))
    }

    /// Runs the plan as a stream pulling one row at a time.
    ///
    /// The stream ends at the first error; results already yielded stay
    /// valid.
    #[instrument(level = "debug", skip_all, fields(cardinality = ?self.cardinality))]
    pub fn execute_async(&self, cx: &QueryContext) -> Result<ValueStream> {
        if !self.is_async {
            bail!("the plan was compiled for synchronous execution; use `execute`");
        }

        let (exec, shaper, mut rows) = self.start(cx)?;

        if self.cardinality != ResultCardinality::Sequence {
            return Ok(ValueStream::from_value(self.single(&exec, &shaper, &mut rows)?));
        }

        Ok(ValueStream::from_stream(try_stream! {
            while let Some(result) = next(&exec, &shaper, &mut rows)? {
                yield result;
            }
        }))
    }

    /// Resolves the lifted slots, runs the prologue and starts the store
    /// half.
    fn start(&self, cx: &QueryContext) -> Result<(ExecutionContext, Closure, Rows)> {
        let slots = self.resolve_slots(cx.schema())?;
        let exec = ExecutionContext::new(
            cx.clone(),
            self.query_context.clone(),
            self.tracking == TrackingBehavior::NoTrackingWithIdentityResolution,
        )
        .with_slots(slots);

        exec.check_cancelled()?;

        for statement in &self.prologue {
            exec.eval(statement)?;
        }

        let shaper = exec.closure(&self.shaper)?;
        let rows = self.executor.execute(&self.query_expression, &exec)?;
        Ok((exec, shaper, rows))
    }

    /// Evaluates the slots in order; each body sees the lift context and
    /// the slots before it.
    fn resolve_slots(&self, schema: &Arc<Schema>) -> Result<HashMap<Param, Value>> {
        if self.lifted.is_empty() {
            return Ok(HashMap::new());
        }

        let lift = LiftContext::new(schema.clone());
        let mut bindings = HashMap::from([(self.lift_context.clone(), Value::Context)]);

        for slot in self.lifted.slots() {
            let value = slot.body().eval_with(&lift, bindings.clone())?;
            bindings.insert(slot.param().clone(), value);
        }

        bindings.remove(&self.lift_context);
        Ok(bindings)
    }

    /// Collapses the rows of a single-result plan.
    fn single(&self, exec: &ExecutionContext, shaper: &Closure, rows: &mut Rows) -> Result<Value> {
        let Some(first) = next(exec, shaper, rows)? else {
            return match self.cardinality {
                ResultCardinality::SingleOrDefault => Ok(self.result_ty.default_value()),
                _ => Err(Error::no_elements()),
            };
        };

        exec.check_cancelled()?;
        if rows.next().transpose()?.is_some() {
            return Err(Error::too_many_elements());
        }

        Ok(first)
    }
}

/// Pulls and shapes the next row.
fn next(exec: &ExecutionContext, shaper: &Closure, rows: &mut Rows) -> Result<Option<Value>> {
    exec.check_cancelled()?;

    let Some(row) = rows.next().transpose()? else {
        return Ok(None);
    };

    shaper
        .call(exec, vec![Value::Context, Value::Buffer(row)])
        .map(Some)
}
