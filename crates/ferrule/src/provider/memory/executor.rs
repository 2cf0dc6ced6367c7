use super::{Aggregate, MemoryQueryExpression, Operation, OrderKey, SetKind, Source, Store};
use crate::{
    provider::{QueryExecutor, Rows},
    ExecutionContext,
};
use ferrule_core::{
    bail,
    expr::{Closure, Expr, Printer, Value, ValueBuffer},
    Error, Result,
};
use std::{cmp::Ordering, sync::Arc};
use tracing::debug;

/// Runs [`MemoryQueryExpression`]s against the rows of a store.
#[derive(Debug)]
pub(super) struct MemoryExecutor {
    store: Arc<Store>,
}

impl MemoryExecutor {
    pub(super) fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn run(&self, query: &MemoryQueryExpression, cx: &ExecutionContext) -> Result<Vec<ValueBuffer>> {
        let mut rows = match query.source() {
            Source::Table(root) => self.store.rows(*root),
            Source::Values(values) => values
                .iter()
                .map(|value| Ok(ValueBuffer::new(vec![cx.eval(value)?])))
                .collect::<Result<_>>()?,
            Source::List(list) => match cx.eval(list)? {
                Value::List(items) => items
                    .into_iter()
                    .map(|item| ValueBuffer::new(vec![item]))
                    .collect(),
                Value::Null => vec![],
                other => bail!("expected a list of values, found {}", other.kind_name()),
            },
        };

        for operation in query.operations() {
            cx.check_cancelled()?;
            rows = self.apply(operation, rows, cx)?;
        }

        Ok(rows)
    }

    fn apply(
        &self,
        operation: &Operation,
        mut rows: Vec<ValueBuffer>,
        cx: &ExecutionContext,
    ) -> Result<Vec<ValueBuffer>> {
        Ok(match operation {
            Operation::Filter(predicate) => {
                let predicate = cx.closure(predicate)?;
                let mut kept = Vec::with_capacity(rows.len());
                for row in rows {
                    if test(cx, &predicate, &row)? {
                        kept.push(row);
                    }
                }
                kept
            }
            Operation::OrderBy(keys) => order(cx, keys, rows)?,
            Operation::Skip(count) => {
                let count = cx.eval(count)?.to_usize()?;
                rows.into_iter().skip(count).collect()
            }
            Operation::Take(count) => {
                let count = cx.eval(count)?.to_usize()?;
                rows.truncate(count);
                rows
            }
            Operation::SkipWhile(predicate) => {
                let predicate = cx.closure(predicate)?;
                let mut skipped = 0;
                for row in &rows {
                    if !test(cx, &predicate, row)? {
                        break;
                    }
                    skipped += 1;
                }
                rows.split_off(skipped)
            }
            Operation::TakeWhile(predicate) => {
                let predicate = cx.closure(predicate)?;
                let mut taken = 0;
                for row in &rows {
                    if !test(cx, &predicate, row)? {
                        break;
                    }
                    taken += 1;
                }
                rows.truncate(taken);
                rows
            }
            Operation::Reverse => {
                rows.reverse();
                rows
            }
            Operation::Distinct(key) => {
                let key = key.as_ref().map(|key| cx.closure(key)).transpose()?;
                distinct(cx, key.as_ref(), rows)?
            }
            Operation::Set { kind, other, key } => {
                let Some(other) = other.downcast_ref::<MemoryQueryExpression>() else {
                    return Err(Error::unhandled_node(Printer::print(other)));
                };
                let other = self.run(other, cx)?;
                let key = key.as_ref().map(|key| cx.closure(key)).transpose()?;
                set(cx, *kind, rows, key.as_ref(), other)?
            }
            Operation::Aggregate(aggregate) => {
                vec![ValueBuffer::new(vec![self.aggregate(aggregate, &rows, cx)?])]
            }
        })
    }

    fn aggregate(
        &self,
        aggregate: &Aggregate,
        rows: &[ValueBuffer],
        cx: &ExecutionContext,
    ) -> Result<Value> {
        Ok(match aggregate {
            Aggregate::All(predicate) => {
                let predicate = cx.closure(predicate)?;
                for row in rows {
                    if !test(cx, &predicate, row)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            Aggregate::Any => Value::Bool(!rows.is_empty()),
            Aggregate::Count => Value::I32(i32::try_from(rows.len()).map_err(|_| {
                Error::expression_evaluation_failed("row count does not fit in i32")
            })?),
            Aggregate::LongCount => Value::I64(rows.len() as i64),
            Aggregate::Sum(selector) => {
                let Selected { values, .. } = select(cx, selector, rows)?;
                if values.iter().any(|value| matches!(value, Value::F64(_))) {
                    Value::F64(values.iter().map(as_f64).sum::<Result<f64>>()?)
                } else {
                    let mut sum = 0i64;
                    for value in &values {
                        sum = sum.checked_add(value.to_i64()?).ok_or_else(|| {
                            Error::expression_evaluation_failed("sum overflowed")
                        })?;
                    }
                    Value::I64(sum)
                }
            }
            Aggregate::Min(selector) => extreme(select(cx, selector, rows)?, Ordering::Less)?,
            Aggregate::Max(selector) => extreme(select(cx, selector, rows)?, Ordering::Greater)?,
            Aggregate::Average(selector) => {
                let Selected { values, saw_null } = select(cx, selector, rows)?;
                if values.is_empty() {
                    return nothing_selected(saw_null);
                }
                let sum = values.iter().map(as_f64).sum::<Result<f64>>()?;
                Value::F64(sum / values.len() as f64)
            }
            Aggregate::Contains { element, item } => {
                let element = cx.closure(element)?;
                let item = cx.eval(item)?;
                for row in rows {
                    if call(cx, &element, row)?.same_as(&item) {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
        })
    }
}

impl QueryExecutor for MemoryExecutor {
    fn execute(&self, query: &Expr, cx: &ExecutionContext) -> Result<Rows> {
        let Some(query) = query.downcast_ref::<MemoryQueryExpression>() else {
            return Err(Error::unhandled_node(Printer::print(query)));
        };

        let rows = self.run(query, cx)?;
        debug!(rows = rows.len(), "in-memory query produced rows");
        Ok(Box::new(rows.into_iter().map(Ok)))
    }
}

fn call(cx: &ExecutionContext, function: &Closure, row: &ValueBuffer) -> Result<Value> {
    function.call(cx, vec![Value::Buffer(row.clone())])
}

/// A null predicate result rejects the row.
fn test(cx: &ExecutionContext, predicate: &Closure, row: &ValueBuffer) -> Result<bool> {
    match call(cx, predicate, row)? {
        Value::Null => Ok(false),
        value => value.to_bool(),
    }
}

/// The results of a selector, nulls left out.
struct Selected {
    values: Vec<Value>,

    /// The selector produced a null for some row
    saw_null: bool,
}

fn select(cx: &ExecutionContext, selector: &Expr, rows: &[ValueBuffer]) -> Result<Selected> {
    let selector = cx.closure(selector)?;
    let mut selected = Selected {
        values: Vec::with_capacity(rows.len()),
        saw_null: false,
    };
    for row in rows {
        let value = call(cx, &selector, row)?;
        if value.is_null() {
            selected.saw_null = true;
        } else {
            selected.values.push(value);
        }
    }
    Ok(selected)
}

/// Min, max and average of a selector that produced no value: null when
/// the selector produced nulls, otherwise the sequence was empty.
fn nothing_selected(saw_null: bool) -> Result<Value> {
    if saw_null {
        Ok(Value::Null)
    } else {
        Err(Error::no_elements())
    }
}

fn extreme(selected: Selected, wanted: Ordering) -> Result<Value> {
    let mut values = selected.values.into_iter();
    let Some(mut best) = values.next() else {
        return nothing_selected(selected.saw_null);
    };
    for value in values {
        if compare(&value, &best) == wanted {
            best = value;
        }
    }
    Ok(best)
}

fn as_f64(value: &Value) -> Result<f64> {
    match value {
        Value::F64(v) => Ok(*v),
        Value::I32(v) => Ok(f64::from(*v)),
        Value::I64(v) => Ok(*v as f64),
        other => bail!("cannot aggregate {}", other.kind_name()),
    }
}

/// Total order over column values: nulls first, then booleans, numbers and
/// strings. Values of other kinds compare equal.
fn compare(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::I32(_) | Value::I64(_) | Value::F64(_) => 2,
            Value::String(_) => 3,
            _ => 4,
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::I32(_) | Value::I64(_), Value::I32(_) | Value::I64(_)) => {
            match (a.to_i64(), b.to_i64()) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => Ordering::Equal,
            }
        }
        _ if rank(a) == 2 && rank(b) == 2 => match (as_f64(a), as_f64(b)) {
            (Ok(a), Ok(b)) => a.total_cmp(&b),
            _ => Ordering::Equal,
        },
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Stable sort by the keys, the first key most significant.
fn order(
    cx: &ExecutionContext,
    keys: &[OrderKey],
    rows: Vec<ValueBuffer>,
) -> Result<Vec<ValueBuffer>> {
    let functions = keys
        .iter()
        .map(|key| cx.closure(&key.key))
        .collect::<Result<Vec<_>>>()?;

    let mut keyed = Vec::with_capacity(rows.len());
    for row in rows {
        let values = functions
            .iter()
            .map(|function| call(cx, function, &row))
            .collect::<Result<Vec<_>>>()?;
        keyed.push((values, row));
    }

    keyed.sort_by(|(a, _), (b, _)| {
        keys.iter()
            .zip(a.iter().zip(b))
            .map(|(key, (a, b))| {
                let ordering = compare(a, b);
                if key.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    });

    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

fn row_key(cx: &ExecutionContext, key: Option<&Closure>, row: &ValueBuffer) -> Result<Value> {
    match key {
        Some(key) => call(cx, key, row),
        None => Ok(Value::Record(row.columns().to_vec())),
    }
}

fn distinct(
    cx: &ExecutionContext,
    key: Option<&Closure>,
    rows: Vec<ValueBuffer>,
) -> Result<Vec<ValueBuffer>> {
    let mut seen: Vec<Value> = vec![];
    let mut kept = vec![];
    for row in rows {
        let value = row_key(cx, key, &row)?;
        if !seen.iter().any(|seen| seen.same_as(&value)) {
            seen.push(value);
            kept.push(row);
        }
    }
    Ok(kept)
}

fn set(
    cx: &ExecutionContext,
    kind: SetKind,
    mut rows: Vec<ValueBuffer>,
    key: Option<&Closure>,
    other: Vec<ValueBuffer>,
) -> Result<Vec<ValueBuffer>> {
    if kind == SetKind::Concat {
        rows.extend(other);
        return Ok(rows);
    }
    if kind == SetKind::Union {
        rows.extend(other);
        return distinct(cx, key, rows);
    }

    let other = other
        .iter()
        .map(|row| row_key(cx, key, row))
        .collect::<Result<Vec<_>>>()?;
    let keep_shared = kind == SetKind::Intersect;

    let mut kept = vec![];
    for row in distinct(cx, key, rows)? {
        let value = row_key(cx, key, &row)?;
        if other.iter().any(|other| other.same_as(&value)) == keep_shared {
            kept.push(row);
        }
    }
    Ok(kept)
}
