use super::{Closure, Object, Type};
use crate::{
    schema::{Descriptor, ModelRef},
    tracking::Entry,
    Error, Result,
};
use std::{fmt, sync::Arc};

/// A runtime value produced by evaluating an expression.
#[derive(Debug, Default, Clone, PartialEq)]
pub enum Value {
    /// Null value
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Signed 32-bit integer
    I32(i32),

    /// Signed 64-bit integer
    I64(i64),

    /// 64-bit float
    F64(f64),

    /// String value
    String(String),

    /// A list of values of the same type
    List(Vec<Value>),

    /// A fixed-length tuple of values
    Record(Vec<Value>),

    /// A row of raw column values
    Buffer(ValueBuffer),

    /// A materialized model instance
    Object(Object),

    /// A handle to a model of a schema
    Model(ModelRef),

    /// A handle to a field, navigation or key of a schema
    Descriptor(Descriptor),

    /// A change-tracking entry
    Entry(Entry),

    /// A closure created by evaluating a lambda
    Function(Closure),

    /// The runtime context the evaluation runs against
    Context,
}

/// A row of raw column values, as handed over by the store.
///
/// Cloning a buffer is cheap; the columns are shared.
#[derive(Clone, PartialEq)]
pub struct ValueBuffer {
    columns: Arc<[Value]>,
}

impl Value {
    pub const fn null() -> Self {
        Self::Null
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn record_from_vec(fields: Vec<Self>) -> Self {
        Self::Record(fields)
    }

    pub fn list_from_vec(items: Vec<Self>) -> Self {
        Self::List(items)
    }

    /// Returns `true` if the value can be reproduced from its printed form.
    ///
    /// Literal kinds are null, booleans, numbers, strings and lists or
    /// records of literal kinds. Everything else references live state that
    /// does not outlive the current execution.
    pub fn is_literal(&self) -> bool {
        match self {
            Self::Null
            | Self::Bool(_)
            | Self::I32(_)
            | Self::I64(_)
            | Self::F64(_)
            | Self::String(_) => true,
            Self::List(items) | Self::Record(items) => items.iter().all(Value::is_literal),
            _ => false,
        }
    }

    /// A short name for the kind of value, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Record(_) => "record",
            Self::Buffer(_) => "value buffer",
            Self::Object(_) => "object",
            Self::Model(_) => "type descriptor",
            Self::Descriptor(_) => "descriptor",
            Self::Entry(_) => "entry",
            Self::Function(_) => "function",
            Self::Context => "context",
        }
    }

    /// Infers the static type of a literal value.
    pub fn infer_ty(&self) -> Type {
        match self {
            Self::Null => Type::Any,
            Self::Bool(_) => Type::Bool,
            Self::I32(_) => Type::I32,
            Self::I64(_) => Type::I64,
            Self::F64(_) => Type::F64,
            Self::String(_) => Type::String,
            Self::List(items) => Type::list(items.first().map(Value::infer_ty).unwrap_or(Type::Any)),
            Self::Record(items) => Type::Record(items.iter().map(Value::infer_ty).collect()),
            Self::Buffer(_) => Type::ValueBuffer,
            Self::Object(object) => Type::Model(object.model()),
            Self::Model(_) => Type::TypeDescriptor,
            Self::Descriptor(_) => Type::Descriptor,
            Self::Entry(_) => Type::Entry,
            Self::Function(_) => Type::func(vec![], Type::Any),
            Self::Context => Type::QueryContext,
        }
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(v) => Ok(*v),
            _ => Err(Error::expression_evaluation_failed(format!(
                "expected bool, found {}",
                self.kind_name()
            ))),
        }
    }

    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Self::I32(v) => Ok(i64::from(*v)),
            Self::I64(v) => Ok(*v),
            _ => Err(Error::expression_evaluation_failed(format!(
                "expected integer, found {}",
                self.kind_name()
            ))),
        }
    }

    pub fn to_usize(&self) -> Result<usize> {
        let v = self.to_i64()?;
        usize::try_from(v).map_err(|_| {
            Error::expression_evaluation_failed(format!("expected non-negative integer, found {v}"))
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(v) => Some(v),
            _ => None,
        }
    }

    /// The items of a list or the fields of a record.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) | Self::Record(items) => Some(items),
            _ => None,
        }
    }

    /// Equality used by constants, switch cases and keys: floats compare
    /// bitwise so that every value is equal to itself.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::F64(a), Self::F64(b)) => a.to_bits() == b.to_bits(),
            (Self::I32(a), Self::I64(b)) | (Self::I64(b), Self::I32(a)) => i64::from(*a) == *b,
            (Self::List(a), Self::List(b)) | (Self::Record(a), Self::Record(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_as(b))
            }
            _ => self == other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::I32(v) => write!(f, "{v}"),
            Self::I64(v) => write!(f, "{v}"),
            Self::F64(v) => write!(f, "{v:?}"),
            Self::String(v) => write!(f, "{v:?}"),
            Self::List(items) => {
                f.write_str("[")?;
                fmt_items(f, items)?;
                f.write_str("]")
            }
            Self::Record(items) => {
                f.write_str("(")?;
                fmt_items(f, items)?;
                f.write_str(")")
            }
            Self::Buffer(buffer) => {
                f.write_str("row[")?;
                fmt_items(f, buffer.columns())?;
                f.write_str("]")
            }
            Self::Object(object) => write!(f, "{object}"),
            Self::Model(model) => write!(f, "{model}"),
            Self::Descriptor(descriptor) => write!(f, "{descriptor}"),
            Self::Entry(entry) => write!(f, "entry({})", entry.instance()),
            Self::Function(_) => f.write_str("<function>"),
            Self::Context => f.write_str("<context>"),
        }
    }
}

fn fmt_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl ValueBuffer {
    pub fn new(columns: Vec<Value>) -> Self {
        Self {
            columns: columns.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Value] {
        &self.columns
    }

    /// Reads the column at `index`.
    pub fn read(&self, index: usize) -> Result<&Value> {
        self.columns.get(index).ok_or_else(|| {
            Error::expression_evaluation_failed(format!(
                "column index {index} out of range for a row of {} columns",
                self.columns.len()
            ))
        })
    }
}

impl fmt::Debug for ValueBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns.iter()).finish()
    }
}

impl From<Vec<Value>> for ValueBuffer {
    fn from(columns: Vec<Value>) -> Self {
        Self::new(columns)
    }
}

impl From<ValueBuffer> for Value {
    fn from(value: ValueBuffer) -> Self {
        Self::Buffer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Self::Null,
        }
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Self::Object(value)
    }
}

impl From<ModelRef> for Value {
    fn from(value: ModelRef) -> Self {
        Self::Model(value)
    }
}

impl From<Descriptor> for Value {
    fn from(value: Descriptor) -> Self {
        Self::Descriptor(value)
    }
}

impl From<Entry> for Value {
    fn from(value: Entry) -> Self {
        Self::Entry(value)
    }
}
