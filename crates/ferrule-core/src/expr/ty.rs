use super::Value;
use crate::schema::ModelId;
use std::fmt;

/// The static type of an expression.
///
/// Every expression node carries its type from construction on. Passes never
/// re-infer types; they read them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The type of expressions evaluated only for their effects
    Unit,

    /// Boolean value
    Bool,

    /// Signed 32-bit integer
    I32,

    /// Signed 64-bit integer
    I64,

    /// 64-bit float
    F64,

    /// String type
    String,

    /// A type that is only known at runtime
    Any,

    /// An instance of a model
    Model(ModelId),

    /// An in-memory list of a single type
    List(Box<Type>),

    /// A fixed-length tuple where each item can have a different type.
    Record(Vec<Type>),

    /// A lazily enumerated sequence
    Sequence(Box<Type>),

    /// A composable query source producing items of the given type
    Queryable(Box<Type>),

    /// A function from the argument types to the return type
    Func(Vec<Type>, Box<Type>),

    /// A row of raw column values produced by the store
    ValueBuffer,

    /// A handle to a model of the schema
    TypeDescriptor,

    /// A handle to a field, navigation or key of the schema
    Descriptor,

    /// A change-tracking entry
    Entry,

    /// The per-execution runtime context
    QueryContext,

    /// The context lifted constant resolvers run against
    LiftContext,

    /// A row buffer bound together with the runtime context
    MaterializationContext,
}

impl Type {
    pub fn list(item: impl Into<Self>) -> Self {
        Self::List(Box::new(item.into()))
    }

    pub fn sequence(item: impl Into<Self>) -> Self {
        Self::Sequence(Box::new(item.into()))
    }

    pub fn queryable(item: impl Into<Self>) -> Self {
        Self::Queryable(Box::new(item.into()))
    }

    pub fn func(args: Vec<Type>, ret: impl Into<Self>) -> Self {
        Self::Func(args, Box::new(ret.into()))
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    pub fn is_model(&self) -> bool {
        matches!(self, Self::Model(_))
    }

    pub fn is_queryable(&self) -> bool {
        matches!(self, Self::Queryable(_))
    }

    /// Returns `true` for every type that can be enumerated: lists,
    /// sequences and queryables.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::List(_) | Self::Sequence(_) | Self::Queryable(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::F64)
    }

    /// The item type of an enumerable type.
    pub fn element(&self) -> Option<&Type> {
        match self {
            Self::List(item) | Self::Sequence(item) | Self::Queryable(item) => Some(item),
            _ => None,
        }
    }

    /// The return type of a function type.
    pub fn ret(&self) -> Option<&Type> {
        match self {
            Self::Func(_, ret) => Some(ret),
            _ => None,
        }
    }

    /// The value a `default` expression of this type produces.
    ///
    /// Reference-like types default to null.
    pub fn default_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::F64 => Value::F64(0.0),
            Self::Record(fields) => Value::Record(fields.iter().map(Type::default_value).collect()),
            _ => Value::Null,
        }
    }

    /// Returns `true` if a value can be stored in a slot of this type.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) | (Self::Any, _) => true,
            (Self::Bool, Value::Bool(_))
            | (Self::I32, Value::I32(_))
            | (Self::I64, Value::I64(_) | Value::I32(_))
            | (Self::F64, Value::F64(_))
            | (Self::String, Value::String(_))
            | (Self::ValueBuffer, Value::Buffer(_))
            | (Self::TypeDescriptor, Value::Model(_))
            | (Self::Descriptor, Value::Descriptor(_))
            | (Self::Entry, Value::Entry(_))
            | (Self::Func(..), Value::Function(_))
            | (Self::QueryContext | Self::LiftContext, Value::Context) => true,
            (Self::Model(id), Value::Object(object)) => object.model() == *id,
            (Self::Record(tys), Value::Record(items)) => {
                tys.len() == items.len() && tys.iter().zip(items).all(|(ty, v)| ty.admits(v))
            }
            (Self::List(item) | Self::Sequence(item) | Self::Queryable(item), Value::List(items)) => {
                items.iter().all(|v| item.admits(v))
            }
            (Self::MaterializationContext, Value::Record(items)) => items.len() == 2,
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit => f.write_str("()"),
            Self::Bool => f.write_str("bool"),
            Self::I32 => f.write_str("i32"),
            Self::I64 => f.write_str("i64"),
            Self::F64 => f.write_str("f64"),
            Self::String => f.write_str("string"),
            Self::Any => f.write_str("any"),
            Self::Model(id) => write!(f, "model#{}", id.0),
            Self::List(item) => write!(f, "list<{item}>"),
            Self::Record(fields) => {
                f.write_str("(")?;
                for (i, ty) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                f.write_str(")")
            }
            Self::Sequence(item) => write!(f, "sequence<{item}>"),
            Self::Queryable(item) => write!(f, "queryable<{item}>"),
            Self::Func(args, ret) => {
                f.write_str("fn(")?;
                for (i, ty) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{ty}")?;
                }
                write!(f, ") -> {ret}")
            }
            Self::ValueBuffer => f.write_str("value_buffer"),
            Self::TypeDescriptor => f.write_str("type_descriptor"),
            Self::Descriptor => f.write_str("descriptor"),
            Self::Entry => f.write_str("entry"),
            Self::QueryContext => f.write_str("query_context"),
            Self::LiftContext => f.write_str("lift_context"),
            Self::MaterializationContext => f.write_str("materialization_context"),
        }
    }
}
