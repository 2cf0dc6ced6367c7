use super::{Expr, ExprKind, Type, Value};
use crate::Error;
use std::fmt;

/// The error a throw expression raises.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Exception {
    /// A key column of the entity is null.
    InvalidKeyValue { entity: String, property: String },

    /// The discriminator value, carried by the throw's operand, matches no
    /// concrete type.
    UnableToDiscriminate { entity: String },

    NoElements,

    TooManyElements,

    /// An ad-hoc error message.
    Message(String),
}

/// Raises an error. The node can stand in for any type.
#[derive(Debug, Clone)]
pub struct ExprThrow {
    pub exception: Exception,
    pub value: Option<Expr>,
}

impl Exception {
    /// Builds the error, given the evaluated operand of the throw.
    pub fn to_error(&self, value: Option<&Value>) -> Error {
        match self {
            Self::InvalidKeyValue { entity, property } => Error::invalid_key_value(entity, property),
            Self::UnableToDiscriminate { entity } => Error::unable_to_discriminate(
                entity,
                value.map(Value::to_string).unwrap_or_else(|| "null".to_string()),
            ),
            Self::NoElements => Error::no_elements(),
            Self::TooManyElements => Error::too_many_elements(),
            Self::Message(message) => match value {
                Some(value) => crate::err!("{message}: {value}"),
                None => crate::err!("{message}"),
            },
        }
    }
}

impl Expr {
    pub fn throw(exception: Exception, value: Option<Expr>, ty: Type) -> Self {
        Expr::from_parts(ty, ExprKind::Throw(ExprThrow { exception, value }))
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKeyValue { entity, property } => {
                write!(f, "invalid_key_value({entity}.{property})")
            }
            Self::UnableToDiscriminate { entity } => write!(f, "unable_to_discriminate({entity})"),
            Self::NoElements => f.write_str("no_elements"),
            Self::TooManyElements => f.write_str("too_many_elements"),
            Self::Message(message) => write!(f, "{message:?}"),
        }
    }
}
