use super::QueryableMethod;
use std::fmt;

/// The methods a call expression can invoke.
///
/// The set is closed: every method has fixed semantics known to the
/// interpreter, the comparer and the printer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// A sequence operator; the first argument is the source.
    Queryable(QueryableMethod),

    /// Reads a mapped property by name, including properties without a
    /// member on the object.
    Property(String),

    /// `list.contains(value)`
    Contains,

    /// `row.read_value(index)`, with the column type as the call's type
    ReadValue,

    /// `context.get_parameter(name)`
    GetParameter,

    /// `context.add_parameter(name, value)`
    AddParameter,

    /// `lift_context.find_model(name)`
    FindModel,

    /// `model.find_field(name)`
    FindField,

    /// `model.find_navigation(name)`
    FindNavigation,

    /// `model.find_primary_key()`
    FindPrimaryKey,

    /// `context.try_get_entry(key, key_values, throw_on_null)`, evaluating to
    /// `(entry or null, has_null_key)`
    TryGetEntry,

    /// `context.start_tracking(model, instance, shadow_snapshot)`
    StartTracking,

    /// `entry.instance()`
    EntryInstance,
}

impl Method {
    pub fn name(&self) -> &str {
        match self {
            Self::Queryable(method) => method.name(),
            Self::Property(_) => "property",
            Self::Contains => "contains",
            Self::ReadValue => "read_value",
            Self::GetParameter => "get_parameter",
            Self::AddParameter => "add_parameter",
            Self::FindModel => "find_model",
            Self::FindField => "find_field",
            Self::FindNavigation => "find_navigation",
            Self::FindPrimaryKey => "find_primary_key",
            Self::TryGetEntry => "try_get_entry",
            Self::StartTracking => "start_tracking",
            Self::EntryInstance => "instance",
        }
    }

    pub fn as_queryable(&self) -> Option<QueryableMethod> {
        match self {
            Self::Queryable(method) => Some(*method),
            _ => None,
        }
    }

    /// Returns `true` for schema lookups resolved against a lift context.
    pub fn is_schema_lookup(&self) -> bool {
        matches!(
            self,
            Self::FindModel | Self::FindField | Self::FindNavigation | Self::FindPrimaryKey
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Property(name) => write!(f, "property<{name}>"),
            _ => f.write_str(self.name()),
        }
    }
}

impl From<QueryableMethod> for Method {
    fn from(value: QueryableMethod) -> Self {
        Self::Queryable(value)
    }
}
