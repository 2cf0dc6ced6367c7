use super::ModelId;
use crate::expr::Type;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Field {
    /// Uniquely identifies the field within the containing model.
    pub id: FieldId,

    pub name: String,

    pub ty: Type,

    /// True if the column may hold null.
    pub nullable: bool,

    /// Shadow fields have a column but no member on the instance; their
    /// values live in the tracking entry's shadow snapshot.
    pub shadow: bool,

    /// Column position within the rows of the hierarchy's table
    pub storage_index: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct FieldId {
    pub model: ModelId,
    pub index: usize,
}

impl fmt::Debug for FieldId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "FieldId({}/{})", self.model.0, self.index)
    }
}
