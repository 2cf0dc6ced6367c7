use super::Error;

/// Error when a row carries a null primary key column for an entity that
/// must be materialized.
#[derive(Debug)]
pub(super) struct InvalidKeyValue {
    entity: Box<str>,
    property: Box<str>,
}

impl std::error::Error for InvalidKeyValue {}

impl core::fmt::Display for InvalidKeyValue {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "invalid key value: property `{}` of entity type `{}` is null",
            self.property, self.entity
        )
    }
}

impl Error {
    /// Creates an invalid key value error naming the entity and key property.
    pub fn invalid_key_value(entity: impl Into<String>, property: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidKeyValue(InvalidKeyValue {
            entity: entity.into().into(),
            property: property.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid key value error.
    pub fn is_invalid_key_value(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidKeyValue(_))
    }
}
