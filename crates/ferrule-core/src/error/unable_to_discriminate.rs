use super::Error;

/// Error when a row's discriminator value matches none of the concrete
/// types of a hierarchy.
#[derive(Debug)]
pub(super) struct UnableToDiscriminate {
    entity: Box<str>,
    value: Box<str>,
}

impl std::error::Error for UnableToDiscriminate {}

impl core::fmt::Display for UnableToDiscriminate {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unable to discriminate entity type `{}`: discriminator value {} matches no known subtype",
            self.entity, self.value
        )
    }
}

impl Error {
    /// Creates an unable-to-discriminate error carrying the raw value.
    pub fn unable_to_discriminate(entity: impl Into<String>, value: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnableToDiscriminate(UnableToDiscriminate {
            entity: entity.into().into(),
            value: value.into().into(),
        }))
    }

    /// Returns `true` if this error is an unable-to-discriminate error.
    pub fn is_unable_to_discriminate(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnableToDiscriminate(_))
    }
}
