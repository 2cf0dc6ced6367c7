use super::Error;

/// Error when a tree violates a construction or comparison contract.
///
/// This occurs when:
/// - A materialization condition has the wrong signature
/// - A lambda parameter instance is reused across unrelated lambdas
/// - A shaped query's shaper does not agree with its cardinality
///
/// These are programmer or provider errors and are never retried.
#[derive(Debug)]
pub(super) struct InvalidShape {
    message: Box<str>,
}

impl std::error::Error for InvalidShape {}

impl core::fmt::Display for InvalidShape {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "invalid shape: {}", self.message)
    }
}

impl Error {
    /// Creates an invalid shape error.
    pub fn invalid_shape(message: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::InvalidShape(InvalidShape {
            message: message.into().into(),
        }))
    }

    /// Returns `true` if this error is an invalid shape error.
    pub fn is_invalid_shape(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::InvalidShape(_))
    }
}
