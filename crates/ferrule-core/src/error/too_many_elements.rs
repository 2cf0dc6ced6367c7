use super::Error;

/// Error when a single-element query finds more than one row.
#[derive(Debug)]
pub(super) struct TooManyElements;

impl std::error::Error for TooManyElements {}

impl core::fmt::Display for TooManyElements {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("sequence contains more than one element")
    }
}

impl Error {
    /// Creates a "sequence contains more than one element" error.
    pub fn too_many_elements() -> Error {
        Error::from(super::ErrorKind::TooManyElements(TooManyElements))
    }

    /// Returns `true` if this error is a too many elements error.
    pub fn is_too_many_elements(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::TooManyElements(_))
    }
}
