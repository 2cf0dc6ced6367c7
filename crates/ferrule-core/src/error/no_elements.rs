use super::Error;

/// Error when a single-element query finds no rows.
#[derive(Debug)]
pub(super) struct NoElements;

impl std::error::Error for NoElements {}

impl core::fmt::Display for NoElements {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("sequence contains no elements")
    }
}

impl Error {
    /// Creates a "sequence contains no elements" error.
    pub fn no_elements() -> Error {
        Error::from(super::ErrorKind::NoElements(NoElements))
    }

    /// Returns `true` if this error is a no elements error.
    pub fn is_no_elements(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::NoElements(_))
    }
}
