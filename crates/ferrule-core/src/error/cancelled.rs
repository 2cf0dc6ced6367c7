use super::Error;

/// Error when a query execution observes its cancellation token.
#[derive(Debug)]
pub(super) struct Cancelled;

impl std::error::Error for Cancelled {}

impl core::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        f.write_str("query execution was cancelled")
    }
}

impl Error {
    /// Creates a cancellation error.
    pub fn cancelled() -> Error {
        Error::from(super::ErrorKind::Cancelled(Cancelled))
    }

    /// Returns `true` if this error is a cancellation error.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::Cancelled(_))
    }
}
