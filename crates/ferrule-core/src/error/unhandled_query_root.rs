use super::Error;

/// Error when a query root reaches the top of translation untouched, which
/// means the provider does not know how to query it.
#[derive(Debug)]
pub(super) struct UnhandledQueryRoot {
    root: Box<str>,
}

impl std::error::Error for UnhandledQueryRoot {}

impl core::fmt::Display for UnhandledQueryRoot {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "unhandled query root `{}`: the provider cannot query this source",
            self.root
        )
    }
}

impl Error {
    /// Creates an unhandled query root error.
    pub fn unhandled_query_root(root: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnhandledQueryRoot(UnhandledQueryRoot {
            root: root.into().into(),
        }))
    }

    /// Returns `true` if this error is an unhandled query root error.
    pub fn is_unhandled_query_root(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnhandledQueryRoot(_))
    }
}
