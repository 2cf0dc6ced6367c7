use super::Error;

/// Error when a pass meets a node kind it has no rule for.
///
/// The comparator, hasher and interpreter fail closed instead of guessing.
#[derive(Debug)]
pub(super) struct UnhandledNode {
    node: Box<str>,
}

impl std::error::Error for UnhandledNode {}

impl core::fmt::Display for UnhandledNode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "unhandled node kind: {}", self.node)
    }
}

impl Error {
    /// Creates an unhandled node kind error.
    pub fn unhandled_node(node: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::UnhandledNode(UnhandledNode {
            node: node.into().into(),
        }))
    }

    /// Returns `true` if this error is an unhandled node kind error.
    pub fn is_unhandled_node(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::UnhandledNode(_))
    }
}
