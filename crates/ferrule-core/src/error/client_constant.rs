use super::Error;

/// Error when a shaper captures a live object reference as a constant.
///
/// Such a constant cannot be reproduced on a later cache hit, so the whole
/// plan is rejected before any row is processed.
#[derive(Debug)]
pub(super) struct ClientConstant {
    description: Box<str>,
}

impl std::error::Error for ClientConstant {}

impl core::fmt::Display for ClientConstant {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "client constant leakage: the shaper captures {} which cannot be reproduced by a cached plan",
            self.description
        )
    }
}

impl Error {
    /// Creates a client constant error describing the captured value.
    pub fn client_constant(description: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::ClientConstant(ClientConstant {
            description: description.into().into(),
        }))
    }

    /// Returns `true` if this error is a client constant error.
    pub fn is_client_constant(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::ClientConstant(_))
    }
}
