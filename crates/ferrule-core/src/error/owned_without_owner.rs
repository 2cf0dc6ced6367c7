use super::Error;

/// Error when a tracking query materializes an owned type without also
/// materializing its owner.
#[derive(Debug)]
pub(super) struct OwnedWithoutOwner {
    owned: Box<str>,
    owner: Box<str>,
}

impl std::error::Error for OwnedWithoutOwner {}

impl core::fmt::Display for OwnedWithoutOwner {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(
            f,
            "owned entities cannot be tracked without their owner: `{}` is owned by `{}`",
            self.owned, self.owner
        )
    }
}

impl Error {
    /// Creates an owned-without-owner error.
    pub fn owned_without_owner(owned: impl Into<String>, owner: impl Into<String>) -> Error {
        Error::from(super::ErrorKind::OwnedWithoutOwner(OwnedWithoutOwner {
            owned: owned.into().into(),
            owner: owner.into().into(),
        }))
    }

    /// Returns `true` if this error is an owned-without-owner error.
    pub fn is_owned_without_owner(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::OwnedWithoutOwner(_))
    }
}
