use super::Error;

/// Error when a composed query cannot be translated for the store and no
/// client evaluation applies.
///
/// Surfaced once, from the top-level translation entry point. The details
/// are the newline-joined reasons collected from nested translations.
#[derive(Debug)]
pub(super) struct TranslationFailed {
    expression: Box<str>,
    details: Option<Box<str>>,
}

impl std::error::Error for TranslationFailed {}

impl core::fmt::Display for TranslationFailed {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "the query `{}` could not be translated", self.expression)?;
        if let Some(ref details) = self.details {
            write!(f, ": {}", details)?;
        }
        Ok(())
    }
}

impl Error {
    /// Creates a translation failed error for the printed expression.
    ///
    /// Empty `details` are omitted from the message.
    pub fn translation_failed(expression: impl Into<String>, details: impl Into<String>) -> Error {
        let details = details.into();
        Error::from(super::ErrorKind::TranslationFailed(TranslationFailed {
            expression: expression.into().into(),
            details: if details.is_empty() {
                None
            } else {
                Some(details.into())
            },
        }))
    }

    /// Returns `true` if this error is a translation failure.
    pub fn is_translation_failed(&self) -> bool {
        matches!(self.kind(), super::ErrorKind::TranslationFailed(_))
    }
}
