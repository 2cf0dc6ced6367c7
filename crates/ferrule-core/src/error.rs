mod adhoc;
mod cancelled;
mod client_constant;
mod expression_evaluation_failed;
mod invalid_key_value;
mod invalid_shape;
mod no_elements;
mod owned_without_owner;
mod too_many_elements;
mod translation_failed;
mod unable_to_discriminate;
mod unhandled_node;
mod unhandled_query_root;

use adhoc::AdhocError;
use cancelled::Cancelled;
use client_constant::ClientConstant;
use expression_evaluation_failed::ExpressionEvaluationFailed;
use invalid_key_value::InvalidKeyValue;
use invalid_shape::InvalidShape;
use no_elements::NoElements;
use owned_without_owner::OwnedWithoutOwner;
use std::sync::Arc;
use too_many_elements::TooManyElements;
use translation_failed::TranslationFailed;
use unable_to_discriminate::UnableToDiscriminate;
use unhandled_node::UnhandledNode;
use unhandled_query_root::UnhandledQueryRoot;

/// Returns early with an ad-hoc error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::Error::from_args(format_args!($($arg)*)))
    };
}

/// Builds an ad-hoc error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        $crate::Error::from_args(format_args!($($arg)*))
    };
}

/// An error that can occur while translating, compiling or executing a
/// query.
///
/// The error is a single pointer wide and cheap to clone, so cached plans
/// and streams can hand it around freely.
#[derive(Clone)]
pub struct Error {
    inner: Option<Arc<ErrorInner>>,
}

#[derive(Debug)]
struct ErrorInner {
    kind: ErrorKind,
    cause: Option<Error>,
}

impl Error {
    /// Adds context to this error.
    ///
    /// Context is displayed in reverse order: the most recently added context
    /// is shown first, followed by earlier context, ending with the root
    /// cause.
    #[inline(always)]
    pub fn context(self, consequent: impl IntoError) -> Error {
        self.context_impl(consequent.into_error())
    }

    #[inline(never)]
    #[cold]
    fn context_impl(self, consequent: Error) -> Error {
        let kind = match consequent.inner {
            Some(inner) => match Arc::try_unwrap(inner) {
                Ok(inner) => inner.kind,
                // Shared consequents keep their own chain; wrap them instead.
                Err(shared) => ErrorKind::Adhoc(AdhocError::new(
                    Error { inner: Some(shared) }.to_string(),
                )),
            },
            None => ErrorKind::Unknown,
        };

        Error {
            inner: Some(Arc::new(ErrorInner {
                kind,
                cause: Some(self),
            })),
        }
    }

    #[doc(hidden)]
    pub fn from_args(args: core::fmt::Arguments<'_>) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(args.to_string())))
    }

    /// Returns the innermost error of the context chain.
    pub fn root(&self) -> &Error {
        let mut err = self;
        while let Some(cause) = err.inner.as_ref().and_then(|inner| inner.cause.as_ref()) {
            err = cause;
        }
        err
    }

    fn chain(&self) -> impl Iterator<Item = &Error> {
        let mut err = self;
        core::iter::once(err).chain(core::iter::from_fn(move || {
            err = err.inner.as_ref().and_then(|inner| inner.cause.as_ref())?;
            Some(err)
        }))
    }

    fn kind(&self) -> &ErrorKind {
        self.inner
            .as_ref()
            .map(|inner| &inner.kind)
            .unwrap_or(&ErrorKind::Unknown)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.kind() {
            ErrorKind::Anyhow(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        let mut it = self.chain().peekable();
        while let Some(err) = it.next() {
            core::fmt::Display::fmt(err.kind(), f)?;
            if it.peek().is_some() {
                f.write_str(": ")?;
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        if !f.alternate() {
            core::fmt::Display::fmt(self, f)
        } else {
            let Some(ref inner) = self.inner else {
                return f.debug_struct("Error").field("kind", &"None").finish();
            };
            f.debug_struct("Error")
                .field("kind", &inner.kind)
                .field("cause", &inner.cause)
                .finish()
        }
    }
}

#[derive(Debug)]
enum ErrorKind {
    Anyhow(anyhow::Error),
    Adhoc(AdhocError),
    Cancelled(Cancelled),
    ClientConstant(ClientConstant),
    ExpressionEvaluationFailed(ExpressionEvaluationFailed),
    InvalidKeyValue(InvalidKeyValue),
    InvalidShape(InvalidShape),
    NoElements(NoElements),
    OwnedWithoutOwner(OwnedWithoutOwner),
    TooManyElements(TooManyElements),
    TranslationFailed(TranslationFailed),
    UnableToDiscriminate(UnableToDiscriminate),
    UnhandledNode(UnhandledNode),
    UnhandledQueryRoot(UnhandledQueryRoot),
    Unknown,
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        use self::ErrorKind::*;

        match self {
            Anyhow(err) => core::fmt::Display::fmt(err, f),
            Adhoc(err) => core::fmt::Display::fmt(err, f),
            Cancelled(err) => core::fmt::Display::fmt(err, f),
            ClientConstant(err) => core::fmt::Display::fmt(err, f),
            ExpressionEvaluationFailed(err) => core::fmt::Display::fmt(err, f),
            InvalidKeyValue(err) => core::fmt::Display::fmt(err, f),
            InvalidShape(err) => core::fmt::Display::fmt(err, f),
            NoElements(err) => core::fmt::Display::fmt(err, f),
            OwnedWithoutOwner(err) => core::fmt::Display::fmt(err, f),
            TooManyElements(err) => core::fmt::Display::fmt(err, f),
            TranslationFailed(err) => core::fmt::Display::fmt(err, f),
            UnableToDiscriminate(err) => core::fmt::Display::fmt(err, f),
            UnhandledNode(err) => core::fmt::Display::fmt(err, f),
            UnhandledQueryRoot(err) => core::fmt::Display::fmt(err, f),
            Unknown => f.write_str("unknown ferrule error"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error {
            inner: Some(Arc::new(ErrorInner { kind, cause: None })),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        Error::from(ErrorKind::Anyhow(err))
    }
}

impl From<core::fmt::Error> for Error {
    fn from(err: core::fmt::Error) -> Error {
        Error::from(anyhow::Error::from(err))
    }
}

/// Trait for types that can be converted into an Error.
pub trait IntoError {
    /// Converts this type into an Error.
    fn into_error(self) -> Error;
}

impl IntoError for Error {
    #[inline(always)]
    fn into_error(self) -> Error {
        self
    }
}

impl IntoError for &str {
    fn into_error(self) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(self)))
    }
}

impl IntoError for String {
    fn into_error(self) -> Error {
        Error::from(ErrorKind::Adhoc(AdhocError::new(self)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_size() {
        // One pointer wide, like the `Arc` it wraps.
        let expected_size = core::mem::size_of::<usize>();
        assert_eq!(expected_size, core::mem::size_of::<Error>());
    }

    #[test]
    fn error_from_args() {
        let err = Error::from_args(format_args!("test error: {}", 42));
        assert_eq!(err.to_string(), "test error: 42");
    }

    #[test]
    fn error_chain_display() {
        let root = err!("root cause");
        let chained = root.context(err!("middle context")).context("top context");
        assert_eq!(
            chained.to_string(),
            "top context: middle context: root cause"
        );
        assert_eq!(chained.root().to_string(), "root cause");
    }

    #[test]
    fn anyhow_bridge() {
        let anyhow_err = anyhow::anyhow!("something failed");
        let our_err: Error = anyhow_err.into();
        assert_eq!(our_err.to_string(), "something failed");
    }

    #[test]
    fn translation_failed_with_details() {
        let err = Error::translation_failed("customers.group_join(...)", "join keys differ\nno key");
        assert!(err.is_translation_failed());
        assert_eq!(
            err.to_string(),
            "the query `customers.group_join(...)` could not be translated: join keys differ\nno key"
        );
    }

    #[test]
    fn translation_failed_without_details() {
        let err = Error::translation_failed("q", "");
        assert_eq!(err.to_string(), "the query `q` could not be translated");
    }

    #[test]
    fn invalid_key_value_names_entity_and_property() {
        let err = Error::invalid_key_value("Customer", "Id");
        assert!(err.is_invalid_key_value());
        assert_eq!(
            err.to_string(),
            "invalid key value: property `Id` of entity type `Customer` is null"
        );
    }

    #[test]
    fn unable_to_discriminate_carries_value() {
        let err = Error::unable_to_discriminate("Animal", "\"Fish\"");
        assert!(err.is_unable_to_discriminate());
        assert_eq!(
            err.to_string(),
            "unable to discriminate entity type `Animal`: discriminator value \"Fish\" matches no known subtype"
        );
    }

    #[test]
    fn cardinality_errors() {
        assert_eq!(Error::no_elements().to_string(), "sequence contains no elements");
        assert_eq!(
            Error::too_many_elements().to_string(),
            "sequence contains more than one element"
        );
    }

    #[test]
    fn predicates_do_not_cross() {
        let err = Error::cancelled();
        assert!(err.is_cancelled());
        assert!(!err.is_no_elements());
        assert!(!err.is_translation_failed());
    }
}
