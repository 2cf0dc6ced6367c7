mod error;
pub use error::{Error, IntoError};

pub mod expr;

pub mod schema;
pub use schema::Schema;

pub mod tracking;

/// A Result type alias that uses Ferrule's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
