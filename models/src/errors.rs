// models/src/errors.rs

pub use thiserror::Error;

/// A validation error raised while deserializing a patient record.
///
/// Every variant maps to a client error at the request boundary; none of them
/// is fatal to the process.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A required field was absent (or empty where emptiness is not allowed).
    #[error("invalid patient: missing {0}")]
    MissingField(&'static str),
    /// The postal code did not match `NNNNN` or `NNNNN-NNNN`.
    #[error("invalid postal code: {0}")]
    InvalidPostalCode(String),
    /// The home phone did not match `(NNN) NNN-NNNN`.
    #[error("invalid home phone: {0}")]
    InvalidPhone(String),
    /// The email address failed RFC syntax validation.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// The date of birth did not parse as `YYYY-MM-DD`.
    #[error("invalid date value or format: {0}")]
    InvalidDate(String),
    /// The gender was not one of `Male`, `Female`, `Unknown`.
    #[error("invalid gender: {0}")]
    InvalidGender(String),
    /// The request body was not a JSON object, or held bad data where a
    /// string was expected.
    #[error("body of request contained bad or no data")]
    MalformedBody,
}

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;
