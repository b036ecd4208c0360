// models/src/lib.rs

//! Typed entities for the patient membership service.
//!
//! The only entity at the moment is the [`Patient`] record, together with the
//! validation machinery that turns an untyped JSON body into a well-formed
//! record (or a [`ValidationError`]).

pub mod errors;
pub mod medical;

pub use errors::{ValidationError, ValidationResult};
pub use medical::patient::{Gender, Patient};
