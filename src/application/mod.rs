// Application layer - the desk that owns the record collection.
// Validation rules live in the domain; this layer sequences calls,
// keeps the collection ordered and logs what happened.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
