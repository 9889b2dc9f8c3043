//! Type system for Arbiter
//!
//! This module contains the runtime type system including:
//! - Typed values
//! - Table / field / link definitions of the data model
//! - The payload parser producing client objects

pub mod object;
pub mod payload;
pub mod schema;
pub mod value;

pub use object::ClientObject;
pub use payload::{FieldErrors, PayloadError, PayloadParser, Strictness};
pub use schema::{DataModel, DataType, Field, LinkToSingle, SchemaError, Table};
pub use value::Value;
