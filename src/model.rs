//! In-memory scheme model shared by the normalizer and the SQL compiler.

mod attribute;
pub mod dto;
mod scheme;

pub use attribute::{Attribute, AttributeConstraint, AttributeType};
pub use scheme::{Relationship, RelationshipDestination, Scheme, Table, TableDependency};
