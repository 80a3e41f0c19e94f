//! Scheme to SQL DDL compilation.

mod builder;
mod dialect;
mod types;

pub use builder::QueryBuilder;
pub use dialect::Dialect;
pub use types::column_type;
