//! Attribute type to SQL column type mapping.

use super::Dialect;
use crate::model::AttributeType;

/// Map an attribute type to a column type. `Unknown` has no column type.
pub fn column_type(ty: AttributeType, dialect: Dialect) -> Option<&'static str> {
    match dialect {
        Dialect::MySQL => mysql_type(ty),
        Dialect::Generic | Dialect::PostgreSQL => generic_type(ty),
    }
}

fn generic_type(ty: AttributeType) -> Option<&'static str> {
    match ty {
        AttributeType::Integer => Some("INTEGER"),
        AttributeType::Float => Some("FLOAT"),
        AttributeType::String => Some("TEXT"),
        AttributeType::Boolean => Some("BOOLEAN"),
        AttributeType::Unknown => None,
    }
}

fn mysql_type(ty: AttributeType) -> Option<&'static str> {
    match ty {
        AttributeType::Integer => Some("INT"),
        // TEXT columns cannot be indexed without a prefix length
        AttributeType::String => Some("VARCHAR(255)"),
        other => generic_type(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generic_types() {
        assert_eq!(column_type(AttributeType::Integer, Dialect::Generic), Some("INTEGER"));
        assert_eq!(column_type(AttributeType::String, Dialect::PostgreSQL), Some("TEXT"));
        assert_eq!(column_type(AttributeType::Unknown, Dialect::Generic), None);
    }

    #[test]
    fn test_mysql_types() {
        assert_eq!(column_type(AttributeType::Integer, Dialect::MySQL), Some("INT"));
        assert_eq!(column_type(AttributeType::String, Dialect::MySQL), Some("VARCHAR(255)"));
        assert_eq!(column_type(AttributeType::Boolean, Dialect::MySQL), Some("BOOLEAN"));
        assert_eq!(column_type(AttributeType::Unknown, Dialect::MySQL), None);
    }
}
