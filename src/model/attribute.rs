use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeType {
    #[default]
    Unknown,
    Integer,
    Float,
    String,
    Boolean,
}

impl AttributeType {
    /// Parse a type keyword of the scheme notation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "unknown" => Some(Self::Unknown),
            "int" | "integer" => Some(Self::Integer),
            "float" => Some(Self::Float),
            "string" | "text" => Some(Self::String),
            "bool" | "boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    /// Wire code; anything outside the known range decodes to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Integer,
            1 => Self::Float,
            2 => Self::String,
            3 => Self::Boolean,
            _ => Self::Unknown,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => -1,
            Self::Integer => 0,
            Self::Float => 1,
            Self::String => 2,
            Self::Boolean => 3,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Integer => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Boolean => "bool",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AttributeConstraint {
    NotNullable,
    PrimaryKey,
    ForeignKey,
}

impl AttributeConstraint {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NotNullable),
            1 => Some(Self::PrimaryKey),
            2 => Some(Self::ForeignKey),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::NotNullable => 0,
            Self::PrimaryKey => 1,
            Self::ForeignKey => 2,
        }
    }

    /// Key constraints are reassigned by decomposition rather than copied.
    pub fn is_key(self) -> bool {
        matches!(self, Self::PrimaryKey | Self::ForeignKey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub ty: AttributeType,
    pub constraints: BTreeSet<AttributeConstraint>,
}

impl Attribute {
    pub fn new(
        name: impl Into<String>,
        ty: AttributeType,
        constraints: impl IntoIterator<Item = AttributeConstraint>,
    ) -> Self {
        Self {
            name: name.into(),
            ty,
            constraints: constraints.into_iter().collect(),
        }
    }

    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&AttributeConstraint::PrimaryKey)
    }

    pub fn is_foreign_key(&self) -> bool {
        self.constraints.contains(&AttributeConstraint::ForeignKey)
    }

    pub fn is_not_nullable(&self) -> bool {
        self.constraints.contains(&AttributeConstraint::NotNullable)
    }

    /// Copy of this attribute without key constraints, optionally promoted
    /// to a primary key.
    pub(crate) fn without_keys(&self, primary_key: bool) -> Self {
        let mut constraints: BTreeSet<AttributeConstraint> = self
            .constraints
            .iter()
            .copied()
            .filter(|c| !c.is_key())
            .collect();
        if primary_key {
            constraints.insert(AttributeConstraint::PrimaryKey);
        }

        Self {
            name: self.name.clone(),
            ty: self.ty,
            constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_key_follows_constraints() {
        let mut attr = Attribute::new("id", AttributeType::Integer, [AttributeConstraint::NotNullable]);
        assert!(!attr.is_primary_key());

        attr.constraints.insert(AttributeConstraint::PrimaryKey);
        assert!(attr.is_primary_key());
    }

    #[test]
    fn test_without_keys() {
        let attr = Attribute::new(
            "user_id",
            AttributeType::Integer,
            [
                AttributeConstraint::PrimaryKey,
                AttributeConstraint::ForeignKey,
                AttributeConstraint::NotNullable,
            ],
        );

        let plain = attr.without_keys(false);
        assert_eq!(
            plain.constraints.iter().copied().collect::<Vec<_>>(),
            vec![AttributeConstraint::NotNullable]
        );

        let key = attr.without_keys(true);
        assert!(key.is_primary_key());
        assert!(!key.is_foreign_key());
    }

    #[test]
    fn test_type_codes() {
        assert_eq!(AttributeType::from_code(-1), AttributeType::Unknown);
        assert_eq!(AttributeType::from_code(2), AttributeType::String);
        assert_eq!(AttributeType::from_code(42), AttributeType::Unknown);
        assert_eq!(AttributeConstraint::from_code(3), None);
        assert_eq!(AttributeType::from_str("TEXT"), Some(AttributeType::String));
    }
}
