//! SQL dialect selection and identifier quoting.

use crate::error::SchemeError;

/// SQL dialect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Standard SQL
    #[default]
    Generic,
    /// PostgreSQL
    PostgreSQL,
    /// MySQL
    MySQL,
}

impl Dialect {
    /// Parse dialect from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "generic" | "ansi" => Some(Self::Generic),
            "postgres" | "postgresql" | "pg" => Some(Self::PostgreSQL),
            "mysql" | "mariadb" => Some(Self::MySQL),
            _ => None,
        }
    }

    pub fn quote_char(self) -> char {
        match self {
            Self::MySQL => '`',
            Self::Generic | Self::PostgreSQL => '"',
        }
    }

    /// Quote an identifier, doubling any embedded quote character.
    pub fn quote_ident(self, ident: &str) -> Result<String, SchemeError> {
        if ident.is_empty() || ident.contains('\0') {
            return Err(SchemeError::InvalidIdentifier(ident.to_string()));
        }

        let quote = self.quote_char();
        let mut out = String::with_capacity(ident.len() + 2);
        out.push(quote);
        for c in ident.chars() {
            if c == quote {
                out.push(quote);
            }
            out.push(c);
        }
        out.push(quote);

        Ok(out)
    }

    pub fn quote_list(self, idents: &[String]) -> Result<String, SchemeError> {
        let quoted = idents
            .iter()
            .map(|i| self.quote_ident(i))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(quoted.join(", "))
    }
}
