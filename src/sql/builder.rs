//! CREATE TABLE / ALTER TABLE statement generation.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::{Dialect, column_type};
use crate::error::SchemeError;
use crate::model::{AttributeType, Relationship, RelationshipDestination, Scheme, Table};

/// Validates a scheme and compiles it to DDL for one dialect.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    scheme: Option<Scheme>,
    dialect: Dialect,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            scheme: None,
            dialect,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn scheme(&self) -> Option<&Scheme> {
        self.scheme.as_ref()
    }

    /// Check name uniqueness, attribute types and relationship endpoints.
    pub fn validate(scheme: &Scheme) -> Result<(), SchemeError> {
        let mut table_names = HashSet::new();
        for table in &scheme.tables {
            if !table_names.insert(table.name.as_str()) {
                return Err(SchemeError::DuplicateEntities(table.name.clone()));
            }
        }

        for table in &scheme.tables {
            let mut attribute_names = HashSet::new();
            for attr in &table.attributes {
                if attr.ty == AttributeType::Unknown {
                    return Err(SchemeError::UnknownAttributeType {
                        table: table.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
                if !attribute_names.insert(attr.name.as_str()) {
                    return Err(SchemeError::DuplicateAttributes {
                        table: table.name.clone(),
                        attribute: attr.name.clone(),
                    });
                }
            }
        }

        for relationship in &scheme.relationships {
            for destination in [&relationship.from, &relationship.to] {
                let valid = !destination.attribute_names.is_empty()
                    && scheme
                        .table(&destination.table_name)
                        .is_some_and(|t| t.has_attributes(&destination.attribute_names));
                if !valid {
                    return Err(SchemeError::InvalidRelationshipDestination(describe(destination)));
                }
            }
        }

        Ok(())
    }

    /// Validate and store `scheme`. On failure the previous scheme is kept.
    pub fn set_scheme(&mut self, scheme: Scheme) -> Result<(), SchemeError> {
        Self::validate(&scheme)?;
        self.scheme = Some(scheme);
        Ok(())
    }

    pub fn build(&self) -> Result<String, SchemeError> {
        let scheme = self.scheme.as_ref().ok_or(SchemeError::NoScheme)?;

        let mut statements = Vec::with_capacity(scheme.tables.len() + scheme.relationships.len());
        for table in &scheme.tables {
            statements.push(self.create_table(table)?);
        }
        for relationship in &scheme.relationships {
            if let Some(statement) = self.add_foreign_key(scheme, relationship)? {
                statements.push(statement);
            }
        }
        debug!(statements = statements.len(), dialect = ?self.dialect, "scheme compiled");

        Ok(statements.join("\n"))
    }

    fn create_table(&self, table: &Table) -> Result<String, SchemeError> {
        let dialect = self.dialect;
        let primary_key: Vec<String> = table.primary_key().into_iter().map(String::from).collect();
        let composite = primary_key.len() > 1;

        let mut columns = Vec::with_capacity(table.attributes.len() + 1);
        for attr in &table.attributes {
            let ty = column_type(attr.ty, dialect).ok_or_else(|| SchemeError::UnknownAttributeType {
                table: table.name.clone(),
                attribute: attr.name.clone(),
            })?;

            let mut column = format!("{} {}", dialect.quote_ident(&attr.name)?, ty);
            if attr.is_not_nullable() {
                column.push_str(" NOT NULL");
            }
            if attr.is_primary_key() && !composite {
                column.push_str(" PRIMARY KEY");
            }
            columns.push(column);
        }
        if composite {
            columns.push(format!("PRIMARY KEY ({})", dialect.quote_list(&primary_key)?));
        }

        Ok(format!(
            "CREATE TABLE {} ({});",
            dialect.quote_ident(&table.name)?,
            columns.join(", ")
        ))
    }

    fn add_foreign_key(&self, scheme: &Scheme, relationship: &Relationship) -> Result<Option<String>, SchemeError> {
        let (from, to) = (&relationship.from, &relationship.to);
        let resolves = |d: &RelationshipDestination| {
            scheme
                .table(&d.table_name)
                .is_some_and(|t| t.has_attributes(&d.attribute_names))
        };

        if from.attribute_names.is_empty()
            || from.attribute_names.len() != to.attribute_names.len()
            || !resolves(from)
            || !resolves(to)
        {
            warn!(from = %describe(from), to = %describe(to), "foreign key skipped");
            return Ok(None);
        }

        let dialect = self.dialect;
        let name = format!(
            "fk_{}_{}_to_{}_{}",
            from.table_name,
            from.attribute_names.join("_"),
            to.table_name,
            to.attribute_names.join("_")
        );

        Ok(Some(format!(
            "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({});",
            dialect.quote_ident(&from.table_name)?,
            dialect.quote_ident(&name)?,
            dialect.quote_list(&from.attribute_names)?,
            dialect.quote_ident(&to.table_name)?,
            dialect.quote_list(&to.attribute_names)?
        )))
    }
}

fn describe(destination: &RelationshipDestination) -> String {
    format!("{}({})", destination.table_name, destination.attribute_names.join(", "))
}
