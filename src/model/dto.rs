//! JSON wire form of a scheme.
//!
//! Field names are camelCase and attribute types/constraints travel as
//! numeric codes. Conversion into the model is the only place an
//! out-of-range constraint code can be detected.

use serde::{Deserialize, Serialize};

use super::attribute::{Attribute as AttributeModel, AttributeConstraint, AttributeType};
use super::scheme as model;
use crate::error::SchemeError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: i64,
    #[serde(default)]
    pub constraints: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDependency {
    pub determinants: Vec<String>,
    pub dependants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub dependencies: Vec<TableDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDestination {
    pub table_name: String,
    pub attribute_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: RelationshipDestination,
    pub to: RelationshipDestination,
}

/// Both collections are required: a payload missing either is rejected
/// before any engine object is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl TryFrom<Scheme> for model::Scheme {
    type Error = SchemeError;

    fn try_from(dto: Scheme) -> Result<Self, Self::Error> {
        let mut tables = Vec::with_capacity(dto.tables.len());
        for table in dto.tables {
            let mut attributes = Vec::with_capacity(table.attributes.len());
            for attr in table.attributes {
                let mut constraints = Vec::with_capacity(attr.constraints.len());
                for &code in &attr.constraints {
                    let constraint = AttributeConstraint::from_code(code).ok_or_else(|| {
                        SchemeError::UnknownConstraint {
                            table: table.name.clone(),
                            attribute: attr.name.clone(),
                            code,
                        }
                    })?;
                    constraints.push(constraint);
                }
                attributes.push(AttributeModel::new(
                    attr.name,
                    AttributeType::from_code(attr.ty),
                    constraints,
                ));
            }

            tables.push(model::Table {
                name: table.name,
                attributes,
                dependencies: table
                    .dependencies
                    .into_iter()
                    .map(|d| model::TableDependency::new(d.determinants, d.dependants))
                    .collect(),
            });
        }

        let relationships = dto
            .relationships
            .into_iter()
            .map(|r| {
                model::Relationship::new(
                    model::RelationshipDestination::new(r.from.table_name, r.from.attribute_names),
                    model::RelationshipDestination::new(r.to.table_name, r.to.attribute_names),
                )
            })
            .collect();

        Ok(model::Scheme {
            tables,
            relationships,
        })
    }
}

impl From<&model::Scheme> for Scheme {
    fn from(scheme: &model::Scheme) -> Self {
        let destination = |d: &model::RelationshipDestination| RelationshipDestination {
            table_name: d.table_name.clone(),
            attribute_names: d.attribute_names.clone(),
        };

        Self {
            tables: scheme
                .tables
                .iter()
                .map(|t| Table {
                    name: t.name.clone(),
                    attributes: t
                        .attributes
                        .iter()
                        .map(|a| Attribute {
                            name: a.name.clone(),
                            ty: a.ty.code(),
                            constraints: a.constraints.iter().map(|c| c.code()).collect(),
                        })
                        .collect(),
                    dependencies: t
                        .dependencies
                        .iter()
                        .map(|d| TableDependency {
                            determinants: d.determinants.clone(),
                            dependants: d.dependants.clone(),
                        })
                        .collect(),
                })
                .collect(),
            relationships: scheme
                .relationships
                .iter()
                .map(|r| Relationship {
                    from: destination(&r.from),
                    to: destination(&r.to),
                })
                .collect(),
        }
    }
}

impl model::Scheme {
    /// Decode a scheme from its JSON wire form.
    pub fn from_json(source: &str) -> Result<Self, SchemeError> {
        let dto: Scheme = serde_json::from_str(source)?;
        dto.try_into()
    }

    pub fn to_json(&self) -> Result<String, SchemeError> {
        Ok(serde_json::to_string_pretty(&Scheme::from(self))?)
    }
}
