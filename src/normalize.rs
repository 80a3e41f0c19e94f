//! Decomposition of a scheme into second or third normal form.
//!
//! Every table is decomposed independently: its dependency clauses feed a
//! [`DependencyMatrix`], and each canonical row of the decomposed matrix
//! becomes one `<table>Part<n>` table keyed by the row's determinants.

mod cover;
mod matrix;

pub use cover::{AttrSet, CoverMode, Fd, closure, minimal_cover, split};
pub use matrix::{DependencyMatrix, ForeignKeyRef, Role, RowRelations};

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::{AttributeConstraint, Relationship, RelationshipDestination, Scheme, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalForm {
    Second,
    #[default]
    Third,
}

impl NormalForm {
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            _ => None,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "2" | "2nf" | "second" => Some(Self::Second),
            "3" | "3nf" | "third" => Some(Self::Third),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::Second => 2,
            Self::Third => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ViolationReason {
    #[serde(rename = "no PK present")]
    NoPrimaryKey,
    #[serde(rename = "unknown attribute")]
    UnknownAttribute,
}

impl ViolationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPrimaryKey => "no PK present",
            Self::UnknownAttribute => "unknown attribute",
        }
    }
}

impl std::fmt::Display for ViolationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A first normal form failure. `attribute_name` is empty for table-level
/// violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalFormViolation {
    pub table_name: String,
    pub attribute_name: String,
    #[serde(rename = "violation")]
    pub reason: ViolationReason,
}

impl NormalFormViolation {
    fn new(table_name: &str, attribute_name: &str, reason: ViolationReason) -> Self {
        Self {
            table_name: table_name.to_string(),
            attribute_name: attribute_name.to_string(),
            reason,
        }
    }
}

impl std::fmt::Display for NormalFormViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.attribute_name.is_empty() {
            write!(f, "{}: {}", self.table_name, self.reason)
        } else {
            write!(f, "{}.{}: {}", self.table_name, self.attribute_name, self.reason)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizerConfig {
    pub cover: CoverMode,
    /// Keep a part keyed by the table's primary key and place attributes no
    /// dependency mentions there.
    pub preserve_key: bool,
    /// Re-target the input scheme's relationships onto the produced parts.
    pub carry_relationships: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cover: CoverMode::Minimal,
            preserve_key: true,
            carry_relationships: true,
        }
    }
}

impl NormalizerConfig {
    pub fn cover(mut self, cover: CoverMode) -> Self {
        self.cover = cover;
        self
    }

    pub fn preserve_key(mut self, preserve_key: bool) -> Self {
        self.preserve_key = preserve_key;
        self
    }

    pub fn carry_relationships(mut self, carry_relationships: bool) -> Self {
        self.carry_relationships = carry_relationships;
        self
    }
}

pub struct Normalizer<'a> {
    scheme: &'a Scheme,
    config: NormalizerConfig,
}

impl<'a> Normalizer<'a> {
    pub fn new(scheme: &'a Scheme) -> Self {
        Self::with_config(scheme, NormalizerConfig::default())
    }

    pub fn with_config(scheme: &'a Scheme, config: NormalizerConfig) -> Self {
        Self { scheme, config }
    }

    /// Every table needs a primary key, and its dependency clauses may only
    /// name declared attributes.
    pub fn check_first_normal_form(&self) -> Vec<NormalFormViolation> {
        let mut violations = Vec::new();

        for table in &self.scheme.tables {
            if table.primary_key().is_empty() {
                violations.push(NormalFormViolation::new(&table.name, "", ViolationReason::NoPrimaryKey));
            }

            let mut unknown: Vec<&str> = Vec::new();
            for dependency in &table.dependencies {
                for name in dependency.dependants.iter().chain(&dependency.determinants) {
                    if !table.has_attribute(name) && !unknown.contains(&name.as_str()) {
                        unknown.push(name);
                    }
                }
            }
            violations.extend(
                unknown
                    .into_iter()
                    .map(|name| NormalFormViolation::new(&table.name, name, ViolationReason::UnknownAttribute)),
            );
        }

        violations
    }

    pub fn second_normal_form(&self) -> Result<Scheme, Vec<NormalFormViolation>> {
        self.normalize(NormalForm::Second)
    }

    pub fn third_normal_form(&self) -> Result<Scheme, Vec<NormalFormViolation>> {
        self.normalize(NormalForm::Third)
    }

    pub fn normalize(&self, form: NormalForm) -> Result<Scheme, Vec<NormalFormViolation>> {
        let violations = self.check_first_normal_form();
        if !violations.is_empty() {
            debug!(count = violations.len(), "first normal form violated");
            return Err(violations);
        }

        let mut out = Scheme::default();
        let mut parts_per_table = Vec::with_capacity(self.scheme.tables.len());

        for table in &self.scheme.tables {
            let matrix = DependencyMatrix::new(&table.dependencies).with_cover_mode(self.config.cover);
            let (tables, relationships) = self.turn_table_to_normal_form(table, matrix, form);
            debug!(table = %table.name, parts = tables.len(), form = form.number(), "table decomposed");

            parts_per_table.push((table.name.as_str(), out.tables.len()..out.tables.len() + tables.len()));
            out.tables.extend(tables);
            out.relationships.extend(relationships);
        }

        if self.config.carry_relationships {
            for relationship in &self.scheme.relationships {
                let find_parts = |name: &str| {
                    parts_per_table
                        .iter()
                        .find(|(table, _)| *table == name)
                        .map(|(_, range)| range.clone())
                };
                let (Some(from_parts), Some(to_parts)) =
                    (find_parts(&relationship.from.table_name), find_parts(&relationship.to.table_name))
                else {
                    warn!(
                        from = %relationship.from.table_name,
                        to = %relationship.to.table_name,
                        "relationship endpoint not in scheme, dropped"
                    );
                    continue;
                };
                carry_relationship(&mut out, relationship, from_parts, to_parts);
            }
        }

        Ok(out)
    }

    /// Decompose one table and materialize the parts and the relationships
    /// between them.
    pub fn turn_table_to_normal_form(
        &self,
        table: &Table,
        mut matrix: DependencyMatrix,
        form: NormalForm,
    ) -> (Vec<Table>, Vec<Relationship>) {
        let mut relations = match form {
            NormalForm::Second => matrix.to_second_normal_form(),
            NormalForm::Third => matrix.to_third_normal_form(),
        };

        if self.config.preserve_key {
            let key: Vec<String> = table.primary_key().into_iter().map(String::from).collect();
            let declared: Vec<String> = table.attributes.iter().map(|a| a.name.clone()).collect();
            matrix.ensure_key_row(&mut relations, &key, &declared);
        }
        matrix.link_foreign_keys(&mut relations);

        let mut parts: Vec<Table> = matrix
            .canonical_rows()
            .iter()
            .enumerate()
            .map(|(i, row)| part(table, format!("{}Part{}", table.name, i + 1), row))
            .collect();

        let mut relationships = Vec::new();
        for (i, refs) in relations.iter().enumerate() {
            for fk in refs {
                // declaration order, so composite keys line up on both sides
                let attributes: Vec<String> = table
                    .attributes
                    .iter()
                    .filter(|a| fk.attributes.contains(&a.name))
                    .map(|a| a.name.clone())
                    .collect();

                let linked = i < parts.len()
                    && fk.target_row < parts.len()
                    && attributes.len() == fk.attributes.len()
                    && parts[i].has_attributes(&attributes)
                    && parts[fk.target_row].has_attributes(&attributes);
                if !linked {
                    warn!(table = %table.name, from = i, to = fk.target_row, attributes = ?fk.attributes, "foreign key skipped");
                    continue;
                }

                for name in &attributes {
                    if let Some(attr) = parts[i].attribute_mut(name) {
                        attr.constraints.insert(AttributeConstraint::ForeignKey);
                    }
                }
                relationships.push(Relationship::new(
                    RelationshipDestination::new(parts[i].name.clone(), attributes.clone()),
                    RelationshipDestination::new(parts[fk.target_row].name.clone(), attributes),
                ));
            }
        }

        (parts, relationships)
    }
}

fn part(table: &Table, name: String, row: &Fd) -> Table {
    let keys = table
        .attributes
        .iter()
        .filter(|a| row.lhs.contains(&a.name))
        .map(|a| a.without_keys(true));
    let dependants = table
        .attributes
        .iter()
        .filter(|a| row.rhs.contains(&a.name))
        .map(|a| a.without_keys(false));

    Table::new(name, keys.chain(dependants).collect())
}

/// Point an input relationship at the parts its tables were split into.
fn carry_relationship(
    out: &mut Scheme,
    relationship: &Relationship,
    from_parts: std::ops::Range<usize>,
    to_parts: std::ops::Range<usize>,
) {
    let from_attrs = &relationship.from.attribute_names;
    let to_attrs = &relationship.to.attribute_names;

    let from = from_parts.clone().find(|&i| out.tables[i].has_attributes(from_attrs));
    let to = to_parts
        .clone()
        .find(|&i| {
            let mut key = out.tables[i].primary_key();
            let mut wanted: Vec<&str> = to_attrs.iter().map(String::as_str).collect();
            key.sort_unstable();
            wanted.sort_unstable();
            key == wanted
        })
        .or_else(|| to_parts.clone().find(|&i| out.tables[i].has_attributes(to_attrs)));

    let (Some(from), Some(to)) = (from, to) else {
        warn!(
            from = %relationship.from.table_name,
            to = %relationship.to.table_name,
            "relationship does not fit any part, dropped"
        );
        return;
    };

    let carried = Relationship::new(
        RelationshipDestination::new(out.tables[from].name.clone(), from_attrs.clone()),
        RelationshipDestination::new(out.tables[to].name.clone(), to_attrs.clone()),
    );
    if out.relationships.contains(&carried) {
        return;
    }

    for name in from_attrs {
        if let Some(attr) = out.tables[from].attribute_mut(name) {
            attr.constraints.insert(AttributeConstraint::ForeignKey);
        }
    }
    debug!(from = %carried.from.table_name, to = %carried.to.table_name, "relationship carried over");
    out.relationships.push(carried);
}
