//! Serializer for converting a scheme back to its text notation.

use crate::model::{Attribute, Relationship, RelationshipDestination, Scheme, Table};
use crate::parser::KEYWORDS;

/// Serialize a Scheme to scheme notation.
pub fn serialize(scheme: &Scheme) -> String {
    let mut output = String::new();

    for (i, table) in scheme.tables.iter().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        serialize_table(&mut output, table);
    }

    if !scheme.relationships.is_empty() {
        if !scheme.tables.is_empty() {
            output.push('\n');
        }
        output.push_str("rel {\n");
        for rel in &scheme.relationships {
            serialize_relationship(&mut output, rel);
        }
        output.push_str("}\n");
    }

    output
}

fn serialize_table(output: &mut String, table: &Table) {
    output.push_str("table ");
    output.push_str(&name(&table.name));
    output.push_str(" {\n");

    for attr in &table.attributes {
        serialize_attribute(output, attr);
    }

    for dep in &table.dependencies {
        output.push_str(&format!(
            "    dep {} -> {}\n",
            name_list(&dep.determinants),
            name_list(&dep.dependants)
        ));
    }

    output.push_str("}\n");
}

fn serialize_attribute(output: &mut String, attr: &Attribute) {
    output.push_str("    ");
    output.push_str(&name(&attr.name));
    output.push(' ');
    output.push_str(attr.ty.keyword());

    if attr.is_primary_key() {
        output.push_str(" pk");
    }
    if attr.is_not_nullable() {
        output.push_str(" not null");
    }
    if attr.is_foreign_key() {
        output.push_str(" fk");
    }

    output.push('\n');
}

fn serialize_relationship(output: &mut String, rel: &Relationship) {
    output.push_str(&format!(
        "    {} -> {}\n",
        destination(&rel.from),
        destination(&rel.to)
    ));
}

fn destination(dest: &RelationshipDestination) -> String {
    format!("{}({})", name(&dest.table_name), name_list(&dest.attribute_names))
}

fn name_list(names: &[String]) -> String {
    names.iter().map(|n| name(n)).collect::<Vec<_>>().join(", ")
}

/// Bare identifier when the lexer would read it back as one, quoted otherwise.
fn name(s: &str) -> String {
    let mut chars = s.chars();
    let bare = chars.next().is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&s);
    if bare {
        return s.to_string();
    }

    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
