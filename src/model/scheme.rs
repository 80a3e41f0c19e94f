use super::attribute::Attribute;

/// One functional dependency clause: `determinants → dependants`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableDependency {
    pub determinants: Vec<String>,
    pub dependants: Vec<String>,
}

impl TableDependency {
    pub fn new<D, T>(determinants: D, dependants: T) -> Self
    where
        D: IntoIterator,
        D::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            determinants: determinants.into_iter().map(Into::into).collect(),
            dependants: dependants.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub dependencies: Vec<TableDependency>,
}

impl Table {
    pub fn new(name: impl Into<String>, attributes: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attributes,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, dependency: TableDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Names of the primary key attributes, in declaration order.
    pub fn primary_key(&self) -> Vec<&str> {
        self.attributes
            .iter()
            .filter(|a| a.is_primary_key())
            .map(|a| a.name.as_str())
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub(crate) fn attribute_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    pub fn has_attributes<S: AsRef<str>>(&self, names: &[S]) -> bool {
        names.iter().all(|n| self.has_attribute(n.as_ref()))
    }
}

/// A (possibly composite) attribute group on a named table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationshipDestination {
    pub table_name: String,
    pub attribute_names: Vec<String>,
}

impl RelationshipDestination {
    pub fn new<I>(table_name: impl Into<String>, attribute_names: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            table_name: table_name.into(),
            attribute_names: attribute_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Directed foreign-key edge: `from` references `to`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationship {
    pub from: RelationshipDestination,
    pub to: RelationshipDestination,
}

impl Relationship {
    pub fn new(from: RelationshipDestination, to: RelationshipDestination) -> Self {
        Self { from, to }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Scheme {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl Scheme {
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
