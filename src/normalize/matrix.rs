//! Functional dependency matrix.
//!
//! Rows are functional dependencies, columns are the table's attributes in
//! alphabetical order. A cell is a determinant (1) when the column's
//! attribute is on the row's left-hand side, a dependant (0) when it is on
//! the right-hand side, and empty otherwise. Decomposition heuristics pick
//! rows by counting determinant cells per row and per column.

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, trace};

use super::cover::{self, AttrSet, CoverMode, Fd};
use crate::model::TableDependency;

/// Cell value of the canonical matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Attribute is on the right-hand side (0).
    Dependant,
    /// Attribute is on the left-hand side (1).
    Determinant,
}

/// A foreign key from one canonical row to another: the referencing row
/// holds `attributes`, which form the determinant of `target_row`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    pub attributes: Vec<String>,
    pub target_row: usize,
}

impl ForeignKeyRef {
    fn new(attributes: &AttrSet, target_row: usize) -> Self {
        Self {
            attributes: attributes.iter().cloned().collect(),
            target_row,
        }
    }
}

/// Foreign keys per canonical row index.
pub type RowRelations = Vec<Vec<ForeignKeyRef>>;

#[derive(Debug, Clone)]
pub struct DependencyMatrix {
    rows: Vec<Fd>,
    canonical: Vec<Fd>,
    attributes: Vec<String>,
    cover: CoverMode,
}

impl DependencyMatrix {
    pub fn new(dependencies: &[TableDependency]) -> Self {
        Self::from_rows(dependencies.iter().map(Fd::from).collect())
    }

    pub fn from_rows(rows: Vec<Fd>) -> Self {
        // raw rows never change, so the attribute universe is fixed here
        let attributes: BTreeSet<String> = rows.iter().flat_map(Fd::attributes).collect();

        Self {
            rows,
            canonical: Vec::new(),
            attributes: attributes.into_iter().collect(),
            cover: CoverMode::default(),
        }
    }

    pub fn with_cover_mode(mut self, cover: CoverMode) -> Self {
        self.cover = cover;
        self
    }

    /// Every attribute named by any raw row, sorted alphabetically.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn rows(&self) -> &[Fd] {
        &self.rows
    }

    pub fn canonical_rows(&self) -> &[Fd] {
        &self.canonical
    }

    pub fn canonical_row(&self, row: usize) -> Option<&Fd> {
        self.canonical.get(row)
    }

    /// Rebuild the canonical rows from the raw rows.
    pub fn canonicalize(&mut self) {
        self.canonical = match self.cover {
            CoverMode::Minimal => cover::minimal_cover(&self.rows),
            CoverMode::SplitOnly => cover::split(&self.rows),
        };
        debug!(raw = self.rows.len(), canonical = self.canonical.len(), mode = ?self.cover, "canonicalized");
        trace!("canonical rows\n{}", self);
    }

    pub fn determinant_count_per_row(&self) -> Vec<usize> {
        self.canonical.iter().map(|r| r.lhs.len()).collect()
    }

    /// How many canonical rows use each attribute as a determinant, in
    /// [`attributes`](Self::attributes) order.
    pub fn determinant_count_per_attribute(&self) -> Vec<usize> {
        self.attributes
            .iter()
            .map(|a| self.canonical.iter().filter(|r| r.lhs.contains(a)).count())
            .collect()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<Role> {
        let fd = self.canonical.get(row)?;
        let attr = self.attributes.get(col)?;

        if fd.lhs.contains(attr) {
            Some(Role::Determinant)
        } else if fd.rhs.contains(attr) {
            Some(Role::Dependant)
        } else {
            None
        }
    }

    /// Fold into `row` the dependants of every other row that holds one of
    /// `row`'s dependants in the given role, then delete those rows.
    ///
    /// Returns the number of rows removed.
    pub fn merge_pseudo_transitive_rows(&mut self, row: usize, role: Role) -> usize {
        self.merge_pseudo_transitive(row, role).len()
    }

    fn merge_pseudo_transitive(&mut self, row: usize, role: Role) -> BTreeSet<usize> {
        let mut matched = BTreeSet::new();
        let Some(dep) = self.canonical.get(row) else {
            return matched;
        };

        for attr in &dep.rhs {
            for (i, other) in self.canonical.iter().enumerate() {
                if i == row {
                    continue;
                }
                let holds = match role {
                    Role::Determinant => other.lhs.contains(attr),
                    Role::Dependant => other.rhs.contains(attr),
                };
                if holds {
                    matched.insert(i);
                }
            }
        }

        let gathered: AttrSet = matched
            .iter()
            .flat_map(|&i| self.canonical[i].rhs.iter().cloned())
            .collect();
        let dep = &mut self.canonical[row];
        for attr in gathered {
            // a row never depends on its own determinant
            if !dep.lhs.contains(&attr) {
                dep.rhs.insert(attr);
            }
        }

        if !matched.is_empty() {
            debug!(row, merged = ?matched, "merged pseudo transitive rows");
        }
        self.remove_rows(&matched);
        matched
    }

    /// Union rows sharing a determinant set into the first such row.
    ///
    /// Returns the number of rows removed.
    pub fn merge_identical_determinant_rows(&mut self) -> usize {
        let mut merged: Vec<Fd> = Vec::with_capacity(self.canonical.len());
        let mut removed = 0;

        for row in self.canonical.drain(..) {
            match merged.iter_mut().find(|m| m.lhs == row.lhs) {
                Some(first) => {
                    first.rhs.extend(row.rhs);
                    removed += 1;
                }
                None => merged.push(row),
            }
        }

        self.canonical = merged;
        removed
    }

    /// For every pair of rows where one determinant set is contained in the
    /// other, drop the smaller row's dependants from the larger row and
    /// record a foreign key from the larger row to the smaller one.
    pub fn remove_duplicated_dependants(&mut self) -> RowRelations {
        let n = self.canonical.len();
        let mut relations: RowRelations = vec![Vec::new(); n];

        for i in 0..n {
            for j in 0..n {
                if i == j || !self.canonical[i].lhs.is_subset(&self.canonical[j].lhs) {
                    continue;
                }

                let derived = self.canonical[i].rhs.clone();
                self.canonical[j].rhs.retain(|a| !derived.contains(a));
                if !self.canonical[i].lhs.is_empty() {
                    relations[j].push(ForeignKeyRef::new(&self.canonical[i].lhs, i));
                }
            }
        }

        relations
    }

    /// Whether one of the row's dependants determines another row.
    pub fn has_pseudo_transitive_rhs(&self, row: usize) -> bool {
        let Some(fd) = self.canonical.get(row) else {
            return false;
        };

        fd.rhs.iter().any(|attr| {
            self.canonical
                .iter()
                .enumerate()
                .any(|(i, other)| i != row && other.lhs.contains(attr))
        })
    }

    pub fn to_second_normal_form(&mut self) -> RowRelations {
        self.canonicalize();

        let mut current = self.select_starting_row();
        debug!(row = current, "selected starting row");

        // each productive round deletes at least one row, so this runs at
        // most once per canonical row
        loop {
            let removed = self.merge_pseudo_transitive(current, Role::Determinant);
            if removed.is_empty() {
                break;
            }
            current -= removed.range(..current).count();
            trace!("after pseudo transitive merge\n{}", self);

            match self.select_pseudo_transitive_row() {
                Some(row) => current = row,
                None => debug!(row = current, "no pseudo transitive row left, keeping working row"),
            }
        }

        self.merge_identical_determinant_rows();
        let relations = self.remove_duplicated_dependants();
        trace!("second normal form\n{}", self);

        relations
    }

    pub fn to_third_normal_form(&mut self) -> RowRelations {
        self.canonicalize();
        self.merge_identical_determinant_rows();

        let n = self.canonical.len();
        let mut relations: RowRelations = vec![Vec::new(); n];
        if n == 0 {
            return relations;
        }

        let start = self.select_pseudo_transitive_row().unwrap_or(0);
        debug!(row = start, "selected starting row");

        let order = std::iter::once(start).chain((0..n).filter(|&i| i != start));
        for row in order {
            let mut visited = BTreeSet::new();
            self.follow_pseudo_transitive_path(&mut relations, row, row, &mut visited);
        }
        trace!("third normal form\n{}", self);

        relations
    }

    /// Walk the dependency chain rooted at `start`, depth first.
    ///
    /// A dependant of `start` that is reached again through an intermediate
    /// row is removed from `start`, and a foreign key from `start` to that
    /// intermediate row is recorded. A dependant is only removed while it
    /// stays derivable from `start`'s determinants. Rows are entered at most
    /// once per walk.
    pub fn follow_pseudo_transitive_path(
        &mut self,
        relations: &mut RowRelations,
        start: usize,
        current: usize,
        visited: &mut BTreeSet<usize>,
    ) {
        if current >= self.canonical.len() || start >= self.canonical.len() {
            return;
        }
        visited.insert(current);

        let dependants: Vec<String> = self.canonical[current].rhs.iter().cloned().collect();
        for attr in dependants {
            if current != start
                && self.canonical[start].rhs.contains(&attr)
                && self.derivable_without(start, &attr)
            {
                self.canonical[start].rhs.remove(&attr);
                let fk = ForeignKeyRef::new(&self.canonical[current].lhs, current);
                debug!(from = start, to = current, attributes = ?fk.attributes, "transitive dependant moved");
                if let Some(rels) = relations.get_mut(start) {
                    if !rels.contains(&fk) {
                        rels.push(fk);
                    }
                }
            }

            let next: Vec<usize> = self
                .canonical
                .iter()
                .enumerate()
                .filter(|(i, row)| *i != start && !visited.contains(i) && row.lhs.contains(&attr))
                .map(|(i, _)| i)
                .collect();
            for i in next {
                if !visited.contains(&i) {
                    self.follow_pseudo_transitive_path(relations, start, i, visited);
                }
            }
        }
    }

    fn derivable_without(&self, row: usize, attr: &str) -> bool {
        let mut rows = self.canonical.clone();
        rows[row].rhs.remove(attr);
        cover::closure(&rows[row].lhs, &rows).contains(attr)
    }

    /// Make sure some row covers the table key, adding a key-only row when
    /// none does, and attach attributes no row mentions to that row.
    pub fn ensure_key_row(&mut self, relations: &mut RowRelations, key: &[String], declared: &[String]) {
        if key.is_empty() {
            return;
        }
        let key: AttrSet = key.iter().cloned().collect();
        let placed: AttrSet = self.canonical.iter().flat_map(Fd::attributes).collect();

        let holder = match self.canonical.iter().position(|r| key.is_subset(&r.attributes())) {
            Some(row) => row,
            None => {
                debug!(key = ?key, "adding key row");
                self.canonical.push(Fd {
                    lhs: key.clone(),
                    rhs: AttrSet::new(),
                });
                relations.resize(self.canonical.len(), Vec::new());
                self.canonical.len() - 1
            }
        };

        let row = &mut self.canonical[holder];
        for attr in declared {
            if !placed.contains(attr) && !row.lhs.contains(attr) {
                row.rhs.insert(attr.clone());
            }
        }
    }

    /// Record a foreign key from every row that holds another row's full
    /// determinant set, unless one to that row already exists.
    pub fn link_foreign_keys(&self, relations: &mut RowRelations) {
        relations.resize(self.canonical.len(), Vec::new());

        for (i, row) in self.canonical.iter().enumerate() {
            let attrs = row.attributes();
            for (j, target) in self.canonical.iter().enumerate() {
                if i == j
                    || target.lhs.is_empty()
                    || target.lhs == row.lhs
                    || !target.lhs.is_subset(&attrs)
                    || relations[i].iter().any(|r| r.target_row == j)
                {
                    continue;
                }
                relations[i].push(ForeignKeyRef::new(&target.lhs, j));
            }
        }
    }

    /// Row with the most determinants that has a pseudo transitive dependant.
    fn select_pseudo_transitive_row(&self) -> Option<usize> {
        let rows = max_indices(&self.determinant_count_per_row());
        let cols = ascending_indices(&self.determinant_count_per_attribute());

        rows.into_iter().find(|&row| {
            self.has_pseudo_transitive_rhs(row)
                && cols.iter().any(|&col| self.value(row, col) == Some(Role::Determinant))
        })
    }

    /// Row with the fewest determinants among those using the most shared
    /// determinant attribute.
    fn select_starting_row(&self) -> usize {
        let cols = max_indices(&self.determinant_count_per_attribute());
        let rows = ascending_indices(&self.determinant_count_per_row());

        for &col in &cols {
            for &row in &rows {
                if self.value(row, col) == Some(Role::Determinant) {
                    return row;
                }
            }
        }
        0
    }

    fn remove_rows(&mut self, indices: &BTreeSet<usize>) {
        if indices.is_empty() {
            return;
        }
        let mut index = 0;
        self.canonical.retain(|_| {
            let keep = !indices.contains(&index);
            index += 1;
            keep
        });
    }
}

impl fmt::Display for DependencyMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.canonical.iter().enumerate() {
            writeln!(f, "{}: {}", i, row)?;
        }
        Ok(())
    }
}

fn max_indices(counts: &[usize]) -> Vec<usize> {
    let Some(&max) = counts.iter().max() else {
        return Vec::new();
    };
    counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == max)
        .map(|(i, _)| i)
        .collect()
}

fn ascending_indices(counts: &[usize]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..counts.len()).collect();
    indices.sort_by_key(|&i| counts[i]);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(attrs: &[&str]) -> AttrSet {
        attrs.iter().map(|s| s.to_string()).collect()
    }

    fn matrix(rows: Vec<Fd>) -> DependencyMatrix {
        DependencyMatrix::from_rows(rows)
    }

    fn canonical(rows: Vec<Fd>, cover: CoverMode) -> DependencyMatrix {
        let mut m = matrix(rows).with_cover_mode(cover);
        m.canonicalize();
        m
    }

    #[test]
    fn test_attributes_sorted() {
        let m = DependencyMatrix::new(&[
            TableDependency::new(["b"], ["d", "a"]),
            TableDependency::new(["c"], ["b"]),
        ]);
        assert_eq!(m.attributes(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_canonical_rows_have_single_dependant() {
        let m = canonical(
            vec![Fd::new(["a"], ["b", "c"]), Fd::new(["d"], Vec::<String>::new())],
            CoverMode::SplitOnly,
        );
        assert_eq!(m.canonical_rows().len(), 2);
        assert!(m.canonical_rows().iter().all(|r| r.rhs.len() == 1));
        // raw rows are untouched
        assert_eq!(m.rows()[0].rhs, set(&["b", "c"]));
    }

    #[test]
    fn test_counts_and_values() {
        let m = canonical(
            vec![Fd::new(["a"], ["b"]), Fd::new(["a", "c"], ["d"])],
            CoverMode::SplitOnly,
        );

        assert_eq!(m.determinant_count_per_row(), vec![1, 2]);
        // attributes: a, b, c, d
        assert_eq!(m.determinant_count_per_attribute(), vec![2, 0, 1, 0]);
        assert_eq!(m.value(0, 0), Some(Role::Determinant));
        assert_eq!(m.value(0, 1), Some(Role::Dependant));
        assert_eq!(m.value(0, 3), None);
        assert_eq!(m.value(5, 0), None);
        assert_eq!(m.value(0, 9), None);
    }

    #[test]
    fn test_merge_pseudo_transitive_rows() {
        let mut m = canonical(
            vec![Fd::new(["a"], ["b"]), Fd::new(["b"], ["c", "a"]), Fd::new(["x"], ["y"])],
            CoverMode::SplitOnly,
        );
        // rows: a→b, b→c, b→a, x→y
        let removed = m.merge_pseudo_transitive_rows(0, Role::Determinant);

        assert_eq!(removed, 2);
        assert_eq!(m.canonical_rows(), &[Fd::new(["a"], ["b", "c"]), Fd::new(["x"], ["y"])]);
        assert_eq!(m.merge_pseudo_transitive_rows(0, Role::Determinant), 0);
        assert_eq!(m.merge_pseudo_transitive_rows(7, Role::Determinant), 0);
    }

    #[test]
    fn test_merge_pseudo_transitive_rows_by_dependant() {
        let mut m = canonical(
            vec![Fd::new(["a"], ["b"]), Fd::new(["c"], ["b"]), Fd::new(["c"], ["d"])],
            CoverMode::SplitOnly,
        );
        let removed = m.merge_pseudo_transitive_rows(0, Role::Dependant);

        assert_eq!(removed, 1);
        assert_eq!(m.canonical_rows()[0], Fd::new(["a"], ["b"]));
        assert_eq!(m.canonical_rows().len(), 2);
    }

    #[test]
    fn test_merge_identical_determinant_rows() {
        let mut m = canonical(
            vec![Fd::new(["a"], ["b", "c"]), Fd::new(["d"], ["e"]), Fd::new(["a"], ["f"])],
            CoverMode::SplitOnly,
        );
        assert_eq!(m.merge_identical_determinant_rows(), 2);
        assert_eq!(
            m.canonical_rows(),
            &[Fd::new(["a"], ["b", "c", "f"]), Fd::new(["d"], ["e"])]
        );
    }

    #[test]
    fn test_remove_duplicated_dependants() {
        let mut m = canonical(
            vec![Fd::new(["a"], ["x"]), Fd::new(["a", "b"], ["x", "y"])],
            CoverMode::SplitOnly,
        );
        m.merge_identical_determinant_rows();
        let relations = m.remove_duplicated_dependants();

        assert_eq!(m.canonical_rows()[1], Fd::new(["a", "b"], ["y"]));
        assert!(relations[0].is_empty());
        assert_eq!(
            relations[1],
            vec![ForeignKeyRef {
                attributes: vec!["a".into()],
                target_row: 0
            }]
        );
    }

    #[test]
    fn test_has_pseudo_transitive_rhs() {
        let m = canonical(
            vec![Fd::new(["a"], ["b"]), Fd::new(["b"], ["c"])],
            CoverMode::SplitOnly,
        );
        assert!(m.has_pseudo_transitive_rhs(0));
        assert!(!m.has_pseudo_transitive_rhs(1));
        assert!(!m.has_pseudo_transitive_rhs(2));
    }

    #[test]
    fn test_second_normal_form_splits_partial_dependency() {
        // OrderId → CustomerName, CustomerCity; OrderId, ProductId → CustomerName, CustomerCity
        let mut m = matrix(vec![
            Fd::new(["OrderId"], ["CustomerName", "CustomerCity"]),
            Fd::new(["OrderId", "ProductId"], ["CustomerName", "CustomerCity"]),
        ])
        .with_cover_mode(CoverMode::SplitOnly);
        let relations = m.to_second_normal_form();

        assert_eq!(
            m.canonical_rows(),
            &[
                Fd::new(["OrderId"], ["CustomerCity", "CustomerName"]),
                Fd::new(["OrderId", "ProductId"], Vec::<String>::new()),
            ]
        );
        assert_eq!(relations[1], vec![ForeignKeyRef::new(&set(&["OrderId"]), 0)]);
    }

    #[test]
    fn test_third_normal_form_moves_transitive_dependant() {
        let mut m = matrix(vec![
            Fd::new(["EmpId"], ["DeptId", "DeptName"]),
            Fd::new(["DeptId"], ["DeptName"]),
        ])
        .with_cover_mode(CoverMode::SplitOnly);
        let relations = m.to_third_normal_form();

        assert_eq!(
            m.canonical_rows(),
            &[Fd::new(["EmpId"], ["DeptId"]), Fd::new(["DeptId"], ["DeptName"])]
        );
        assert_eq!(relations[0], vec![ForeignKeyRef::new(&set(&["DeptId"]), 1)]);
        assert!(relations[1].is_empty());
    }

    #[test]
    fn test_third_normal_form_keeps_dependant_reached_through_cycle() {
        let mut m = matrix(vec![
            Fd::new(["a"], ["c"]),
            Fd::new(["b"], ["c"]),
            Fd::new(["c"], ["b"]),
        ]);
        let relations = m.to_third_normal_form();

        assert_eq!(m.canonical_rows()[0], Fd::new(["a"], ["c"]));
        assert!(relations[0].is_empty());
    }

    #[test]
    fn test_third_normal_form_of_empty_matrix() {
        let mut m = matrix(Vec::new());
        assert!(m.to_third_normal_form().is_empty());
        assert!(m.to_second_normal_form().is_empty());
    }

    #[test]
    fn test_ensure_key_row_adds_missing_key() {
        let mut m = canonical(vec![Fd::new(["a"], ["b"])], CoverMode::Minimal);
        let mut relations = vec![Vec::new()];
        let declared: Vec<String> = ["a", "c", "b", "z"].iter().map(|s| s.to_string()).collect();
        m.ensure_key_row(&mut relations, &["a".to_string(), "c".to_string()], &declared);

        assert_eq!(relations.len(), 2);
        assert_eq!(m.canonical_rows()[1], Fd::new(["a", "c"], ["z"]));
    }

    #[test]
    fn test_ensure_key_row_reuses_covering_row() {
        let mut m = canonical(vec![Fd::new(["a"], ["b"])], CoverMode::Minimal);
        let mut relations = vec![Vec::new()];
        let declared: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        m.ensure_key_row(&mut relations, &["a".to_string()], &declared);

        assert_eq!(m.canonical_rows(), &[Fd::new(["a"], ["b", "c"])]);
        assert_eq!(relations.len(), 1);
    }

    #[test]
    fn test_link_foreign_keys() {
        let m = canonical(
            vec![Fd::new(["e"], ["d"]), Fd::new(["d"], ["n"])],
            CoverMode::Minimal,
        );
        let mut relations = vec![Vec::new(), Vec::new()];
        m.link_foreign_keys(&mut relations);

        assert_eq!(relations[0], vec![ForeignKeyRef::new(&set(&["d"]), 1)]);
        assert!(relations[1].is_empty());

        m.link_foreign_keys(&mut relations);
        assert_eq!(relations[0].len(), 1);
    }

    #[test]
    fn test_display() {
        let m = canonical(vec![Fd::new(["a", "b"], ["c"])], CoverMode::SplitOnly);
        assert_eq!(m.to_string(), "0: {a, b} → {c}\n");
    }

    fn arb_rows() -> impl Strategy<Value = Vec<Fd>> {
        let row = (
            prop::collection::btree_set("[a-e]", 1..3),
            prop::collection::btree_set("[a-e]", 1..3),
        );
        prop::collection::vec(row.prop_map(|(lhs, rhs)| Fd { lhs, rhs }), 0..6)
    }

    proptest! {
        #[test]
        fn merge_identical_is_idempotent(rows in arb_rows()) {
            let mut m = canonical(rows, CoverMode::SplitOnly);
            m.merge_identical_determinant_rows();
            let once = m.canonical_rows().to_vec();

            prop_assert_eq!(m.merge_identical_determinant_rows(), 0);
            prop_assert_eq!(m.canonical_rows(), once.as_slice());
        }

        #[test]
        fn decompositions_terminate_with_one_list_per_row(rows in arb_rows()) {
            let mut second = matrix(rows.clone());
            let relations = second.to_second_normal_form();
            prop_assert_eq!(relations.len(), second.canonical_rows().len());

            let mut third = matrix(rows);
            let relations = third.to_third_normal_form();
            prop_assert_eq!(relations.len(), third.canonical_rows().len());
        }
    }
}
