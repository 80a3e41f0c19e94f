//! Attribute closure and minimal cover over functional dependency rows.

use std::collections::BTreeSet;
use std::fmt;

use tracing::trace;

use crate::model::TableDependency;

pub type AttrSet = BTreeSet<String>;

/// One functional dependency row: `lhs → rhs`.
///
/// Rows own their sets; splitting a row clones its `lhs`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fd {
    pub lhs: AttrSet,
    pub rhs: AttrSet,
}

impl Fd {
    pub fn new<L, R>(lhs: L, rhs: R) -> Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            lhs: lhs.into_iter().map(Into::into).collect(),
            rhs: rhs.into_iter().map(Into::into).collect(),
        }
    }

    /// All attributes mentioned by the row.
    pub fn attributes(&self) -> AttrSet {
        self.lhs.union(&self.rhs).cloned().collect()
    }
}

impl From<&TableDependency> for Fd {
    fn from(dependency: &TableDependency) -> Self {
        Fd::new(dependency.determinants.iter().cloned(), dependency.dependants.iter().cloned())
    }
}

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |set: &AttrSet| set.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
        write!(f, "{{{}}} → {{{}}}", join(&self.lhs), join(&self.rhs))
    }
}

/// How much of the minimal cover computation canonicalization runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoverMode {
    /// Split, then drop extraneous determinants and redundant rows.
    #[default]
    Minimal,
    /// Only drop empty rows and split to singleton right-hand sides.
    SplitOnly,
}

impl CoverMode {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "minimal" => Some(Self::Minimal),
            "split" | "split_only" => Some(Self::SplitOnly),
            _ => None,
        }
    }
}

/// Fixpoint attribute closure of `attrs` under `fds`.
pub fn closure<'a, I>(attrs: &AttrSet, fds: I) -> AttrSet
where
    I: IntoIterator<Item = &'a Fd>,
    I::IntoIter: Clone,
{
    let fds = fds.into_iter();
    let mut closure = attrs.clone();

    loop {
        let mut changed = false;
        for fd in fds.clone() {
            if fd.lhs.is_subset(&closure) {
                for a in &fd.rhs {
                    if closure.insert(a.clone()) {
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }

    closure
}

/// Drop empty rows and trivial dependants, then split every row into
/// singleton right-hand sides.
pub fn split(rows: &[Fd]) -> Vec<Fd> {
    let mut out = Vec::new();
    for row in rows {
        for attr in row.rhs.difference(&row.lhs) {
            out.push(Fd {
                lhs: row.lhs.clone(),
                rhs: AttrSet::from([attr.clone()]),
            });
        }
    }
    out
}

/// Textbook minimal cover of `rows`.
pub fn minimal_cover(rows: &[Fd]) -> Vec<Fd> {
    let mut cover = split(rows);
    trace!(rows = cover.len(), "split by dependant");

    // extraneous determinants
    for i in 0..cover.len() {
        let lhs: Vec<String> = cover[i].lhs.iter().cloned().collect();
        for attr in lhs {
            if cover[i].lhs.len() <= 1 {
                break;
            }
            let mut reduced = cover[i].lhs.clone();
            reduced.remove(&attr);
            if cover[i].rhs.is_subset(&closure(&reduced, &cover)) {
                trace!(%attr, row = i, "extraneous determinant");
                cover[i].lhs = reduced;
            }
        }
    }

    // redundant rows
    let mut removed = vec![false; cover.len()];
    for i in 0..cover.len() {
        let others: Vec<&Fd> = cover
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i && !removed[j])
            .map(|(_, fd)| fd)
            .collect();
        if cover[i].rhs.is_subset(&closure(&cover[i].lhs, others.iter().copied())) {
            trace!(row = i, "redundant dependency");
            removed[i] = true;
        }
    }

    cover
        .into_iter()
        .zip(removed)
        .filter(|(_, removed)| !removed)
        .map(|(fd, _)| fd)
        .collect()
}
