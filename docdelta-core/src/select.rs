// Selective regeneration filter.
//
// Decides, per module path, whether a partial rebuild has to touch it. A
// selected module pulls in its descendants (their docs feed it) and its
// ancestors (their overviews summarize it). Pure functions, no state.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::modules::ModuleTree;

/// Why a module was included or excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "pattern", rename_all = "snake_case")]
pub enum SelectionReason {
    NoFilter,
    ExactMatch(String),
    ChildOf(String),
    ParentOf(String),
    NotInFilter,
}

impl fmt::Display for SelectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFilter => f.write_str("no filter"),
            Self::ExactMatch(p) => write!(f, "exact match: {p}"),
            Self::ChildOf(p) => write!(f, "child of: {p}"),
            Self::ParentOf(p) => write!(f, "parent of: {p}"),
            Self::NotInFilter => f.write_str("not in filter"),
        }
    }
}

/// Include/exclude decision for one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub included: bool,
    pub reason: SelectionReason,
}

impl Selection {
    fn include(reason: SelectionReason) -> Self {
        Self {
            included: true,
            reason,
        }
    }
}

/// Decide whether `module_path` is part of a selective rebuild.
///
/// An empty filter includes everything. Otherwise patterns are tried in
/// order, each checked for exact, child, then parent match; the first hit
/// wins. `_all_module_paths` is accepted for callers that have it at hand
/// but does not change the outcome.
pub fn should_process<S: AsRef<str>>(
    module_path: &str,
    filters: &[S],
    _all_module_paths: &BTreeSet<String>,
) -> Selection {
    if filters.is_empty() {
        return Selection::include(SelectionReason::NoFilter);
    }

    for pattern in filters {
        let pattern = pattern.as_ref();
        if module_path == pattern {
            return Selection::include(SelectionReason::ExactMatch(pattern.to_string()));
        }
        if is_strict_descendant(module_path, pattern) {
            return Selection::include(SelectionReason::ChildOf(pattern.to_string()));
        }
        if is_strict_descendant(pattern, module_path) {
            return Selection::include(SelectionReason::ParentOf(pattern.to_string()));
        }
    }

    Selection {
        included: false,
        reason: SelectionReason::NotInFilter,
    }
}

fn is_strict_descendant(path: &str, ancestor: &str) -> bool {
    path.strip_prefix(ancestor)
        .is_some_and(|rest| rest.starts_with('/'))
}

/// Every strict ancestor path of every selected path.
pub fn required_parents<S: AsRef<str>>(selected: &[S]) -> BTreeSet<String> {
    let mut parents = BTreeSet::new();
    for path in selected {
        let path = path.as_ref();
        for (idx, _) in path.match_indices('/') {
            parents.insert(path[..idx].to_string());
        }
    }
    parents
}

/// Split a comma-separated module list, trimming entries and dropping blanks.
pub fn parse_module_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// One module's decision within a [`SelectionPlan`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleDecision {
    pub path: String,
    #[serde(flatten)]
    pub selection: Selection,
}

/// Decisions for a whole module tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SelectionPlan {
    /// Every module in processing order (children before parents).
    pub decisions: Vec<ModuleDecision>,
    /// Ancestors of the filter patterns, which need their overviews rebuilt.
    pub required_parents: BTreeSet<String>,
}

impl SelectionPlan {
    pub fn build<S: AsRef<str>>(tree: &ModuleTree, filters: &[S]) -> Self {
        let order = tree.processing_order();
        let universe: BTreeSet<String> = order.iter().cloned().collect();
        let decisions = order
            .into_iter()
            .map(|path| {
                let selection = should_process(&path, filters, &universe);
                ModuleDecision { path, selection }
            })
            .collect();
        Self {
            decisions,
            required_parents: required_parents(filters),
        }
    }

    /// Included module paths, in processing order.
    pub fn included(&self) -> Vec<&str> {
        self.decisions
            .iter()
            .filter(|d| d.selection.included)
            .map(|d| d.path.as_str())
            .collect()
    }

    pub fn excluded_count(&self) -> usize {
        self.decisions.iter().filter(|d| !d.selection.included).count()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
