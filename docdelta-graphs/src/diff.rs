// Graph diffing: classify component IDs as added, removed, or modified
// between two snapshots.
//
// What counts as "modified" is an explicit policy, held constant for a run,
// because it decides which components seed propagation downstream.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::graph::{Component, ComponentId, DependencyGraph};
use crate::normalize::normalize_source;

/// Which component attributes participate in modification detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModificationPolicy {
    /// Normalized `source_code` only.
    Source,
    /// Normalized source, the `depends_on` set, and `file_path`.
    #[default]
    Structural,
    /// Everything in `Structural`, plus `parameters`.
    Strict,
}

impl ModificationPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Structural => "structural",
            Self::Strict => "strict",
        }
    }

    fn compares_structure(self) -> bool {
        matches!(self, Self::Structural | Self::Strict)
    }
}

impl fmt::Display for ModificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModificationPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "source" => Ok(Self::Source),
            "structural" => Ok(Self::Structural),
            "strict" => Ok(Self::Strict),
            other => Err(format!(
                "unknown modification policy {other:?} (expected source, structural, or strict)"
            )),
        }
    }
}

/// The first attribute found to differ for a modified component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationReason {
    Source,
    Dependencies,
    FilePath,
    Parameters,
}

impl ModificationReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Dependencies => "dependencies",
            Self::FilePath => "file_path",
            Self::Parameters => "parameters",
        }
    }
}

impl fmt::Display for ModificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of comparing two snapshots.
///
/// `added`, `removed`, and `modified` are disjoint by construction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    pub added: BTreeSet<ComponentId>,
    pub removed: BTreeSet<ComponentId>,
    pub modified: BTreeSet<ComponentId>,
    /// Why each entry of `modified` was judged different.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reasons: BTreeMap<ComponentId, ModificationReason>,
}

impl DiffResult {
    /// `added ∪ modified`: components present in the new snapshot that changed.
    pub fn changed_components(&self) -> BTreeSet<ComponentId> {
        self.added.union(&self.modified).cloned().collect()
    }

    /// `added ∪ removed ∪ modified`.
    pub fn all_changed(&self) -> BTreeSet<ComponentId> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.modified)
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    pub fn reason(&self, id: &str) -> Option<ModificationReason> {
        self.reasons.get(id).copied()
    }

    /// One-line count summary, e.g. `"2 added, 1 modified, 0 removed"`.
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} removed",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }
}

/// Compares snapshots under a fixed [`ModificationPolicy`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphDiffer {
    policy: ModificationPolicy,
}

impl GraphDiffer {
    pub fn new(policy: ModificationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ModificationPolicy {
        self.policy
    }

    /// Compute the diff between `old` and `new`.
    pub fn compare(&self, old: &DependencyGraph, new: &DependencyGraph) -> DiffResult {
        let mut diff = DiffResult::default();

        for (id, new_component) in new.iter() {
            match old.get(id) {
                None => {
                    diff.added.insert(id.to_string());
                }
                Some(old_component) => {
                    if let Some(reason) =
                        modification_reason(old_component, new_component, self.policy)
                    {
                        diff.modified.insert(id.to_string());
                        diff.reasons.insert(id.to_string(), reason);
                    }
                }
            }
        }

        diff.removed = old
            .ids()
            .filter(|id| !new.contains(id))
            .map(str::to_string)
            .collect();

        diff
    }
}

/// Compare two snapshots under the default policy.
pub fn compare_graphs(old: &DependencyGraph, new: &DependencyGraph) -> DiffResult {
    GraphDiffer::default().compare(old, new)
}

/// Return the first attribute that differs under `policy`, checked in the
/// order source, dependencies, file path, parameters.
pub fn modification_reason(
    old: &Component,
    new: &Component,
    policy: ModificationPolicy,
) -> Option<ModificationReason> {
    if normalize_source(old.source()) != normalize_source(new.source()) {
        return Some(ModificationReason::Source);
    }
    if policy.compares_structure() {
        if old.depends_on != new.depends_on {
            return Some(ModificationReason::Dependencies);
        }
        if old.file_path != new.file_path {
            return Some(ModificationReason::FilePath);
        }
    }
    if policy == ModificationPolicy::Strict && old.parameters != new.parameters {
        return Some(ModificationReason::Parameters);
    }
    None
}

pub fn is_modified(old: &Component, new: &Component, policy: ModificationPolicy) -> bool {
    modification_reason(old, new, policy).is_some()
}

// ── Tests ─────────────────────────────────────────────────────────────
