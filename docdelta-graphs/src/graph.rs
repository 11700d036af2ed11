// Snapshot model: components keyed by ID, with outgoing `depends_on` edges.
//
// A `DependencyGraph` is one point-in-time view of the repository. Snapshots
// are built once (by the loader or from an iterator) and never mutated.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

/// Globally unique component identifier, e.g. `"pkg/file.Class.method"`.
pub type ComponentId = String;

/// One tracked unit of code (function, method, class).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_code: Option<String>,
    /// IDs this component depends on. May reference IDs absent from the graph.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub depends_on: BTreeSet<ComponentId>,
    /// Originating file; a change here means the component was relocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

impl Component {
    pub fn with_source(source: impl Into<String>) -> Self {
        Self {
            source_code: Some(source.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn depending_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentId>,
    {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn in_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Source text, treating an absent value as empty.
    pub fn source(&self) -> &str {
        self.source_code.as_deref().unwrap_or("")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeSet<ComponentId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeSet<ComponentId>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Immutable mapping from component ID to component.
///
/// Iteration is ordered by ID so every derived result is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    components: BTreeMap<ComponentId, Component>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Component> {
        self.components.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.components.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Component)> {
        self.components.iter().map(|(id, c)| (id.as_str(), c))
    }

    /// Total number of declared `depends_on` edges, dangling ones included.
    pub fn edge_count(&self) -> usize {
        self.components.values().map(|c| c.depends_on.len()).sum()
    }

    /// Dependency references that point at IDs not present in this snapshot.
    pub fn dangling_references(&self) -> BTreeSet<&str> {
        self.components
            .values()
            .flat_map(|c| c.depends_on.iter())
            .filter(|dep| !self.components.contains_key(dep.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl<S: Into<ComponentId>> FromIterator<(S, Component)> for DependencyGraph {
    fn from_iter<T: IntoIterator<Item = (S, Component)>>(iter: T) -> Self {
        Self {
            components: iter.into_iter().map(|(id, c)| (id.into(), c)).collect(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
