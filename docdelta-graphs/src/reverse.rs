// Reverse dependency index, for "who depends on X?" lookups.

use std::collections::{BTreeSet, HashMap};

use crate::graph::{ComponentId, DependencyGraph};

/// Maps a component ID to the set of components declaring it in `depends_on`.
///
/// Keys are referenced IDs, so a dangling reference still gets an entry even
/// though no component with that ID exists in the snapshot.
#[derive(Debug, Clone, Default)]
pub struct ReverseDependencyIndex {
    entries: HashMap<ComponentId, BTreeSet<ComponentId>>,
}

impl ReverseDependencyIndex {
    /// Invert every `depends_on` edge of `graph`. O(edges).
    pub fn build(graph: &DependencyGraph) -> Self {
        let mut entries: HashMap<ComponentId, BTreeSet<ComponentId>> = HashMap::new();
        for (id, component) in graph.iter() {
            for dep in &component.depends_on {
                entries
                    .entry(dep.clone())
                    .or_default()
                    .insert(id.to_string());
            }
        }
        Self { entries }
    }

    /// Components that depend directly on `id`.
    pub fn dependents(&self, id: &str) -> Option<&BTreeSet<ComponentId>> {
        self.entries.get(id)
    }

    /// Number of distinct referenced IDs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.entries.values().map(BTreeSet::len).sum()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Component;

    #[test]
    fn empty_graph_has_empty_index() {
        let index = ReverseDependencyIndex::build(&DependencyGraph::new());
        assert!(index.is_empty());
        assert_eq!(index.edge_count(), 0);
    }

    #[test]
    fn inverts_a_single_edge() {
        let graph: DependencyGraph = [
            ("A", Component::default().depending_on(["B"])),
            ("B", Component::default()),
        ]
        .into_iter()
        .collect();
        let index = ReverseDependencyIndex::build(&graph);
        assert!(index.dependents("B").unwrap().contains("A"));
        assert!(index.dependents("A").is_none());
    }

    #[test]
    fn collects_multiple_dependents() {
        let graph: DependencyGraph = [
            ("A", Component::default().depending_on(["C"])),
            ("B", Component::default().depending_on(["C"])),
            ("C", Component::default()),
        ]
        .into_iter()
        .collect();
        let index = ReverseDependencyIndex::build(&graph);
        let dependents: Vec<_> = index.dependents("C").unwrap().iter().cloned().collect();
        assert_eq!(dependents, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(index.edge_count(), graph.edge_count());
    }

    #[test]
    fn dangling_reference_gets_an_entry() {
        let graph: DependencyGraph = [("A", Component::default().depending_on(["missing"]))]
            .into_iter()
            .collect();
        let index = ReverseDependencyIndex::build(&graph);
        assert!(index.dependents("missing").unwrap().contains("A"));
        assert!(!graph.contains("missing"));
    }

    #[test]
    fn self_dependency_is_recorded() {
        let graph: DependencyGraph = [("A", Component::default().depending_on(["A"]))]
            .into_iter()
            .collect();
        let index = ReverseDependencyIndex::build(&graph);
        assert!(index.dependents("A").unwrap().contains("A"));
    }
}
