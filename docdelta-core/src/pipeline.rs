// Affected-modules pipeline: load → diff → propagate → map.
//
// Propagation always walks the reverse index of the *new* snapshot, so the
// result follows the current dependency shape.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use docdelta_graphs::{
    AffectedSet, DependencyGraph, DepthBounds, DiffResult, GraphDiffer, ModificationPolicy,
    Propagator, ReverseDependencyIndex, load_graph,
};

use crate::config::{DeltaConfig, SeedScope};
use crate::error::Result;
use crate::modules::{ModuleMapper, ModuleMapping, ModuleTree};

/// Number of sample IDs listed per change kind in verbose output.
pub const SAMPLE_LIMIT: usize = 10;

/// Resolved input file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedInputs {
    pub old_graph: PathBuf,
    pub new_graph: PathBuf,
    pub module_tree: PathBuf,
}

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffectedOptions {
    pub depth: u32,
    pub bounds: DepthBounds,
    pub seed: SeedScope,
    pub policy: ModificationPolicy,
    pub large_file_warning_bytes: u64,
}

impl Default for AffectedOptions {
    fn default() -> Self {
        Self {
            depth: 2,
            bounds: DepthBounds::default(),
            seed: SeedScope::All,
            policy: ModificationPolicy::default(),
            large_file_warning_bytes: 100 * 1024 * 1024,
        }
    }
}

impl AffectedOptions {
    pub fn from_config(config: &DeltaConfig) -> Result<Self> {
        Ok(Self {
            depth: config.propagation.depth,
            bounds: config.propagation.bounds()?,
            seed: config.propagation.seed,
            policy: config.diff.policy,
            large_file_warning_bytes: config.large_file_threshold_bytes(),
        })
    }
}

/// Wall-clock time spent in each phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub load: Duration,
    pub diff: Duration,
    pub propagate: Duration,
    pub map: Duration,
}

impl PhaseTimings {
    pub fn total(&self) -> Duration {
        self.load + self.diff + self.propagate + self.map
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AffectedReport {
    pub diff: DiffResult,
    pub affected: AffectedSet,
    pub mapping: ModuleMapping,
    pub depth: u32,
    pub seed: SeedScope,
    pub old_components: usize,
    pub new_components: usize,
    #[serde(skip)]
    pub timings: PhaseTimings,
}

impl AffectedReport {
    /// Module paths to regenerate, sorted.
    pub fn modules(&self) -> &[String] {
        &self.mapping.modules
    }

    /// The three count lines printed after every run.
    pub fn summary_lines(&self) -> Vec<String> {
        let components = if self.diff.is_empty() {
            "Affected components: 0".to_string()
        } else {
            format!(
                "Affected components: {} (including {}-hop dependents)",
                self.affected.len(),
                self.depth
            )
        };
        vec![
            format!("Changes detected: {}", self.diff.summary()),
            components,
            format!("Affected modules: {}", self.mapping.modules.len()),
        ]
    }

    /// Per-kind listing of changed IDs, at most `limit` per kind.
    pub fn change_listing(&self, limit: usize) -> Vec<String> {
        let mut lines = Vec::new();
        let kinds = [
            ("Added", '+', &self.diff.added),
            ("Removed", '-', &self.diff.removed),
            ("Modified", '~', &self.diff.modified),
        ];
        for (label, marker, ids) in kinds {
            if ids.is_empty() {
                continue;
            }
            lines.push(format!("{label} components ({}):", ids.len()));
            for id in ids.iter().take(limit) {
                match self.diff.reason(id) {
                    Some(reason) => lines.push(format!("  {marker} {id} ({reason})")),
                    None => lines.push(format!("  {marker} {id}")),
                }
            }
            if ids.len() > limit {
                lines.push(format!("  ... and {} more", ids.len() - limit));
            }
        }
        lines
    }

    /// `"Traversal (N-hop): Found K dependent components"`, when K > 0.
    pub fn traversal_line(&self) -> Option<String> {
        let dependents = self.affected.dependent_count();
        (dependents > 0).then(|| {
            format!(
                "Traversal ({}-hop): Found {dependents} dependent components",
                self.depth
            )
        })
    }
}

/// Runs the affected-modules computation with fixed options.
#[derive(Debug, Clone, Default)]
pub struct AffectedPipeline {
    options: AffectedOptions,
}

impl AffectedPipeline {
    pub fn new(options: AffectedOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AffectedOptions {
        &self.options
    }

    /// Load the inputs and compute the report.
    ///
    /// The depth is checked before any file is read. The two snapshots are
    /// decoded in parallel; a failure in the old one is reported first.
    pub fn run(&self, inputs: &AffectedInputs) -> Result<AffectedReport> {
        self.options.bounds.check(self.options.depth)?;

        let threshold = self.options.large_file_warning_bytes;
        warn_if_large(&inputs.old_graph, "Old dependency graph", threshold);
        warn_if_large(&inputs.new_graph, "New dependency graph", threshold);
        warn_if_large(&inputs.module_tree, "Module tree", threshold);

        let start = Instant::now();
        let (old, new) = rayon::join(
            || load_graph(&inputs.old_graph),
            || load_graph(&inputs.new_graph),
        );
        let old = old?;
        let new = new?;
        let tree = ModuleTree::load(&inputs.module_tree)?;
        let load = start.elapsed();
        info!(
            old_components = old.len(),
            new_components = new.len(),
            modules = tree.module_paths().len(),
            duration = ?load,
            "Inputs loaded"
        );

        let mut report = self.run_on(&old, &new, &tree)?;
        report.timings.load = load;
        Ok(report)
    }

    /// Compute the report for snapshots already in memory.
    pub fn run_on(
        &self,
        old: &DependencyGraph,
        new: &DependencyGraph,
        tree: &ModuleTree,
    ) -> Result<AffectedReport> {
        let propagator = Propagator::new(self.options.bounds);
        propagator.bounds().check(self.options.depth)?;
        let mut timings = PhaseTimings::default();

        let start = Instant::now();
        let diff = GraphDiffer::new(self.options.policy).compare(old, new);
        timings.diff = start.elapsed();
        debug!(
            added = diff.added.len(),
            modified = diff.modified.len(),
            removed = diff.removed.len(),
            policy = %self.options.policy,
            duration = ?timings.diff,
            "Snapshots compared"
        );

        if diff.is_empty() {
            info!("No component changes detected");
            return Ok(AffectedReport {
                diff,
                affected: AffectedSet::default(),
                mapping: ModuleMapping::default(),
                depth: self.options.depth,
                seed: self.options.seed,
                old_components: old.len(),
                new_components: new.len(),
                timings,
            });
        }

        let seed = match self.options.seed {
            SeedScope::All => diff.all_changed(),
            SeedScope::Changed => diff.changed_components(),
        };

        let start = Instant::now();
        let index = ReverseDependencyIndex::build(new);
        let affected = propagator.propagate_with_index(seed, &index, self.options.depth)?;
        timings.propagate = start.elapsed();
        debug!(
            affected = affected.len(),
            dependents = affected.dependent_count(),
            max_hop = affected.max_hop(),
            duration = ?timings.propagate,
            "Propagation complete"
        );

        let start = Instant::now();
        let mapping = ModuleMapper::new(tree).map(affected.ids());
        timings.map = start.elapsed();
        if !mapping.unresolved.is_empty() {
            warn!(
                count = mapping.unresolved.len(),
                "Affected components could not be mapped to any module"
            );
        }
        debug!(
            modules = mapping.modules.len(),
            inferred = mapping.inferred.len(),
            duration = ?timings.map,
            "Components mapped to modules"
        );

        Ok(AffectedReport {
            diff,
            affected,
            mapping,
            depth: self.options.depth,
            seed: self.options.seed,
            old_components: old.len(),
            new_components: new.len(),
            timings,
        })
    }
}

fn warn_if_large(path: &Path, what: &str, threshold: u64) {
    if let Ok(meta) = std::fs::metadata(path) {
        if meta.len() > threshold {
            warn!(
                path = %path.display(),
                size_mb = meta.len() / (1024 * 1024),
                "{what} is large; loading may use significant memory"
            );
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use docdelta_graphs::{Component, GraphError};
    use serde_json::json;

    fn scenario() -> (DependencyGraph, DependencyGraph, ModuleTree) {
        let old: DependencyGraph = [("A", Component::with_source("def f(): pass"))]
            .into_iter()
            .collect();
        let new: DependencyGraph = [
            ("A", Component::with_source("def f(): return 1")),
            ("B", Component::with_source("x").depending_on(["A"])),
        ]
        .into_iter()
        .collect();
        let tree = serde_json::from_value(json!({ "m": { "components": ["A", "B"] } })).unwrap();
        (old, new, tree)
    }

    fn options(depth: u32) -> AffectedOptions {
        AffectedOptions {
            depth,
            ..AffectedOptions::default()
        }
    }

    #[test]
    fn end_to_end_in_memory() {
        let (old, new, tree) = scenario();
        let report = AffectedPipeline::new(options(1))
            .run_on(&old, &new, &tree)
            .unwrap();

        assert_eq!(report.diff.modified.iter().collect::<Vec<_>>(), ["A"]);
        assert_eq!(report.diff.added.iter().collect::<Vec<_>>(), ["B"]);
        assert_eq!(report.affected.ids().collect::<Vec<_>>(), ["A", "B"]);
        assert_eq!(report.modules(), ["m"]);
        insta::assert_snapshot!(report.summary_lines().join("\n"), @r"
        Changes detected: 1 added, 1 modified, 0 removed
        Affected components: 2 (including 1-hop dependents)
        Affected modules: 1
        ");
    }

    #[test]
    fn identical_snapshots_report_nothing() {
        let (_, new, tree) = scenario();
        let report = AffectedPipeline::default().run_on(&new, &new, &tree).unwrap();
        assert!(report.modules().is_empty());
        assert!(report.affected.is_empty());
        assert!(report.traversal_line().is_none());
        insta::assert_snapshot!(report.summary_lines().join("\n"), @r"
        Changes detected: 0 added, 0 modified, 0 removed
        Affected components: 0
        Affected modules: 0
        ");
    }

    #[test]
    fn changed_seed_skips_removed_components() {
        let old: DependencyGraph = [
            ("gone", Component::with_source("old")),
            ("keep", Component::with_source("same")),
        ]
        .into_iter()
        .collect();
        let new: DependencyGraph = [("keep", Component::with_source("same").depending_on(["gone"]))]
            .into_iter()
            .collect();
        let tree = serde_json::from_value(json!({
            "a": { "components": ["gone"] },
            "b": { "components": ["keep"] }
        }))
        .unwrap();

        let all = AffectedPipeline::new(options(1)).run_on(&old, &new, &tree).unwrap();
        assert_eq!(all.modules(), ["a", "b"]);

        let changed = AffectedPipeline::new(AffectedOptions {
            seed: SeedScope::Changed,
            policy: ModificationPolicy::Source,
            ..options(1)
        })
        .run_on(&old, &new, &tree)
        .unwrap();
        assert!(changed.affected.is_empty());
        assert!(changed.modules().is_empty());
        assert_eq!(changed.diff.removed.len(), 1);
    }

    #[test]
    fn invalid_depth_fails_before_work() {
        let (old, new, tree) = scenario();
        let err = AffectedPipeline::new(options(0))
            .run_on(&old, &new, &tree)
            .unwrap_err();
        assert!(matches!(
            err.as_graph_error(),
            Some(GraphError::InvalidParameter { .. })
        ));

        let inputs = AffectedInputs {
            old_graph: "/nonexistent/old.json".into(),
            new_graph: "/nonexistent/new.json".into(),
            module_tree: "/nonexistent/tree.json".into(),
        };
        let err = AffectedPipeline::new(options(21)).run(&inputs).unwrap_err();
        assert!(err.to_string().contains("at most 20"), "{err}");
    }

    fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        path
    }

    #[test]
    fn run_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let (old, new, tree) = scenario();
        let inputs = AffectedInputs {
            old_graph: write_json(dir.path(), "old.json", &old),
            new_graph: write_json(dir.path(), "new.json", &new),
            module_tree: write_json(dir.path(), "tree.json", &tree),
        };

        let report = AffectedPipeline::new(options(1)).run(&inputs).unwrap();
        assert_eq!(report.modules(), ["m"]);
        assert_eq!(report.old_components, 1);
        assert_eq!(report.new_components, 2);
        assert!(report.timings.total() >= report.timings.load);
    }

    #[test]
    fn missing_old_graph_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = AffectedInputs {
            old_graph: dir.path().join("old.json"),
            new_graph: dir.path().join("new.json"),
            module_tree: dir.path().join("tree.json"),
        };
        let err = AffectedPipeline::default().run(&inputs).unwrap_err();
        assert!(matches!(err.as_graph_error(), Some(GraphError::NotFound { .. })));
        assert!(err.to_string().contains("old.json"), "{err}");
    }

    #[test]
    fn change_listing_truncates() {
        let old = DependencyGraph::new();
        let new: DependencyGraph = (0..12)
            .map(|i| (format!("c{i:02}"), Component::with_source("x")))
            .collect();
        let report = AffectedPipeline::default()
            .run_on(&old, &new, &ModuleTree::new())
            .unwrap();
        let listing = report.change_listing(SAMPLE_LIMIT);
        assert_eq!(listing.first().map(String::as_str), Some("Added components (12):"));
        assert_eq!(listing.last().map(String::as_str), Some("  ... and 2 more"));
        assert_eq!(listing.len(), 12);
    }

    #[test]
    fn change_listing_shows_reasons() {
        let (old, new, tree) = scenario();
        let report = AffectedPipeline::new(options(1))
            .run_on(&old, &new, &tree)
            .unwrap();
        insta::assert_snapshot!(report.change_listing(SAMPLE_LIMIT).join("\n"), @r"
        Added components (1):
          + B
        Modified components (1):
          ~ A (source)
        ");
        assert!(report.traversal_line().is_none());
    }

    #[test]
    fn traversal_line_counts_dependents() {
        let old: DependencyGraph = [
            ("core", Component::with_source("v1")),
            ("mid", Component::with_source("m").depending_on(["core"])),
            ("top", Component::with_source("t").depending_on(["mid"])),
        ]
        .into_iter()
        .collect();
        let mut new_entries: Vec<(&str, Component)> = old
            .iter()
            .map(|(id, c)| (id, c.clone()))
            .collect();
        new_entries[0].1 = Component::with_source("v2");
        let new: DependencyGraph = new_entries.into_iter().collect();

        let report = AffectedPipeline::new(options(2))
            .run_on(&old, &new, &ModuleTree::new())
            .unwrap();
        assert_eq!(report.affected.len(), 3);
        assert_eq!(
            report.traversal_line().as_deref(),
            Some("Traversal (2-hop): Found 2 dependent components")
        );
        assert_eq!(report.mapping.unresolved.len(), 3);
    }
}
