use serde_json::json;

use docdelta_core::{AffectedOptions, ModuleTree, SeedScope, SelectionPlan};
use docdelta_graphs::{GraphError, ModificationPolicy};
use docdelta_test::Snapshots;

// ── Minimal Fixture ───────────────────────────────────────────────────

#[test]
fn minimal_change_maps_to_module() {
    let snapshots = Snapshots::minimal();
    let report = snapshots.affected(1);

    assert_eq!(report.diff.modified.iter().collect::<Vec<_>>(), ["A"]);
    assert_eq!(report.diff.added.iter().collect::<Vec<_>>(), ["B"]);
    assert!(report.diff.removed.is_empty());
    assert_eq!(report.affected.ids().collect::<Vec<_>>(), ["A", "B"]);
    assert_eq!(report.modules(), ["m"]);
}

#[test]
fn minimal_change_from_gzip_snapshot() {
    let snapshots = Snapshots::minimal();
    snapshots.compress_old();
    let mut inputs = snapshots.inputs();
    inputs.old_graph.set_extension("json.gz");

    let report = docdelta_core::AffectedPipeline::new(AffectedOptions::default())
        .run(&inputs)
        .unwrap();
    assert_eq!(report.modules(), ["m"]);
}

#[test]
fn identical_snapshots_produce_no_modules() {
    let snapshots = Snapshots::minimal();
    let new = std::fs::read_to_string(snapshots.inputs().new_graph).unwrap();
    std::fs::write(snapshots.inputs().old_graph, new).unwrap();

    let report = snapshots.affected(2);
    assert!(report.diff.is_empty());
    assert!(report.modules().is_empty());
}

#[test]
fn whitespace_only_edit_is_not_a_change() {
    let snapshots = Snapshots::new();
    snapshots
        .write_old(&json!({ "A": { "source_code": "def f():\n\tpass\n" } }))
        .write_new(&json!({ "A": { "source_code": "def f():\r\n\tpass   \r\n\r\n\r\n" } }))
        .write_tree(&json!({ "m": { "components": ["A"] } }));

    let report = snapshots.affected(1);
    assert!(report.diff.is_empty(), "{:?}", report.diff);
}

// ── Layered Fixture ───────────────────────────────────────────────────

#[test]
fn layered_change_respects_depth() {
    let snapshots = Snapshots::layered();

    let one_hop = snapshots.affected(1);
    assert_eq!(one_hop.modules(), ["backend/auth", "utils"]);
    assert_eq!(one_hop.affected.hop("backend.auth.login"), Some(1));
    assert!(!one_hop.affected.contains("backend.auth.Session.check"));

    let three_hops = snapshots.affected(3);
    assert_eq!(
        three_hops.modules(),
        ["backend/api", "backend/auth", "utils"]
    );
    assert_eq!(three_hops.affected.hop("backend.api.routes"), Some(3));
    assert!(!three_hops.affected.contains("docs.readme"));
}

#[test]
fn layered_modules_feed_selective_rebuild() {
    let snapshots = Snapshots::layered();
    let report = snapshots.affected(1);
    let tree = ModuleTree::load(&snapshots.inputs().module_tree).unwrap();

    let plan = SelectionPlan::build(&tree, report.modules());
    assert_eq!(plan.included(), ["backend/auth", "backend", "utils"]);
    assert!(plan.required_parents.contains("backend"));
    assert_eq!(plan.excluded_count(), 2);
}

#[test]
fn removed_component_seeds_its_dependents() {
    let snapshots = Snapshots::new();
    snapshots
        .write_old(&json!({
            "lib.parse": { "source_code": "def parse(): ..." },
            "app.main": { "source_code": "def main(): parse()", "depends_on": ["lib.parse"] }
        }))
        .write_new(&json!({
            "app.main": { "source_code": "def main(): parse()", "depends_on": ["lib.parse"] }
        }))
        .write_tree(&json!({
            "lib": { "components": ["lib.parse"] },
            "app": { "components": ["app.main"] }
        }));

    let all = snapshots.affected(1);
    assert_eq!(all.diff.removed.iter().collect::<Vec<_>>(), ["lib.parse"]);
    assert_eq!(all.modules(), ["app", "lib"]);

    let changed_only = snapshots.affected_with(AffectedOptions {
        depth: 1,
        seed: SeedScope::Changed,
        ..AffectedOptions::default()
    });
    assert!(changed_only.modules().is_empty());
}

#[test]
fn dependency_only_change_depends_on_policy() {
    let snapshots = Snapshots::new();
    snapshots
        .write_old(&json!({ "a.run": { "source_code": "run()", "depends_on": ["a.x"] } }))
        .write_new(&json!({ "a.run": { "source_code": "run()", "depends_on": ["a.y"] } }))
        .write_tree(&json!({ "a": { "components": ["a.run"] } }));

    let structural = snapshots.affected(1);
    assert_eq!(structural.modules(), ["a"]);

    let source_only = snapshots.affected_with(AffectedOptions {
        depth: 1,
        policy: ModificationPolicy::Source,
        ..AffectedOptions::default()
    });
    assert!(source_only.diff.is_empty());
}

#[test]
fn cycle_terminates() {
    let snapshots = Snapshots::new();
    let graph = |src: &str| {
        json!({
            "pkg.a": { "source_code": src, "depends_on": ["pkg.b"] },
            "pkg.b": { "source_code": "b", "depends_on": ["pkg.c"] },
            "pkg.c": { "source_code": "c", "depends_on": ["pkg.a"] }
        })
    };
    snapshots
        .write_old(&graph("a1"))
        .write_new(&graph("a2"))
        .write_tree(&json!({ "pkg": { "components": ["pkg.a", "pkg.b", "pkg.c"] } }));

    let report = snapshots.affected(10);
    assert_eq!(report.affected.len(), 3);
    assert_eq!(report.modules(), ["pkg"]);
}

#[test]
fn components_missing_from_tree_are_inferred() {
    let snapshots = Snapshots::new();
    snapshots
        .write_old(&json!({}))
        .write_new(&json!({
            "services/billing/invoice.Invoice.total": { "source_code": "..." },
            "standalone": { "source_code": "..." }
        }))
        .write_tree(&json!({}));

    let report = snapshots.affected(1);
    assert_eq!(report.modules(), ["services/billing"]);
    assert!(report.mapping.unresolved.contains("standalone"));
}

// ── Failure Cases ─────────────────────────────────────────────────────

#[test]
fn missing_module_tree_is_not_found() {
    let snapshots = Snapshots::new();
    snapshots
        .write_old(&json!({}))
        .write_new(&json!({}));

    let err = docdelta_core::AffectedPipeline::default()
        .run(&snapshots.inputs())
        .unwrap_err();
    assert!(matches!(err.as_graph_error(), Some(GraphError::NotFound { .. })));
    assert!(err.to_string().contains("Module tree"), "{err}");
}

#[test]
fn truncated_archive_is_corrupt() {
    let snapshots = Snapshots::minimal();
    snapshots.compress_old();
    let mut inputs = snapshots.inputs();
    inputs.old_graph.set_extension("json.gz");
    let bytes = std::fs::read(&inputs.old_graph).unwrap();
    std::fs::write(&inputs.old_graph, &bytes[..bytes.len() / 2]).unwrap();

    let err = docdelta_core::AffectedPipeline::default()
        .run(&inputs)
        .unwrap_err();
    assert!(
        matches!(err.as_graph_error(), Some(GraphError::CorruptArchive { .. })),
        "{err}"
    );
}

#[test]
fn non_object_graph_is_schema_violation() {
    let snapshots = Snapshots::minimal();
    std::fs::write(snapshots.inputs().old_graph, "[\"A\"]").unwrap();

    let err = docdelta_core::AffectedPipeline::default()
        .run(&snapshots.inputs())
        .unwrap_err();
    assert!(matches!(
        err.as_graph_error(),
        Some(GraphError::SchemaViolation { .. })
    ));
    assert!(err.to_string().contains("must be a JSON object"), "{err}");
}
