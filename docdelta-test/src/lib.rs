// Integration test utilities and fixture management for docdelta.

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::{Value, json};

use docdelta_core::{AffectedInputs, AffectedOptions, AffectedPipeline, AffectedReport};

pub const GRAPH_FILE: &str = "dependency_graph.json";
pub const MODULE_TREE_FILE: &str = "module_tree.json";

/// Two snapshot directories in a temp dir: `v1/` (old) and `v2/` (new,
/// also holding the module tree).
#[derive(Debug)]
pub struct Snapshots {
    pub dir: tempfile::TempDir,
}

impl Default for Snapshots {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshots {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        std::fs::create_dir_all(dir.path().join("v1")).unwrap();
        std::fs::create_dir_all(dir.path().join("v2")).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn old_dir(&self) -> PathBuf {
        self.path().join("v1")
    }

    pub fn new_dir(&self) -> PathBuf {
        self.path().join("v2")
    }

    pub fn write_old(&self, graph: &Value) -> &Self {
        write_json(&self.old_dir().join(GRAPH_FILE), graph);
        self
    }

    pub fn write_new(&self, graph: &Value) -> &Self {
        write_json(&self.new_dir().join(GRAPH_FILE), graph);
        self
    }

    pub fn write_tree(&self, tree: &Value) -> &Self {
        write_json(&self.new_dir().join(MODULE_TREE_FILE), tree);
        self
    }

    /// Replace the old snapshot with a gzip-compressed copy.
    pub fn compress_old(&self) -> &Self {
        let plain = self.old_dir().join(GRAPH_FILE);
        let value: Value =
            serde_json::from_str(&std::fs::read_to_string(&plain).unwrap()).unwrap();
        write_gzip_json(&self.old_dir().join(format!("{GRAPH_FILE}.gz")), &value);
        std::fs::remove_file(plain).unwrap();
        self
    }

    /// Inputs at the conventional file names.
    pub fn inputs(&self) -> AffectedInputs {
        AffectedInputs {
            old_graph: self.old_dir().join(GRAPH_FILE),
            new_graph: self.new_dir().join(GRAPH_FILE),
            module_tree: self.new_dir().join(MODULE_TREE_FILE),
        }
    }

    /// Run the pipeline at `depth` with otherwise default options.
    pub fn affected(&self, depth: u32) -> AffectedReport {
        self.affected_with(AffectedOptions {
            depth,
            ..AffectedOptions::default()
        })
    }

    pub fn affected_with(&self, options: AffectedOptions) -> AffectedReport {
        AffectedPipeline::new(options)
            .run(&self.inputs())
            .expect("pipeline run")
    }

    /// One modified and one added component in a single module.
    pub fn minimal() -> Self {
        let snapshots = Self::new();
        snapshots
            .write_old(&json!({
                "A": { "source_code": "def f(): pass", "depends_on": [] }
            }))
            .write_new(&json!({
                "A": { "source_code": "def f(): return 1", "depends_on": [] },
                "B": { "source_code": "x", "depends_on": ["A"] }
            }))
            .write_tree(&json!({ "m": { "components": ["A", "B"] } }));
        snapshots
    }

    /// A small layered project where `utils.helper` changes.
    ///
    /// `backend.auth.Session.check` → `backend.auth.login` → `utils.helper`,
    /// and `backend.api.routes` → `backend.auth.Session.check`.
    pub fn layered() -> Self {
        let old = layered_graph("def helper():\n    return 1\n");
        let new = layered_graph("def helper():\n    return 2\n");
        let snapshots = Self::new();
        snapshots
            .write_old(&old)
            .write_new(&new)
            .write_tree(&json!({
                "backend": {
                    "components": [],
                    "children": {
                        "auth": {
                            "components": ["backend.auth.login", "backend.auth.Session.check"]
                        },
                        "api": { "components": ["backend.api.routes"] }
                    }
                },
                "utils": { "components": ["utils.helper"] },
                "docs": { "components": ["docs.readme"] }
            }));
        snapshots
    }
}

fn layered_graph(helper_source: &str) -> Value {
    json!({
        "utils.helper": {
            "source_code": helper_source,
            "depends_on": [],
            "file_path": "utils/helper.py"
        },
        "backend.auth.login": {
            "source_code": "def login():\n    return helper()\n",
            "depends_on": ["utils.helper"],
            "file_path": "backend/auth.py"
        },
        "backend.auth.Session.check": {
            "source_code": "def check(self):\n    return login()\n",
            "depends_on": ["backend.auth.login"],
            "file_path": "backend/auth.py"
        },
        "backend.api.routes": {
            "source_code": "def routes():\n    return Session().check()\n",
            "depends_on": ["backend.auth.Session.check"],
            "file_path": "backend/api.py"
        },
        "docs.readme": {
            "source_code": "README",
            "depends_on": []
        }
    })
}

pub fn write_json(path: &Path, value: &Value) {
    std::fs::write(path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
}

pub fn write_gzip_json(path: &Path, value: &Value) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(&serde_json::to_vec(value).unwrap())
        .unwrap();
    encoder.finish().unwrap();
}
