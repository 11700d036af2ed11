// Module tree model and component-to-module mapping.
//
// A module path is the `/`-joined list of names from the root to a node.
// Traversals carry an explicit stack of path segments and never mutate the
// tree. Map ordering is by module name, so every listing is deterministic.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use docdelta_graphs::{ComponentId, GraphError, read_document, read_value};

use crate::error::{DeltaError, Result};

/// Hierarchical grouping of components, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleTree {
    modules: BTreeMap<String, ModuleNode>,
}

/// One module: the components it owns and its sub-modules.
///
/// `components` stays `None` when the key is absent from the document so
/// that [`ModuleTree::validate`] can tell a missing list from an empty one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    components: Option<Vec<ComponentId>>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "ModuleTree::is_empty"
    )]
    children: ModuleTree,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<ModuleTree, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ModuleTree>::deserialize(deserializer)?.unwrap_or_default())
}

impl ModuleNode {
    pub fn with_components<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentId>,
    {
        Self {
            components: Some(components.into_iter().map(Into::into).collect()),
            children: ModuleTree::default(),
        }
    }

    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, child: ModuleNode) -> Self {
        self.children.modules.insert(name.into(), child);
        self
    }

    pub fn components(&self) -> &[ComponentId] {
        self.components.as_deref().unwrap_or_default()
    }

    pub fn children(&self) -> &ModuleTree {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, ModuleNode)> for ModuleTree {
    fn from_iter<T: IntoIterator<Item = (S, ModuleNode)>>(iter: T) -> Self {
        Self {
            modules: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl ModuleTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a module tree file (plain JSON or `.gz`).
    ///
    /// Unknown keys are ignored and missing fields default to empty. Use
    /// [`ModuleTree::validate`] for the stricter shape check.
    pub fn load(path: &Path) -> Result<Self> {
        let document = read_document(path, "Module tree")?;
        Self::from_document(document).map_err(|e| {
            DeltaError::Graph(GraphError::SchemaViolation {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })
    }

    pub fn from_document(document: Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(document))
    }

    /// Number of top-level modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleNode)> {
        self.modules.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Look up a node by its `/`-joined path.
    pub fn node(&self, path: &str) -> Option<&ModuleNode> {
        let mut segments = path.split('/');
        let first = segments.next()?;
        let mut node = self.modules.get(first)?;
        for segment in segments {
            node = node.children.modules.get(segment)?;
        }
        Some(node)
    }

    /// Every module path, parents before their children.
    pub fn module_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        walk(self, &mut Vec::new(), Order::ParentsFirst, &mut |path, _| {
            paths.push(path.join("/"));
        });
        paths
    }

    /// Every module path, children before their parents, so that a parent's
    /// overview can be written after all of its sub-modules.
    pub fn processing_order(&self) -> Vec<String> {
        let mut paths = Vec::new();
        walk(self, &mut Vec::new(), Order::ChildrenFirst, &mut |path, _| {
            paths.push(path.join("/"));
        });
        paths
    }

    /// Require every node to carry a `components` key.
    pub fn validate(&self) -> Result<()> {
        let mut missing = None;
        walk(self, &mut Vec::new(), Order::ParentsFirst, &mut |path, node| {
            if missing.is_none() && node.components.is_none() {
                missing = Some(path.join("/"));
            }
        });
        match missing {
            Some(module) => Err(DeltaError::ModuleTree {
                module,
                message: "node has no \"components\" key".to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Order {
    ParentsFirst,
    ChildrenFirst,
}

fn walk<'t, F>(tree: &'t ModuleTree, stack: &mut Vec<&'t str>, order: Order, visit: &mut F)
where
    F: FnMut(&[&'t str], &'t ModuleNode),
{
    for (name, node) in &tree.modules {
        stack.push(name);
        if order == Order::ParentsFirst {
            visit(stack.as_slice(), node);
        }
        walk(&node.children, stack, order, visit);
        if order == Order::ChildrenFirst {
            visit(stack.as_slice(), node);
        }
        stack.pop();
    }
}

// ── Mapping ───────────────────────────────────────────────────────────

/// Result of mapping a component set onto a module tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModuleMapping {
    /// Sorted, duplicate-free module paths.
    pub modules: Vec<String>,
    /// Components absent from the tree, with the path guessed from their ID.
    pub inferred: BTreeMap<ComponentId, String>,
    /// Components absent from the tree whose ID shape gave no module.
    pub unresolved: BTreeSet<ComponentId>,
}

/// Resolves component IDs to the module paths that own them.
#[derive(Debug, Clone)]
pub struct ModuleMapper<'t> {
    owners: HashMap<&'t str, Vec<String>>,
}

impl<'t> ModuleMapper<'t> {
    pub fn new(tree: &'t ModuleTree) -> Self {
        let mut owners: HashMap<&'t str, Vec<String>> = HashMap::new();
        walk(tree, &mut Vec::new(), Order::ParentsFirst, &mut |path, node| {
            let joined = path.join("/");
            for id in node.components() {
                owners.entry(id.as_str()).or_default().push(joined.clone());
            }
        });
        Self { owners }
    }

    pub fn map<I, S>(&self, components: I) -> ModuleMapping
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut modules = BTreeSet::new();
        let mut inferred = BTreeMap::new();
        let mut unresolved = BTreeSet::new();

        for id in components {
            let id = id.as_ref();
            if let Some(paths) = self.owners.get(id) {
                modules.extend(paths.iter().cloned());
                continue;
            }
            match infer_module_path(id) {
                Some(path) => {
                    modules.insert(path.clone());
                    inferred.insert(id.to_string(), path);
                }
                None => {
                    unresolved.insert(id.to_string());
                }
            }
        }

        ModuleMapping {
            modules: modules.into_iter().collect(),
            inferred,
            unresolved,
        }
    }
}

/// Sorted, duplicate-free module paths for `components`.
pub fn map_components_to_modules<I, S>(components: I, tree: &ModuleTree) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ModuleMapper::new(tree).map(components).modules
}

/// Guess a module path from the shape of a component ID.
///
/// - `some/path/file.Class.method` → `some/path`
/// - `module.ClassA.method1` → `module`
/// - `pkg.Widget` → `pkg`
/// - `backend.auth.login` → `backend/auth`
///
/// IDs with a single segment give `None`. Naming that does not follow the
/// leading-uppercase class convention will map to the wrong module.
pub fn infer_module_path(id: &str) -> Option<String> {
    if let Some((dir, _file)) = id.rsplit_once('/') {
        let dir = dir.trim_matches('/');
        return (!dir.is_empty()).then(|| dir.to_string());
    }

    let segments: Vec<&str> = id.split('.').filter(|s| !s.is_empty()).collect();
    let n = segments.len();
    if n < 2 {
        return None;
    }
    // `Class.method` suffix, else a trailing `Class` or function.
    let keep = if starts_uppercase(segments[n - 2]) {
        n - 2
    } else {
        n - 1
    };
    (keep > 0).then(|| segments[..keep].join("/"))
}

fn starts_uppercase(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

// ── Sub-module specs ──────────────────────────────────────────────────

/// Sub-module declarations as produced by a clustering step, in either of
/// the two shapes seen in practice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SubModuleSpecs {
    /// `{"name": ["id", ...]}`
    Map(BTreeMap<String, ComponentList>),
    /// `[{"name": "...", "components": [...]}, ...]`, with alternate key names.
    List(Vec<Value>),
}

/// A component list that may also arrive as a single scalar.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ComponentList {
    Many(Vec<ComponentId>),
    One(ComponentId),
}

impl ComponentList {
    fn into_vec(self) -> Vec<ComponentId> {
        match self {
            Self::Many(ids) => ids,
            Self::One(id) => vec![id],
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Many(ids) => ids.is_empty(),
            Self::One(id) => id.is_empty(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SubModuleEntry {
    name: Option<String>,
    module_name: Option<String>,
    sub_module_name: Option<String>,
    submodule_name: Option<String>,
    components: Option<ComponentList>,
    core_components: Option<ComponentList>,
    core_component_ids: Option<ComponentList>,
    files: Option<ComponentList>,
}

impl SubModuleEntry {
    fn into_pair(self) -> Option<(String, Vec<ComponentId>)> {
        let name = [
            self.name,
            self.module_name,
            self.sub_module_name,
            self.submodule_name,
        ]
        .into_iter()
        .flatten()
        .find(|n| !n.is_empty())?;
        let components = [
            self.components,
            self.core_components,
            self.core_component_ids,
            self.files,
        ]
        .into_iter()
        .flatten()
        .find(|c| !c.is_empty())
        .map(ComponentList::into_vec)
        .unwrap_or_default();
        Some((name, components))
    }
}

impl SubModuleSpecs {
    /// Read sub-module declarations in either shape (plain JSON or `.gz`).
    pub fn load(path: &Path) -> Result<Self> {
        let value = read_value(path, "Sub-module specs")?;
        serde_json::from_value(value).map_err(|_| {
            DeltaError::Graph(GraphError::SchemaViolation {
                path: path.display().to_string(),
                message: "Sub-module specs must be a JSON object or array of entries"
                    .to_string(),
            })
        })
    }

    /// Collapse either shape into `name → component IDs`.
    ///
    /// List entries that are not objects, or carry no usable name, are
    /// dropped. The first non-empty component key wins.
    pub fn normalize(self) -> BTreeMap<String, Vec<ComponentId>> {
        match self {
            Self::Map(map) => map
                .into_iter()
                .map(|(name, list)| (name, list.into_vec()))
                .collect(),
            Self::List(items) => items
                .into_iter()
                .filter_map(|item| serde_json::from_value::<SubModuleEntry>(item).ok())
                .filter_map(SubModuleEntry::into_pair)
                .collect(),
        }
    }

    /// One-level module tree with a leaf per sub-module.
    pub fn into_tree(self) -> ModuleTree {
        self.normalize()
            .into_iter()
            .map(|(name, ids)| (name, ModuleNode::with_components(ids)))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
