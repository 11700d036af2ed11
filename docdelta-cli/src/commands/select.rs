use std::collections::BTreeSet;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::warn;

use docdelta_core::{ModuleTree, SelectionPlan, SubModuleSpecs, parse_module_list};

use super::GlobalOpts;

#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Path to the module tree (.json or .json.gz)
    #[arg(long, required_unless_present = "sub_modules", conflicts_with = "sub_modules")]
    pub module_tree: Option<PathBuf>,
    /// Sub-module declarations (name → components map, or list of entries) used as a one-level tree
    #[arg(long)]
    pub sub_modules: Option<PathBuf>,
    /// Comma-separated module paths to regenerate
    #[arg(long, conflicts_with = "modules_file")]
    pub modules: Option<String>,
    /// File holding the module list (JSON array, or comma/newline separated); `-` reads stdin
    #[arg(long)]
    pub modules_file: Option<PathBuf>,
}

pub fn run(args: SelectArgs, globals: &GlobalOpts) -> anyhow::Result<()> {
    let tree = load_tree(&args)?;

    let filters = match (&args.modules, &args.modules_file) {
        (Some(list), _) => parse_module_list(list),
        (None, Some(path)) => read_module_file(path)?,
        (None, None) => Vec::new(),
    };

    let plan = SelectionPlan::build(&tree, &filters);
    let known: BTreeSet<&str> = plan.decisions.iter().map(|d| d.path.as_str()).collect();
    for pattern in &filters {
        if !known.contains(pattern.as_str()) {
            warn!(module = %pattern, "Module not present in module tree");
        }
    }

    if globals.verbose > 0 {
        for decision in &plan.decisions {
            let mark = if decision.selection.included { '+' } else { '-' };
            eprintln!("  [{mark}] {} ({})", decision.path, decision.selection.reason);
        }
    }

    let included = plan.included();
    let json = serde_json::to_string(&included).context("Cannot serialize module list")?;
    println!("{json}");

    if !globals.quiet {
        eprintln!(
            "Modules selected: {} of {}",
            included.len(),
            plan.decisions.len()
        );
        if !plan.required_parents.is_empty() {
            let parents: Vec<&str> = plan.required_parents.iter().map(String::as_str).collect();
            eprintln!("Required parent overviews: {}", parents.join(", "));
        }
    }
    Ok(())
}

fn load_tree(args: &SelectArgs) -> anyhow::Result<ModuleTree> {
    match (&args.module_tree, &args.sub_modules) {
        (Some(path), _) => {
            let tree = ModuleTree::load(path)
                .with_context(|| format!("Cannot load module tree: {}", path.display()))?;
            tree.validate()
                .with_context(|| format!("Cannot use module tree: {}", path.display()))?;
            Ok(tree)
        }
        (None, Some(path)) => Ok(SubModuleSpecs::load(path)
            .with_context(|| format!("Cannot load sub-module specs: {}", path.display()))?
            .into_tree()),
        (None, None) => anyhow::bail!("Please specify --module-tree or --sub-modules"),
    }
}

fn read_module_file(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Cannot read module list from stdin")?;
        buf
    } else if !path.is_file() {
        anyhow::bail!("Module list not found: {}", path.display());
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read module list: {}", path.display()))?
    };
    parse_module_text(&text, path)
}

/// A JSON array of strings (the output of `affected`), or a plain list
/// separated by commas or newlines.
fn parse_module_text(text: &str, origin: &Path) -> anyhow::Result<Vec<String>> {
    let trimmed = text.trim();
    if trimmed.starts_with('[') {
        let modules: Vec<String> = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid JSON in module list: {}", origin.display()))?;
        return Ok(modules
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect());
    }
    Ok(parse_module_list(&trimmed.replace('\n', ",")))
}

// ── Tests ─────────────────────────────────────────────────────────────
