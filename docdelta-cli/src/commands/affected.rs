use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tracing::info;

use docdelta_core::config::{DeltaConfig, LayoutSection, SeedScope};
use docdelta_core::pipeline::SAMPLE_LIMIT;
use docdelta_core::{AffectedInputs, AffectedOptions, AffectedPipeline, AffectedReport};
use docdelta_graphs::ModificationPolicy;

use super::GlobalOpts;

#[derive(Args, Debug, Default)]
pub struct AffectedArgs {
    /// Path to the old dependency graph (.json or .json.gz)
    #[arg(long)]
    pub old_graph: Option<PathBuf>,
    /// Path to the new dependency graph (.json or .json.gz)
    #[arg(long)]
    pub new_graph: Option<PathBuf>,
    /// Path to the module tree (required with explicit paths)
    #[arg(long)]
    pub module_tree: Option<PathBuf>,
    /// Directory containing the old dependency graph
    #[arg(long)]
    pub old_dir: Option<PathBuf>,
    /// Directory containing the new dependency graph and module tree
    #[arg(long)]
    pub new_dir: Option<PathBuf>,
    /// Dependency traversal depth in hops (default: from config, 2)
    #[arg(long, allow_negative_numbers = true)]
    pub depth: Option<i64>,
    /// Which changes seed the traversal
    #[arg(long, value_parser = ["all", "changed"])]
    pub seed: Option<String>,
    /// What counts as a modification
    #[arg(long, value_parser = ["source", "structural", "strict"])]
    pub policy: Option<String>,
}

/// Where the three inputs come from.
#[derive(Debug, Clone, PartialEq, Eq)]
enum InputSource {
    Explicit {
        old_graph: PathBuf,
        new_graph: PathBuf,
        module_tree: PathBuf,
    },
    Directory {
        old_dir: PathBuf,
        new_dir: PathBuf,
        module_tree: Option<PathBuf>,
    },
}

impl InputSource {
    fn from_args(args: &AffectedArgs) -> anyhow::Result<Self> {
        let has_explicit = args.old_graph.is_some() || args.new_graph.is_some();
        let has_directory = args.old_dir.is_some() || args.new_dir.is_some();

        if has_explicit && has_directory {
            anyhow::bail!(
                "Cannot use both explicit paths (--old-graph, --new-graph) \
                 and directory mode (--old-dir, --new-dir)"
            );
        }

        if has_explicit {
            let Some(old_graph) = args.old_graph.clone() else {
                anyhow::bail!("--old-graph is required when using explicit paths");
            };
            let Some(new_graph) = args.new_graph.clone() else {
                anyhow::bail!("--new-graph is required when using explicit paths");
            };
            let Some(module_tree) = args.module_tree.clone() else {
                anyhow::bail!("--module-tree is required when using explicit paths");
            };
            return Ok(Self::Explicit {
                old_graph,
                new_graph,
                module_tree,
            });
        }

        if has_directory {
            let Some(old_dir) = args.old_dir.clone() else {
                anyhow::bail!("--old-dir is required when using directory mode");
            };
            let Some(new_dir) = args.new_dir.clone() else {
                anyhow::bail!("--new-dir is required when using directory mode");
            };
            return Ok(Self::Directory {
                old_dir,
                new_dir,
                module_tree: args.module_tree.clone(),
            });
        }

        anyhow::bail!(
            "Please specify either:\n  \
             --old-graph PATH --new-graph PATH --module-tree PATH\n\
             or:\n  \
             --old-dir PATH --new-dir PATH"
        )
    }

    /// Directory mode takes file names from `layout`, preferring the plain
    /// file and falling back to a `.gz` sibling.
    fn resolve(self, layout: &LayoutSection) -> AffectedInputs {
        match self {
            Self::Explicit {
                old_graph,
                new_graph,
                module_tree,
            } => AffectedInputs {
                old_graph,
                new_graph,
                module_tree,
            },
            Self::Directory {
                old_dir,
                new_dir,
                module_tree,
            } => AffectedInputs {
                old_graph: snapshot_file(&old_dir, &layout.graph_file),
                new_graph: snapshot_file(&new_dir, &layout.graph_file),
                module_tree: module_tree
                    .unwrap_or_else(|| snapshot_file(&new_dir, &layout.module_tree_file)),
            },
        }
    }
}

fn snapshot_file(dir: &Path, name: &str) -> PathBuf {
    let plain = dir.join(name);
    if plain.exists() {
        return plain;
    }
    let compressed = dir.join(format!("{name}.gz"));
    if compressed.is_file() { compressed } else { plain }
}

fn options(args: &AffectedArgs, config: &DeltaConfig) -> anyhow::Result<AffectedOptions> {
    let mut options =
        AffectedOptions::from_config(config).context("Invalid config: propagation bounds")?;
    if let Some(depth) = args.depth {
        options.depth = options.bounds.accept(depth)?;
    }
    if let Some(seed) = &args.seed {
        options.seed = seed.parse::<SeedScope>().map_err(anyhow::Error::msg)?;
    }
    if let Some(policy) = &args.policy {
        options.policy = policy
            .parse::<ModificationPolicy>()
            .map_err(anyhow::Error::msg)?;
    }
    Ok(options)
}

pub fn run(args: AffectedArgs, config: &DeltaConfig, globals: &GlobalOpts) -> anyhow::Result<()> {
    let inputs = InputSource::from_args(&args)?.resolve(&config.layout);
    let options = options(&args, config)?;
    let verbose = globals.verbose > 0;

    if verbose {
        eprintln!("Loading old graph: {}", inputs.old_graph.display());
        eprintln!("Loading new graph: {}", inputs.new_graph.display());
        eprintln!("Loading module tree: {}", inputs.module_tree.display());
    }
    info!(
        depth = options.depth,
        seed = options.seed.as_str(),
        policy = %options.policy,
        "Computing affected modules"
    );

    let report = AffectedPipeline::new(options)
        .run(&inputs)
        .context("Cannot compute affected modules")?;

    if verbose {
        print_verbose(&report);
    }

    let json = serde_json::to_string(report.modules()).context("Cannot serialize module list")?;
    println!("{json}");

    if !globals.quiet {
        for line in report.summary_lines() {
            eprintln!("{line}");
        }
    }
    if verbose {
        eprintln!("\nTotal time: {:.2}s", report.timings.total().as_secs_f64());
    }
    Ok(())
}

fn print_verbose(report: &AffectedReport) {
    let t = &report.timings;
    eprintln!("\nLoad time: {:.2}s", t.load.as_secs_f64());
    eprintln!("Old graph: {} components", report.old_components);
    eprintln!("New graph: {} components", report.new_components);
    eprintln!("Compare time: {:.2}s", t.diff.as_secs_f64());

    for line in report.change_listing(SAMPLE_LIMIT) {
        if line.ends_with("):") {
            eprintln!();
        }
        eprintln!("{line}");
    }

    if report.diff.is_empty() {
        return;
    }
    eprintln!("Traverse time: {:.2}s", t.propagate.as_secs_f64());
    if let Some(line) = report.traversal_line() {
        eprintln!("\n{line}");
    }
    eprintln!("Map time: {:.2}s", t.map.as_secs_f64());

    if !report.mapping.inferred.is_empty() {
        eprintln!(
            "\n{} components were mapped by ID shape (not in module tree)",
            report.mapping.inferred.len()
        );
    }
    let unresolved = &report.mapping.unresolved;
    if !unresolved.is_empty() {
        let sample: Vec<&str> = unresolved
            .iter()
            .take(SAMPLE_LIMIT)
            .map(String::as_str)
            .collect();
        eprintln!(
            "\nWarning: {} affected components could not be mapped to modules: {}",
            unresolved.len(),
            sample.join(", ")
        );
    }
    eprintln!();
}

// ── Tests ─────────────────────────────────────────────────────────────
