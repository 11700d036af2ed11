pub mod affected;
pub mod select;

use std::path::PathBuf;

use anyhow::Context;
use clap::Subcommand;

use docdelta_core::DeltaConfig;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Detect modules affected by changes between two dependency graphs
    Affected(affected::AffectedArgs),
    /// Decide which modules a selective rebuild has to regenerate
    Select(select::SelectArgs),
}

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    pub verbose: u8,
    pub quiet: bool,
    pub config: Option<PathBuf>,
}

pub fn run(cmd: Command, globals: &GlobalOpts) -> anyhow::Result<()> {
    let config = load_config(globals)?;
    match cmd {
        Command::Affected(args) => affected::run(args, &config, globals),
        Command::Select(args) => select::run(args, globals),
    }
}

/// An explicit `--config` must exist; otherwise `./docdelta.toml` is used
/// when present and defaults apply when it is not.
fn load_config(globals: &GlobalOpts) -> anyhow::Result<DeltaConfig> {
    match &globals.config {
        Some(path) => DeltaConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Cannot resolve working directory")?;
            DeltaConfig::discover(&cwd).context("Cannot load config: docdelta.toml")
        }
    }
}
