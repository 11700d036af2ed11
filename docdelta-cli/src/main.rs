use std::path::PathBuf;

use clap::Parser;

use docdelta_core::{ConfigError, DeltaError};
use docdelta_graphs::GraphError;

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "docdelta",
    version,
    about = "Find the documentation modules affected by a dependency graph change"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Config file (default: ./docdelta.toml when present)
    #[arg(long, global = true, env = "DOCDELTA_CONFIG")]
    config: Option<PathBuf>,
}

/// Classify an error into a process exit code.
///
/// Exit codes:
///   0 : success
///   1 : general/unknown error
///   2 : configuration or usage error
///   3 : input file not found
///   4 : corrupt archive or malformed data
///   5 : schema violation
///   6 : invalid parameter
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<DeltaError>() {
            return match e {
                DeltaError::Graph(g) => graph_exit_code(g),
                DeltaError::Config(_) => 2,
                DeltaError::ModuleTree { .. } => 5,
            };
        }
        if let Some(e) = cause.downcast_ref::<GraphError>() {
            return graph_exit_code(e);
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("config")
        || lower.contains("required when using")
        || lower.contains("cannot use both")
        || lower.contains("please specify")
    {
        2
    } else if lower.contains("not found") {
        3
    } else if lower.contains("invalid json") {
        4
    } else {
        1
    }
}

fn graph_exit_code(err: &GraphError) -> i32 {
    match err {
        GraphError::NotFound { .. } => 3,
        GraphError::CorruptArchive { .. } | GraphError::MalformedData { .. } => 4,
        GraphError::SchemaViolation { .. } => 5,
        GraphError::InvalidParameter { .. } => 6,
        GraphError::Io(_) => 1,
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let globals = commands::GlobalOpts {
        verbose: cli.verbose,
        quiet: cli.quiet,
        config: cli.config,
    };

    match commands::run(cli.command, &globals) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    fn graph_err(e: GraphError) -> anyhow::Error {
        anyhow::Error::new(DeltaError::Graph(e)).context("Cannot compute affected modules")
    }

    #[test]
    fn exit_code_not_found() {
        let err = graph_err(GraphError::NotFound {
            what: "Dependency graph".into(),
            path: "/missing.json".into(),
        });
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_corrupt_and_malformed() {
        let err = graph_err(GraphError::CorruptArchive {
            path: "g.json.gz".into(),
            cause: "archive appears truncated".into(),
        });
        assert_eq!(classify_exit_code(&err), 4);

        let err = graph_err(GraphError::MalformedData {
            path: "g.json".into(),
            line: 1,
            column: 2,
            message: "expected value".into(),
        });
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_schema_violation() {
        let err = graph_err(GraphError::SchemaViolation {
            path: "g.json".into(),
            message: "Dependency graph must be a JSON object, got array".into(),
        });
        assert_eq!(classify_exit_code(&err), 5);

        let err = anyhow::Error::new(DeltaError::ModuleTree {
            module: "backend".into(),
            message: "node has no \"components\" key".into(),
        });
        assert_eq!(classify_exit_code(&err), 5);
    }

    #[test]
    fn exit_code_invalid_parameter() {
        let err = graph_err(GraphError::InvalidParameter {
            name: "depth",
            bound: "at least 1".into(),
            value: 0,
        });
        assert_eq!(classify_exit_code(&err), 6);
    }

    #[test]
    fn wrapped_graph_error_prints_once() {
        let err = graph_err(GraphError::InvalidParameter {
            name: "depth",
            bound: "at least 1".into(),
            value: 0,
        });
        let text = format!("{err:#}");
        assert_eq!(text.matches("depth must be").count(), 1, "{text}");
    }

    #[test]
    fn exit_code_config() {
        let err: Result<(), ConfigError> = Err(ConfigError::Parse("bad toml".into()));
        let err = err.context("Cannot load config: docdelta.toml").unwrap_err();
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_usage() {
        let err = anyhow::anyhow!("--module-tree is required when using explicit paths");
        assert_eq!(classify_exit_code(&err), 2);
        let err = anyhow::anyhow!(
            "Cannot use both explicit paths (--old-graph, --new-graph) and directory mode (--old-dir, --new-dir)"
        );
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
