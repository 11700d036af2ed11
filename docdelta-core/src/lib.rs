//! docdelta core library: module trees, selective regeneration, and the
//! affected-modules pipeline.
//!
//! The main entry point is [`pipeline::AffectedPipeline`], which loads two
//! dependency graph snapshots and a module tree, diffs the snapshots,
//! propagates the change through reverse dependencies, and maps the result
//! onto module paths. [`select::SelectionPlan`] turns a module list into the
//! set of modules a partial rebuild has to touch.

pub mod config;
pub mod error;
pub mod modules;
pub mod pipeline;
pub mod select;

pub use config::{DeltaConfig, SeedScope};
pub use error::{ConfigError, DeltaError, Result};
pub use modules::{
    ModuleMapper, ModuleMapping, ModuleNode, ModuleTree, SubModuleSpecs, infer_module_path,
    map_components_to_modules,
};
pub use pipeline::{AffectedInputs, AffectedOptions, AffectedPipeline, AffectedReport};
pub use select::{
    Selection, SelectionPlan, SelectionReason, parse_module_list, required_parents,
    should_process,
};
