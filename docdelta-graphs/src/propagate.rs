// Affected-set propagation: bounded breadth-first expansion over the
// reverse dependency index.
//
// Membership is checked before an ID joins the next frontier, so every ID is
// expanded at most once and cycles cannot cause re-expansion. Total work is
// bounded by the number of components regardless of graph shape.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::graph::{ComponentId, DependencyGraph};
use crate::reverse::ReverseDependencyIndex;
use crate::{GraphError, Result};

/// Smallest accepted hop count.
pub const MIN_DEPTH: u32 = 1;
/// Largest accepted hop count.
pub const MAX_DEPTH: u32 = 20;

/// Inclusive `[min, max]` range for the propagation depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthBounds {
    min: u32,
    max: u32,
}

impl Default for DepthBounds {
    fn default() -> Self {
        Self {
            min: MIN_DEPTH,
            max: MAX_DEPTH,
        }
    }
}

impl DepthBounds {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 {
            return Err(GraphError::InvalidParameter {
                name: "min_depth",
                bound: "at least 1".to_string(),
                value: 0,
            });
        }
        if min > max {
            return Err(GraphError::InvalidParameter {
                name: "max_depth",
                bound: format!("at least min_depth ({min})"),
                value: i64::from(max),
            });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Reject `depth` outside the inclusive range, naming the violated bound.
    pub fn check(&self, depth: u32) -> Result<()> {
        self.accept(i64::from(depth)).map(drop)
    }

    /// Validate a depth taken from user input, which may be negative, and
    /// narrow it to a hop count.
    pub fn accept(&self, depth: i64) -> Result<u32> {
        let violated = if depth < i64::from(self.min) {
            format!("at least {}", self.min)
        } else if depth > i64::from(self.max) {
            format!("at most {}", self.max)
        } else {
            return u32::try_from(depth).map_err(|_| GraphError::InvalidParameter {
                name: "depth",
                bound: format!("at most {}", self.max),
                value: depth,
            });
        };
        Err(GraphError::InvalidParameter {
            name: "depth",
            bound: violated,
            value: depth,
        })
    }
}

/// Components reached by propagation, with the hop at which each was reached.
///
/// Seed members sit at hop 0. Grows monotonically: nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedSet {
    hops: BTreeMap<ComponentId, u32>,
}

impl AffectedSet {
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.hops.contains_key(id)
    }

    pub fn hop(&self, id: &str) -> Option<u32> {
        self.hops.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.hops.keys().map(String::as_str)
    }

    /// Members reached through at least one reverse edge.
    pub fn dependent_count(&self) -> usize {
        self.hops.values().filter(|&&h| h > 0).count()
    }

    /// Deepest hop that contributed a member (0 when only the seed).
    pub fn max_hop(&self) -> u32 {
        self.hops.values().copied().max().unwrap_or(0)
    }

    pub fn to_id_set(&self) -> BTreeSet<ComponentId> {
        self.hops.keys().cloned().collect()
    }

    pub fn into_id_set(self) -> BTreeSet<ComponentId> {
        self.hops.into_keys().collect()
    }
}

/// Runs bounded propagation with a fixed set of depth bounds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Propagator {
    bounds: DepthBounds,
}

impl Propagator {
    pub fn new(bounds: DepthBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> DepthBounds {
        self.bounds
    }

    /// Expand `seed` through the reverse dependencies of `graph` for up to
    /// `depth` hops.
    ///
    /// `graph` should be the current snapshot, so propagation follows today's
    /// dependency shape even for historically changed components.
    pub fn propagate<I, S>(&self, seed: I, graph: &DependencyGraph, depth: u32) -> Result<AffectedSet>
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentId>,
    {
        self.bounds.check(depth)?;
        let index = ReverseDependencyIndex::build(graph);
        self.propagate_with_index(seed, &index, depth)
    }

    /// Same as [`Propagator::propagate`], reusing a prebuilt index.
    pub fn propagate_with_index<I, S>(
        &self,
        seed: I,
        index: &ReverseDependencyIndex,
        depth: u32,
    ) -> Result<AffectedSet>
    where
        I: IntoIterator<Item = S>,
        S: Into<ComponentId>,
    {
        self.bounds.check(depth)?;

        let mut hops: BTreeMap<ComponentId, u32> = BTreeMap::new();
        let mut frontier: BTreeSet<ComponentId> = BTreeSet::new();
        for id in seed {
            let id = id.into();
            hops.insert(id.clone(), 0);
            frontier.insert(id);
        }

        for hop in 1..=depth {
            let mut next_frontier = BTreeSet::new();
            for id in &frontier {
                let Some(dependents) = index.dependents(id) else {
                    continue;
                };
                for dependent in dependents {
                    if !hops.contains_key(dependent) {
                        hops.insert(dependent.clone(), hop);
                        next_frontier.insert(dependent.clone());
                    }
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        Ok(AffectedSet { hops })
    }
}

/// Propagate with the default `[MIN_DEPTH, MAX_DEPTH]` bounds.
pub fn affected_components<I, S>(seed: I, graph: &DependencyGraph, depth: u32) -> Result<AffectedSet>
where
    I: IntoIterator<Item = S>,
    S: Into<ComponentId>,
{
    Propagator::default().propagate(seed, graph, depth)
}

// ── Tests ─────────────────────────────────────────────────────────────
