//! Headless parameter sweeps over initial population sizes.
//!
//! Every grid point is an independent run with its own seed, so the grid is
//! evaluated in parallel and the result does not depend on scheduling.

use crate::config::SimConfig;
use crate::rng::derive_run_seed;
use crate::world::{World, WorldInitError};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};
use tracing::debug;

/// A stepped range `start, start + step, ...` stopping before `end`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl StepRange {
    pub fn values(&self) -> Vec<usize> {
        if self.step == 0 {
            return Vec::new();
        }
        (self.start..self.end).step_by(self.step).collect()
    }
}

/// Grid of (junk count) x (Cas9 count = virus count) points.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub junk: StepRange,
    pub cas9_virus: StepRange,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            junk: StepRange {
                start: 0,
                end: 301,
                step: 10,
            },
            cas9_virus: StepRange {
                start: 1,
                end: 90,
                step: 3,
            },
        }
    }
}

impl SweepGrid {
    /// Grid points in output order: junk outer, Cas9/virus inner.
    pub fn points(&self) -> Vec<(usize, usize)> {
        let cv = self.cas9_virus.values();
        self.junk
            .values()
            .into_iter()
            .flat_map(|junk| cv.iter().map(move |&cv| (junk, cv)))
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepRow {
    pub init_cas9_virus: usize,
    pub init_junk: usize,
    pub virus_kill_density: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SweepError {
    InvalidStep,
    Run {
        junk: usize,
        cas9_virus: usize,
        source: WorldInitError,
    },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::InvalidStep => write!(f, "sweep range steps must be positive"),
            SweepError::Run {
                junk,
                cas9_virus,
                source,
            } => write!(
                f,
                "run with junk={junk}, cas9/virus={cas9_virus} failed: {source}"
            ),
        }
    }
}

impl Error for SweepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SweepError::Run { source, .. } => Some(source),
            SweepError::InvalidStep => None,
        }
    }
}

/// Run one experiment to completion and return its kill density.
pub fn run_single(config: SimConfig) -> Result<f64, WorldInitError> {
    let mut world = World::new(config)?;
    Ok(world.run_to_completion().kill_density)
}

/// Evaluate every grid point. Each point uses `base` with its populations
/// replaced and a seed derived from `base.seed` and the point's index.
pub fn run_sweep(base: &SimConfig, grid: &SweepGrid) -> Result<Vec<SweepRow>, SweepError> {
    if grid.junk.step == 0 || grid.cas9_virus.step == 0 {
        return Err(SweepError::InvalidStep);
    }
    let points = grid.points();
    debug!(runs = points.len(), "starting sweep");
    points
        .par_iter()
        .enumerate()
        .map(|(index, &(junk, cv))| {
            let config = SimConfig {
                seed: derive_run_seed(base.seed, index),
                num_junk: junk,
                num_virus: cv,
                num_cas9: cv,
                ..base.clone()
            };
            let virus_kill_density = run_single(config).map_err(|source| SweepError::Run {
                junk,
                cas9_virus: cv,
                source,
            })?;
            Ok(SweepRow {
                init_cas9_virus: cv,
                init_junk: junk,
                virus_kill_density,
            })
        })
        .collect()
}
