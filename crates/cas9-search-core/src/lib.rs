pub mod cas9;
pub mod config;
pub mod constants;
pub mod dna;
pub mod dwell;
pub mod metrics;
pub mod motion;
pub mod rng;
pub mod sweep;
pub mod world;

pub use config::{SimConfig, SimConfigError};
pub use metrics::{AgentTag, AgentView, Frame, PopulationStats, RunSummary, TimeHistogram};
pub use sweep::{run_single, run_sweep, SweepError, SweepGrid, SweepRow};
pub use world::{StepEvents, World, WorldInitError};
