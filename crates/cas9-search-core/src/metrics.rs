use serde::{Deserialize, Serialize};

/// Live population counts, as shown in a status line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationStats {
    pub junk: usize,
    pub virus: usize,
    pub free_cas9: usize,
    pub bound_cas9: usize,
}

/// What a renderer needs to pick a color for an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentTag {
    JunkDna,
    VirusDna,
    FreeCas9,
    Cas9CheckingJunk,
    Cas9StalledOnVirus,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: u32,
    pub position: [f64; 2],
    pub radius: f64,
    pub tag: AgentTag,
}

/// Snapshot of a world for drawing. Targets come first, then probes, so
/// probes draw on top.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time: f64,
    pub stats: PopulationStats,
    pub agents: Vec<AgentView>,
}

/// Event counts in fixed-width time bins over `[0, duration)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeHistogram {
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl TimeHistogram {
    /// Bin `times` into `floor(duration / bin_width)` bins. Times outside
    /// `[0, duration)` or past the last whole bin are dropped.
    pub fn from_times(times: &[f64], duration: f64, bin_width: f64) -> Self {
        let n_bins = if bin_width > 0.0 && duration > 0.0 {
            (duration / bin_width).floor() as usize
        } else {
            0
        };
        let mut counts = vec![0usize; n_bins];
        for &t in times {
            if !(0.0..duration).contains(&t) {
                continue;
            }
            let idx = (t / bin_width).floor() as usize;
            if let Some(count) = counts.get_mut(idx) {
                *count += 1;
            }
        }
        Self { bin_width, counts }
    }

    /// Labels of the form `"0-5"`, `"5-10"`, ...
    pub fn labels(&self) -> Vec<String> {
        (0..self.counts.len())
            .map(|i| {
                let lo = (i as f64 * self.bin_width) as i64;
                let hi = ((i + 1) as f64 * self.bin_width) as i64;
                format!("{lo}-{hi}")
            })
            .collect()
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub seed: u64,
    pub duration: f64,
    pub steps: usize,
    pub initial_junk: usize,
    pub initial_virus: usize,
    pub initial_cas9: usize,
    pub kills: usize,
    pub junk_checks: usize,
    pub failed_recognitions: usize,
    pub kill_density: f64,
    pub capture_times: Vec<f64>,
    pub check_times: Vec<f64>,
    pub capture_histogram: TimeHistogram,
    pub check_histogram: TimeHistogram,
    pub final_stats: PopulationStats,
}

/// Fraction of the initial virus population that was cut.
pub fn kill_density(kills: usize, initial_virus: usize) -> f64 {
    if initial_virus == 0 {
        0.0
    } else {
        kills as f64 / initial_virus as f64
    }
}
