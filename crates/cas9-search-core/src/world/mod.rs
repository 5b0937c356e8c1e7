use crate::cas9::{Cas9, Cas9State};
use crate::config::{SimConfig, SimConfigError};
use crate::dna::{Dna, DnaKind};
use crate::dwell::{generate_virus_dwell_times, sample_junk_bind_time};
use crate::metrics::{
    kill_density, AgentTag, AgentView, Frame, PopulationStats, RunSummary, TimeHistogram,
};
use crate::motion::{random_direction, Arena};
use crate::rng::create_rng;
use rand_chacha::ChaCha12Rng;
use std::collections::HashSet;
use std::{error::Error, fmt};
use tracing::debug;

mod phases;

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepEvents {
    /// Virus targets cut (each also removes one probe).
    pub captures: usize,
    /// Junk targets engaged.
    pub checks: usize,
    /// Virus contacts that stalled instead of cutting.
    pub failed_recognitions: usize,
    /// Probes that detached after their dwell expired.
    pub releases: usize,
}

/// A single simulation run: owns every agent, the clock and the event logs.
pub struct World {
    dna: Vec<Dna>,
    cas9: Vec<Cas9>,
    config: SimConfig,
    arena: Arena,
    rng: ChaCha12Rng,
    /// Simulated time of the next tick.
    time: f64,
    step_index: usize,
    initial_junk: usize,
    initial_virus: usize,
    initial_cas9: usize,
    capture_times: Vec<f64>,
    check_times: Vec<f64>,
    failed_recognitions: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldInitError {
    Config(SimConfigError),
    DuplicateDnaId(u32),
    DuplicateCas9Id(u32),
    AgentOutOfBounds { id: u32 },
    UnknownBoundTarget { cas9_id: u32, dna_id: u32 },
    BoundStateMismatch { cas9_id: u32, dna_id: u32 },
    TargetBoundTwice { dna_id: u32 },
}

impl fmt::Display for WorldInitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldInitError::Config(e) => write!(f, "{}", e),
            WorldInitError::DuplicateDnaId(id) => write!(f, "duplicate DNA id {id}"),
            WorldInitError::DuplicateCas9Id(id) => write!(f, "duplicate Cas9 id {id}"),
            WorldInitError::AgentOutOfBounds { id } => {
                write!(f, "agent {id} does not fit inside the arena")
            }
            WorldInitError::UnknownBoundTarget { cas9_id, dna_id } => {
                write!(f, "Cas9 {cas9_id} is bound to unknown DNA {dna_id}")
            }
            WorldInitError::BoundStateMismatch { cas9_id, dna_id } => write!(
                f,
                "Cas9 {cas9_id} binding state does not match the kind of DNA {dna_id}"
            ),
            WorldInitError::TargetBoundTwice { dna_id } => {
                write!(f, "DNA {dna_id} has more than one Cas9 bound to it")
            }
        }
    }
}

impl From<SimConfigError> for WorldInitError {
    fn from(err: SimConfigError) -> Self {
        WorldInitError::Config(err)
    }
}

impl Error for WorldInitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            WorldInitError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// Resolve a stable DNA id to its current index. `dna` is kept sorted by id.
fn dna_index(dna: &[Dna], id: u32) -> Option<usize> {
    dna.binary_search_by_key(&id, |d| d.id).ok()
}

impl World {
    /// Build a world with randomly placed populations drawn from `config`.
    pub fn new(config: SimConfig) -> Result<Self, WorldInitError> {
        config.validate()?;
        let mut rng = create_rng(config.seed);
        let arena = Arena::new(config.width, config.height);

        // The virus batch is drawn before any placement, once per population.
        let virus_dwell_times =
            generate_virus_dwell_times(config.num_virus, config.virus_time_scale, &mut rng);

        let mut dna = Vec::with_capacity(config.num_junk + config.num_virus);
        for _ in 0..config.num_junk {
            let id = dna.len() as u32;
            let position = arena.random_position(config.dna_radius, &mut rng);
            let direction = random_direction(&mut rng);
            let bind_time = sample_junk_bind_time(&mut rng);
            dna.push(Dna::junk(
                id,
                position,
                config.dna_radius,
                direction,
                Some(bind_time),
            ));
        }
        for bind_time in virus_dwell_times {
            let id = dna.len() as u32;
            let position = arena.random_position(config.dna_radius, &mut rng);
            let direction = random_direction(&mut rng);
            dna.push(Dna::virus(
                id,
                position,
                config.dna_radius,
                direction,
                Some(bind_time),
            ));
        }

        let cas9 = (0..config.num_cas9)
            .map(|id| {
                let position = arena.random_position(config.cas9_radius, &mut rng);
                let direction = random_direction(&mut rng);
                Cas9::new(id as u32, position, config.cas9_radius, direction)
            })
            .collect();

        debug!(
            seed = config.seed,
            junk = config.num_junk,
            virus = config.num_virus,
            cas9 = config.num_cas9,
            "world initialized"
        );
        Ok(Self::assemble(dna, cas9, config, rng))
    }

    /// Build a world from hand-placed agents. The RNG is still seeded from
    /// `config.seed`; population counts in `config` are ignored.
    pub fn from_agents(
        mut dna: Vec<Dna>,
        cas9: Vec<Cas9>,
        config: SimConfig,
    ) -> Result<Self, WorldInitError> {
        config.validate()?;
        let arena = Arena::new(config.width, config.height);

        dna.sort_by_key(|d| d.id);
        if let Some(pair) = dna.windows(2).find(|pair| pair[0].id == pair[1].id) {
            return Err(WorldInitError::DuplicateDnaId(pair[0].id));
        }
        let mut cas9_ids = HashSet::with_capacity(cas9.len());
        for c in &cas9 {
            if !cas9_ids.insert(c.id) {
                return Err(WorldInitError::DuplicateCas9Id(c.id));
            }
        }
        if let Some(d) = dna.iter().find(|d| !arena.contains(d.position, d.radius)) {
            return Err(WorldInitError::AgentOutOfBounds { id: d.id });
        }
        if let Some(c) = cas9.iter().find(|c| !arena.contains(c.position, c.radius)) {
            return Err(WorldInitError::AgentOutOfBounds { id: c.id });
        }

        let mut held = HashSet::new();
        for c in &cas9 {
            let (dna_id, expected) = match c.state {
                Cas9State::Free => continue,
                Cas9State::BoundJunk { dna_id } => (dna_id, DnaKind::Junk),
                Cas9State::BoundVirus { dna_id } => (dna_id, DnaKind::Virus),
            };
            let Some(idx) = dna_index(&dna, dna_id) else {
                return Err(WorldInitError::UnknownBoundTarget {
                    cas9_id: c.id,
                    dna_id,
                });
            };
            if dna[idx].kind() != expected {
                return Err(WorldInitError::BoundStateMismatch {
                    cas9_id: c.id,
                    dna_id,
                });
            }
            if !held.insert(dna_id) {
                return Err(WorldInitError::TargetBoundTwice { dna_id });
            }
        }
        for d in &mut dna {
            if held.contains(&d.id) {
                d.occupied = true;
            }
        }

        let rng = create_rng(config.seed);
        Ok(Self::assemble(dna, cas9, config, rng))
    }

    fn assemble(dna: Vec<Dna>, cas9: Vec<Cas9>, config: SimConfig, rng: ChaCha12Rng) -> Self {
        let initial_junk = dna.iter().filter(|d| d.kind() == DnaKind::Junk).count();
        let initial_virus = dna.len() - initial_junk;
        let initial_cas9 = cas9.len();
        Self {
            dna,
            cas9,
            arena: Arena::new(config.width, config.height),
            config,
            rng,
            time: 0.0,
            step_index: 0,
            initial_junk,
            initial_virus,
            initial_cas9,
            capture_times: Vec::new(),
            check_times: Vec::new(),
            failed_recognitions: 0,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn dna(&self) -> &[Dna] {
        &self.dna
    }

    pub fn cas9(&self) -> &[Cas9] {
        &self.cas9
    }

    /// Simulated time elapsed so far.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Timestamps of virus cuts, in order.
    pub fn capture_times(&self) -> &[f64] {
        &self.capture_times
    }

    /// Timestamps of junk engagements, in order.
    pub fn check_times(&self) -> &[f64] {
        &self.check_times
    }

    pub fn kills(&self) -> usize {
        self.capture_times.len()
    }

    pub fn kill_density(&self) -> f64 {
        kill_density(self.kills(), self.initial_virus)
    }

    pub fn is_finished(&self) -> bool {
        self.time >= self.config.experiment_duration
    }

    /// Advance one fixed `dt` tick.
    pub fn step(&mut self) -> StepEvents {
        let now = self.time;
        let events = self.tick(now);
        self.time += self.config.dt;
        events
    }

    /// Run one tick at an externally supplied time, e.g. wall-clock seconds
    /// since start. Times earlier than the current clock are clamped to it.
    pub fn step_at(&mut self, now: f64) -> StepEvents {
        let now = now.max(self.time);
        let events = self.tick(now);
        self.time = now;
        events
    }

    fn tick(&mut self, now: f64) -> StepEvents {
        let mut events = StepEvents::default();
        self.step_movement_phase(now, &mut events);
        self.step_collision_phase(now, &mut events);
        self.prune_dead_agents();
        self.step_index += 1;
        events
    }

    fn prune_dead_agents(&mut self) {
        self.dna.retain(|d| d.alive);
        self.cas9.retain(|c| c.alive);
    }

    /// Step until the experiment duration is reached and summarize.
    pub fn run_to_completion(&mut self) -> RunSummary {
        while !self.is_finished() {
            self.step();
        }
        let summary = self.summary();
        debug!(
            steps = summary.steps,
            kills = summary.kills,
            checks = summary.junk_checks,
            kill_density = summary.kill_density,
            "run complete"
        );
        summary
    }

    pub fn population_stats(&self) -> PopulationStats {
        let mut stats = PopulationStats::default();
        for d in self.dna.iter().filter(|d| d.alive) {
            match d.kind() {
                DnaKind::Junk => stats.junk += 1,
                DnaKind::Virus => stats.virus += 1,
            }
        }
        for c in self.cas9.iter().filter(|c| c.alive) {
            if c.is_free() {
                stats.free_cas9 += 1;
            } else {
                stats.bound_cas9 += 1;
            }
        }
        stats
    }

    /// Drawable snapshot of the live agents.
    pub fn frame(&self) -> Frame {
        let targets = self.dna.iter().filter(|d| d.alive).map(|d| AgentView {
            id: d.id,
            position: d.position,
            radius: d.radius,
            tag: match d.kind() {
                DnaKind::Junk => AgentTag::JunkDna,
                DnaKind::Virus => AgentTag::VirusDna,
            },
        });
        let probes = self.cas9.iter().filter(|c| c.alive).map(|c| AgentView {
            id: c.id,
            position: c.position,
            radius: c.radius,
            tag: match c.state {
                Cas9State::Free => AgentTag::FreeCas9,
                Cas9State::BoundJunk { .. } => AgentTag::Cas9CheckingJunk,
                Cas9State::BoundVirus { .. } => AgentTag::Cas9StalledOnVirus,
            },
        });
        Frame {
            time: self.time,
            stats: self.population_stats(),
            agents: targets.chain(probes).collect(),
        }
    }

    pub fn summary(&self) -> RunSummary {
        let duration = self.config.experiment_duration;
        let bin_width = self.config.bin_width;
        RunSummary {
            schema_version: 1,
            seed: self.config.seed,
            duration,
            steps: self.step_index,
            initial_junk: self.initial_junk,
            initial_virus: self.initial_virus,
            initial_cas9: self.initial_cas9,
            kills: self.kills(),
            junk_checks: self.check_times.len(),
            failed_recognitions: self.failed_recognitions,
            kill_density: self.kill_density(),
            capture_times: self.capture_times.clone(),
            check_times: self.check_times.clone(),
            capture_histogram: TimeHistogram::from_times(&self.capture_times, duration, bin_width),
            check_histogram: TimeHistogram::from_times(&self.check_times, duration, bin_width),
            final_stats: self.population_stats(),
        }
    }
}

#[cfg(test)]
mod tests;
