use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Arena width in world units.
    pub width: f64,
    /// Arena height in world units.
    pub height: f64,
    /// Radius of every DNA target.
    pub dna_radius: f64,
    /// Radius of every Cas9 probe.
    pub cas9_radius: f64,
    /// Initial number of junk DNA targets.
    pub num_junk: usize,
    /// Initial number of virus DNA targets.
    pub num_virus: usize,
    /// Initial number of Cas9 probes.
    pub num_cas9: usize,
    /// Displacement per tick of a free Cas9 along its heading.
    pub cas9_speed: f64,
    /// Damping applied to `cas9_speed` for DNA motion.
    pub dna_speed_factor: f64,
    /// Per-tick probability that a DNA target picks a new heading.
    pub dna_turn_probability: f64,
    /// Per-tick probability that a free Cas9 picks a new heading.
    pub cas9_turn_probability: f64,
    /// Simulation timestep (seconds of model time).
    pub dt: f64,
    /// Scale applied to a virus dwell time when a failed check binds.
    pub time_scale: f64,
    /// Scale applied to virus dwell times when the population is generated.
    pub virus_time_scale: f64,
    /// Junk dwell time used when a target carries no sampled value.
    pub bind_time_junk: f64,
    /// Virus dwell time used when a target carries no sampled value.
    pub bind_time_virus: f64,
    /// Window after a junk release during which the target is ignored.
    pub cooldown_junk: f64,
    /// Window after a failed virus check during which the target is ignored.
    pub cooldown_virus_fail: f64,
    /// Simulated duration of one experiment (seconds).
    pub experiment_duration: f64,
    /// Extra distance added to the radius sum when testing contact.
    pub collision_buffer: f64,
    /// Probability that a virus contact is cut immediately.
    pub success_prob: f64,
    /// Width of the time bins used for event histograms (seconds).
    pub bin_width: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 1000.0,
            height: 1000.0,
            dna_radius: 10.0,
            cas9_radius: 20.0,
            num_junk: 100,
            num_virus: 15,
            num_cas9: 15,
            cas9_speed: 20.0,
            dna_speed_factor: 0.3,
            dna_turn_probability: 0.1,
            cas9_turn_probability: 0.2,
            dt: 0.02,
            time_scale: 0.2,
            virus_time_scale: 0.27,
            bind_time_junk: 1.0,
            bind_time_virus: 2.0,
            cooldown_junk: 2.5,
            cooldown_virus_fail: 2.5,
            experiment_duration: 10.0,
            collision_buffer: 0.0,
            success_prob: 0.8,
            bin_width: 5.0,
        }
    }
}

macro_rules! define_sim_config_error {
    (
        $(
            $variant:ident $( { $($field:ident : $type:ty),* } )? => $fmt:literal $(, $arg:expr)*
        );* $(;)?
    ) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum SimConfigError {
            $(
                $variant $( { $($field : $type),* } )?,
            )*
        }

        impl std::fmt::Display for SimConfigError {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        Self::$variant $( { $($field),* } )? => write!(f, $fmt $(, $arg)*),
                    )*
                }
            }
        }
    };
}

define_sim_config_error! {
    InvalidArenaSize => "width and height must be positive and finite";
    InvalidDnaRadius => "dna_radius must be positive and finite";
    InvalidCas9Radius => "cas9_radius must be positive and finite";
    RadiusExceedsArena { radius: f64, width: f64, height: f64 } => "radius {} does not fit in a {}x{} arena", radius, width, height;
    AgentCountOverflow => "Total agent count overflow";
    TooManyAgents { max: usize, actual: usize } => "Too many agents: {} > max {}", actual, max;
    InvalidCas9Speed => "cas9_speed must be finite and non-negative";
    InvalidDnaSpeedFactor => "dna_speed_factor must be finite and non-negative";
    InvalidDnaTurnProbability => "dna_turn_probability must be finite and within [0,1]";
    InvalidCas9TurnProbability => "cas9_turn_probability must be finite and within [0,1]";
    InvalidDt => "dt must be positive and finite";
    InvalidTimeScale => "time_scale must be finite and non-negative";
    InvalidVirusTimeScale => "virus_time_scale must be finite and non-negative";
    InvalidBindTimeJunk => "bind_time_junk must be finite and non-negative";
    InvalidBindTimeVirus => "bind_time_virus must be finite and non-negative";
    InvalidCooldownJunk => "cooldown_junk must be finite and non-negative";
    InvalidCooldownVirusFail => "cooldown_virus_fail must be finite and non-negative";
    InvalidExperimentDuration => "experiment_duration must be positive and finite";
    TooManySteps { max: usize, actual: f64 } => "experiment_duration / dt ({}) exceeds supported maximum ({}) steps", actual, max;
    InvalidCollisionBuffer => "collision_buffer must be finite and non-negative";
    InvalidSuccessProb => "success_prob must be finite and within [0,1]";
    InvalidBinWidth => "bin_width must be positive and finite";
}

impl std::error::Error for SimConfigError {}

fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl SimConfig {
    pub const MAX_TOTAL_AGENTS: usize = 100_000;

    pub const MAX_EXPERIMENT_STEPS: usize = 10_000_000;

    /// Preset used by the wall-clock driver: the longer 20 s experiment.
    pub fn interactive() -> Self {
        Self {
            experiment_duration: 20.0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.validate_arena()?;
        self.validate_populations()?;
        self.validate_motion()?;
        self.validate_kinetics()?;
        Ok(())
    }

    /// Number of virus targets + junk targets + probes at start.
    pub fn total_agents(&self) -> Option<usize> {
        self.num_junk
            .checked_add(self.num_virus)?
            .checked_add(self.num_cas9)
    }

    fn validate_arena(&self) -> Result<(), SimConfigError> {
        if !(is_positive(self.width) && is_positive(self.height)) {
            return Err(SimConfigError::InvalidArenaSize);
        }
        if !is_positive(self.dna_radius) {
            return Err(SimConfigError::InvalidDnaRadius);
        }
        if !is_positive(self.cas9_radius) {
            return Err(SimConfigError::InvalidCas9Radius);
        }
        for radius in [self.dna_radius, self.cas9_radius] {
            if 2.0 * radius > self.width.min(self.height) {
                return Err(SimConfigError::RadiusExceedsArena {
                    radius,
                    width: self.width,
                    height: self.height,
                });
            }
        }
        Ok(())
    }

    fn validate_populations(&self) -> Result<(), SimConfigError> {
        let total = self
            .total_agents()
            .ok_or(SimConfigError::AgentCountOverflow)?;
        if total > Self::MAX_TOTAL_AGENTS {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_TOTAL_AGENTS,
                actual: total,
            });
        }
        Ok(())
    }

    fn validate_motion(&self) -> Result<(), SimConfigError> {
        if !is_non_negative(self.cas9_speed) {
            return Err(SimConfigError::InvalidCas9Speed);
        }
        if !is_non_negative(self.dna_speed_factor) {
            return Err(SimConfigError::InvalidDnaSpeedFactor);
        }
        if !is_probability(self.dna_turn_probability) {
            return Err(SimConfigError::InvalidDnaTurnProbability);
        }
        if !is_probability(self.cas9_turn_probability) {
            return Err(SimConfigError::InvalidCas9TurnProbability);
        }
        if !is_non_negative(self.collision_buffer) {
            return Err(SimConfigError::InvalidCollisionBuffer);
        }
        Ok(())
    }

    fn validate_kinetics(&self) -> Result<(), SimConfigError> {
        if !is_positive(self.dt) {
            return Err(SimConfigError::InvalidDt);
        }
        if !is_non_negative(self.time_scale) {
            return Err(SimConfigError::InvalidTimeScale);
        }
        if !is_non_negative(self.virus_time_scale) {
            return Err(SimConfigError::InvalidVirusTimeScale);
        }
        if !is_non_negative(self.bind_time_junk) {
            return Err(SimConfigError::InvalidBindTimeJunk);
        }
        if !is_non_negative(self.bind_time_virus) {
            return Err(SimConfigError::InvalidBindTimeVirus);
        }
        if !is_non_negative(self.cooldown_junk) {
            return Err(SimConfigError::InvalidCooldownJunk);
        }
        if !is_non_negative(self.cooldown_virus_fail) {
            return Err(SimConfigError::InvalidCooldownVirusFail);
        }
        if !is_positive(self.experiment_duration) {
            return Err(SimConfigError::InvalidExperimentDuration);
        }
        let steps = (self.experiment_duration / self.dt).ceil();
        if steps > Self::MAX_EXPERIMENT_STEPS as f64 {
            return Err(SimConfigError::TooManySteps {
                max: Self::MAX_EXPERIMENT_STEPS,
                actual: steps,
            });
        }
        if !is_probability(self.success_prob) {
            return Err(SimConfigError::InvalidSuccessProb);
        }
        if !is_positive(self.bin_width) {
            return Err(SimConfigError::InvalidBinWidth);
        }
        Ok(())
    }
}
