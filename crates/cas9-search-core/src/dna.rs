use crate::motion::{maybe_turn, Arena};
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DnaKind {
    Junk,
    Virus,
}

/// A drifting DNA target probed by Cas9.
///
/// Exactly one of the two sampled dwell times can be present, matching `kind`.
/// Use [`Dna::junk`] or [`Dna::virus`] to build one.
#[derive(Clone, Debug, PartialEq)]
pub struct Dna {
    /// Stable identifier; never reused within a run.
    pub id: u32,
    pub position: [f64; 2],
    pub radius: f64,
    pub direction: [f64; 2],
    pub alive: bool,
    /// Simulated time before which no probe may engage this target.
    pub cooldown_until: f64,
    /// Set while a probe is bound here. For a virus this spans the whole
    /// failed-recognition dwell; for junk, the check.
    pub occupied: bool,
    kind: DnaKind,
    junk_bind_time: Option<f64>,
    virus_bind_time: Option<f64>,
}

impl Dna {
    fn new(id: u32, kind: DnaKind, position: [f64; 2], radius: f64, direction: [f64; 2]) -> Self {
        Self {
            id,
            position,
            radius,
            direction,
            alive: true,
            cooldown_until: 0.0,
            occupied: false,
            kind,
            junk_bind_time: None,
            virus_bind_time: None,
        }
    }

    pub fn junk(
        id: u32,
        position: [f64; 2],
        radius: f64,
        direction: [f64; 2],
        bind_time: Option<f64>,
    ) -> Self {
        Self {
            junk_bind_time: bind_time,
            ..Self::new(id, DnaKind::Junk, position, radius, direction)
        }
    }

    pub fn virus(
        id: u32,
        position: [f64; 2],
        radius: f64,
        direction: [f64; 2],
        bind_time: Option<f64>,
    ) -> Self {
        Self {
            virus_bind_time: bind_time,
            ..Self::new(id, DnaKind::Virus, position, radius, direction)
        }
    }

    pub fn kind(&self) -> DnaKind {
        self.kind
    }

    pub fn is_virus(&self) -> bool {
        self.kind == DnaKind::Virus
    }

    pub fn junk_bind_time(&self) -> Option<f64> {
        self.junk_bind_time
    }

    pub fn virus_bind_time(&self) -> Option<f64> {
        self.virus_bind_time
    }

    /// Whether a free probe may engage this target at simulated time `now`.
    pub fn is_engageable(&self, now: f64) -> bool {
        self.alive && !self.occupied && now >= self.cooldown_until
    }

    /// One drift step: move `step` along the heading, bounce off walls, then
    /// maybe pick a new heading.
    pub fn move_step<R: Rng + ?Sized>(
        &mut self,
        arena: &Arena,
        step: f64,
        turn_probability: f64,
        rng: &mut R,
    ) {
        if !self.alive {
            return;
        }
        let (position, direction) =
            arena.reflect_step(self.position, self.direction, self.radius, step);
        self.position = position;
        self.direction = direction;
        maybe_turn(&mut self.direction, turn_probability, rng);
    }

    /// Apply the effect of a probe letting go at `now`.
    ///
    /// Junk starts its cooldown at release. A virus already had its cooldown
    /// set when the failed check happened, so only the occupancy is cleared.
    pub fn release(&mut self, now: f64, cooldown_junk: f64) {
        self.occupied = false;
        if self.kind == DnaKind::Junk {
            self.cooldown_until = now + cooldown_junk;
        }
    }
}
