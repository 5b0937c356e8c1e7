use crate::dna::{Dna, DnaKind};
use crate::motion::{maybe_turn, Arena};
use rand::Rng;

/// Binding state of a probe. Bound variants carry the stable id of the target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cas9State {
    Free,
    /// Checking a junk target; always released on expiry.
    BoundJunk { dna_id: u32 },
    /// Stalled on a virus after a failed recognition.
    BoundVirus { dna_id: u32 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cas9 {
    pub id: u32,
    pub position: [f64; 2],
    pub radius: f64,
    pub direction: [f64; 2],
    pub state: Cas9State,
    /// Simulated time at which the current binding ends.
    pub bound_until: f64,
    pub alive: bool,
}

/// A probe detaching from a target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Release {
    pub dna_id: u32,
    pub kind: DnaKind,
}

impl Cas9 {
    pub fn new(id: u32, position: [f64; 2], radius: f64, direction: [f64; 2]) -> Self {
        Self {
            id,
            position,
            radius,
            direction,
            state: Cas9State::Free,
            bound_until: 0.0,
            alive: true,
        }
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, Cas9State::Free)
    }

    /// Id of the target this probe is bound to, if any.
    pub fn bound_dna(&self) -> Option<u32> {
        match self.state {
            Cas9State::Free => None,
            Cas9State::BoundJunk { dna_id } | Cas9State::BoundVirus { dna_id } => Some(dna_id),
        }
    }

    /// Bind to `dna` at `now` for `bind_time`, snapping onto it.
    pub fn bind(&mut self, dna: &Dna, now: f64, bind_time: f64) {
        self.state = match dna.kind() {
            DnaKind::Junk => Cas9State::BoundJunk { dna_id: dna.id },
            DnaKind::Virus => Cas9State::BoundVirus { dna_id: dna.id },
        };
        self.bound_until = now + bind_time;
        self.position = dna.position;
    }

    /// Per-tick update while bound. Follows the target (when it can still be
    /// resolved) and detaches once the binding has expired.
    pub fn step_bound(&mut self, target_position: Option<[f64; 2]>, now: f64) -> Option<Release> {
        let release = match self.state {
            Cas9State::Free => return None,
            Cas9State::BoundJunk { dna_id } => Release {
                dna_id,
                kind: DnaKind::Junk,
            },
            Cas9State::BoundVirus { dna_id } => Release {
                dna_id,
                kind: DnaKind::Virus,
            },
        };
        if let Some(position) = target_position {
            self.position = position;
        }
        if now >= self.bound_until {
            self.state = Cas9State::Free;
            return Some(release);
        }
        None
    }

    /// Random-walk step for a free probe.
    pub fn step_free<R: Rng + ?Sized>(
        &mut self,
        arena: &Arena,
        speed: f64,
        turn_probability: f64,
        rng: &mut R,
    ) {
        if !self.alive || !self.is_free() {
            return;
        }
        let (position, direction) =
            arena.reflect_step(self.position, self.direction, self.radius, speed);
        self.position = position;
        self.direction = direction;
        maybe_turn(&mut self.direction, turn_probability, rng);
    }
}
