use super::super::{dna_index, StepEvents, World};
use tracing::trace;

impl World {
    /// Move every target, then every probe. Bound probes follow their target
    /// and detach once their dwell has run out.
    pub(in crate::world) fn step_movement_phase(&mut self, now: f64, events: &mut StepEvents) {
        let config = &self.config;
        let arena = self.arena;
        let rng = &mut self.rng;
        let dna_step = config.cas9_speed * config.dna_speed_factor;

        for dna in &mut self.dna {
            dna.move_step(&arena, dna_step, config.dna_turn_probability, rng);
        }

        let dna = &mut self.dna;
        for cas9 in self.cas9.iter_mut().filter(|c| c.alive) {
            let Some(dna_id) = cas9.bound_dna() else {
                cas9.step_free(&arena, config.cas9_speed, config.cas9_turn_probability, rng);
                continue;
            };
            let target = dna_index(dna, dna_id).filter(|&idx| dna[idx].alive);
            let Some(release) = cas9.step_bound(target.map(|idx| dna[idx].position), now) else {
                continue;
            };
            if let Some(idx) = target {
                dna[idx].release(now, config.cooldown_junk);
            }
            events.releases += 1;
            trace!(time = now, cas9 = cas9.id, dna = release.dna_id, kind = ?release.kind, "release");
        }
    }
}
