use super::super::{StepEvents, World};
use crate::dna::DnaKind;
use crate::motion::distance;
use rand::Rng;
use tracing::trace;

impl World {
    /// Resolve contacts between free probes and engageable targets.
    ///
    /// Probes and targets are scanned in storage order; each probe resolves at
    /// most one contact per tick.
    pub(in crate::world) fn step_collision_phase(&mut self, now: f64, events: &mut StepEvents) {
        let config = &self.config;

        for cas9 in self.cas9.iter_mut() {
            if !cas9.alive || !cas9.is_free() {
                continue;
            }
            for dna in self.dna.iter_mut() {
                if !dna.is_engageable(now) {
                    continue;
                }
                let reach = cas9.radius + dna.radius + config.collision_buffer;
                if distance(cas9.position, dna.position) > reach {
                    continue;
                }

                match dna.kind() {
                    DnaKind::Junk => {
                        self.check_times.push(now);
                        events.checks += 1;
                        let bind_time = dna.junk_bind_time().unwrap_or(config.bind_time_junk);
                        dna.occupied = true;
                        cas9.bind(dna, now, bind_time);
                        trace!(time = now, cas9 = cas9.id, dna = dna.id, bind_time, "junk check");
                    }
                    DnaKind::Virus => {
                        let p: f64 = self.rng.random();
                        if p < config.success_prob {
                            self.capture_times.push(now);
                            events.captures += 1;
                            dna.alive = false;
                            cas9.alive = false;
                            trace!(time = now, cas9 = cas9.id, dna = dna.id, "virus cut");
                        } else {
                            let bind_time = dna
                                .virus_bind_time()
                                .map(|t| t * config.time_scale)
                                .unwrap_or(config.bind_time_virus);
                            dna.occupied = true;
                            dna.cooldown_until = now + config.cooldown_virus_fail;
                            cas9.bind(dna, now, bind_time);
                            self.failed_recognitions += 1;
                            events.failed_recognitions += 1;
                            trace!(time = now, cas9 = cas9.id, dna = dna.id, bind_time, "failed recognition");
                        }
                    }
                }
                break;
            }
        }
    }
}
