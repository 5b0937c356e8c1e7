use super::*;
use crate::cas9::{Cas9, Cas9State};
use crate::dna::Dna;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

/// Nothing moves or turns; populations come from the agents passed in.
fn still_config() -> SimConfig {
    SimConfig {
        num_junk: 0,
        num_virus: 0,
        num_cas9: 0,
        cas9_speed: 0.0,
        dna_turn_probability: 0.0,
        cas9_turn_probability: 0.0,
        ..SimConfig::default()
    }
}

fn probe(id: u32, position: [f64; 2]) -> Cas9 {
    Cas9::new(id, position, 20.0, [1.0, 0.0])
}

fn junk(id: u32, position: [f64; 2], bind_time: Option<f64>) -> Dna {
    Dna::junk(id, position, 10.0, [1.0, 0.0], bind_time)
}

fn virus(id: u32, position: [f64; 2], bind_time: Option<f64>) -> Dna {
    Dna::virus(id, position, 10.0, [1.0, 0.0], bind_time)
}

fn find_dna(world: &World, id: u32) -> &Dna {
    world
        .dna()
        .iter()
        .find(|d| d.id == id)
        .expect("dna should be alive")
}

fn free_probe_ids(world: &World) -> HashSet<u32> {
    world
        .cas9()
        .iter()
        .filter(|c| c.is_free())
        .map(|c| c.id)
        .collect()
}

/// Checks that must hold between any two ticks. `walked` holds the probes that
/// were free going into the tick, i.e. the ones that took a random-walk step.
fn assert_tick_invariants(world: &World, walked: &HashSet<u32>) {
    let config = world.config();
    let mut holders: HashMap<u32, u32> = HashMap::new();
    for c in world.cas9() {
        assert!(c.alive, "dead probes are pruned at end of tick");
        match c.bound_dna() {
            None if walked.contains(&c.id) => {
                assert!(
                    c.position[0] >= c.radius
                        && c.position[0] <= config.width - c.radius
                        && c.position[1] >= c.radius
                        && c.position[1] <= config.height - c.radius,
                    "free probe {} escaped: {:?}",
                    c.id,
                    c.position
                );
            }
            None => {}
            Some(dna_id) => {
                assert!(
                    holders.insert(dna_id, c.id).is_none(),
                    "dna {dna_id} has two probes bound"
                );
                let target = find_dna(world, dna_id);
                assert_eq!(c.position, target.position, "bound probe must track its target");
            }
        }
    }
    for d in world.dna() {
        assert!(d.alive, "dead targets are pruned at end of tick");
        assert!(
            d.position[0] >= d.radius
                && d.position[0] <= config.width - d.radius
                && d.position[1] >= d.radius
                && d.position[1] <= config.height - d.radius,
            "dna {} escaped: {:?}",
            d.id,
            d.position
        );
        assert_eq!(
            d.occupied,
            holders.contains_key(&d.id),
            "occupied flag of dna {} out of sync",
            d.id
        );
    }
}

#[test]
fn new_populates_requested_counts() {
    let world = World::new(SimConfig::default()).unwrap();
    let stats = world.population_stats();
    assert_eq!(stats.junk, 100);
    assert_eq!(stats.virus, 15);
    assert_eq!(stats.free_cas9, 15);
    assert_eq!(stats.bound_cas9, 0);

    for d in world.dna() {
        match d.kind() {
            DnaKind::Junk => {
                assert!(d.junk_bind_time().is_some());
                assert!(d.virus_bind_time().is_none());
            }
            DnaKind::Virus => {
                assert!(d.junk_bind_time().is_none());
                let t = d.virus_bind_time().expect("virus dwell time sampled");
                assert!(t > 0.0 && t < 12.0);
            }
        }
    }
    assert!(world.dna().windows(2).all(|w| w[0].id < w[1].id));
    assert_tick_invariants(&world, &free_probe_ids(&world));
}

#[test]
fn new_returns_err_on_invalid_config() {
    let config = SimConfig {
        success_prob: -0.5,
        ..SimConfig::default()
    };
    assert!(matches!(
        World::new(config),
        Err(WorldInitError::Config(SimConfigError::InvalidSuccessProb))
    ));
}

#[test]
fn same_seed_reproduces_run() {
    let a = World::new(SimConfig::default()).unwrap().run_to_completion();
    let b = World::new(SimConfig::default()).unwrap().run_to_completion();
    assert_eq!(a.capture_times, b.capture_times);
    assert_eq!(a.check_times, b.check_times);
    assert_eq!(a.final_stats, b.final_stats);
}

#[test]
fn fixed_dt_run_covers_duration() {
    let mut world = World::new(SimConfig::default()).unwrap();
    let summary = world.run_to_completion();
    assert!(world.is_finished());
    assert!((500..=501).contains(&summary.steps), "steps = {}", summary.steps);
    assert_eq!(summary.capture_histogram.counts.len(), 2);
    assert_eq!(summary.kills, summary.capture_times.len());
    assert_eq!(summary.kills, summary.capture_histogram.total());
    assert_eq!(summary.junk_checks, summary.check_histogram.total());
}

#[test]
fn empty_world_runs_and_reports_zero_density() {
    let config = SimConfig {
        num_junk: 0,
        num_virus: 0,
        num_cas9: 0,
        ..SimConfig::default()
    };
    let summary = World::new(config).unwrap().run_to_completion();
    assert_eq!(summary.kill_density, 0.0);
    assert_eq!(summary.kills, 0);
    assert_eq!(summary.junk_checks, 0);
    assert_eq!(summary.final_stats, PopulationStats::default());
}

#[test]
fn probes_without_targets_just_wander() {
    let config = SimConfig {
        num_junk: 0,
        num_virus: 0,
        num_cas9: 10,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();
    for _ in 0..200 {
        let walked = free_probe_ids(&world);
        assert_eq!(world.step(), StepEvents::default());
        assert_tick_invariants(&world, &walked);
    }
    assert_eq!(world.cas9().len(), 10);
}

#[test]
fn junk_release_and_cooldown_timeline() {
    let bind = 0.125;
    let config = still_config();
    let cooldown = config.cooldown_junk;
    let dna = vec![junk(0, [500.0, 500.0], Some(bind))];
    let mut world = World::from_agents(dna, vec![probe(0, [500.0, 500.0])], config).unwrap();

    let events = world.step_at(0.0);
    assert_eq!(events.checks, 1);
    assert_eq!(world.cas9()[0].state, Cas9State::BoundJunk { dna_id: 0 });
    assert_eq!(world.cas9()[0].bound_until, bind);
    assert!(world.dna()[0].occupied);

    world.step_at(bind / 2.0);
    assert!(!world.cas9()[0].is_free());

    let release_at = 0.0 + bind;
    let events = world.step_at(release_at);
    assert_eq!(events.releases, 1);
    assert_eq!(events.checks, 0, "released junk is cooling down");
    assert!(world.cas9()[0].is_free());
    assert!(!world.dna()[0].occupied);
    let reopen_at = release_at + cooldown;
    assert_eq!(world.dna()[0].cooldown_until, reopen_at);

    world.step_at(reopen_at - 0.01);
    assert!(world.cas9()[0].is_free());

    let events = world.step_at(reopen_at);
    assert_eq!(events.checks, 1);
    assert_eq!(world.check_times(), &[0.0, reopen_at]);
}

#[test]
fn junk_fallback_bind_time_is_used_when_unsampled() {
    let config = still_config();
    let fallback = config.bind_time_junk;
    let dna = vec![junk(0, [500.0, 500.0], None)];
    let mut world = World::from_agents(dna, vec![probe(0, [500.0, 500.0])], config).unwrap();
    world.step_at(0.5);
    assert_eq!(world.cas9()[0].bound_until, 0.5 + fallback);
}

#[test]
fn engaged_junk_is_held_exclusively() {
    let dna = vec![junk(0, [500.0, 500.0], Some(1.0))];
    let cas9 = vec![probe(0, [500.0, 500.0]), probe(1, [505.0, 500.0])];
    let mut world = World::from_agents(dna, cas9, still_config()).unwrap();
    let events = world.step_at(0.0);
    assert_eq!(events.checks, 1);
    assert!(!world.cas9()[0].is_free());
    assert!(world.cas9()[1].is_free());
    let walked = free_probe_ids(&world);
    world.step_at(0.5);
    assert!(world.cas9()[1].is_free());
    assert_tick_invariants(&world, &walked);
}

#[test]
fn certain_success_cuts_every_contacted_virus() {
    let config = SimConfig {
        success_prob: 1.0,
        ..still_config()
    };
    let spots = [[100.0, 100.0], [300.0, 300.0], [500.0, 500.0]];
    let mut dna: Vec<Dna> = spots
        .iter()
        .enumerate()
        .map(|(i, &p)| virus(i as u32, p, Some(5.0)))
        .collect();
    dna.push(junk(10, [900.0, 900.0], None));
    let cas9 = spots
        .iter()
        .enumerate()
        .map(|(i, &p)| probe(i as u32, p))
        .collect();
    let mut world = World::from_agents(dna, cas9, config).unwrap();

    let probes_before = world.cas9().len();
    let events = world.step();
    assert_eq!(events.captures, 3);
    assert_eq!(world.cas9().len() + events.captures, probes_before);
    assert_eq!(world.population_stats().virus, 0);
    assert_eq!(world.population_stats().junk, 1);
    assert_eq!(world.capture_times(), &[0.0, 0.0, 0.0]);
    assert_eq!(world.kill_density(), 1.0);
}

#[test]
fn certain_success_clears_viruses_in_long_run() {
    let config = SimConfig {
        width: 200.0,
        height: 200.0,
        num_junk: 0,
        num_virus: 5,
        num_cas9: 10,
        success_prob: 1.0,
        experiment_duration: 60.0,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();
    let summary = world.run_to_completion();
    assert_eq!(summary.final_stats.virus, 0);
    assert_eq!(summary.kills, 5);
    assert_eq!(summary.kill_density, 1.0);
    assert_eq!(summary.final_stats.free_cas9, 5);
}

#[test]
fn zero_success_virus_cycles_occupied_cooldown_free() {
    let config = SimConfig {
        success_prob: 0.0,
        ..still_config()
    };
    let time_scale = config.time_scale;
    let virus_cooldown = config.cooldown_virus_fail;
    let dna = vec![virus(0, [500.0, 500.0], Some(1.0))];
    let cas9 = vec![probe(0, [500.0, 500.0]), probe(1, [510.0, 500.0])];
    let mut world = World::from_agents(dna, cas9, config).unwrap();

    let events = world.step_at(0.0);
    assert_eq!(events.failed_recognitions, 1);
    assert_eq!(events.captures, 0);
    let v = &world.dna()[0];
    assert!(v.occupied);
    assert_eq!(v.cooldown_until, virus_cooldown);
    assert_eq!(world.cas9()[0].state, Cas9State::BoundVirus { dna_id: 0 });
    assert_eq!(world.cas9()[0].bound_until, 1.0 * time_scale);
    assert!(world.cas9()[1].is_free(), "occupied virus blocks other probes");

    let dwell_end = 1.0 * time_scale;
    world.step_at(dwell_end / 2.0);
    assert!(world.dna()[0].occupied);
    assert!(world.cas9()[1].is_free());

    let events = world.step_at(dwell_end);
    assert_eq!(events.releases, 1);
    assert!(!world.dna()[0].occupied);
    assert!(world.cas9().iter().all(|c| c.is_free()), "still cooling down");

    let events = world.step_at(virus_cooldown);
    assert_eq!(events.failed_recognitions, 1);
    assert!(world.dna()[0].occupied);
    assert_eq!(world.population_stats().virus, 1);
    assert!(world.capture_times().is_empty());
}

#[test]
fn zero_success_never_loses_a_virus() {
    let config = SimConfig {
        width: 300.0,
        height: 300.0,
        num_junk: 20,
        num_virus: 10,
        num_cas9: 20,
        success_prob: 0.0,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();
    let mut failed = 0;
    while !world.is_finished() {
        failed += world.step().failed_recognitions;
        assert_eq!(world.population_stats().virus, 10);
        assert_eq!(world.cas9().len(), 20);
    }
    assert!(failed > 0, "a dense arena should produce contacts");
    assert_eq!(world.kill_density(), 0.0);
}

#[test]
fn virus_fallback_bind_time_skips_time_scale() {
    let config = SimConfig {
        success_prob: 0.0,
        ..still_config()
    };
    let fallback = config.bind_time_virus;
    let dna = vec![virus(0, [500.0, 500.0], None)];
    let mut world = World::from_agents(dna, vec![probe(0, [500.0, 500.0])], config).unwrap();
    world.step_at(1.0);
    assert_eq!(world.cas9()[0].bound_until, 1.0 + fallback);
}

#[test]
fn bound_probe_tracks_moving_target() {
    let config = SimConfig {
        dna_turn_probability: 0.0,
        cas9_turn_probability: 0.0,
        ..still_config()
    };
    let config = SimConfig {
        cas9_speed: 20.0,
        ..config
    };
    let dna = vec![junk(0, [500.0, 500.0], Some(5.0))];
    let cas9 = vec![Cas9::new(0, [500.0, 500.0], 20.0, [0.0, 1.0])];
    let mut world = World::from_agents(dna, cas9, config).unwrap();

    world.step();
    assert!(!world.cas9()[0].is_free());
    for _ in 0..20 {
        world.step();
        assert_eq!(world.cas9()[0].position, world.dna()[0].position);
    }
    assert!(world.dna()[0].position[0] > 500.0);
}

#[test]
fn collision_buffer_extends_reach() {
    let dna = vec![junk(0, [500.0, 500.0], Some(1.0))];
    let cas9 = vec![probe(0, [535.0, 500.0])];
    let mut world = World::from_agents(dna.clone(), cas9.clone(), still_config()).unwrap();
    assert_eq!(world.step().checks, 0);

    let config = SimConfig {
        collision_buffer: 5.0,
        ..still_config()
    };
    let mut world = World::from_agents(dna, cas9, config).unwrap();
    assert_eq!(world.step().checks, 1);
}

#[test]
fn probe_resolves_at_most_one_contact_per_tick() {
    let dna = vec![
        junk(0, [500.0, 500.0], Some(1.0)),
        junk(1, [505.0, 500.0], Some(1.0)),
    ];
    let mut world = World::from_agents(dna, vec![probe(0, [502.0, 500.0])], still_config()).unwrap();
    let events = world.step();
    assert_eq!(events.checks, 1);
    assert_eq!(world.cas9()[0].bound_dna(), Some(0), "targets are scanned in id order");
}

#[test]
fn step_at_never_moves_clock_backwards() {
    let mut world = World::from_agents(Vec::new(), Vec::new(), still_config()).unwrap();
    world.step_at(3.0);
    world.step_at(1.0);
    assert_eq!(world.time(), 3.0);
    assert_eq!(world.step_index(), 2);
}

#[test]
fn frame_tags_follow_binding_state() {
    let config = SimConfig {
        success_prob: 0.0,
        ..still_config()
    };
    let dna = vec![
        junk(0, [100.0, 100.0], Some(1.0)),
        virus(1, [500.0, 500.0], Some(1.0)),
    ];
    let cas9 = vec![
        probe(0, [100.0, 100.0]),
        probe(1, [500.0, 500.0]),
        probe(2, [900.0, 900.0]),
    ];
    let mut world = World::from_agents(dna, cas9, config).unwrap();
    world.step();
    let frame = world.frame();
    let tags: Vec<AgentTag> = frame.agents.iter().map(|a| a.tag).collect();
    assert_eq!(
        tags,
        vec![
            AgentTag::JunkDna,
            AgentTag::VirusDna,
            AgentTag::Cas9CheckingJunk,
            AgentTag::Cas9StalledOnVirus,
            AgentTag::FreeCas9,
        ]
    );
    assert_eq!(frame.stats.bound_cas9, 2);
    assert_eq!(frame.stats.free_cas9, 1);
    assert_eq!(frame.time, world.time());
}

#[test]
fn from_agents_rejects_inconsistent_inputs() {
    let config = still_config();
    assert_eq!(
        World::from_agents(
            vec![junk(1, [100.0, 100.0], None), junk(1, [200.0, 200.0], None)],
            Vec::new(),
            config.clone()
        )
        .err(),
        Some(WorldInitError::DuplicateDnaId(1))
    );
    assert_eq!(
        World::from_agents(
            Vec::new(),
            vec![probe(4, [100.0, 100.0]), probe(4, [200.0, 200.0])],
            config.clone()
        )
        .err(),
        Some(WorldInitError::DuplicateCas9Id(4))
    );
    assert_eq!(
        World::from_agents(vec![junk(2, [5.0, 100.0], None)], Vec::new(), config.clone()).err(),
        Some(WorldInitError::AgentOutOfBounds { id: 2 })
    );

    let mut stray = probe(0, [100.0, 100.0]);
    stray.state = Cas9State::BoundJunk { dna_id: 9 };
    assert_eq!(
        World::from_agents(Vec::new(), vec![stray], config.clone()).err(),
        Some(WorldInitError::UnknownBoundTarget {
            cas9_id: 0,
            dna_id: 9
        })
    );

    let mut wrong_kind = probe(0, [100.0, 100.0]);
    wrong_kind.state = Cas9State::BoundVirus { dna_id: 0 };
    assert_eq!(
        World::from_agents(
            vec![junk(0, [100.0, 100.0], None)],
            vec![wrong_kind],
            config.clone()
        )
        .err(),
        Some(WorldInitError::BoundStateMismatch {
            cas9_id: 0,
            dna_id: 0
        })
    );

    let mut a = probe(0, [100.0, 100.0]);
    let mut b = probe(1, [100.0, 100.0]);
    a.state = Cas9State::BoundJunk { dna_id: 0 };
    b.state = Cas9State::BoundJunk { dna_id: 0 };
    assert_eq!(
        World::from_agents(vec![junk(0, [100.0, 100.0], None)], vec![a, b], config).err(),
        Some(WorldInitError::TargetBoundTwice { dna_id: 0 })
    );
}

#[test]
fn from_agents_marks_prebound_targets_occupied() {
    let mut c = probe(0, [100.0, 100.0]);
    c.state = Cas9State::BoundVirus { dna_id: 3 };
    c.bound_until = 1.0;
    let world = World::from_agents(
        vec![virus(3, [100.0, 100.0], Some(2.0))],
        vec![c],
        still_config(),
    )
    .unwrap();
    assert!(world.dna()[0].occupied);
    assert_eq!(world.population_stats().bound_cas9, 1);
}

#[test]
fn dense_run_keeps_tick_invariants() {
    let config = SimConfig {
        width: 300.0,
        height: 300.0,
        num_junk: 60,
        num_virus: 20,
        num_cas9: 30,
        success_prob: 0.5,
        experiment_duration: 5.0,
        ..SimConfig::default()
    };
    let mut world = World::new(config).unwrap();
    let mut last_virus = world.population_stats().virus;
    while !world.is_finished() {
        let probes_before = world.cas9().len();
        let walked = free_probe_ids(&world);
        let events = world.step();
        assert_eq!(world.cas9().len() + events.captures, probes_before);
        let virus_now = world.population_stats().virus;
        assert_eq!(virus_now + events.captures, last_virus);
        last_virus = virus_now;
        assert_tick_invariants(&world, &walked);
    }
    let summary = world.summary();
    assert_eq!(summary.kills, 20 - summary.final_stats.virus);
    assert!(summary.failed_recognitions > 0);
    assert!(summary.junk_checks > 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn proptest_kill_density_is_a_fraction(
        seed in any::<u64>(),
        num_virus in 0usize..12,
        num_cas9 in 0usize..12,
        num_junk in 0usize..30,
        success_prob in 0.0f64..=1.0,
    ) {
        let config = SimConfig {
            seed,
            width: 250.0,
            height: 250.0,
            num_virus,
            num_cas9,
            num_junk,
            success_prob,
            experiment_duration: 2.0,
            ..SimConfig::default()
        };
        let summary = World::new(config).unwrap().run_to_completion();
        prop_assert!((0.0..=1.0).contains(&summary.kill_density));
        prop_assert!(summary.kills <= num_virus.min(num_cas9));
        if num_virus == 0 {
            prop_assert_eq!(summary.kill_density, 0.0);
        }
    }
}
