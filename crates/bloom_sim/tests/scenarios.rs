//! Multi-tick scenarios driven through the public `Simulation` API.

use bloom_core::glam::Vec2;
use bloom_sim::anchor::landmark;
use bloom_sim::frame::SimEvent;
use bloom_sim::ledger::NameTag;
use bloom_sim::particle::StateKind;
use bloom_sim::{AnchorRole, BodyPhase, Landmark, Particle, SimConfig, Simulation};
use std::time::Duration;

/// Standing figure facing the camera; unused slots are invisible.
fn pose() -> Vec<Landmark> {
    let mut points = vec![Landmark::with_visibility(0.5, 0.5, 0.0); 33];
    points[landmark::NOSE] = Landmark::with_visibility(0.5, 0.2, 1.0);
    points[landmark::LEFT_ELBOW] = Landmark::with_visibility(0.35, 0.45, 1.0);
    points[landmark::LEFT_WRIST] = Landmark::with_visibility(0.35, 0.45, 1.0);
    points[landmark::RIGHT_ELBOW] = Landmark::with_visibility(0.65, 0.45, 1.0);
    points[landmark::RIGHT_WRIST] = Landmark::with_visibility(0.65, 0.45, 1.0);
    points[landmark::RIGHT_ANKLE] = Landmark::with_visibility(0.55, 0.9, 1.0);
    points[landmark::LEFT_FOOT_INDEX] = Landmark::with_visibility(0.45, 0.92, 1.0);
    points
}

fn tracking_sim(seed: u64) -> Simulation {
    let config = SimConfig {
        seed: Some(seed),
        ..SimConfig::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    sim.start_tracking();
    sim
}

fn still(position: Vec2, color: bloom_sim::Rgb) -> Particle {
    Particle::new(position, Vec2::ZERO, color, 10.0, 0.0005)
}

/// One particle per non-head color, parked along the top edge.
fn bystanders(sim: &Simulation) -> Vec<Particle> {
    AnchorRole::ALL
        .iter()
        .filter(|role| **role != AnchorRole::Head)
        .enumerate()
        .map(|(i, role)| {
            still(
                Vec2::new(100.0 + 150.0 * i as f32, 60.0),
                sim.session().palette.color(*role),
            )
        })
        .collect()
}

fn head_anchor(sim: &Simulation) -> bloom_sim::ResolvedAnchor {
    *sim.anchors()
        .iter()
        .find(|a| a.role == AnchorRole::Head)
        .unwrap()
}

#[test]
fn test_same_color_particle_bonds_within_200ms() {
    let mut sim = tracking_sim(1);
    let pose = pose();
    let frame = sim.step(Some(&pose));
    assert_eq!(frame.phase, BodyPhase::Tracking);
    assert_eq!(frame.anchors.len(), 5);

    let head = head_anchor(&sim);
    let mut population = vec![still(head.position + Vec2::new(6.0, 0.0), head.color)];
    population.extend(bystanders(&sim));
    sim.replace_particles(population);

    let mut bonded = false;
    let mut ticks = 0;
    while ticks < 12 {
        let frame = sim.step(Some(&pose));
        bonded |= frame.events.iter().any(|e| {
            matches!(
                e,
                SimEvent::Bonded {
                    role: AnchorRole::Head,
                    particle: 0
                }
            )
        });
        ticks += 1;
    }

    assert!(bonded);
    assert_eq!(sim.particles()[0].connected_role(), Some(AnchorRole::Head));
    assert!(sim.timers().get(AnchorRole::Head).is_started());
}

#[test]
fn test_lost_tracking_holds_last_anchors() {
    let mut sim = tracking_sim(2);
    let pose = pose();
    sim.step(Some(&pose));
    let head = head_anchor(&sim);

    let frame = sim.step(None);
    assert!(frame.tracking_lost);
    assert_eq!(frame.phase, BodyPhase::Lost);
    let held = frame.anchor(AnchorRole::Head).unwrap();
    assert!((held.position - head.position).length() < 1e-3);

    let frame = sim.step(Some(&pose));
    assert!(!frame.tracking_lost);
}

#[test]
fn test_all_groups_expired_collapses_and_respawns() {
    let mut sim = tracking_sim(3);
    let pose = pose();
    let palette = *sim.session().palette.colors();
    let grid: Vec<Particle> = (0..6)
        .flat_map(|row| (0..10).map(move |col| (row, col)))
        .map(|(row, col)| {
            still(
                Vec2::new(440.0 + 40.0 * col as f32, 60.0 + 40.0 * row as f32),
                palette[(row * 10 + col) % palette.len()],
            )
        })
        .collect();
    sim.replace_particles(grid);
    sim.step(Some(&pose));
    let username = sim.session().username.clone();
    let session = sim.session().id;

    // Every group was observed on the first tick; 26 s exceeds any duration.
    let frame = sim.tick(Duration::from_secs(26), Some(&pose));
    let now = sim.now_ms();
    let BodyPhase::Dead { wake_at } = frame.phase else {
        panic!("expected Dead, got {:?}", frame.phase);
    };
    assert!((wake_at - (now + 15_000.0)).abs() < 1e-6);
    assert_eq!(frame.count_state(StateKind::Collapsing), frame.particles.len());
    assert!(frame
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::BodyDied { .. })));
    assert!(frame.anchors.is_empty());

    // Still dead just before the wake time.
    let frame = sim.tick(Duration::from_millis(14_000), None);
    assert!(frame.phase.is_dead());

    let frame = sim.tick(Duration::from_millis(1_001), None);
    assert!(frame
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::SessionStarted { .. })));
    assert_eq!(sim.session().id, session + 1);
    assert_eq!(sim.phase(), BodyPhase::Lost);
    for role in AnchorRole::ALL {
        assert!(!sim.timers().get(role).is_started());
    }
    assert!(sim.name_tags().is_empty());
    assert!(sim.ledger().find(&username).is_some());
}

#[test]
fn test_new_session_clears_worn_name_tags() {
    let mut config = SimConfig {
        seed: Some(4),
        ..SimConfig::default()
    };
    config.particles.name_tag_chance_per_name = 1.0;
    let mut sim = Simulation::new(config).unwrap();
    sim.start_tracking();
    sim.step(Some(&pose()));
    sim.force_death();
    assert!(sim.phase().is_dead());
    assert_eq!(sim.ledger().len(), 1);

    // Rebuilt population draws the archived name.
    sim.resize(1280.0, 720.0).unwrap();
    assert_eq!(sim.name_tags().len(), 1);
    let worn = sim
        .particles()
        .iter()
        .filter(|p| p.name_tag.is_some())
        .count();
    assert_eq!(worn, 1);

    // Hold everyone still so nothing respawns and redraws the name.
    for (i, particle) in sim.particles_mut().iter_mut().enumerate() {
        let (col, row) = ((i % 10) as f32, (i / 10) as f32);
        particle.position = Vec2::new(100.0 + 100.0 * col, 100.0 + 80.0 * row);
        particle.velocity = Vec2::ZERO;
    }

    sim.tick(Duration::from_millis(15_001), None);
    assert!(sim.name_tags().is_empty());
    assert!(sim.particles().iter().all(|p| p.name_tag.is_none()));
}

#[test]
fn test_tagged_particle_greets_on_bond() {
    let mut sim = tracking_sim(5);
    let pose = pose();
    sim.step(Some(&pose));
    sim.force_death();
    let departed = sim.session().username.clone();
    let died_at = sim.now_ms();
    sim.tick(Duration::from_millis(15_001), None);
    sim.step(Some(&pose));

    let head = head_anchor(&sim);
    let mut greeter = still(head.position + Vec2::new(0.0, -5.0), head.color);
    greeter.name_tag = Some(NameTag {
        name: departed.clone(),
        since: died_at,
    });
    let mut population = vec![greeter];
    population.extend(bystanders(&sim));
    sim.replace_particles(population);

    let mut greeting = None;
    let mut bubbles = 0;
    for _ in 0..12 {
        let frame = sim.step(Some(&pose));
        if let Some(SimEvent::Greeting(g)) = frame
            .events
            .iter()
            .find(|e| matches!(e, SimEvent::Greeting(_)))
        {
            greeting = Some(g.clone());
            bubbles = frame.bubbles.len();
        }
    }

    let greeting = greeting.unwrap();
    assert_eq!(greeting.name, departed);
    assert_eq!(greeting.minutes_ago, 1);
    assert!(greeting.node_line.ends_with("I was here 1 minute(s) ago."));
    assert_eq!(bubbles, 2);
    assert!(sim.particles()[0].has_greeted);
}

#[test]
fn test_absorbed_particle_returns_fresh() {
    let mut sim = tracking_sim(6);
    let pose = pose();
    sim.step(Some(&pose));

    let head = head_anchor(&sim);
    let mut target = still(head.position + Vec2::new(-40.0, -60.0), head.color);
    target.life = 0.3;
    target.name_tag = Some(NameTag {
        name: "Wanderer".into(),
        since: 0.0,
    });
    let mut population = vec![target];
    population.extend(bystanders(&sim));
    sim.replace_particles(population);

    assert!(sim.begin_absorbing(0, AnchorRole::Head));
    assert_eq!(sim.particles()[0].kind(), StateKind::Absorbing);

    let mut absorbed = false;
    for _ in 0..200 {
        let frame = sim.step(Some(&pose));
        if frame
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::Absorbed { particle: 0 }))
        {
            absorbed = true;
            break;
        }
        let alpha = frame.particles[0].alpha;
        assert!(alpha >= 0.1 - 1e-6);
    }

    assert!(absorbed);
    let particle = &sim.particles()[0];
    assert!(particle.is_free());
    assert_eq!(particle.life, 1.0);
    assert!(particle.name_tag.is_none());
}

#[test]
fn test_life_and_state_stay_consistent_over_long_run() {
    let mut sim = tracking_sim(7);
    let pose = pose();
    for tick in 0..2_000 {
        let input = if tick % 50 < 40 { Some(pose.as_slice()) } else { None };
        let frame = sim.step(input);
        for particle in sim.particles() {
            assert!((0.0..=1.0).contains(&particle.life));
        }
        let total: usize = [
            StateKind::Free,
            StateKind::Connected,
            StateKind::Absorbing,
            StateKind::Collapsing,
        ]
        .iter()
        .map(|s| frame.count_state(*s))
        .sum();
        assert_eq!(total, frame.particles.len());
    }

    let mut names: Vec<&str> = sim.particles().iter().filter_map(|p| p.tag_name()).collect();
    let before = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), before);
}
