//! Simulation context
//!
//! Owns every piece of mutable state: particles, the name ledger and active
//! tags, the session controller with its group timers, and the speech
//! bubbles. One call to [`Simulation::tick`] per display frame advances it.
//!
//! Within a tick, anchor forces are applied to all particles before any
//! particle integrates, so a bond made this tick already shapes this tick's
//! motion.

use crate::anchor::AnchorRole;
use crate::config::{ConfigError, SimConfig};
use crate::frame::{BadgeView, Frame, ParticleView, SimEvent};
use crate::group_timer::GroupTimers;
use crate::interaction::{ConnectionEdge, InteractionResolver, ResolvedAnchor};
use crate::ledger::{minutes_ago, Greeting, NameLedger, NameTags, SpeechBubbles};
use crate::palette::Rgb;
use crate::particle::{apply_anti_collision, Particle, Respawn, SpawnContext, StateKind};
use crate::projection::{apply_hand_blend, Landmark, LandmarkSmoother, Projection};
use crate::session::{BodyPhase, BodySession, SessionController};
use bloom_core::math::{sim_rng, SimRng};
use bloom_core::time::{Millis, SimulationTime, TICK_DURATION};
use glam::Vec2;
use rand::seq::{IteratorRandom, SliceRandom};
use std::time::Duration;

/// Speech bubble placement relative to the speaker.
const USER_BUBBLE_OFFSET: Vec2 = Vec2::new(12.0, -60.0);
const NODE_BUBBLE_OFFSET: Vec2 = Vec2::new(12.0, -40.0);

pub struct Simulation {
    config: SimConfig,
    clock: SimulationTime,
    rng: SimRng,
    particles: Vec<Particle>,
    ledger: NameLedger,
    tags: NameTags,
    controller: SessionController,
    resolver: InteractionResolver,
    smoother: LandmarkSmoother,
    /// Hand-blended landmarks from the most recent non-empty input.
    last_landmarks: Option<Vec<Landmark>>,
    anchors: Vec<ResolvedAnchor>,
    bubbles: SpeechBubbles,
    events: Vec<SimEvent>,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = sim_rng(config.seed);
        let controller = SessionController::new(&config, 0.0, &mut rng);

        let mut sim = Self {
            resolver: InteractionResolver::new(&config),
            smoother: LandmarkSmoother::new(config.projection.smoothing),
            clock: SimulationTime::new(),
            rng,
            particles: Vec::new(),
            ledger: NameLedger::new(),
            tags: NameTags::new(),
            controller,
            last_landmarks: None,
            anchors: Vec::new(),
            bubbles: SpeechBubbles::default(),
            events: Vec::new(),
            config,
        };
        sim.reinitialize_population();
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    /// Swap in a new population. Tags worn by the outgoing particles are
    /// released. Incoming tags are reserved; a name already worn is dropped.
    pub fn replace_particles(&mut self, particles: Vec<Particle>) {
        for particle in &mut self.particles {
            particle.release_tag(&mut self.tags);
        }
        self.particles = particles;
        for particle in &mut self.particles {
            let taken = particle
                .name_tag
                .as_ref()
                .is_some_and(|tag| !self.tags.reserve(&tag.name));
            if taken {
                particle.name_tag = None;
            }
        }
    }

    pub fn ledger(&self) -> &NameLedger {
        &self.ledger
    }

    pub fn name_tags(&self) -> &NameTags {
        &self.tags
    }

    pub fn session(&self) -> &BodySession {
        self.controller.session()
    }

    pub fn phase(&self) -> BodyPhase {
        self.controller.phase()
    }

    pub fn timers(&self) -> &GroupTimers {
        self.controller.timers()
    }

    /// Anchors resolved on the last tick.
    pub fn anchors(&self) -> &[ResolvedAnchor] {
        &self.anchors
    }

    /// Advance one fixed 60 Hz tick.
    pub fn step(&mut self, landmarks: Option<&[Landmark]>) -> Frame {
        self.tick(TICK_DURATION, landmarks)
    }

    /// Advance by `dt` and apply this tick's pose input.
    ///
    /// `None` or an empty slice means no body was detected this tick; the
    /// last landmarks seen are held and the frame is marked tracking-lost.
    pub fn tick(&mut self, dt: Duration, landmarks: Option<&[Landmark]>) -> Frame {
        self.clock.advance(dt);
        let now = self.clock.now_ms();

        if self.particles.is_empty() {
            tracing::warn!("particle population empty, reinitializing");
            self.reinitialize_population();
        }

        if self.controller.wake_due(now) {
            self.begin_session(now);
        }

        let connections = self.track(landmarks, now);

        let phase = self.controller.phase();
        if matches!(phase, BodyPhase::Tracking | BodyPhase::Lost)
            && self.controller.timers().all_expired(now)
        {
            self.die(now);
        }

        self.integrate_particles();
        self.ensure_body_colors();

        self.bubbles.prune(now);
        self.controller.badge_mut().update(self.config.canvas.height);

        self.build_frame(now, connections)
    }

    /// Resolve anchors from this tick's input and run the interaction pass.
    fn track(&mut self, landmarks: Option<&[Landmark]>, now: Millis) -> Vec<ConnectionEdge> {
        self.anchors.clear();
        if !matches!(self.controller.phase(), BodyPhase::Tracking | BodyPhase::Lost) {
            return Vec::new();
        }

        match landmarks.filter(|l| !l.is_empty()) {
            Some(fresh) => {
                let blended = apply_hand_blend(fresh, self.controller.session().hand_blend);
                for role in AnchorRole::ALL {
                    if blended.get(role.landmark_index()).is_some() {
                        self.controller.timers_mut().observe(role, now, &mut self.rng);
                    }
                }
                self.last_landmarks = Some(blended);
                self.controller.set_phase(BodyPhase::Tracking);
            }
            None => self.controller.set_phase(BodyPhase::Lost),
        }

        let Some(held) = self.last_landmarks.as_deref() else {
            return Vec::new();
        };
        let smoothed = self.smoother.apply(held);
        let canvas = Vec2::new(self.config.canvas.width, self.config.canvas.height);
        let projection = Projection::new(&smoothed, canvas, &self.config.projection);
        self.anchors = ResolvedAnchor::project_all(
            &smoothed,
            &projection,
            self.controller.session(),
            self.controller.timers(),
            now,
        );

        let session_id = self.controller.session().id;
        let resolution = self
            .resolver
            .resolve(&self.anchors, &mut self.particles, session_id, now);

        for bond in &resolution.bonds {
            self.controller
                .timers_mut()
                .refresh(bond.role, now, &mut self.rng);
            self.events.push(SimEvent::Bonded {
                role: bond.role,
                particle: bond.particle,
            });
            self.greet(bond.particle, bond.role, now);
        }

        if let Some(head) = self.anchor(AnchorRole::Head) {
            let position = head.position;
            self.controller.badge_mut().follow(position);
        }
        resolution.edges
    }

    fn anchor(&self, role: AnchorRole) -> Option<&ResolvedAnchor> {
        self.anchors.iter().find(|a| a.role == role)
    }

    /// A tagged particle greets the body the first time it bonds.
    fn greet(&mut self, index: usize, role: AnchorRole, now: Millis) {
        let Some(particle) = self.particles.get_mut(index) else {
            return;
        };
        if particle.has_greeted {
            return;
        }
        let Some(tag) = particle.name_tag.as_ref() else {
            return;
        };
        particle.has_greeted = true;

        let greeting = Greeting::compose(&tag.name, minutes_ago(tag.since, now), &mut self.rng);
        let particle_position = particle.position;
        let speaker = self
            .anchor(AnchorRole::Head)
            .or_else(|| self.anchor(role))
            .map_or(particle_position, |a| a.position);

        let expires_at = now + self.config.timing.bubble_lifetime_ms;
        self.bubbles.push(
            speaker + USER_BUBBLE_OFFSET,
            greeting.user_line.clone(),
            expires_at,
        );
        self.bubbles.push(
            particle_position + NODE_BUBBLE_OFFSET,
            greeting.node_line.clone(),
            expires_at,
        );

        tracing::debug!(
            name = %greeting.name,
            minutes_ago = greeting.minutes_ago,
            "greeting"
        );
        self.events.push(SimEvent::Greeting(greeting));
    }

    /// Every body color stays present on at least one free particle.
    ///
    /// A missing color goes to a free particle whose own color is spare: an
    /// extra color, or a body color some other free particle also carries.
    fn ensure_body_colors(&mut self) {
        let colors = *self.controller.session().palette.colors();
        let free_with = |particles: &[Particle], color: Rgb| {
            particles
                .iter()
                .filter(|p| p.is_free() && p.color == color)
                .count()
        };

        for color in colors {
            if free_with(&self.particles, color) > 0 {
                continue;
            }
            let spare: Vec<usize> = (0..self.particles.len())
                .filter(|&i| {
                    let p = &self.particles[i];
                    p.is_free()
                        && (!colors.contains(&p.color) || free_with(&self.particles, p.color) > 1)
                })
                .collect();
            let candidate = spare.choose(&mut self.rng).copied().or_else(|| {
                (0..self.particles.len())
                    .filter(|&i| self.particles[i].is_free())
                    .choose(&mut self.rng)
            });
            if let Some(index) = candidate {
                let particle = &mut self.particles[index];
                particle.color = color;
                particle.life = 1.0;
                particle.alpha = 1.0;
            }
        }
    }

    fn integrate_particles(&mut self) {
        for i in 0..self.particles.len() {
            apply_anti_collision(&mut self.particles, i, &self.config);
            let mut ctx = SpawnContext {
                config: &self.config,
                ledger: &self.ledger,
                tags: &mut self.tags,
                rng: &mut self.rng,
            };
            if let Some(Respawn::Absorbed) = self.particles[i].update(&mut ctx) {
                tracing::debug!(particle = i, "absorption complete");
                self.events.push(SimEvent::Absorbed { particle: i });
            }
        }
    }

    fn build_frame(&mut self, now: Millis, connections: Vec<ConnectionEdge>) -> Frame {
        let phase = self.controller.phase();
        let frame = Frame {
            tick: self.clock.tick_count(),
            time_ms: now,
            phase,
            tracking_lost: phase == BodyPhase::Lost,
            preset: self.controller.session().preset,
            particles: self.particles.iter().map(ParticleView::from).collect(),
            connections,
            anchors: self.anchors.clone(),
            bubbles: self.bubbles.as_slice().to_vec(),
            badge: BadgeView::from_badge(
                self.controller.badge(),
                &self.controller.session().username,
            ),
            events: std::mem::take(&mut self.events),
        };
        tracing::trace!(
            tick = frame.tick,
            free = frame.count_state(StateKind::Free),
            connected = frame.count_state(StateKind::Connected),
            collapsing = frame.count_state(StateKind::Collapsing),
            "tick"
        );
        frame
    }

    fn begin_session(&mut self, now: Millis) {
        for particle in &mut self.particles {
            particle.release_tag(&mut self.tags);
        }
        self.tags.clear();
        self.bubbles.clear();
        self.smoother.reset();
        self.last_landmarks = None;

        let session = self.controller.start_session(&self.config, now, &mut self.rng);
        self.events.push(SimEvent::SessionStarted {
            session: session.id,
            username: session.username.clone(),
            preset: session.preset,
        });
    }

    fn die(&mut self, now: Millis) {
        let wake_at = self.controller.die(
            now,
            self.config.timing.respawn_delay_ms,
            &mut self.ledger,
        );
        self.last_landmarks = None;
        self.anchors.clear();
        for particle in &mut self.particles {
            particle.collapse();
        }
        self.events.push(SimEvent::BodyDied {
            username: self.controller.session().username.clone(),
            wake_at,
        });
    }

    fn reinitialize_population(&mut self) {
        for particle in &mut self.particles {
            particle.release_tag(&mut self.tags);
        }
        self.tags.clear();

        let mut ctx = SpawnContext {
            config: &self.config,
            ledger: &self.ledger,
            tags: &mut self.tags,
            rng: &mut self.rng,
        };
        let count = ctx.config.particles.count;
        self.particles = (0..count).map(|_| Particle::spawn(&mut ctx)).collect();
        self.ensure_body_colors();
        self.events.push(SimEvent::PopulationReset { count });
    }

    /// The tracking source started: begin a new body session.
    ///
    /// Ignored while a body is already tracked or waiting to respawn.
    pub fn start_tracking(&mut self) {
        if self.controller.phase().is_active() {
            return;
        }
        tracing::info!("tracking started");
        let now = self.clock.now_ms();
        self.begin_session(now);
    }

    /// The tracking source stopped. Bonds are dropped and the particles keep
    /// drifting on their own.
    pub fn stop_tracking(&mut self) {
        if !self.controller.phase().is_active() {
            return;
        }
        tracing::info!("tracking stopped");
        for particle in &mut self.particles {
            particle.release();
        }
        self.controller.go_idle();
        self.smoother.reset();
        self.last_landmarks = None;
        self.anchors.clear();
    }

    /// Kill the current body now, as if every group had expired.
    pub fn force_death(&mut self) {
        if matches!(self.controller.phase(), BodyPhase::Tracking | BodyPhase::Lost) {
            let now = self.clock.now_ms();
            self.die(now);
        }
    }

    /// New canvas size; the population is rebuilt to fill it.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), ConfigError> {
        let mut config = self.config.clone();
        config.canvas.width = width;
        config.canvas.height = height;
        config.validate()?;
        self.config = config;
        tracing::info!(width, height, "canvas resized");
        self.reinitialize_population();
        Ok(())
    }

    /// Start absorbing particle `index` into the anchor for `role` as placed
    /// on the last tick. Returns false if either is unavailable or the
    /// particle is not free or connected.
    pub fn begin_absorbing(&mut self, index: usize, role: AnchorRole) -> bool {
        let Some(anchor) = self.anchors.iter().find(|a| a.role == role) else {
            return false;
        };
        let Some(particle) = self.particles.get_mut(index) else {
            return false;
        };
        self.resolver.begin_absorbing(particle, anchor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NameTag;

    fn seeded() -> Simulation {
        let config = SimConfig {
            seed: Some(17),
            ..SimConfig::default()
        };
        Simulation::new(config).unwrap()
    }

    #[test]
    fn test_starts_idle_with_full_population() {
        let mut sim = seeded();
        assert_eq!(sim.phase(), BodyPhase::Idle);
        assert_eq!(sim.particles().len(), 60);

        let frame = sim.step(None);
        assert!(!frame.tracking_lost);
        assert!(frame.anchors.is_empty());
        assert!(frame
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::PopulationReset { count: 60 })));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let mut config = SimConfig::default();
        config.particles.count = 0;
        assert!(matches!(
            Simulation::new(config),
            Err(ConfigError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_empty_population_self_heals() {
        let mut sim = seeded();
        sim.replace_particles(Vec::new());
        let frame = sim.step(None);
        assert_eq!(frame.particles.len(), 60);
    }

    #[test]
    fn test_body_colors_always_present_on_free_particles() {
        let mut sim = seeded();
        sim.start_tracking();
        for _ in 0..30 {
            sim.step(None);
            for color in sim.session().palette.colors() {
                assert!(sim
                    .particles()
                    .iter()
                    .any(|p| p.is_free() && p.color == *color));
            }
        }
    }

    #[test]
    fn test_tracking_without_input_is_lost() {
        let mut sim = seeded();
        sim.start_tracking();
        let frame = sim.step(Some(&[]));
        assert!(frame.tracking_lost);
        assert_eq!(frame.phase, BodyPhase::Lost);
        assert!(frame
            .events
            .iter()
            .any(|e| matches!(e, SimEvent::SessionStarted { .. })));
    }

    #[test]
    fn test_force_death_ignored_when_idle() {
        let mut sim = seeded();
        sim.force_death();
        assert_eq!(sim.phase(), BodyPhase::Idle);
        assert!(sim.ledger().is_empty());
    }

    #[test]
    fn test_stop_tracking_releases_bonds() {
        let mut sim = seeded();
        sim.start_tracking();
        let session = sim.session().id;
        sim.particles_mut()[0].connect(AnchorRole::Head, session);
        sim.stop_tracking();
        assert_eq!(sim.phase(), BodyPhase::Idle);
        assert!(sim.particles()[0].is_free());

        // Keeps drifting without a tracking source.
        let before = sim.now_ms();
        for _ in 0..10 {
            sim.step(None);
        }
        assert!(sim.now_ms() > before);
    }

    #[test]
    fn test_resize_rebuilds_population() {
        let mut sim = seeded();
        sim.resize(400.0, 300.0).unwrap();
        assert_eq!(sim.config().canvas.width, 400.0);
        assert!(sim
            .particles()
            .iter()
            .all(|p| p.position.x <= 400.0 && p.position.y <= 300.0));
        assert!(sim.resize(0.0, 300.0).is_err());
        assert_eq!(sim.config().canvas.width, 400.0);
    }

    fn parked(x: f32, color: Rgb) -> Particle {
        Particle::new(Vec2::new(x, 300.0), Vec2::ZERO, color, 10.0, 0.0005)
    }

    #[test]
    fn test_palette_fill_keeps_sole_carriers() {
        use crate::palette::EXTRA_COLORS;

        for seed in 0..50 {
            let config = SimConfig {
                seed: Some(seed),
                ..SimConfig::default()
            };
            let mut sim = Simulation::new(config).unwrap();
            let colors = *sim.session().palette.colors();
            let mut population: Vec<Particle> = colors[..4]
                .iter()
                .enumerate()
                .map(|(i, color)| parked(200.0 + 200.0 * i as f32, *color))
                .collect();
            population.push(parked(1_000.0, EXTRA_COLORS[0]));
            sim.replace_particles(population);

            sim.step(None);
            for color in colors {
                assert!(
                    sim.particles()
                        .iter()
                        .any(|p| p.is_free() && p.color == color),
                    "seed {seed}: {color:?} missing"
                );
            }
        }
    }

    #[test]
    fn test_palette_fill_takes_duplicate_body_color() {
        let mut sim = seeded();
        let colors = *sim.session().palette.colors();
        let population = [colors[0], colors[0], colors[1], colors[2], colors[3]]
            .iter()
            .enumerate()
            .map(|(i, color)| parked(200.0 + 200.0 * i as f32, *color))
            .collect();
        sim.replace_particles(population);

        sim.step(None);
        for color in colors {
            let carriers = sim.particles().iter().filter(|p| p.color == color).count();
            assert_eq!(carriers, 1);
        }
    }

    #[test]
    fn test_replace_particles_releases_outgoing_tags() {
        let mut sim = seeded();
        sim.tags.reserve("Old");
        sim.particles[0].name_tag = Some(NameTag {
            name: "Old".into(),
            since: 0.0,
        });

        let mut first = parked(200.0, sim.session().palette.colors()[0]);
        first.name_tag = Some(NameTag {
            name: "New".into(),
            since: 0.0,
        });
        let second = first.clone();
        sim.replace_particles(vec![first, second]);

        assert!(!sim.name_tags().is_active("Old"));
        assert!(sim.name_tags().is_active("New"));
        assert_eq!(sim.name_tags().len(), 1);
        let worn = sim.particles().iter().filter(|p| p.name_tag.is_some()).count();
        assert_eq!(worn, 1);
    }

    #[test]
    fn test_begin_absorbing_needs_resolved_anchor() {
        let mut sim = seeded();
        assert!(!sim.begin_absorbing(0, AnchorRole::Head));
    }
}
