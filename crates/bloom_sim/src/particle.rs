//! Particles
//!
//! A fixed population of particles is created once and recycled in place:
//! a particle whose life runs out, that leaves the canvas, or that finishes
//! being absorbed is respawned with fresh random fields, never reallocated.

use crate::anchor::{AnchorRole, ANCHOR_COUNT};
use crate::config::SimConfig;
use crate::ledger::{NameLedger, NameTag, NameTags};
use crate::palette::{random_particle_color, Rgb};
use crate::session::SessionId;
use bloom_core::math::{direction_to, SimRng};
use bloom_core::time::Millis;
use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Progress past which an absorbing particle starts fading out.
const ABSORB_FADE_START: f32 = 0.7;
const ABSORB_FADE_RATE: f32 = 0.15;
const ABSORB_MIN_ALPHA: f32 = 0.1;

/// Lifecycle state. Exactly one is active at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticleState {
    /// Drifting. `near_since[role]` is when the particle last entered that
    /// anchor's bond radius without leaving it since.
    Free {
        near_since: [Option<Millis>; ANCHOR_COUNT],
    },
    /// Bonded to one anchor of one body session.
    Connected {
        role: AnchorRole,
        session: SessionId,
        ticks: u32,
    },
    /// Being pulled into an anchor position; respawns at progress 1.
    Absorbing { target: Vec2, progress: f32 },
    /// Falling after the body died.
    Collapsing,
}

impl ParticleState {
    pub fn free() -> Self {
        ParticleState::Free {
            near_since: [None; ANCHOR_COUNT],
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            ParticleState::Free { .. } => StateKind::Free,
            ParticleState::Connected { .. } => StateKind::Connected,
            ParticleState::Absorbing { .. } => StateKind::Absorbing,
            ParticleState::Collapsing => StateKind::Collapsing,
        }
    }
}

/// Discriminant of [`ParticleState`] for callers that only need the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateKind {
    Free,
    Connected,
    Absorbing,
    Collapsing,
}

/// Why a particle was recycled during its update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Respawn {
    OutOfBounds,
    Faded,
    Absorbed,
}

/// Everything a respawn needs besides the particle itself.
pub struct SpawnContext<'a> {
    pub config: &'a SimConfig,
    pub ledger: &'a NameLedger,
    pub tags: &'a mut NameTags,
    pub rng: &'a mut SimRng,
}

#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec2,
    pub velocity: Vec2,
    pub color: Rgb,
    pub size: f32,
    pub alpha: f32,
    pub life: f32,
    pub decay_rate: f32,
    pub state: ParticleState,
    pub name_tag: Option<NameTag>,
    pub has_greeted: bool,
}

impl Particle {
    /// A free particle with explicit placement; no name tag.
    pub fn new(position: Vec2, velocity: Vec2, color: Rgb, size: f32, decay_rate: f32) -> Self {
        Self {
            position,
            velocity,
            color,
            size,
            alpha: 1.0,
            life: 1.0,
            decay_rate,
            state: ParticleState::free(),
            name_tag: None,
            has_greeted: false,
        }
    }

    /// A fresh random free particle somewhere on the canvas.
    pub fn spawn(ctx: &mut SpawnContext<'_>) -> Self {
        let mut particle = Self::new(Vec2::ZERO, Vec2::ZERO, Rgb::from_hex(0), 0.0, 0.0);
        particle.randomize(ctx);
        particle.try_acquire_tag(ctx);
        particle
    }

    pub fn kind(&self) -> StateKind {
        self.state.kind()
    }

    pub fn is_free(&self) -> bool {
        matches!(self.state, ParticleState::Free { .. })
    }

    pub fn connected_role(&self) -> Option<AnchorRole> {
        match self.state {
            ParticleState::Connected { role, .. } => Some(role),
            _ => None,
        }
    }

    pub fn tag_name(&self) -> Option<&str> {
        self.name_tag.as_ref().map(|t| t.name.as_str())
    }

    fn randomize(&mut self, ctx: &mut SpawnContext<'_>) {
        let config: &SimConfig = ctx.config;
        let (canvas, p) = (&config.canvas, &config.particles);
        let rng = &mut *ctx.rng;

        self.position = Vec2::new(
            rng.gen::<f32>() * canvas.width,
            rng.gen::<f32>() * canvas.height,
        );
        self.velocity = Vec2::new(
            (rng.gen::<f32>() - 0.5) * p.drift_x,
            p.drift_y_min + rng.gen::<f32>() * (p.drift_y_max - p.drift_y_min),
        );
        self.color = random_particle_color(rng);
        self.size = (p.size_min + rng.gen::<f32>() * (p.size_max - p.size_min)) * p.size_scale;
        self.decay_rate = p.decay_min + rng.gen::<f32>() * (p.decay_max - p.decay_min);
        self.alpha = 1.0;
        self.life = 1.0;
        self.state = ParticleState::free();
        self.has_greeted = false;
    }

    /// Free particles may borrow a name from the ledger.
    pub fn try_acquire_tag(&mut self, ctx: &mut SpawnContext<'_>) {
        if !self.is_free() || self.name_tag.is_some() {
            return;
        }
        self.name_tag = ctx.ledger.draw_tag(
            &mut *ctx.tags,
            ctx.config.particles.name_tag_chance_per_name,
            &mut *ctx.rng,
        );
        self.has_greeted = false;
    }

    /// Give the worn name back to the pool.
    pub fn release_tag(&mut self, tags: &mut NameTags) {
        if let Some(tag) = self.name_tag.take() {
            tags.release(&tag.name);
        }
        self.has_greeted = false;
    }

    /// Recycle in place as a fresh free particle.
    pub fn respawn(&mut self, ctx: &mut SpawnContext<'_>) {
        self.release_tag(&mut *ctx.tags);
        self.randomize(ctx);
        self.try_acquire_tag(ctx);
    }

    /// Bond to `role` of `session`. Only free particles can connect.
    pub fn connect(&mut self, role: AnchorRole, session: SessionId) -> bool {
        if !self.is_free() {
            return false;
        }
        self.state = ParticleState::Connected {
            role,
            session,
            ticks: 0,
        };
        true
    }

    /// Drop a bond, back to drifting.
    pub fn release(&mut self) {
        if matches!(self.state, ParticleState::Connected { .. }) {
            self.state = ParticleState::free();
        }
    }

    /// Start absorption into `target`. Free and connected particles only.
    pub fn begin_absorbing(&mut self, target: Vec2) -> bool {
        match self.state {
            ParticleState::Free { .. } | ParticleState::Connected { .. } => {
                self.state = ParticleState::Absorbing {
                    target,
                    progress: 0.0,
                };
                true
            }
            _ => false,
        }
    }

    /// The body died: fall under gravity.
    pub fn collapse(&mut self) {
        self.state = ParticleState::Collapsing;
    }

    /// Pairwise overlap response with `other`: push both apart along the
    /// line between them and exchange a small velocity impulse.
    pub fn separate_from(&mut self, other: &mut Particle, config: &SimConfig) {
        let p = &config.particles;
        let delta = self.position - other.position;
        let distance = delta.length();
        let min_distance = (self.size + other.size) * p.collision_spacing;
        if distance <= 0.0 || distance >= min_distance {
            return;
        }

        let force = (min_distance - distance) * p.collision_stiffness;
        let normal = delta / distance;
        let separation = normal * force * 0.5;
        self.position += separation;
        other.position -= separation;

        let bounce = normal * force * p.collision_bounce;
        self.velocity += bounce;
        other.velocity -= bounce;
    }

    /// Integrate one tick. Anchor forces for this tick are already applied.
    pub fn update(&mut self, ctx: &mut SpawnContext<'_>) -> Option<Respawn> {
        let config: &SimConfig = ctx.config;
        let p = &config.particles;
        let (width, height) = (config.canvas.width, config.canvas.height);
        let falling = matches!(self.state, ParticleState::Collapsing);

        if falling {
            self.velocity.y = (self.velocity.y + p.gravity).min(p.max_fall_speed);
        }

        let damping = if falling { p.collapse_damping } else { p.damping };
        self.velocity *= damping;
        self.position += self.velocity;

        if falling {
            let floor = height - p.floor_margin;
            if self.position.y >= floor {
                self.position.y = floor;
                self.velocity.x *= p.ground_friction;
                self.velocity.y = 0.0;
                self.life -= p.ground_decay;
                if self.life <= 0.0 {
                    self.respawn(ctx);
                    return Some(Respawn::Faded);
                }
            } else if self.position.x < 0.0 || self.position.x > width || self.position.y < 0.0 {
                self.respawn(ctx);
                return Some(Respawn::OutOfBounds);
            }
        } else if self.position.x < 0.0
            || self.position.x > width
            || self.position.y < 0.0
            || self.position.y > height
        {
            self.respawn(ctx);
            return Some(Respawn::OutOfBounds);
        }

        if let ParticleState::Absorbing { target, progress } = &mut self.state {
            *progress += p.absorb_step;
            if *progress >= 1.0 {
                self.respawn(ctx);
                return Some(Respawn::Absorbed);
            }
            let progress = *progress;
            let target = *target;
            self.steer_into(target, progress);
            return None;
        }

        match &mut self.state {
            ParticleState::Connected { ticks, .. } => {
                self.life = (self.life + p.connected_regen).min(1.0);
                *ticks = ticks.saturating_add(1);
            }
            _ => {
                self.life -= self.decay_rate;
                if self.life <= 0.0 {
                    self.respawn(ctx);
                    return Some(Respawn::Faded);
                }
            }
        }

        self.life = self.life.clamp(0.0, 1.0);
        self.alpha = self.life;
        None
    }

    /// Three speed tiers by remaining distance; snaps when nearly there.
    /// Fades (without shrinking) over the last 30% of progress.
    fn steer_into(&mut self, target: Vec2, progress: f32) {
        let (direction, distance) = direction_to(self.position, target);
        if distance > 0.5 {
            let speed = if distance > 10.0 {
                0.15
            } else if distance > 2.0 {
                0.08 * (1.0 - progress * 0.3)
            } else {
                0.2 * (1.0 - progress)
            };
            self.velocity = direction * speed;
        } else {
            self.position = target;
            self.velocity = Vec2::ZERO;
        }

        if progress > ABSORB_FADE_START {
            let fade =
                (progress - ABSORB_FADE_START) / (1.0 - ABSORB_FADE_START) * ABSORB_FADE_RATE;
            self.alpha = (self.alpha * (1.0 - fade)).max(ABSORB_MIN_ALPHA);
        }
    }
}

/// Mutable references to two distinct elements.
pub(crate) fn pair_mut<T>(items: &mut [T], i: usize, j: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = items.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// Overlap response of particle `i` against every other particle.
pub fn apply_anti_collision(particles: &mut [Particle], i: usize, config: &SimConfig) {
    for j in 0..particles.len() {
        if j == i {
            continue;
        }
        let (this, other) = pair_mut(particles, i, j);
        this.separate_from(other, config);
    }
}
