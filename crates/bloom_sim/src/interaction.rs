//! Anchor and particle interaction
//!
//! Runs once per tick before particles integrate. Free particles of an
//! anchor's color bond after lingering inside the bond radius; free
//! particles of any other color are pushed away. Bonded particles are pulled
//! back toward their anchor and reported as connection edges.

use crate::anchor::AnchorRole;
use crate::config::{ForceConfig, SimConfig};
use crate::group_timer::GroupTimers;
use crate::palette::Rgb;
use crate::particle::{pair_mut, Particle, ParticleState};
use crate::projection::{Landmark, Projection};
use crate::session::{BodySession, SessionId};
use bloom_core::math::{clamp_speed, direction_to};
use bloom_core::time::Millis;
use glam::Vec2;
use serde::Serialize;

/// Alpha of every connection edge.
const EDGE_ALPHA: f32 = 0.9;

/// One anchor placed on screen for this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedAnchor {
    pub role: AnchorRole,
    pub position: Vec2,
    /// Session color; particles bond by this.
    pub color: Rgb,
    /// Session color faded toward gray by the group timer.
    pub fade_color: Rgb,
    pub visibility: f32,
    pub expired: bool,
}

impl ResolvedAnchor {
    /// Place every anchor whose landmark is present.
    pub fn project_all(
        landmarks: &[Landmark],
        projection: &Projection,
        session: &BodySession,
        timers: &GroupTimers,
        now: Millis,
    ) -> Vec<ResolvedAnchor> {
        AnchorRole::ALL
            .iter()
            .filter_map(|&role| {
                let landmark = landmarks.get(role.landmark_index())?;
                let mut position = projection.to_screen(landmark);
                match role {
                    AnchorRole::LeftFoot => position.x += session.foot_offsets.left,
                    AnchorRole::RightAnkle => position.x += session.foot_offsets.right,
                    _ => {}
                }
                let color = session.palette.color(role);
                Some(ResolvedAnchor {
                    role,
                    position,
                    color,
                    fade_color: timers.fade_color(role, color, now),
                    visibility: landmark.visibility(),
                    expired: timers.is_expired(role, now),
                })
            })
            .collect()
    }
}

/// Line from an anchor to one of its bonded particles, for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConnectionEdge {
    pub role: AnchorRole,
    pub anchor: Vec2,
    pub particle: Vec2,
    pub color: Rgb,
    pub alpha: f32,
}

/// A particle that bonded this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub particle: usize,
    pub role: AnchorRole,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub edges: Vec<ConnectionEdge>,
    pub bonds: Vec<Bond>,
}

pub struct InteractionResolver {
    forces: ForceConfig,
    bond_dwell: Millis,
}

impl InteractionResolver {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            forces: config.forces.clone(),
            bond_dwell: config.timing.bond_dwell_ms,
        }
    }

    /// Apply anchor forces for this tick and report new bonds and edges.
    ///
    /// Absorbing and collapsing particles follow their own motion and are
    /// left untouched.
    pub fn resolve(
        &self,
        anchors: &[ResolvedAnchor],
        particles: &mut [Particle],
        session: SessionId,
        now: Millis,
    ) -> Resolution {
        let mut resolution = Resolution::default();

        for anchor in anchors {
            for (index, particle) in particles.iter_mut().enumerate() {
                let edges = &mut resolution.edges;
                if let Some(role) = self.interact(anchor, particle, session, now, edges) {
                    resolution.bonds.push(Bond {
                        particle: index,
                        role,
                    });
                }
            }
        }

        self.separate_from_connected(particles);
        resolution
    }

    fn interact(
        &self,
        anchor: &ResolvedAnchor,
        particle: &mut Particle,
        session: SessionId,
        now: Millis,
        edges: &mut Vec<ConnectionEdge>,
    ) -> Option<AnchorRole> {
        let f = &self.forces;
        let (direction, distance) = direction_to(particle.position, anchor.position);
        let same_color = particle.color == anchor.color;
        let mut bonded = None;

        match &mut particle.state {
            ParticleState::Free { near_since } if same_color => {
                let slot = &mut near_since[anchor.role.index()];
                if distance < f.bond_radius {
                    let since = *slot.get_or_insert(now);
                    if !anchor.expired && now - since >= self.bond_dwell {
                        bonded = Some(anchor.role);
                    }
                } else {
                    *slot = None;
                }
            }
            ParticleState::Free { near_since } => {
                near_since[anchor.role.index()] = None;
                if distance < f.repulsion_radius {
                    let impact = if distance < f.impact_radius {
                        f.impact_repulsion
                    } else {
                        0.0
                    };
                    particle.velocity -= direction * (f.base_repulsion + impact);
                }
            }
            ParticleState::Connected {
                role,
                session: owner,
                ..
            } => {
                if *role != anchor.role || *owner != session {
                    return None;
                }
            }
            ParticleState::Absorbing { .. } | ParticleState::Collapsing => return None,
        }

        if let Some(role) = bonded {
            particle.connect(role, session);
            tracing::debug!(role = ?role, tag = particle.tag_name(), "particle bonded");
        }

        if particle.connected_role() == Some(anchor.role) {
            if distance > f.bond_slack {
                particle.velocity += direction * f.connection_force;
            }
            edges.push(ConnectionEdge {
                role: anchor.role,
                anchor: anchor.position,
                particle: particle.position,
                color: anchor.color,
                alpha: EDGE_ALPHA,
            });
        }

        clamp_speed(&mut particle.velocity, f.resolve_speed_cap);
        bonded
    }

    /// Every connected particle nudges all nearby particles away from it.
    fn separate_from_connected(&self, particles: &mut [Particle]) {
        let f = &self.forces;
        for i in 0..particles.len() {
            if particles[i].connected_role().is_none() {
                continue;
            }
            for j in 0..particles.len() {
                if i == j {
                    continue;
                }
                let (connected, other) = pair_mut(particles, i, j);
                if !matches!(
                    other.state,
                    ParticleState::Free { .. } | ParticleState::Connected { .. }
                ) {
                    continue;
                }
                let (direction, distance) = direction_to(other.position, connected.position);
                if distance < f.avoidance_radius {
                    other.velocity -= direction * f.avoidance_force;
                }
                clamp_speed(&mut other.velocity, f.avoidance_speed_cap);
            }
        }
    }

    /// Start pulling `particle` into `anchor`. Only free and connected
    /// particles can be absorbed.
    pub fn begin_absorbing(&self, particle: &mut Particle, anchor: &ResolvedAnchor) -> bool {
        let started = particle.begin_absorbing(anchor.position);
        if started {
            tracing::debug!(role = ?anchor.role, "absorption started");
        }
        started
    }
}
