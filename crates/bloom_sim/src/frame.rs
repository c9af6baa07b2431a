//! Per-tick output
//!
//! A [`Frame`] is a self-contained snapshot for the renderer: nothing in it
//! borrows from the simulation.

use crate::anchor::AnchorRole;
use crate::interaction::{ConnectionEdge, ResolvedAnchor};
use crate::ledger::{Greeting, SpeechBubble};
use crate::palette::Rgb;
use crate::particle::{Particle, StateKind};
use crate::session::{BodyPhase, ConnectivePreset, NameBadge, SessionId};
use bloom_core::time::Millis;
use glam::Vec2;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticleView {
    pub position: Vec2,
    pub color: Rgb,
    pub state: StateKind,
    pub alpha: f32,
    pub size: f32,
    pub name_tag: Option<String>,
}

impl From<&Particle> for ParticleView {
    fn from(particle: &Particle) -> Self {
        Self {
            position: particle.position,
            color: particle.color,
            state: particle.kind(),
            alpha: particle.alpha,
            size: particle.size,
            name_tag: particle.tag_name().map(str::to_owned),
        }
    }
}

/// Session username badge, if on screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BadgeView {
    pub username: String,
    pub position: Vec2,
    pub falling: bool,
}

impl BadgeView {
    pub fn from_badge(badge: &NameBadge, username: &str) -> Option<Self> {
        badge.visible.then(|| BadgeView {
            username: username.to_owned(),
            position: badge.position,
            falling: badge.falling,
        })
    }
}

/// Notable things that happened during the tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SimEvent {
    SessionStarted {
        session: SessionId,
        username: String,
        preset: ConnectivePreset,
    },
    Bonded {
        role: AnchorRole,
        particle: usize,
    },
    Greeting(Greeting),
    BodyDied {
        username: String,
        wake_at: Millis,
    },
    Absorbed {
        particle: usize,
    },
    PopulationReset {
        count: usize,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub tick: u64,
    pub time_ms: Millis,
    pub phase: BodyPhase,
    pub tracking_lost: bool,
    pub preset: ConnectivePreset,
    pub particles: Vec<ParticleView>,
    pub connections: Vec<ConnectionEdge>,
    pub anchors: Vec<ResolvedAnchor>,
    pub bubbles: Vec<SpeechBubble>,
    pub badge: Option<BadgeView>,
    pub events: Vec<SimEvent>,
}

impl Frame {
    pub fn count_state(&self, state: StateKind) -> usize {
        self.particles.iter().filter(|p| p.state == state).count()
    }

    pub fn anchor(&self, role: AnchorRole) -> Option<&ResolvedAnchor> {
        self.anchors.iter().find(|a| a.role == role)
    }
}
