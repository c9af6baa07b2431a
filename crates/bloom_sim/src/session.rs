//! Body sessions
//!
//! A session is one tracked body from first detection to death. Each gets a
//! fresh username, a shuffled palette, a connective preset and small
//! randomized offsets so consecutive bodies never look identical.

use crate::config::SimConfig;
use crate::group_timer::GroupTimers;
use crate::ledger::NameLedger;
use crate::palette::SessionPalette;
use crate::projection::HandBlend;
use bloom_core::time::Millis;
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::fmt;

pub type SessionId = u64;

/// How the renderer joins the body's anchors. The simulation only picks it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivePreset {
    TriGlass,
    Spring,
    Tube,
    Goo,
    Dots,
}

impl ConnectivePreset {
    pub const ALL: [ConnectivePreset; 5] = [
        ConnectivePreset::TriGlass,
        ConnectivePreset::Spring,
        ConnectivePreset::Tube,
        ConnectivePreset::Goo,
        ConnectivePreset::Dots,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConnectivePreset::TriGlass => "tri_glass",
            ConnectivePreset::Spring => "spring",
            ConnectivePreset::Tube => "tube",
            ConnectivePreset::Goo => "goo",
            ConnectivePreset::Dots => "dots",
        }
    }
}

impl fmt::Display for ConnectivePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Walks the presets in order, with an even chance of a random pick instead.
#[derive(Debug, Clone, Default)]
pub struct PresetPicker {
    cursor: usize,
}

impl PresetPicker {
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> ConnectivePreset {
        let mut preset = ConnectivePreset::ALL[self.cursor % ConnectivePreset::ALL.len()];
        self.cursor = self.cursor.wrapping_add(1);
        if rng.gen_bool(0.5) {
            if let Some(random) = ConnectivePreset::ALL.choose(rng) {
                preset = *random;
            }
        }
        preset
    }
}

const USERNAME_ADJECTIVES: [&str; 20] = [
    "Swift", "Silent", "Neon", "Cyber", "Shadow", "Quantum", "Pixel", "Solar", "Lunar", "Crystal",
    "Iron", "Atomic", "Cosmic", "Echo", "Phantom", "Velvet", "Nova", "Glitch", "Rapid", "Frost",
];

const USERNAME_NOUNS: [&str; 20] = [
    "Runner", "Voyager", "Hacker", "Samurai", "Wanderer", "Rider", "Pilot", "Coder", "Ranger",
    "Seeker", "Dancer", "Guardian", "Artist", "Nomad", "Sentinel", "Gamer", "Wizard", "Tinker",
    "Maker", "Scout",
];

/// `<Adjective><Noun><NN>`, e.g. `NeonRider42`.
pub fn generate_username<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = USERNAME_ADJECTIVES.choose(rng).copied().unwrap_or("Swift");
    let noun = USERNAME_NOUNS.choose(rng).copied().unwrap_or("Runner");
    let number: u32 = rng.gen_range(10..=98);
    format!("{adjective}{noun}{number}")
}

/// Horizontal pixel nudges for the two foot anchors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FootOffsets {
    pub left: f32,
    pub right: f32,
}

impl FootOffsets {
    fn random<R: Rng + ?Sized>(jitter: f32, rng: &mut R) -> Self {
        let mut draw = || (rng.gen::<f32>() * 2.0 - 1.0) * jitter;
        Self {
            left: draw(),
            right: draw(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BodySession {
    pub id: SessionId,
    pub username: String,
    pub palette: SessionPalette,
    pub preset: ConnectivePreset,
    pub hand_blend: HandBlend,
    pub foot_offsets: FootOffsets,
    pub started_at: Millis,
}

/// Whole-body state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BodyPhase {
    /// No tracking source; particles drift on their own.
    Idle,
    Tracking,
    /// Tracking source running but no landmarks this tick.
    Lost,
    /// Every anchor group expired; a new session starts at `wake_at`.
    Dead { wake_at: Millis },
}

impl BodyPhase {
    pub fn is_dead(&self) -> bool {
        matches!(self, BodyPhase::Dead { .. })
    }

    /// Tracking source running, alive or not.
    pub fn is_active(&self) -> bool {
        !matches!(self, BodyPhase::Idle)
    }
}

/// Session username shown above the head; drops to the floor when the body
/// dies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NameBadge {
    pub position: Vec2,
    pub velocity_y: f32,
    pub visible: bool,
    pub falling: bool,
}

const BADGE_HEAD_CLEARANCE: f32 = 40.0;
const BADGE_GRAVITY: f32 = 0.35;
const BADGE_FLOOR_MARGIN: f32 = 40.0;

impl NameBadge {
    pub fn follow(&mut self, head: Vec2) {
        *self = NameBadge {
            position: head - Vec2::new(0.0, BADGE_HEAD_CLEARANCE),
            velocity_y: 0.0,
            visible: true,
            falling: false,
        };
    }

    pub fn drop_down(&mut self) {
        if self.visible {
            self.falling = true;
        }
    }

    pub fn hide(&mut self) {
        *self = NameBadge::default();
    }

    /// Advance a falling badge; hides it once it reaches the floor.
    pub fn update(&mut self, canvas_height: f32) {
        if !(self.visible && self.falling) {
            return;
        }
        self.velocity_y += BADGE_GRAVITY;
        self.position.y += self.velocity_y;
        if self.position.y >= canvas_height - BADGE_FLOOR_MARGIN {
            self.hide();
        }
    }
}

/// Owns the current session, its group timers and the body phase.
#[derive(Debug, Clone)]
pub struct SessionController {
    session: BodySession,
    phase: BodyPhase,
    timers: GroupTimers,
    presets: PresetPicker,
    badge: NameBadge,
}

impl SessionController {
    /// The first session is prepared up front, before any tracking starts.
    pub fn new<R: Rng + ?Sized>(config: &SimConfig, now: Millis, rng: &mut R) -> Self {
        let mut presets = PresetPicker::default();
        let session = Self::roll_session(0, config, &mut presets, now, rng);
        Self {
            session,
            phase: BodyPhase::Idle,
            timers: GroupTimers::new(
                config.timing.group_duration_min_ms,
                config.timing.group_duration_max_ms,
            ),
            presets,
            badge: NameBadge::default(),
        }
    }

    fn roll_session<R: Rng + ?Sized>(
        id: SessionId,
        config: &SimConfig,
        presets: &mut PresetPicker,
        now: Millis,
        rng: &mut R,
    ) -> BodySession {
        let palette = SessionPalette::shuffled(rng);
        let preset = presets.pick(rng);
        let hand_blend = HandBlend {
            left: rng.gen_range(0.5..=1.0),
            right: rng.gen_range(0.5..=1.0),
        };
        let username = generate_username(rng);
        let foot_offsets = FootOffsets::random(config.projection.foot_jitter, rng);
        BodySession {
            id,
            username,
            palette,
            preset,
            hand_blend,
            foot_offsets,
            started_at: now,
        }
    }

    pub fn session(&self) -> &BodySession {
        &self.session
    }

    pub fn phase(&self) -> BodyPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: BodyPhase) {
        self.phase = phase;
    }

    pub fn timers(&self) -> &GroupTimers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut GroupTimers {
        &mut self.timers
    }

    pub fn badge(&self) -> &NameBadge {
        &self.badge
    }

    pub fn badge_mut(&mut self) -> &mut NameBadge {
        &mut self.badge
    }

    /// Replace the session with a freshly randomized one and reset every
    /// group timer. The caller clears name tags and speech bubbles.
    pub fn start_session<R: Rng + ?Sized>(
        &mut self,
        config: &SimConfig,
        now: Millis,
        rng: &mut R,
    ) -> &BodySession {
        let id = self.session.id.wrapping_add(1);
        self.session = Self::roll_session(id, config, &mut self.presets, now, rng);
        self.timers.reset();
        self.badge.hide();
        self.phase = BodyPhase::Lost;

        tracing::info!(
            session = id,
            username = %self.session.username,
            preset = %self.session.preset,
            "body session started"
        );
        &self.session
    }

    /// Enter Dead: archive the username and schedule the next session.
    pub fn die(&mut self, now: Millis, respawn_delay: Millis, ledger: &mut NameLedger) -> Millis {
        let wake_at = now + respawn_delay;
        ledger.record(self.session.username.clone(), now);
        self.phase = BodyPhase::Dead { wake_at };
        self.badge.drop_down();

        tracing::info!(
            session = self.session.id,
            username = %self.session.username,
            wake_at,
            "body died"
        );
        wake_at
    }

    pub fn wake_due(&self, now: Millis) -> bool {
        matches!(self.phase, BodyPhase::Dead { wake_at } if now >= wake_at)
    }

    /// Back to camera-independent drift.
    pub fn go_idle(&mut self) {
        self.timers.reset();
        self.badge.hide();
        self.phase = BodyPhase::Idle;
    }
}
