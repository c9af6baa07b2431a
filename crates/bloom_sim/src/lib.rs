//! Bloom Simulation
//!
//! Particle lifecycle and body-interaction engine. Free particles drift,
//! bond to same-colored body anchors, keep anchor groups alive, and collapse
//! when the tracked body dies.
//!
//! The whole simulation lives in one [`Simulation`] context that is advanced
//! by the caller once per display frame. Pose landmarks are handed in per
//! tick; the returned [`Frame`] is everything a renderer needs.

pub mod anchor;
pub mod config;
pub mod frame;
pub mod group_timer;
pub mod interaction;
pub mod ledger;
pub mod palette;
pub mod particle;
pub mod projection;
pub mod session;
pub mod simulation;

pub use anchor::{AnchorRole, ANCHOR_COUNT};
pub use config::{ConfigError, SimConfig};
pub use frame::{Frame, ParticleView, SimEvent};
pub use group_timer::{GroupTimer, GroupTimers};
pub use interaction::{ConnectionEdge, InteractionResolver, ResolvedAnchor};
pub use ledger::{NameLedger, NameTags, SpeechBubble};
pub use palette::Rgb;
pub use particle::{Particle, ParticleState, StateKind};
pub use projection::Landmark;
pub use session::{BodyPhase, BodySession, ConnectivePreset, SessionController};
pub use simulation::Simulation;
