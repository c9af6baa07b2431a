//! Colors
//!
//! Particles draw from seven colors: the five body colors plus two that no
//! anchor ever uses. Each session shuffles the five body colors over the
//! anchor roles.

use crate::anchor::{AnchorRole, ANCHOR_COUNT};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: (hex >> 16) as u8,
            g: (hex >> 8) as u8,
            b: hex as u8,
        }
    }

    /// Per-channel linear blend toward `to`, rounded. `t` is clamped to [0, 1].
    pub fn lerp(self, to: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb {
            r: mix(self.r, to.r),
            g: mix(self.g, to.g),
            b: mix(self.b, to.b),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub const BODY_COLORS: [Rgb; ANCHOR_COUNT] = [
    Rgb::from_hex(0xE53935), // red
    Rgb::from_hex(0x1E40FF), // blue
    Rgb::from_hex(0x18C065), // green
    Rgb::from_hex(0xF28C28), // orange
    Rgb::from_hex(0x9B59B6), // purple
];

/// Free-only colors; never bound to an anchor.
pub const EXTRA_COLORS: [Rgb; 2] = [
    Rgb::from_hex(0x00BCD4), // cyan
    Rgb::from_hex(0xE91E63), // pink
];

/// Fade endpoint for expiring anchor groups.
pub const NEUTRAL_GRAY: Rgb = Rgb::from_hex(0x323232);

/// Uniform pick over body and extra colors.
pub fn random_particle_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb {
    let i = rng.gen_range(0..BODY_COLORS.len() + EXTRA_COLORS.len());
    if i < BODY_COLORS.len() {
        BODY_COLORS[i]
    } else {
        EXTRA_COLORS[i - BODY_COLORS.len()]
    }
}

/// Role to color bijection for one body session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionPalette([Rgb; ANCHOR_COUNT]);

impl SessionPalette {
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut colors = BODY_COLORS;
        colors.shuffle(rng);
        Self(colors)
    }

    pub fn color(&self, role: AnchorRole) -> Rgb {
        self.0[role.index()]
    }

    pub fn role_of(&self, color: Rgb) -> Option<AnchorRole> {
        self.0
            .iter()
            .position(|c| *c == color)
            .and_then(AnchorRole::from_index)
    }

    pub fn colors(&self) -> &[Rgb; ANCHOR_COUNT] {
        &self.0
    }
}

impl Default for SessionPalette {
    fn default() -> Self {
        Self(BODY_COLORS)
    }
}
