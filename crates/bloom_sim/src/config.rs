//! Simulation tuning
//!
//! Every constant the simulation uses lives here so a settings file can
//! override it. Defaults reproduce the calibrated installation values.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by [`SimConfig::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("canvas must have positive size, got {width}x{height}")]
    InvalidCanvas { width: f32, height: f32 },

    #[error("particle population must be at least one")]
    EmptyPopulation,

    #[error("range '{name}' is inverted ({min} > {max})")]
    InvertedRange { name: &'static str, min: f64, max: f64 },

    #[error("'{name}' must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("'{name}' must lie in [0, 1], got {value}")]
    NotUnit { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub canvas: CanvasConfig,
    pub particles: ParticleConfig,
    pub forces: ForceConfig,
    pub timing: TimingConfig,
    pub projection: ProjectionConfig,
    /// Fixed seed for replayable runs. `None` seeds from entropy.
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParticleConfig {
    pub count: usize,
    /// Horizontal drift spread; spawn vx is uniform in ±drift_x/2.
    pub drift_x: f32,
    pub drift_y_min: f32,
    pub drift_y_max: f32,
    pub size_min: f32,
    pub size_max: f32,
    pub size_scale: f32,
    pub decay_min: f32,
    pub decay_max: f32,
    pub damping: f32,
    pub collapse_damping: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    /// Distance above the bottom edge treated as the ground.
    pub floor_margin: f32,
    pub ground_friction: f32,
    pub ground_decay: f32,
    pub connected_regen: f32,
    pub absorb_step: f32,
    /// Minimum spacing as a fraction of the summed sizes.
    pub collision_spacing: f32,
    pub collision_stiffness: f32,
    pub collision_bounce: f32,
    /// Name tag chance contributed by each name in the ledger.
    pub name_tag_chance_per_name: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub bond_radius: f32,
    pub repulsion_radius: f32,
    pub impact_radius: f32,
    pub connection_force: f32,
    /// Connected particles closer than this are left alone.
    pub bond_slack: f32,
    pub base_repulsion: f32,
    pub impact_repulsion: f32,
    pub avoidance_radius: f32,
    pub avoidance_force: f32,
    pub resolve_speed_cap: f32,
    pub avoidance_speed_cap: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub bond_dwell_ms: f64,
    pub group_duration_min_ms: f64,
    pub group_duration_max_ms: f64,
    pub respawn_delay_ms: f64,
    pub bubble_lifetime_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Negative values mirror the body's horizontal travel.
    pub translation_multiplier: f32,
    pub foot_offset_from_bottom: f32,
    pub visibility_threshold: f32,
    pub smoothing: f32,
    /// Per-session foot offsets are uniform in ±foot_jitter pixels.
    pub foot_jitter: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            canvas: CanvasConfig::default(),
            particles: ParticleConfig::default(),
            forces: ForceConfig::default(),
            timing: TimingConfig::default(),
            projection: ProjectionConfig::default(),
            seed: None,
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            count: 60,
            drift_x: 0.5,
            drift_y_min: 0.3,
            drift_y_max: 0.7,
            size_min: 7.0,
            size_max: 13.0,
            size_scale: 1.2,
            decay_min: 0.0003,
            decay_max: 0.0009,
            damping: 0.998,
            collapse_damping: 0.995,
            gravity: 0.15,
            max_fall_speed: 8.0,
            floor_margin: 5.0,
            ground_friction: 0.8,
            ground_decay: 0.005,
            connected_regen: 0.02,
            absorb_step: 0.008,
            collision_spacing: 0.8,
            collision_stiffness: 0.1,
            collision_bounce: 0.05,
            name_tag_chance_per_name: 0.015,
        }
    }
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            bond_radius: 88.0,
            repulsion_radius: 130.0,
            impact_radius: 40.0,
            connection_force: 0.028,
            bond_slack: 2.0,
            base_repulsion: 0.08,
            impact_repulsion: 0.22,
            avoidance_radius: 25.0,
            avoidance_force: 0.015,
            resolve_speed_cap: 1.05,
            avoidance_speed_cap: 1.1,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            bond_dwell_ms: 100.0,
            group_duration_min_ms: 15_000.0,
            group_duration_max_ms: 25_000.0,
            respawn_delay_ms: 15_000.0,
            bubble_lifetime_ms: 4_000.0,
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            translation_multiplier: -2.0,
            foot_offset_from_bottom: 40.0,
            visibility_threshold: 0.4,
            smoothing: 0.95,
            foot_jitter: 25.0,
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let CanvasConfig { width, height } = self.canvas;
        if !(width > 0.0 && height > 0.0) {
            return Err(ConfigError::InvalidCanvas { width, height });
        }
        if self.particles.count == 0 {
            return Err(ConfigError::EmptyPopulation);
        }

        let p = &self.particles;
        ordered("particles.drift_y", p.drift_y_min as f64, p.drift_y_max as f64)?;
        ordered("particles.size", p.size_min as f64, p.size_max as f64)?;
        ordered("particles.decay", p.decay_min as f64, p.decay_max as f64)?;
        positive("particles.size_min", p.size_min as f64)?;
        positive("particles.absorb_step", p.absorb_step as f64)?;
        unit("particles.damping", p.damping as f64)?;
        unit("particles.collapse_damping", p.collapse_damping as f64)?;

        let f = &self.forces;
        positive("forces.bond_radius", f.bond_radius as f64)?;
        positive("forces.resolve_speed_cap", f.resolve_speed_cap as f64)?;
        positive("forces.avoidance_speed_cap", f.avoidance_speed_cap as f64)?;

        let t = &self.timing;
        ordered(
            "timing.group_duration",
            t.group_duration_min_ms,
            t.group_duration_max_ms,
        )?;
        positive("timing.group_duration_min_ms", t.group_duration_min_ms)?;

        unit("projection.smoothing", self.projection.smoothing as f64)?;
        unit(
            "projection.visibility_threshold",
            self.projection.visibility_threshold as f64,
        )?;
        Ok(())
    }
}

fn ordered(name: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min > max {
        return Err(ConfigError::InvertedRange { name, min, max });
    }
    Ok(())
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(value > 0.0) {
        return Err(ConfigError::NotPositive { name, value });
    }
    Ok(())
}

fn unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::NotUnit { name, value });
    }
    Ok(())
}
