//! Bloom Services Layer
//!
//! Everything between the simulation and the outside world: settings files
//! and pose input sources.

pub mod input;
pub mod settings;

pub use input::{InputError, LandmarkStream, PoseFrame, PoseSource, ScriptedPose};
pub use settings::{RuntimeSettings, Settings, SettingsError};
