//! Pose input sources
//!
//! The simulation takes one optional landmark list per tick. Sources here
//! produce those lists either from a recording (one JSON value per line) or
//! from a built-in scripted figure.

use bloom_sim::anchor::landmark;
use bloom_sim::Landmark;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read pose input")]
    Io(#[from] std::io::Error),

    #[error("line {line}: malformed landmark frame")]
    Malformed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One tick of input. `None` means no body was detected.
pub type PoseFrame = Option<Vec<Landmark>>;

pub trait PoseSource {
    /// Input for the next tick, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<PoseFrame>, InputError>;
}

/// Parse one recorded line. Blank lines and `null` are ticks without a body.
pub fn parse_frame(text: &str, line: usize) -> Result<PoseFrame, InputError> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(text).map_err(|source| InputError::Malformed { line, source })
}

/// Recorded landmark frames, one JSON array (or `null`) per line.
pub struct LandmarkStream<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl LandmarkStream<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, InputError> {
        let file = File::open(path)?;
        tracing::info!(path = %path.display(), "reading pose recording");
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> LandmarkStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> PoseSource for LandmarkStream<R> {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>, InputError> {
        self.buf.clear();
        if self.reader.read_line(&mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line += 1;
        parse_frame(&self.buf, self.line).map(Some)
    }
}

/// A figure standing in front of the camera, swaying gently and stepping out
/// of view for a short stretch every cycle. Runs forever.
#[derive(Debug, Clone)]
pub struct ScriptedPose {
    tick: u64,
    cycle: u64,
    absent: u64,
}

impl ScriptedPose {
    /// Every `cycle` ticks the body is missing for the last `absent` of them.
    pub fn new(cycle: u64, absent: u64) -> Self {
        Self {
            tick: 0,
            cycle: cycle.max(1),
            absent: absent.min(cycle),
        }
    }

    fn figure(&self) -> Vec<Landmark> {
        let t = self.tick as f32 / 60.0;
        let sway = (t * 0.4).sin() * 0.05;
        let wave = (t * 1.5).sin() * 0.08;

        let mut points = vec![Landmark::with_visibility(0.5, 0.5, 0.0); 33];
        let mut set = |slot: usize, x: f32, y: f32| {
            points[slot] = Landmark::with_visibility(x + sway, y, 1.0);
        };
        set(landmark::NOSE, 0.5, 0.2);
        set(landmark::LEFT_ELBOW, 0.38, 0.42);
        set(landmark::LEFT_WRIST, 0.3, 0.35 + wave);
        set(landmark::RIGHT_ELBOW, 0.62, 0.42);
        set(landmark::RIGHT_WRIST, 0.7, 0.5 - wave);
        set(landmark::RIGHT_ANKLE, 0.55, 0.9);
        set(landmark::LEFT_FOOT_INDEX, 0.45, 0.92);
        points
    }
}

impl Default for ScriptedPose {
    fn default() -> Self {
        Self::new(1_800, 120)
    }
}

impl PoseSource for ScriptedPose {
    fn next_frame(&mut self) -> Result<Option<PoseFrame>, InputError> {
        let visible = self.tick % self.cycle < self.cycle - self.absent;
        let frame = visible.then(|| self.figure());
        self.tick += 1;
        Ok(Some(frame))
    }
}
