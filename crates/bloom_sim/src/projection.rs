//! Landmark to screen projection
//!
//! Pose landmarks arrive in normalized camera coordinates. The body is
//! re-centred, mirrored, scaled by how large it appears in the camera and
//! dropped so the left foot rests a fixed distance above the bottom edge.

use crate::anchor::{landmark, AnchorRole};
use crate::config::ProjectionConfig;
use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Scale used when there is nothing to measure.
pub const DEFAULT_BODY_SCALE: f32 = 0.5;
pub const MIN_BODY_SCALE: f32 = 0.1;
pub const MAX_BODY_SCALE: f32 = 3.0;

/// One pose keypoint. `y` routinely leaves [0, 1] when limbs are out of frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            visibility: Some(visibility),
        }
    }

    /// Missing visibility counts as fully visible.
    pub fn visibility(&self) -> f32 {
        self.visibility.unwrap_or(1.0)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Per-session interpolation from elbow to wrist for the hand anchors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HandBlend {
    pub left: f32,
    pub right: f32,
}

impl Default for HandBlend {
    fn default() -> Self {
        Self {
            left: 1.0,
            right: 1.0,
        }
    }
}

/// Write the blended hand positions into the hand anchor slots.
pub fn apply_hand_blend(landmarks: &[Landmark], blend: HandBlend) -> Vec<Landmark> {
    let mut adjusted = landmarks.to_vec();
    let mut write = |slot: usize, elbow: usize, wrist: usize, t: f32| {
        let (Some(e), Some(w)) = (landmarks.get(elbow), landmarks.get(wrist)) else {
            return;
        };
        if let Some(target) = adjusted.get_mut(slot) {
            *target = Landmark::with_visibility(
                e.x + (w.x - e.x) * t,
                e.y + (w.y - e.y) * t,
                e.visibility().min(w.visibility()),
            );
        }
    };
    write(landmark::LEFT_HAND_SLOT, landmark::LEFT_ELBOW, landmark::LEFT_WRIST, blend.left);
    write(landmark::RIGHT_WRIST, landmark::RIGHT_ELBOW, landmark::RIGHT_WRIST, blend.right);
    adjusted
}

/// Exponential moving average per landmark slot to calm detector jitter.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother {
    factor: f32,
    state: Vec<Option<Landmark>>,
}

impl LandmarkSmoother {
    pub fn new(factor: f32) -> Self {
        Self {
            factor,
            state: Vec::new(),
        }
    }

    /// The first sighting of a slot is taken as-is; later ones are blended.
    pub fn apply(&mut self, landmarks: &[Landmark]) -> Vec<Landmark> {
        if self.state.len() < landmarks.len() {
            self.state.resize(landmarks.len(), None);
        }
        landmarks
            .iter()
            .zip(self.state.iter_mut())
            .map(|(current, slot)| {
                let next = match slot {
                    None => *current,
                    Some(prev) => Landmark {
                        x: prev.x * self.factor + current.x * (1.0 - self.factor),
                        y: prev.y * self.factor + current.y * (1.0 - self.factor),
                        visibility: current.visibility,
                    },
                };
                *slot = Some(next);
                next
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.state.clear();
    }
}

/// Mean position of landmarks above the visibility threshold; screen centre
/// when none qualify.
pub fn pose_center(landmarks: &[Landmark], visibility_threshold: f32) -> Vec2 {
    let (sum, count) = landmarks
        .iter()
        .filter(|l| l.visibility() > visibility_threshold)
        .fold((Vec2::ZERO, 0u32), |(sum, n), l| (sum + l.position(), n + 1));
    if count == 0 {
        Vec2::splat(0.5)
    } else {
        sum / count as f32
    }
}

/// Fraction of the screen height the body should fill, given its apparent
/// height in the camera.
///
/// The breakpoints were tuned against observed heights, which exceed 1 when
/// the body is close; they are calibration constants, not normalized bounds.
pub fn target_occupancy(body_height: f32) -> f32 {
    if body_height <= 0.7 {
        0.3
    } else if body_height <= 1.5 {
        let t = (body_height - 0.7) / (1.5 - 0.7);
        0.3 + t * (0.6 - 0.3)
    } else if body_height <= 3.0 {
        let t = (body_height - 1.5) / (3.0 - 1.5);
        0.6 + t * (0.75 - 0.6)
    } else {
        0.75
    }
}

/// Scale factor from the vertical spread of the five anchor landmarks.
pub fn body_scale_factor(landmarks: &[Landmark], visibility_threshold: f32) -> f32 {
    let mut ys = AnchorRole::ALL
        .iter()
        .filter_map(|role| landmarks.get(role.landmark_index()))
        .filter(|l| l.visibility() > visibility_threshold)
        .map(|l| l.y)
        .peekable();
    if ys.peek().is_none() {
        return DEFAULT_BODY_SCALE;
    }

    let (min_y, max_y) = ys.fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), y| {
        (lo.min(y), hi.max(y))
    });
    let height = max_y - min_y;
    if height <= 0.0 {
        return MAX_BODY_SCALE;
    }
    (target_occupancy(height) / height).clamp(MIN_BODY_SCALE, MAX_BODY_SCALE)
}

/// Projection parameters derived from one frame's landmarks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    canvas: Vec2,
    center: Vec2,
    shifted_center_x: f32,
    scale: f32,
    vertical_offset: f32,
}

impl Projection {
    pub fn new(landmarks: &[Landmark], canvas: Vec2, config: &ProjectionConfig) -> Self {
        let center = pose_center(landmarks, config.visibility_threshold);
        let mut projection = Self {
            canvas,
            center,
            shifted_center_x: 0.5 + (center.x - 0.5) * config.translation_multiplier,
            scale: body_scale_factor(landmarks, config.visibility_threshold),
            vertical_offset: 0.0,
        };

        if let Some(foot) = landmarks.get(landmark::LEFT_FOOT_INDEX) {
            let foot_y = projection.to_screen(foot).y;
            projection.vertical_offset = canvas.y - config.foot_offset_from_bottom - foot_y;
        }
        projection
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Screen position of a landmark: offset from the pose centre is
    /// mirrored horizontally around the shifted centre, then scaled about
    /// the canvas midpoint.
    pub fn to_screen(&self, landmark: &Landmark) -> Vec2 {
        let relative_x = landmark.x - self.center.x;
        let mirrored_x = self.shifted_center_x - relative_x;
        let offset = Vec2::new(
            (mirrored_x - 0.5) * self.canvas.x,
            (landmark.y - 0.5) * self.canvas.y,
        );
        self.canvas * 0.5 + offset * self.scale + Vec2::new(0.0, self.vertical_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skeleton() -> Vec<Landmark> {
        let mut points = vec![Landmark::with_visibility(0.5, 0.5, 0.0); 33];
        points[landmark::NOSE] = Landmark::new(0.5, 0.2);
        points[landmark::LEFT_ELBOW] = Landmark::new(0.35, 0.4);
        points[landmark::LEFT_WRIST] = Landmark::new(0.35, 0.5);
        points[landmark::RIGHT_ELBOW] = Landmark::new(0.65, 0.4);
        points[landmark::RIGHT_WRIST] = Landmark::new(0.65, 0.5);
        points[landmark::RIGHT_ANKLE] = Landmark::new(0.55, 0.9);
        points[landmark::LEFT_FOOT_INDEX] = Landmark::new(0.45, 0.92);
        points
    }

    #[test]
    fn test_occupancy_breakpoints() {
        assert_eq!(target_occupancy(0.2), 0.3);
        assert_eq!(target_occupancy(0.7), 0.3);
        assert!((target_occupancy(1.1) - 0.45).abs() < 1e-6);
        assert!((target_occupancy(1.5) - 0.6).abs() < 1e-6);
        assert!((target_occupancy(2.25) - 0.675).abs() < 1e-6);
        assert_eq!(target_occupancy(3.5), 0.75);
    }

    #[test]
    fn test_scale_clamped() {
        // Tiny spread: would be huge without the clamp.
        let mut points = skeleton();
        for role in AnchorRole::ALL {
            points[role.landmark_index()] = Landmark::new(0.5, 0.5);
        }
        points[landmark::NOSE].y = 0.49;
        assert_eq!(body_scale_factor(&points, 0.4), MAX_BODY_SCALE);

        // Huge spread: 0.75 / 40.
        points[landmark::NOSE].y = -20.0;
        points[landmark::LEFT_FOOT_INDEX].y = 20.0;
        assert_eq!(body_scale_factor(&points, 0.4), MIN_BODY_SCALE);
    }

    #[test]
    fn test_scale_ignores_hidden_points() {
        assert_eq!(body_scale_factor(&[], 0.4), DEFAULT_BODY_SCALE);
        let hidden = vec![Landmark::with_visibility(0.5, 0.5, 0.2); 33];
        assert_eq!(body_scale_factor(&hidden, 0.4), DEFAULT_BODY_SCALE);
    }

    #[test]
    fn test_center_skips_low_visibility() {
        let points = vec![
            Landmark::new(0.2, 0.2),
            Landmark::new(0.4, 0.6),
            Landmark::with_visibility(1.0, 1.0, 0.4),
        ];
        let center = pose_center(&points, 0.4);
        assert!((center - Vec2::new(0.3, 0.4)).length() < 1e-6);
        assert_eq!(pose_center(&[], 0.4), Vec2::splat(0.5));
    }

    #[test]
    fn test_hand_blend_writes_anchor_slots() {
        let points = apply_hand_blend(
            &skeleton(),
            HandBlend {
                left: 0.5,
                right: 1.0,
            },
        );
        let left = points[landmark::LEFT_HAND_SLOT];
        assert!((left.y - 0.45).abs() < 1e-6);
        assert_eq!(left.visibility(), 1.0);
        let right = points[landmark::RIGHT_WRIST];
        assert!((right.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_hand_blend_tolerates_short_input() {
        let points = vec![Landmark::new(0.5, 0.5); 3];
        assert_eq!(apply_hand_blend(&points, HandBlend::default()), points);
    }

    #[test]
    fn test_smoother_first_sighting_is_raw() {
        let mut smoother = LandmarkSmoother::new(0.95);
        let first = smoother.apply(&[Landmark::new(0.2, 0.2)]);
        assert_eq!(first[0].position(), Vec2::new(0.2, 0.2));
        let second = smoother.apply(&[Landmark::new(1.2, 0.2)]);
        assert!((second[0].x - 0.25).abs() < 1e-6);

        smoother.reset();
        let third = smoother.apply(&[Landmark::new(0.9, 0.9)]);
        assert_eq!(third[0].position(), Vec2::new(0.9, 0.9));
    }

    #[test]
    fn test_left_foot_rests_above_bottom() {
        let config = ProjectionConfig::default();
        let canvas = Vec2::new(1280.0, 720.0);
        let points = apply_hand_blend(&skeleton(), HandBlend::default());
        let projection = Projection::new(&points, canvas, &config);
        let foot = projection.to_screen(&points[landmark::LEFT_FOOT_INDEX]);
        assert!((foot.y - 680.0).abs() < 1e-3);

        // Mirrored: the head sits above the foot, the hands swap sides.
        let head = projection.to_screen(&points[landmark::NOSE]);
        assert!(head.y < foot.y);
        let left = projection.to_screen(&points[landmark::LEFT_HAND_SLOT]);
        let right = projection.to_screen(&points[landmark::RIGHT_WRIST]);
        assert!(left.x > right.x);
    }
}
