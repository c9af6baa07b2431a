//! Body anchors
//!
//! Five fixed roles read from the pose landmark list. Each role owns one
//! color group per session.

use serde::{Deserialize, Serialize};

/// Number of tracked anchor roles.
pub const ANCHOR_COUNT: usize = 5;

/// Landmark slots in the pose model's 33-point layout.
pub mod landmark {
    pub const NOSE: usize = 0;
    /// Rewritten each frame with the blended left hand position.
    pub const LEFT_HAND_SLOT: usize = 11;
    pub const LEFT_ELBOW: usize = 13;
    pub const RIGHT_ELBOW: usize = 14;
    pub const LEFT_WRIST: usize = 15;
    pub const RIGHT_WRIST: usize = 16;
    pub const RIGHT_ANKLE: usize = 28;
    pub const LEFT_FOOT_INDEX: usize = 31;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnchorRole {
    Head,
    LeftHand,
    RightHand,
    LeftFoot,
    RightAnkle,
}

impl AnchorRole {
    pub const ALL: [AnchorRole; ANCHOR_COUNT] = [
        AnchorRole::Head,
        AnchorRole::LeftHand,
        AnchorRole::RightHand,
        AnchorRole::LeftFoot,
        AnchorRole::RightAnkle,
    ];

    /// Group index; also the palette slot for this role.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Landmark slot this role reads from.
    pub const fn landmark_index(self) -> usize {
        match self {
            AnchorRole::Head => landmark::NOSE,
            AnchorRole::LeftHand => landmark::LEFT_HAND_SLOT,
            AnchorRole::RightHand => landmark::RIGHT_WRIST,
            AnchorRole::LeftFoot => landmark::LEFT_FOOT_INDEX,
            AnchorRole::RightAnkle => landmark::RIGHT_ANKLE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trips() {
        for (i, role) in AnchorRole::ALL.iter().enumerate() {
            assert_eq!(role.index(), i);
            assert_eq!(AnchorRole::from_index(i), Some(*role));
        }
        assert_eq!(AnchorRole::from_index(ANCHOR_COUNT), None);
    }

    #[test]
    fn test_landmark_slots_are_distinct() {
        let mut slots: Vec<usize> = AnchorRole::ALL.iter().map(|r| r.landmark_index()).collect();
        slots.sort_unstable();
        slots.dedup();
        assert_eq!(slots.len(), ANCHOR_COUNT);
    }
}
