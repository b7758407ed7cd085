//! Per-hand tick input.
//!
//! The host samples each controller once per simulation tick and hands the
//! engine a pose delta relative to the pose captured at cast start, already
//! expressed in the casting grid's local frame (start-pose pitch and roll
//! forced to zero, yaw fixed at cast start).

use super::geometry::{self, Vec3, ZERO};

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.  Templates are authored for the right (dominant) hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// Both hands, left first.
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// The other hand.
    pub fn other(&self) -> Hand {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Whether template references must be mirrored for this hand.
    pub fn is_mirrored(&self) -> bool {
        matches!(self, Self::Left)
    }

    /// Template position as seen by this hand.
    pub fn position(&self, p: Vec3) -> Vec3 {
        if self.is_mirrored() {
            geometry::mirror_position(p)
        } else {
            p
        }
    }

    /// Template rotation as seen by this hand.
    pub fn rotation(&self, r: Vec3) -> Vec3 {
        if self.is_mirrored() {
            geometry::mirror_rotation(r)
        } else {
            r
        }
    }
}

// ── Tick input ─────────────────────────────────────────────

/// One hand's sampled state for a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandInput {
    /// Position offset from the cast-start pose (meters).
    pub delta_position: Vec3,
    /// Rotation offset from the cast-start pose (degrees, pitch/yaw/roll).
    pub delta_rotation: Vec3,
    /// Whether the cast trigger is held.
    pub trigger_held: bool,
}

impl Default for HandInput {
    fn default() -> Self {
        Self {
            delta_position: ZERO,
            delta_rotation: ZERO,
            trigger_held: false,
        }
    }
}

impl HandInput {
    /// Trigger held at the given pose delta.
    pub fn held(delta_position: Vec3, delta_rotation: Vec3) -> Self {
        Self {
            delta_position,
            delta_rotation,
            trigger_held: true,
        }
    }

    /// Trigger released; pose is irrelevant.
    pub fn released() -> Self {
        Self::default()
    }

    /// Rotation wrapped into `(-180, 180]` per axis.
    pub fn normalized_rotation(&self) -> Vec3 {
        geometry::normalize_rotation(self.delta_rotation)
    }
}
