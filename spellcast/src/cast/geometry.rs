//! Tolerance geometry for waypoint matching.
//!
//! Pure predicates over start-pose-local vectors: an axis-masked band
//! between two reference points, and a fixed per-axis radius around a
//! target.  Rotations are Euler degrees `(pitch, yaw, roll)` and are
//! normalized into `(-180, 180]` before comparison.

/// Three-component vector: meters for positions, degrees for rotations.
pub type Vec3 = [f32; 3];

/// The zero offset every template starts from.
pub const ZERO: Vec3 = [0.0, 0.0, 0.0];

// ── Axis mask ──────────────────────────────────────────────

/// Per-axis enable flags for band checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMask {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl AxisMask {
    /// Every axis checked.
    pub const ALL: AxisMask = AxisMask::new(true, true, true);
    /// No axis checked.
    pub const NONE: AxisMask = AxisMask::new(false, false, false);

    pub const fn new(x: bool, y: bool, z: bool) -> Self {
        Self { x, y, z }
    }

    /// Enable flags as an array, ordered x, y, z.
    pub fn axes(&self) -> [bool; 3] {
        [self.x, self.y, self.z]
    }

    /// Compact form for IPC/status output, e.g. `"xz"`, or `"-"` when empty.
    pub fn as_flags(&self) -> String {
        let mut s = String::new();
        if self.x {
            s.push('x');
        }
        if self.y {
            s.push('y');
        }
        if self.z {
            s.push('z');
        }
        if s.is_empty() {
            s.push('-');
        }
        s
    }
}

impl Default for AxisMask {
    fn default() -> Self {
        Self::ALL
    }
}

// ── Predicates ─────────────────────────────────────────────

/// Whether `value` lies within `max_error` of the segment `[start, end]`
/// on a single axis.  A disabled axis always passes.
pub fn in_band(value: f32, start: f32, end: f32, max_error: f32, enabled: bool) -> bool {
    if !enabled {
        return true;
    }
    let lo = start.min(end) - max_error;
    let hi = start.max(end) + max_error;
    value >= lo && value <= hi
}

/// Per-axis [`in_band`] over a full vector.
pub fn in_band_vec(value: Vec3, start: Vec3, end: Vec3, max_error: f32, mask: AxisMask) -> bool {
    mask.axes()
        .iter()
        .enumerate()
        .all(|(i, &enabled)| in_band(value[i], start[i], end[i], max_error, enabled))
}

/// Whether every axis of `current` is within `max_error` of `target`.
/// Never masked.
pub fn within_radius(current: Vec3, target: Vec3, max_error: f32) -> bool {
    (0..3).all(|i| (current[i] - target[i]).abs() <= max_error)
}

/// Largest absolute component, used as the gesture amplitude.
pub fn max_abs_component(v: Vec3) -> f32 {
    v.iter().fold(0.0_f32, |acc, c| acc.max(c.abs()))
}

/// Multiply every component by `factor`.
pub fn scaled(v: Vec3, factor: f32) -> Vec3 {
    [v[0] * factor, v[1] * factor, v[2] * factor]
}

// ── Angles ─────────────────────────────────────────────────

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_angle(deg: f32) -> f32 {
    let mut a = deg % 360.0;
    if a <= -180.0 {
        a += 360.0;
    } else if a > 180.0 {
        a -= 360.0;
    }
    a
}

/// [`normalize_angle`] applied per axis.
pub fn normalize_rotation(r: Vec3) -> Vec3 {
    [
        normalize_angle(r[0]),
        normalize_angle(r[1]),
        normalize_angle(r[2]),
    ]
}

// ── Mirroring ──────────────────────────────────────────────

/// Reflect a right-hand position for the left hand (lateral axis negated).
pub fn mirror_position(p: Vec3) -> Vec3 {
    [-p[0], p[1], p[2]]
}

/// Reflect a right-hand rotation for the left hand.
///
/// Reflection across the sagittal plane keeps pitch and negates yaw and roll.
pub fn mirror_rotation(r: Vec3) -> Vec3 {
    [r[0], -r[1], -r[2]]
}

/// Whether all components are finite.
pub fn is_finite(v: Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_band_inside_and_outside() {
        assert!(in_band(0.5, 0.0, 1.0, 0.1, true));
        assert!(in_band(1.1, 0.0, 1.0, 0.1, true));
        assert!(in_band(-0.1, 0.0, 1.0, 0.1, true));
        assert!(!in_band(1.2, 0.0, 1.0, 0.1, true));
        assert!(!in_band(-0.2, 0.0, 1.0, 0.1, true));
    }

    #[test]
    fn test_in_band_disabled_axis_always_passes() {
        assert!(in_band(100.0, 0.0, 1.0, 0.1, false));
        assert!(in_band(f32::MAX, 0.0, 0.0, 0.0, false));
    }

    #[test]
    fn test_in_band_symmetric_in_start_end() {
        let samples = [-2.0, -1.05, -0.5, 0.0, 0.3, 0.95, 1.0, 1.04, 3.0];
        for &v in &samples {
            for &e in &[0.0, 0.05, 0.1, 1.0] {
                for &enabled in &[true, false] {
                    assert_eq!(
                        in_band(v, -1.0, 1.0, e, enabled),
                        in_band(v, 1.0, -1.0, e, enabled),
                        "asymmetric at v={v} e={e}",
                    );
                }
            }
        }
    }

    #[test]
    fn test_in_band_vec_respects_mask() {
        let start = [0.0, 0.0, 0.0];
        let end = [0.0, 1.0, 0.0];
        // x drifts past tolerance
        let value = [0.2, 0.5, 0.0];
        assert!(!in_band_vec(value, start, end, 0.1, AxisMask::ALL));
        assert!(in_band_vec(value, start, end, 0.1, AxisMask::new(false, true, true)));
        assert!(in_band_vec([9.0, 9.0, 9.0], start, end, 0.1, AxisMask::NONE));
    }

    #[test]
    fn test_within_radius() {
        assert!(within_radius([0.1, 0.2, 0.3], [0.1, 0.2, 0.3], 0.0));
        assert!(within_radius([0.15, 0.2, 0.25], [0.1, 0.2, 0.3], 0.06));
        assert!(!within_radius([0.1, 0.2, 0.5], [0.1, 0.2, 0.3], 0.1));
    }

    #[test]
    fn test_max_abs_component() {
        assert_eq!(max_abs_component([0.1, -0.4, 0.3]), 0.4);
        assert_eq!(max_abs_component(ZERO), 0.0);
    }

    #[test]
    fn test_normalize_angle_range() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(190.0), -170.0);
        assert_eq!(normalize_angle(-190.0), 170.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(-540.0), 180.0);
    }

    #[test]
    fn test_mirror_is_involution() {
        let p = [0.3, -0.2, 1.5];
        let r = [12.0, -45.0, 170.0];
        assert_eq!(mirror_position(mirror_position(p)), p);
        assert_eq!(mirror_rotation(mirror_rotation(r)), r);
    }

    #[test]
    fn test_mirror_axes() {
        assert_eq!(mirror_position([1.0, 2.0, 3.0]), [-1.0, 2.0, 3.0]);
        assert_eq!(mirror_rotation([10.0, 20.0, 30.0]), [10.0, -20.0, -30.0]);
    }

    #[test]
    fn test_axis_mask_flags() {
        assert_eq!(AxisMask::ALL.as_flags(), "xyz");
        assert_eq!(AxisMask::new(true, false, true).as_flags(), "xz");
        assert_eq!(AxisMask::NONE.as_flags(), "-");
    }
}
