//! Matching tunables.

use lexpr::Value;
use tracing::debug;

use crate::sexp;

/// Configuration for gesture matching and dual-cast timing.
#[derive(Debug, Clone, PartialEq)]
pub struct CastConfig {
    /// Enable casting.  When disabled, ticks are ignored.
    pub enabled: bool,
    /// Smallest amplitude (meters) a template may be scaled to.
    pub min_scale: f32,
    /// Position tolerance (meters) for band and arrival checks.
    pub max_position_error: f32,
    /// Rotation tolerance (degrees) for band and arrival checks.
    pub max_rotation_error_deg: f32,
    /// Window (ms) after the first trigger press in which the other hand
    /// can join for a synchronized dual cast.
    pub dual_grace_ms: f64,
}

impl Default for CastConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_scale: 0.2,
            max_position_error: 0.1,
            max_rotation_error_deg: 30.0,
            dual_grace_ms: 1000.0 / 3.0,
        }
    }
}

impl CastConfig {
    /// Override fields present in an s-expression plist, e.g.
    /// `(:min-scale 0.15 :dual-grace-ms 250)`.  Unknown keys are ignored.
    pub fn apply_sexp(&mut self, value: &Value) {
        if let Some(v) = sexp::get_bool(value, "enabled") {
            self.enabled = v;
        }
        if let Some(v) = sexp::get_float(value, "min-scale") {
            self.min_scale = v as f32;
        }
        if let Some(v) = sexp::get_float(value, "max-position-error") {
            self.max_position_error = v as f32;
        }
        if let Some(v) = sexp::get_float(value, "max-rotation-error-deg") {
            self.max_rotation_error_deg = v as f32;
        }
        if let Some(v) = sexp::get_float(value, "dual-grace-ms") {
            self.dual_grace_ms = v;
        }
        debug!("cast config: {}", self.config_sexp());
    }

    /// Generate s-expression for IPC config.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:enabled {} :min-scale {:.3} :max-position-error {:.3} :max-rotation-error-deg {:.1} :dual-grace-ms {:.0})",
            if self.enabled { "t" } else { "nil" },
            self.min_scale,
            self.max_position_error,
            self.max_rotation_error_deg,
            self.dual_grace_ms,
        )
    }
}
