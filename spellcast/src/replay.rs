//! Recorded tick scripts.
//!
//! A script stands in for the host: it supplies the per-tick hand samples
//! the engine would otherwise receive from tracked controllers.
//!
//! ```text
//! (:config (:dual-grace-ms 250)
//!  :frames ((:dt 11.1 :repeat 3
//!            :left (:pos (0 0 0) :rot (0 0 0) :trigger t)
//!            :right (:trigger nil))
//!           ...))
//! ```
//!
//! A missing hand or pose is the zero offset, a missing trigger is
//! released, a missing `:dt` falls back to the runner's default, and
//! `:repeat` (default 1) replays the frame that many ticks.

use lexpr::Value;
use thiserror::Error;
use tracing::debug;

use crate::cast::geometry::ZERO;
use crate::cast::{CastConfig, CastCoordinator, CastEvent, HandInput};
use crate::sexp::{self, SexpError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Sexp(#[from] SexpError),
    #[error("frame {index}: {source}")]
    Frame {
        index: usize,
        #[source]
        source: SexpError,
    },
}

/// One scripted sample, possibly repeated.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub dt_ms: Option<f64>,
    pub repeat: u32,
    pub left: HandInput,
    pub right: HandInput,
}

#[derive(Debug, Clone)]
pub struct Script {
    /// Config overrides, applied on top of the runner's config.
    pub config: Option<Value>,
    pub frames: Vec<Frame>,
}

impl Script {
    pub fn parse(raw: &str) -> Result<Self, ReplayError> {
        let doc = sexp::parse(raw)?;
        let frames = match sexp::get_value(&doc, "frames") {
            Some(list) => sexp::list_items(list)
                .into_iter()
                .enumerate()
                .map(|(index, v)| {
                    frame_from_value(v).map_err(|source| ReplayError::Frame { index, source })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => return Err(SexpError::Missing("frames").into()),
        };
        Ok(Self {
            config: sexp::get_value(&doc, "config").cloned(),
            frames,
        })
    }

    pub fn apply_config(&self, config: &mut CastConfig) {
        if let Some(value) = &self.config {
            config.apply_sexp(value);
        }
    }

    /// Total ticks after expanding repeats.
    pub fn tick_count(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.repeat)).sum()
    }
}

fn frame_from_value(value: &Value) -> Result<Frame, SexpError> {
    let dt_ms = match sexp::get_float(value, "dt") {
        Some(dt) if !dt.is_finite() || dt < 0.0 => {
            return Err(SexpError::Invalid {
                field: "dt",
                expected: "a non-negative number",
            })
        }
        other => other,
    };
    let repeat = match sexp::get_int(value, "repeat") {
        Some(n) => u32::try_from(n)
            .ok()
            .filter(|&n| n > 0)
            .ok_or(SexpError::Invalid {
                field: "repeat",
                expected: "a positive integer",
            })?,
        None => 1,
    };
    Ok(Frame {
        dt_ms,
        repeat,
        left: hand_from_value(sexp::get_value(value, "left"))?,
        right: hand_from_value(sexp::get_value(value, "right"))?,
    })
}

fn hand_from_value(value: Option<&Value>) -> Result<HandInput, SexpError> {
    let Some(value) = value else {
        return Ok(HandInput::released());
    };
    Ok(HandInput {
        delta_position: sexp::get_vec3(value, "pos")?.unwrap_or(ZERO),
        delta_rotation: sexp::get_vec3(value, "rot")?.unwrap_or(ZERO),
        trigger_held: sexp::get_bool(value, "trigger").unwrap_or(false),
    })
}

// ── Runner ─────────────────────────────────────────────────

/// An engine event stamped with the tick that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct TickEvent {
    pub tick: u64,
    pub event: CastEvent,
}

impl TickEvent {
    pub fn to_sexp(&self) -> String {
        let mut fields = vec![("tick", self.tick.to_string())];
        fields.extend(self.event.fields());
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        sexp::format_event(self.event.name(), &borrowed)
    }
}

/// Feed every scripted tick through the coordinator.
pub fn run(coordinator: &mut CastCoordinator, script: &Script, default_dt_ms: f64) -> Vec<TickEvent> {
    let mut out = Vec::new();
    let mut tick = 0_u64;
    for frame in &script.frames {
        let dt = frame.dt_ms.unwrap_or(default_dt_ms);
        for _ in 0..frame.repeat {
            for event in coordinator.update(&frame.left, &frame.right, dt) {
                debug!("tick {}: {}", tick, event.name());
                out.push(TickEvent { tick, event });
            }
            tick += 1;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cast::{CastMode, CastState, Hand, TemplateLibrary};

    const GRENADE_RIGHT: &str = r#"
        (:frames ((:right (:pos (0 0 0) :trigger t))
                  (:right (:pos (0 0.3 0) :trigger t))
                  (:right (:pos (0.3 0.3 0) :trigger t))
                  (:right (:pos (0.3 0 0) :trigger t))
                  (:right (:pos (0 0 0) :trigger t) :repeat 2)
                  (:dt 20 :right (:trigger nil))))
    "#;

    fn coordinator() -> CastCoordinator {
        CastCoordinator::new(TemplateLibrary::builtin(), CastConfig::default())
    }

    #[test]
    fn test_parse_defaults() {
        let script = Script::parse(GRENADE_RIGHT).unwrap();
        assert_eq!(script.frames.len(), 6);
        assert_eq!(script.tick_count(), 7);
        let first = &script.frames[0];
        assert_eq!(first.dt_ms, None);
        assert_eq!(first.repeat, 1);
        assert!(!first.left.trigger_held);
        assert!(first.right.trigger_held);
        assert_eq!(first.right.delta_rotation, ZERO);
        assert_eq!(script.frames[5].dt_ms, Some(20.0));
        assert!(!script.frames[5].right.trigger_held);
        assert!(script.config.is_none());
    }

    #[test]
    fn test_run_grenade_script() {
        let script = Script::parse(GRENADE_RIGHT).unwrap();
        let mut c = coordinator();
        let events = run(&mut c, &script, 11.1);

        let complete = events
            .iter()
            .find(|e| e.event.name() == "cast-complete")
            .expect("grenade should complete");
        assert_eq!(complete.tick, 4);
        assert_eq!(
            complete.to_sexp(),
            "(:type :event :event :cast-complete :tick 4 :hand :right :spell \"grenade\" :charges 3 :effect :grenade)"
        );
        assert_eq!(c.mode(), CastMode::Idle);
        assert_eq!(c.cast_state(Hand::Right), CastState::Ready);
        assert_eq!(c.record(Hand::Right).charges, 3);
    }

    #[test]
    fn test_config_overrides_apply() {
        let script = Script::parse(
            "(:config (:dual-grace-ms 50 :min-scale 0.1) :frames ((:left (:trigger t))))",
        )
        .unwrap();
        let mut config = CastConfig::default();
        script.apply_config(&mut config);
        assert_eq!(config.dual_grace_ms, 50.0);
        assert!((config.min_scale - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_grace_follows_script_dt() {
        // Right alone for 3 x 20ms, then left joins: inside a 50ms window
        // only if dt is honored per frame.
        let script = Script::parse(
            "(:config (:dual-grace-ms 50)
              :frames ((:dt 20 :repeat 3 :right (:trigger t))
                       (:dt 20 :left (:trigger t) :right (:trigger t))))",
        )
        .unwrap();
        let mut config = CastConfig::default();
        script.apply_config(&mut config);
        let mut c = CastCoordinator::new(TemplateLibrary::builtin(), config);
        run(&mut c, &script, 1.0);
        assert_eq!(c.mode(), CastMode::Separate);
    }

    #[test]
    fn test_bad_frames_report_index() {
        let err = Script::parse("(:frames ((:right (:trigger t)) (:repeat 0)))").unwrap_err();
        assert!(matches!(err, ReplayError::Frame { index: 1, .. }), "{}", err);

        let err = Script::parse("(:frames ((:left (:pos (1 2)))))").unwrap_err();
        assert!(err.to_string().starts_with("frame 0:"), "{}", err);

        assert!(matches!(
            Script::parse("(:config ())"),
            Err(ReplayError::Sexp(SexpError::Missing("frames")))
        ));
    }
}
