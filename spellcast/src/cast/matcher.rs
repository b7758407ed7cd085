//! Per-hand gesture matcher.
//!
//! Drives one hand's [`CandidateTable`] through a cast: reset on trigger
//! press, then once per tick eliminate templates that leave tolerance,
//! rescale the survivors to the user's first motion, advance arrivals, and
//! report the first template (in library order) to finish.
//!
//! State transitions are pure functions on [`CastState`]; the matcher only
//! applies the effect they ask for.

use tracing::{debug, info};

use super::candidate::CandidateTable;
use super::config::CastConfig;
use super::geometry::{in_band_vec, max_abs_component, within_radius, Vec3};
use super::hand::{Hand, HandInput};
use super::template::{SpellTemplate, TemplateId, TemplateLibrary};

// ── Cast state ─────────────────────────────────────────────

/// Lifecycle of one hand's cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastState {
    /// Idle, waiting for a trigger press.
    Ready,
    /// Trigger held, candidates being matched.
    Casting,
    /// A template completed.  Held until release.
    Complete,
    /// Every candidate was eliminated.  Held until release.
    Failed,
}

/// What a trigger sample asks the matcher to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEffect {
    None,
    /// Reset candidates and begin matching.
    Start,
    /// Drop in-flight candidate state.
    Abandon,
}

/// Result of one matching tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// Still casting, or not casting at all.
    Pending,
    /// This template traversed every waypoint.
    Completed(TemplateId),
    /// No candidate remains.
    Exhausted,
}

impl CastState {
    /// String representation for IPC.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Casting => "casting",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }

    /// Transition on a trigger sample.  Completed or failed casts stay put
    /// while the trigger is held; only a release returns to `Ready`.
    pub fn on_trigger(self, held: bool) -> (CastState, TriggerEffect) {
        match (self, held) {
            (Self::Ready, true) => (Self::Casting, TriggerEffect::Start),
            (Self::Ready, false) => (Self::Ready, TriggerEffect::None),
            (_, false) => (Self::Ready, TriggerEffect::Abandon),
            (state, true) => (state, TriggerEffect::None),
        }
    }

    /// Transition on a matching outcome.
    pub fn on_outcome(self, outcome: MatchOutcome) -> CastState {
        match (self, outcome) {
            (Self::Casting, MatchOutcome::Completed(_)) => Self::Complete,
            (Self::Casting, MatchOutcome::Exhausted) => Self::Failed,
            (state, _) => state,
        }
    }
}

// ── Matcher ────────────────────────────────────────────────

/// Why a candidate was dropped.  Logged only.
#[derive(Debug, Clone, Copy)]
enum Elimination {
    Mode,
    Origin,
    /// Left the band toward the waypoint at this ordinal.
    Band(usize),
}

impl Elimination {
    fn describe(&self, template: &SpellTemplate) -> String {
        match self {
            Self::Mode => "wrong hand mode".to_string(),
            Self::Origin => "start pose off origin".to_string(),
            Self::Band(ordinal) => match template.waypoints.get(*ordinal) {
                Some(wp) => format!("left band toward waypoint {}", wp.index),
                None => format!("left band toward ordinal {}", ordinal),
            },
        }
    }
}

enum Step {
    Tracking,
    Eliminated(Elimination),
    Completed,
}

/// Matching state machine for a single hand.
#[derive(Debug, Clone)]
pub struct HandMatcher {
    state: CastState,
    table: CandidateTable,
    completed: Option<TemplateId>,
}

impl HandMatcher {
    pub fn new(hand: Hand, library: &TemplateLibrary, config: &CastConfig) -> Self {
        Self {
            state: CastState::Ready,
            table: CandidateTable::new(hand, library, config.min_scale),
            completed: None,
        }
    }

    pub fn hand(&self) -> Hand {
        self.table.hand()
    }

    pub fn state(&self) -> CastState {
        self.state
    }

    /// Per-template tracking state for this hand.
    pub fn table(&self) -> &CandidateTable {
        &self.table
    }

    /// Template that completed this cast, if any.
    pub fn completed(&self) -> Option<TemplateId> {
        self.completed
    }

    /// Apply a trigger sample.
    pub fn on_trigger(&mut self, held: bool, config: &CastConfig) -> TriggerEffect {
        let (next, effect) = self.state.on_trigger(held);
        match effect {
            TriggerEffect::Start => self.begin(config),
            TriggerEffect::Abandon => self.completed = None,
            TriggerEffect::None => {}
        }
        self.state = next;
        effect
    }

    /// Force the hand back to `Ready`, discarding the cast.
    pub fn release(&mut self) {
        self.state = CastState::Ready;
        self.completed = None;
    }

    fn begin(&mut self, config: &CastConfig) {
        self.table.reset(config.min_scale);
        self.completed = None;
        info!("{} hand cast started", self.hand().as_str());
    }

    /// Evaluate one tick.  `dual` selects dual-only templates instead of
    /// single-hand ones.
    pub fn advance(
        &mut self,
        library: &TemplateLibrary,
        config: &CastConfig,
        input: &HandInput,
        dual: bool,
    ) -> MatchOutcome {
        if self.state != CastState::Casting {
            return MatchOutcome::Pending;
        }

        let position = input.delta_position;
        let rotation = input.normalized_rotation();

        let mut outcome = MatchOutcome::Pending;
        for (id, template) in library.iter() {
            if !self.table[id].is_valid() {
                continue;
            }
            match self.step(id, template, config, position, rotation, dual) {
                Step::Tracking => {}
                Step::Eliminated(reason) => {
                    self.table[id].invalidate();
                    debug!(
                        "{} eliminated on {} hand: {}",
                        template.spell_id,
                        self.hand().as_str(),
                        reason.describe(template)
                    );
                }
                Step::Completed => {
                    outcome = MatchOutcome::Completed(id);
                    break;
                }
            }
        }

        if outcome == MatchOutcome::Pending && self.table.valid_count() == 0 {
            outcome = MatchOutcome::Exhausted;
        }

        match outcome {
            MatchOutcome::Completed(id) => {
                self.completed = Some(id);
                info!(
                    "{} hand completed {}",
                    self.hand().as_str(),
                    library[id].spell_id
                );
            }
            MatchOutcome::Exhausted => {
                info!("{} hand failed: no template matches", self.hand().as_str());
            }
            MatchOutcome::Pending => {}
        }
        self.state = self.state.on_outcome(outcome);
        outcome
    }

    /// Advance one candidate against the current pose.
    fn step(
        &mut self,
        id: TemplateId,
        template: &SpellTemplate,
        config: &CastConfig,
        position: Vec3,
        rotation: Vec3,
        dual: bool,
    ) -> Step {
        let pos_err = config.max_position_error;
        let rot_err = config.max_rotation_error_deg;

        if template.dual_only != dual {
            return Step::Eliminated(Elimination::Mode);
        }

        if !self.table[id].origin_reached() {
            let origin_p = self.table.target_position(template, 0, 1.0);
            let origin_r = self.table.target_rotation(template, 0);
            if !(within_radius(position, origin_p, pos_err)
                && within_radius(rotation, origin_r, rot_err))
            {
                return Step::Eliminated(Elimination::Origin);
            }
            self.table[id].mark_reached(0);
        }

        let Some(next) = self.table[id].next_target() else {
            return Step::Completed;
        };

        // The first committed segment sets the working amplitude.
        if next == 1 || next == 2 {
            let amplitude = max_abs_component(position);
            let grow = next == 1 || {
                let scale = self.table[id].scale();
                within_radius(position, self.table.target_position(template, 1, scale), pos_err)
                    && within_radius(rotation, self.table.target_rotation(template, 1), rot_err)
            };
            if grow {
                self.table[id].grow_scale(amplitude, config.min_scale);
            }
        }

        let scale = self.table[id].scale();
        let waypoint = &template.waypoints[next];
        let prev_p = self.table.target_position(template, next - 1, scale);
        let target_p = self.table.target_position(template, next, scale);
        let prev_r = self.table.target_rotation(template, next - 1);
        let target_r = self.table.target_rotation(template, next);

        if !in_band_vec(position, prev_p, target_p, pos_err, waypoint.position_mask)
            || !in_band_vec(rotation, prev_r, target_r, rot_err, waypoint.rotation_mask)
        {
            return Step::Eliminated(Elimination::Band(next));
        }

        if within_radius(position, target_p, pos_err) && within_radius(rotation, target_r, rot_err)
        {
            self.table[id].mark_reached(next);
            debug!(
                "{} reached waypoint {} on {} hand (scale {:.3})",
                template.spell_id,
                waypoint.index,
                self.table.hand().as_str(),
                scale
            );
            if self.table[id].next_target().is_none() {
                return Step::Completed;
            }
        }

        Step::Tracking
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
pub(crate) fn grenade_path(s: f32) -> Vec<Vec3> {
    vec![
        [0.0, 0.0, 0.0],
        [0.0, s, 0.0],
        [s, s, 0.0],
        [s, 0.0, 0.0],
        [0.0, 0.0, 0.0],
    ]
}
