//! Two-hand cast coordination.
//!
//! Derives the cast mode from both trigger states each tick, runs the two
//! [`HandMatcher`]s, and settles their outcomes into the per-hand and
//! shared [`ActiveSpellRecord`]s.
//!
//! Mode rules:
//! - Neither trigger held: `Idle`.  Matchers return to `Ready`, the grace
//!   timer and session latch are cleared, and charges of a shared spell are
//!   reconciled.
//! - Both triggers pressed on the same tick from idle: `Dual` at once.
//! - One trigger held: `Independent(hand)`.  If the other hand joins while
//!   the grace timer is within `dual_grace_ms` and the first hand is still
//!   casting, the session is promoted to `Dual` and both casts restart.
//!   A later join latches `Separate`.
//! - `Dual` and `Separate` stay latched until both triggers are released.

use tracing::{info, warn};

use super::config::CastConfig;
use super::effect::SpellEffect;
use super::geometry::{AxisMask, Vec3};
use super::hand::{Hand, HandInput};
use super::matcher::{CastState, HandMatcher, MatchOutcome, TriggerEffect};
use super::template::{SpellTemplate, TemplateId, TemplateLibrary};
use crate::sexp;

/// Outcome of the shared two-hand cast.  Same lifecycle as a hand.
pub type DualState = CastState;

// ── CastMode ───────────────────────────────────────────────

/// How the two hands are currently being matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastMode {
    Idle,
    /// One hand casting on single-hand templates.
    Independent(Hand),
    /// Both hands casting on single-hand templates, each on its own.
    Separate,
    /// Both hands casting one dual-only template together.
    Dual,
}

impl CastMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Independent(Hand::Left) => "independent-left",
            Self::Independent(Hand::Right) => "independent-right",
            Self::Separate => "separate",
            Self::Dual => "dual",
        }
    }

    pub fn is_dual(&self) -> bool {
        matches!(self, Self::Dual)
    }
}

/// Session latch, set once both hands are held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Latch {
    Open,
    Separate,
    Dual,
}

// ── ActiveSpellRecord ──────────────────────────────────────

/// The spell a hand (or the dual session) currently holds.
///
/// Written by the coordinator on completion.  The host owns the charge
/// count from then on and may edit or clear the record freely.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSpellRecord {
    pub spell_id: Option<String>,
    pub charges: u32,
    pub effect: Option<SpellEffect>,
    /// Mirrors the owning matcher (or the dual session) every tick.
    pub state: CastState,
}

impl Default for ActiveSpellRecord {
    fn default() -> Self {
        Self {
            spell_id: None,
            charges: 0,
            effect: None,
            state: CastState::Ready,
        }
    }
}

impl ActiveSpellRecord {
    /// Load a freshly completed template with its default charges.
    pub fn assign(&mut self, template: &SpellTemplate) {
        self.spell_id = Some(template.spell_id.clone());
        self.charges = template.default_charges;
        self.effect = Some(template.effect);
    }

    /// Spend one charge.  Returns the effect to spawn, or `None` when the
    /// record is empty or out of charges.
    pub fn discharge(&mut self) -> Option<SpellEffect> {
        if self.spell_id.is_none() || self.charges == 0 {
            return None;
        }
        self.charges -= 1;
        self.effect
    }

    pub fn clear(&mut self) {
        self.spell_id = None;
        self.charges = 0;
        self.effect = None;
    }

    pub fn status_sexp(&self) -> String {
        format!(
            "(:state :{} :spell {} :charges {} :effect {})",
            self.state.as_str(),
            match &self.spell_id {
                Some(id) => format!("\"{}\"", sexp::escape_string(id)),
                None => "nil".to_string(),
            },
            self.charges,
            match self.effect {
                Some(e) => format!(":{}", e.as_str()),
                None => "nil".to_string(),
            },
        )
    }
}

// ── CastEvent ──────────────────────────────────────────────

/// Events emitted by [`CastCoordinator::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum CastEvent {
    ModeChanged { from: CastMode, to: CastMode },
    /// A hand's trigger press started a cast.  The host should capture the
    /// start pose that later deltas are relative to.
    CastStarted { hand: Hand, dual: bool },
    /// A hand released its trigger, abandoning or ending its cast.
    CastReleased { hand: Hand },
    /// A single-hand template completed and the hand record was written.
    HandComplete {
        hand: Hand,
        spell_id: String,
        charges: u32,
        effect: SpellEffect,
    },
    /// Every candidate was eliminated on this hand.
    HandFailed { hand: Hand },
    /// One hand finished its half of a dual-only template.
    DualHandReady { hand: Hand, spell_id: String },
    /// Both hands finished the same dual-only template.
    DualComplete {
        spell_id: String,
        charges: u32,
        effect: SpellEffect,
    },
    /// Both hands finished, but on different dual-only templates.
    DualMismatch { left: String, right: String },
    DualFailed,
    /// Idle reconciliation lowered the charges of a shared spell.
    ChargesReconciled { spell_id: String, charges: u32 },
}

impl CastEvent {
    /// Event name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ModeChanged { .. } => "mode-changed",
            Self::CastStarted { .. } => "cast-started",
            Self::CastReleased { .. } => "cast-released",
            Self::HandComplete { .. } => "cast-complete",
            Self::HandFailed { .. } => "cast-failed",
            Self::DualHandReady { .. } => "dual-hand-ready",
            Self::DualComplete { .. } => "dual-complete",
            Self::DualMismatch { .. } => "dual-mismatch",
            Self::DualFailed => "dual-failed",
            Self::ChargesReconciled { .. } => "charges-reconciled",
        }
    }

    /// Payload fields in output order.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let quoted = |s: &str| format!("\"{}\"", sexp::escape_string(s));
        let hand_kw = |h: &Hand| format!(":{}", h.as_str());
        match self {
            Self::ModeChanged { from, to } => vec![
                ("from", format!(":{}", from.as_str())),
                ("to", format!(":{}", to.as_str())),
            ],
            Self::CastStarted { hand, dual } => vec![
                ("hand", hand_kw(hand)),
                ("dual", if *dual { "t" } else { "nil" }.to_string()),
            ],
            Self::CastReleased { hand } | Self::HandFailed { hand } => {
                vec![("hand", hand_kw(hand))]
            }
            Self::HandComplete {
                hand,
                spell_id,
                charges,
                effect,
            } => vec![
                ("hand", hand_kw(hand)),
                ("spell", quoted(spell_id)),
                ("charges", charges.to_string()),
                ("effect", format!(":{}", effect.as_str())),
            ],
            Self::DualHandReady { hand, spell_id } => {
                vec![("hand", hand_kw(hand)), ("spell", quoted(spell_id))]
            }
            Self::DualComplete {
                spell_id,
                charges,
                effect,
            } => vec![
                ("spell", quoted(spell_id)),
                ("charges", charges.to_string()),
                ("effect", format!(":{}", effect.as_str())),
            ],
            Self::DualMismatch { left, right } => {
                vec![("left", quoted(left)), ("right", quoted(right))]
            }
            Self::DualFailed => Vec::new(),
            Self::ChargesReconciled { spell_id, charges } => vec![
                ("spell", quoted(spell_id)),
                ("charges", charges.to_string()),
            ],
        }
    }

    /// Convert the event to an IPC s-expression.
    pub fn to_sexp(&self) -> String {
        let fields = self.fields();
        let borrowed: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        sexp::format_event(self.name(), &borrowed)
    }
}

// ── Candidate view ─────────────────────────────────────────

/// Snapshot of one still-valid candidate, for visualizers.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateView {
    pub template: TemplateId,
    pub spell_id: String,
    pub valid: bool,
    pub scale: f32,
    /// Position of the next waypoint in the template's list.
    pub next_waypoint: usize,
    /// Authored `index` of that waypoint.
    pub next_index: Option<usize>,
    /// Where the hand should go next: mirrored for the left hand and
    /// multiplied by `scale`.
    pub target: Option<Vec3>,
    /// Axes the band check enforces on the way there.
    pub position_mask: Option<AxisMask>,
}

// ── CastCoordinator ────────────────────────────────────────

/// Owns both hand matchers and the spell records they feed.
pub struct CastCoordinator {
    pub config: CastConfig,
    library: TemplateLibrary,
    left: HandMatcher,
    right: HandMatcher,
    mode: CastMode,
    latch: Latch,
    /// Time since the first trigger of the current session went down.
    grace_elapsed_ms: f64,
    dual_state: DualState,
    left_record: ActiveSpellRecord,
    right_record: ActiveSpellRecord,
    dual_record: ActiveSpellRecord,
}

impl CastCoordinator {
    pub fn new(library: TemplateLibrary, config: CastConfig) -> Self {
        let left = HandMatcher::new(Hand::Left, &library, &config);
        let right = HandMatcher::new(Hand::Right, &library, &config);
        info!(
            "cast coordinator ready: {} templates, grace {:.0}ms",
            library.len(),
            config.dual_grace_ms
        );
        Self {
            config,
            library,
            left,
            right,
            mode: CastMode::Idle,
            latch: Latch::Open,
            grace_elapsed_ms: 0.0,
            dual_state: CastState::Ready,
            left_record: ActiveSpellRecord::default(),
            right_record: ActiveSpellRecord::default(),
            dual_record: ActiveSpellRecord::default(),
        }
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn mode(&self) -> CastMode {
        self.mode
    }

    pub fn dual_state(&self) -> DualState {
        self.dual_state
    }

    pub fn cast_state(&self, hand: Hand) -> CastState {
        self.matcher(hand).state()
    }

    pub fn record(&self, hand: Hand) -> &ActiveSpellRecord {
        match hand {
            Hand::Left => &self.left_record,
            Hand::Right => &self.right_record,
        }
    }

    /// Host access for discharging or clearing a hand's spell.
    pub fn record_mut(&mut self, hand: Hand) -> &mut ActiveSpellRecord {
        match hand {
            Hand::Left => &mut self.left_record,
            Hand::Right => &mut self.right_record,
        }
    }

    pub fn dual_record(&self) -> &ActiveSpellRecord {
        &self.dual_record
    }

    fn matcher(&self, hand: Hand) -> &HandMatcher {
        match hand {
            Hand::Left => &self.left,
            Hand::Right => &self.right,
        }
    }

    /// Still-valid candidates on a hand, in library order.  Empty unless
    /// the hand is casting.
    pub fn candidates(&self, hand: Hand) -> Vec<CandidateView> {
        let matcher = self.matcher(hand);
        if matcher.state() != CastState::Casting {
            return Vec::new();
        }
        let table = matcher.table();
        table
            .valid()
            .map(|(id, c)| {
                let template = &self.library[id];
                let ordinal = c.next_waypoint();
                let next = template.waypoints.get(ordinal);
                CandidateView {
                    template: id,
                    spell_id: template.spell_id.clone(),
                    valid: c.is_valid(),
                    scale: c.scale(),
                    next_waypoint: ordinal,
                    next_index: next.map(|wp| wp.index),
                    target: next.map(|_| table.target_position(template, ordinal, c.scale())),
                    position_mask: next.map(|wp| wp.position_mask),
                }
            })
            .collect()
    }

    /// Drop every cast in flight and return to idle.  Records are kept.
    pub fn reset(&mut self) {
        self.left.release();
        self.right.release();
        self.mode = CastMode::Idle;
        self.latch = Latch::Open;
        self.grace_elapsed_ms = 0.0;
        self.dual_state = CastState::Ready;
        self.sync_record_states();
    }

    /// Advance one tick with both hands' samples.
    pub fn update(&mut self, left: &HandInput, right: &HandInput, dt_ms: f64) -> Vec<CastEvent> {
        let mut events = Vec::new();
        if !self.config.enabled {
            return events;
        }

        let previous = self.mode;
        let mode = self.derive_mode(left.trigger_held, right.trigger_held, dt_ms);

        if mode != previous {
            info!("cast mode: {} -> {}", previous.as_str(), mode.as_str());
            events.push(CastEvent::ModeChanged {
                from: previous,
                to: mode,
            });
        }
        self.mode = mode;

        let mut restarted = None;
        match mode {
            CastMode::Idle => self.enter_idle(&mut events),
            CastMode::Dual => {
                self.latch = Latch::Dual;
                if previous != CastMode::Dual {
                    // A promoted lone hand restarts alongside the joiner.
                    if let CastMode::Independent(first) = previous {
                        match first {
                            Hand::Left => self.left.release(),
                            Hand::Right => self.right.release(),
                        }
                        restarted = Some(first);
                    }
                    self.dual_state = CastState::Casting;
                }
            }
            CastMode::Separate => self.latch = Latch::Separate,
            CastMode::Independent(_) => {}
        }

        if mode != CastMode::Idle {
            let dual = mode.is_dual();
            for hand in Hand::BOTH {
                let held = match hand {
                    Hand::Left => left.trigger_held,
                    Hand::Right => right.trigger_held,
                };
                let matcher = match hand {
                    Hand::Left => &mut self.left,
                    Hand::Right => &mut self.right,
                };
                match matcher.on_trigger(held, &self.config) {
                    TriggerEffect::Start => events.push(CastEvent::CastStarted { hand, dual }),
                    TriggerEffect::Abandon => events.push(CastEvent::CastReleased { hand }),
                    TriggerEffect::None => {}
                }
            }

            for hand in Hand::BOTH {
                // Its delta is still relative to the abandoned start pose
                // until the host handles this tick's `CastStarted`.
                if restarted == Some(hand) {
                    continue;
                }
                let (matcher, input) = match hand {
                    Hand::Left => (&mut self.left, left),
                    Hand::Right => (&mut self.right, right),
                };
                let outcome = matcher.advance(&self.library, &self.config, input, dual);
                self.settle(hand, outcome, dual, &mut events);
            }

            if dual {
                self.resolve_dual(&mut events);
            }
        }

        self.sync_record_states();
        events
    }

    fn derive_mode(&mut self, left_held: bool, right_held: bool, dt_ms: f64) -> CastMode {
        let previous = self.mode;
        if previous == CastMode::Idle {
            self.grace_elapsed_ms = 0.0;
        } else {
            self.grace_elapsed_ms += dt_ms;
        }

        match (left_held, right_held) {
            (false, false) => CastMode::Idle,
            (true, false) => self.lone_mode(Hand::Left, previous),
            (false, true) => self.lone_mode(Hand::Right, previous),
            (true, true) => match self.latch {
                Latch::Dual => CastMode::Dual,
                Latch::Separate => CastMode::Separate,
                Latch::Open => match previous {
                    CastMode::Idle => CastMode::Dual,
                    CastMode::Independent(first)
                        if self.grace_elapsed_ms <= self.config.dual_grace_ms
                            && self.matcher(first).state() == CastState::Casting =>
                    {
                        CastMode::Dual
                    }
                    _ => CastMode::Separate,
                },
            },
        }
    }

    fn lone_mode(&mut self, hand: Hand, previous: CastMode) -> CastMode {
        match self.latch {
            Latch::Separate => CastMode::Separate,
            Latch::Dual => CastMode::Dual,
            Latch::Open => {
                // The other hand let go as this one pressed: a new session.
                if previous == CastMode::Independent(hand.other()) {
                    self.grace_elapsed_ms = 0.0;
                }
                CastMode::Independent(hand)
            }
        }
    }

    fn enter_idle(&mut self, events: &mut Vec<CastEvent>) {
        for hand in Hand::BOTH {
            let matcher = match hand {
                Hand::Left => &mut self.left,
                Hand::Right => &mut self.right,
            };
            if matcher.on_trigger(false, &self.config) == TriggerEffect::Abandon {
                events.push(CastEvent::CastReleased { hand });
            }
        }
        self.latch = Latch::Open;
        self.grace_elapsed_ms = 0.0;
        self.dual_state = CastState::Ready;
        self.reconcile_charges(events);
    }

    /// Apply one hand's tick outcome.
    fn settle(&mut self, hand: Hand, outcome: MatchOutcome, dual: bool, events: &mut Vec<CastEvent>) {
        match outcome {
            MatchOutcome::Pending => {}
            MatchOutcome::Completed(id) => {
                let template = &self.library[id];
                if template.dual_only {
                    events.push(CastEvent::DualHandReady {
                        hand,
                        spell_id: template.spell_id.clone(),
                    });
                    return;
                }
                let record = match hand {
                    Hand::Left => &mut self.left_record,
                    Hand::Right => &mut self.right_record,
                };
                record.assign(template);
                events.push(CastEvent::HandComplete {
                    hand,
                    spell_id: template.spell_id.clone(),
                    charges: template.default_charges,
                    effect: template.effect,
                });
            }
            MatchOutcome::Exhausted => {
                events.push(CastEvent::HandFailed { hand });
                if dual && self.dual_state == CastState::Casting {
                    self.dual_state = CastState::Failed;
                    info!("dual cast failed on {} hand", hand.as_str());
                    events.push(CastEvent::DualFailed);
                }
            }
        }
    }

    /// Write the shared outcome once both hands have completed.
    fn resolve_dual(&mut self, events: &mut Vec<CastEvent>) {
        if self.dual_state != CastState::Casting {
            return;
        }
        if self.left.state() != CastState::Complete || self.right.state() != CastState::Complete {
            return;
        }
        let (Some(left_id), Some(right_id)) = (self.left.completed(), self.right.completed()) else {
            return;
        };

        if left_id != right_id {
            let left = self.library[left_id].spell_id.clone();
            let right = self.library[right_id].spell_id.clone();
            warn!(
                "dual cast asymmetry: left completed {}, right completed {}",
                left, right
            );
            self.dual_state = CastState::Failed;
            events.push(CastEvent::DualMismatch { left, right });
            return;
        }

        let template = &self.library[left_id];
        self.left_record.assign(template);
        self.right_record.assign(template);
        self.dual_record.assign(template);
        self.dual_state = CastState::Complete;
        info!(
            "dual cast complete: {} ({} charges)",
            template.spell_id, template.default_charges
        );
        events.push(CastEvent::DualComplete {
            spell_id: template.spell_id.clone(),
            charges: template.default_charges,
            effect: template.effect,
        });
    }

    /// Keep the charge counts of a spell held by both hands equal.
    fn reconcile_charges(&mut self, events: &mut Vec<CastEvent>) {
        let Some(spell_id) = self.left_record.spell_id.clone() else {
            return;
        };
        if self.right_record.spell_id.as_deref() != Some(spell_id.as_str()) {
            return;
        }

        let shared_dual = self.dual_record.spell_id.as_deref() == Some(spell_id.as_str());
        let mut charges = self.left_record.charges.min(self.right_record.charges);
        if shared_dual {
            charges = charges.min(self.dual_record.charges);
        }

        let diverged = self.left_record.charges != charges
            || self.right_record.charges != charges
            || (shared_dual && self.dual_record.charges != charges);
        if !diverged {
            return;
        }

        self.left_record.charges = charges;
        self.right_record.charges = charges;
        if shared_dual {
            self.dual_record.charges = charges;
        }
        info!("reconciled {} charges to {}", spell_id, charges);
        events.push(CastEvent::ChargesReconciled { spell_id, charges });
    }

    fn sync_record_states(&mut self) {
        self.left_record.state = self.left.state();
        self.right_record.state = self.right.state();
        self.dual_record.state = self.dual_state;
    }

    /// Generate IPC status s-expression.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:enabled {} :mode :{} :dual-state :{} :grace-ms {:.1} :left {} :right {} :dual {})",
            if self.config.enabled { "t" } else { "nil" },
            self.mode.as_str(),
            self.dual_state.as_str(),
            self.grace_elapsed_ms,
            self.hand_status_sexp(Hand::Left),
            self.hand_status_sexp(Hand::Right),
            self.dual_record.status_sexp(),
        )
    }

    fn hand_status_sexp(&self, hand: Hand) -> String {
        let candidates: Vec<String> = self
            .candidates(hand)
            .iter()
            .map(|c| {
                let mut s = format!(
                    "(:spell \"{}\" :scale {:.3} :next {}",
                    sexp::escape_string(&c.spell_id),
                    c.scale,
                    c.next_waypoint
                );
                if let (Some(index), Some(target), Some(mask)) =
                    (c.next_index, c.target, c.position_mask)
                {
                    s.push_str(&format!(
                        " :index {} :target {} :mask \"{}\"",
                        index,
                        sexp::vec3_sexp(target),
                        mask.as_flags()
                    ));
                }
                s.push(')');
                s
            })
            .collect();
        format!(
            "(:state :{} :valid {} :record {} :candidates ({}))",
            self.cast_state(hand).as_str(),
            candidates.len(),
            self.record(hand).status_sexp(),
            candidates.join(" "),
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
