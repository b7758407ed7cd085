//! Immutable spell template catalog.
//!
//! A template is an ordered list of waypoints relative to the cast-start
//! pose.  Waypoint 0 is always the zero offset.  Positions are authored in
//! unit amplitude and multiplied by the per-cast scale during matching;
//! rotations are absolute degrees and never scaled.
//!
//! The library is validated once at construction and never mutated.  All
//! per-cast tracking state lives in per-hand candidate tables keyed by
//! [`TemplateId`].

use thiserror::Error;
use tracing::warn;

use super::effect::SpellEffect;
use super::geometry::{self, AxisMask, Vec3, ZERO};

// ── Waypoint ───────────────────────────────────────────────

/// A relative pose checkpoint within a template.
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Authored index; 0 first, strictly increasing.
    pub index: usize,
    /// Position offset in unit amplitude.
    pub position: Vec3,
    /// Rotation offset in degrees (pitch, yaw, roll).
    pub rotation: Vec3,
    /// Position axes checked while travelling toward this waypoint.
    pub position_mask: AxisMask,
    /// Rotation axes checked while travelling toward this waypoint.
    pub rotation_mask: AxisMask,
}

impl Waypoint {
    /// Waypoint with every axis checked.
    pub fn new(index: usize, position: Vec3, rotation: Vec3) -> Self {
        Self {
            index,
            position,
            rotation,
            position_mask: AxisMask::ALL,
            rotation_mask: AxisMask::ALL,
        }
    }

    /// The origin waypoint every template starts with.
    pub fn origin() -> Self {
        Self::new(0, ZERO, ZERO)
    }

    pub fn with_masks(mut self, position_mask: AxisMask, rotation_mask: AxisMask) -> Self {
        self.position_mask = position_mask;
        self.rotation_mask = rotation_mask;
        self
    }
}

// ── Template ───────────────────────────────────────────────

/// Index of a template within its library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub usize);

/// One recognizable spell gesture.
#[derive(Debug, Clone, PartialEq)]
pub struct SpellTemplate {
    pub spell_id: String,
    pub default_charges: u32,
    pub waypoints: Vec<Waypoint>,
    /// Only matchable in a synchronized two-hand cast.
    pub dual_only: bool,
    pub effect: SpellEffect,
}

impl SpellTemplate {
    pub fn new(
        spell_id: &str,
        default_charges: u32,
        dual_only: bool,
        effect: SpellEffect,
        waypoints: Vec<Waypoint>,
    ) -> Self {
        Self {
            spell_id: spell_id.to_string(),
            default_charges,
            waypoints,
            dual_only,
            effect,
        }
    }

    /// Number of waypoints including the origin.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    fn validate(&self) -> Result<(), LibraryError> {
        if self.spell_id.trim().is_empty() {
            return Err(LibraryError::BlankSpellId);
        }
        let first = self
            .waypoints
            .first()
            .ok_or_else(|| LibraryError::NoWaypoints(self.spell_id.clone()))?;
        if first.index != 0 || first.position != ZERO || first.rotation != ZERO {
            return Err(LibraryError::OriginNotZero(self.spell_id.clone()));
        }
        for pair in self.waypoints.windows(2) {
            if pair[1].index <= pair[0].index {
                return Err(LibraryError::IndexOrder {
                    spell: self.spell_id.clone(),
                    previous: pair[0].index,
                    index: pair[1].index,
                });
            }
        }
        for wp in &self.waypoints {
            if !geometry::is_finite(wp.position) || !geometry::is_finite(wp.rotation) {
                return Err(LibraryError::NonFinite {
                    spell: self.spell_id.clone(),
                    index: wp.index,
                });
            }
            // Live rotations are wrapped into (-180, 180]; anything outside
            // could never be reached.
            if geometry::normalize_rotation(wp.rotation) != wp.rotation {
                return Err(LibraryError::RotationRange {
                    spell: self.spell_id.clone(),
                    index: wp.index,
                });
            }
        }
        Ok(())
    }
}

// ── Errors ─────────────────────────────────────────────────

/// Data-integrity violations that reject a library at load time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LibraryError {
    #[error("template library is empty")]
    Empty,
    #[error("template with blank spell id")]
    BlankSpellId,
    #[error("duplicate spell id: {0}")]
    DuplicateSpellId(String),
    #[error("template {0} has no waypoints")]
    NoWaypoints(String),
    #[error("template {0}: waypoint 0 must be index 0 at the zero offset")]
    OriginNotZero(String),
    #[error("template {spell}: waypoint index {index} does not follow {previous}")]
    IndexOrder {
        spell: String,
        previous: usize,
        index: usize,
    },
    #[error("template {spell}: waypoint {index} has a non-finite coordinate")]
    NonFinite { spell: String, index: usize },
    #[error("template {spell}: waypoint {index} rotation outside (-180, 180] degrees")]
    RotationRange { spell: String, index: usize },
}

// ── Library ────────────────────────────────────────────────

/// Validated, immutable template arena.
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    templates: Vec<SpellTemplate>,
}

impl TemplateLibrary {
    /// Validate and freeze a template list.  Library order is the
    /// completion tie-break order.
    pub fn new(templates: Vec<SpellTemplate>) -> Result<Self, LibraryError> {
        if templates.is_empty() {
            return Err(LibraryError::Empty);
        }
        for (i, template) in templates.iter().enumerate() {
            if let Err(e) = template.validate() {
                warn!("rejecting template library: {}", e);
                return Err(e);
            }
            if templates[..i].iter().any(|t| t.spell_id == template.spell_id) {
                warn!("rejecting template library: duplicate {}", template.spell_id);
                return Err(LibraryError::DuplicateSpellId(template.spell_id.clone()));
            }
        }
        Ok(Self { templates })
    }

    /// The default catalog.
    ///
    /// | spell | hands | gesture (right hand, unit amplitude) |
    /// |---|---|---|
    /// | grenade | one | up, across, down, back to start |
    /// | missile | one | push forward, then roll the wrist |
    /// | artillery | dual | raise overhead, slam down in front |
    /// | shockwave | dual | push outward, away from the body |
    pub fn builtin() -> Self {
        let free_roll = AxisMask::new(true, true, false);
        let templates = vec![
            SpellTemplate::new(
                "grenade",
                3,
                false,
                SpellEffect::Grenade,
                vec![
                    Waypoint::origin(),
                    Waypoint::new(1, [0.0, 1.0, 0.0], ZERO),
                    Waypoint::new(2, [1.0, 1.0, 0.0], ZERO),
                    Waypoint::new(3, [1.0, 0.0, 0.0], ZERO),
                    Waypoint::new(4, [0.0, 0.0, 0.0], ZERO),
                ],
            ),
            SpellTemplate::new(
                "missile",
                5,
                false,
                SpellEffect::Missile,
                vec![
                    Waypoint::origin(),
                    Waypoint::new(1, [0.0, 0.0, -1.0], ZERO)
                        .with_masks(AxisMask::ALL, free_roll),
                    Waypoint::new(2, [0.0, 0.0, -1.0], [0.0, 0.0, -90.0]),
                ],
            ),
            SpellTemplate::new(
                "artillery",
                2,
                true,
                SpellEffect::Artillery,
                vec![
                    Waypoint::origin(),
                    Waypoint::new(1, [0.0, 1.0, 0.0], ZERO),
                    Waypoint::new(2, [0.0, 0.0, -1.0], [-45.0, 0.0, 0.0])
                        .with_masks(AxisMask::new(true, true, false), AxisMask::ALL),
                ],
            ),
            SpellTemplate::new(
                "shockwave",
                1,
                true,
                SpellEffect::Shockwave,
                vec![
                    Waypoint::origin(),
                    Waypoint::new(1, [1.0, 0.0, 0.0], ZERO),
                    Waypoint::new(2, [1.0, 0.0, -1.0], ZERO),
                ],
            ),
        ];
        // The builtin catalog satisfies every invariant checked by `new`.
        Self { templates }
    }

    pub fn get(&self, id: TemplateId) -> Option<&SpellTemplate> {
        self.templates.get(id.0)
    }

    /// Look up a template by spell id.
    pub fn find(&self, spell_id: &str) -> Option<TemplateId> {
        self.templates
            .iter()
            .position(|t| t.spell_id == spell_id)
            .map(TemplateId)
    }

    /// Templates in library order.
    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &SpellTemplate)> {
        self.templates
            .iter()
            .enumerate()
            .map(|(i, t)| (TemplateId(i), t))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl std::ops::Index<TemplateId> for TemplateLibrary {
    type Output = SpellTemplate;

    fn index(&self, id: TemplateId) -> &SpellTemplate {
        &self.templates[id.0]
    }
}

// ── Tests ──────────────────────────────────────────────────
