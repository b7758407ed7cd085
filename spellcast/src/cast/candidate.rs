//! Per-hand, per-template matching state.
//!
//! Each hand owns one [`CandidateTable`] with a slot per library template.
//! The table also resolves template references for its hand: the left hand
//! sees every position and rotation through the mirror transform, and all
//! of its reached flags and scales are stored apart from the right hand's.

use std::ops::{Index, IndexMut};

use super::geometry::{self, Vec3};
use super::hand::Hand;
use super::template::{SpellTemplate, TemplateId, TemplateLibrary};

// ── Candidate ──────────────────────────────────────────────

/// Matching state of one template for one hand during a cast.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateState {
    valid: bool,
    /// One flag per waypoint, in template order.
    reached: Vec<bool>,
    scale: f32,
    /// Cached ordinal of the next unreached waypoint (0 until the origin
    /// check passes, `len` once every waypoint is reached).
    next_waypoint: usize,
}

impl CandidateState {
    fn new(waypoint_count: usize, min_scale: f32) -> Self {
        Self {
            valid: true,
            reached: vec![false; waypoint_count],
            scale: min_scale,
            next_waypoint: 0,
        }
    }

    fn reset(&mut self, min_scale: f32) {
        self.valid = true;
        self.reached.iter_mut().for_each(|r| *r = false);
        self.scale = min_scale;
        self.next_waypoint = 0;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Current amplitude multiplier for template positions.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Raise the scale to `amplitude` (floored at `min_scale`).  Never lowers it.
    pub fn grow_scale(&mut self, amplitude: f32, min_scale: f32) {
        self.scale = self.scale.max(amplitude.max(min_scale));
    }

    /// Ordinal of the waypoint currently being approached.
    pub fn next_waypoint(&self) -> usize {
        self.next_waypoint
    }

    pub fn is_reached(&self, ordinal: usize) -> bool {
        self.reached.get(ordinal).copied().unwrap_or(false)
    }

    pub fn origin_reached(&self) -> bool {
        self.is_reached(0)
    }

    /// Mark a waypoint reached.  Arrival is never undone during a cast.
    pub fn mark_reached(&mut self, ordinal: usize) {
        if let Some(r) = self.reached.get_mut(ordinal) {
            *r = true;
        }
        if ordinal == 0 {
            self.next_waypoint = self.next_waypoint.max(1);
        }
    }

    /// First unreached waypoint from 1 upward, or `None` when the template
    /// is fully traversed.  Refreshes the cached index.
    pub fn next_target(&mut self) -> Option<usize> {
        let next = (1..self.reached.len()).find(|&i| !self.reached[i]);
        self.next_waypoint = next.unwrap_or(self.reached.len());
        next
    }
}

// ── Table ──────────────────────────────────────────────────

/// All candidates for one hand, indexed by [`TemplateId`].
#[derive(Debug, Clone)]
pub struct CandidateTable {
    hand: Hand,
    candidates: Vec<CandidateState>,
}

impl CandidateTable {
    pub fn new(hand: Hand, library: &TemplateLibrary, min_scale: f32) -> Self {
        let candidates = library
            .iter()
            .map(|(_, t)| CandidateState::new(t.len(), min_scale))
            .collect();
        Self { hand, candidates }
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    /// Start-of-cast reset: everything valid, nothing reached, minimum scale.
    pub fn reset(&mut self, min_scale: f32) {
        for c in &mut self.candidates {
            c.reset(min_scale);
        }
    }

    pub fn get(&self, id: TemplateId) -> Option<&CandidateState> {
        self.candidates.get(id.0)
    }

    pub fn get_mut(&mut self, id: TemplateId) -> Option<&mut CandidateState> {
        self.candidates.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TemplateId, &CandidateState)> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (TemplateId(i), c))
    }

    /// Candidates still in the running.
    pub fn valid(&self) -> impl Iterator<Item = (TemplateId, &CandidateState)> {
        self.iter().filter(|(_, c)| c.is_valid())
    }

    pub fn valid_count(&self) -> usize {
        self.candidates.iter().filter(|c| c.is_valid()).count()
    }

    /// Waypoint position for this hand at the given scale.
    pub fn target_position(&self, template: &SpellTemplate, ordinal: usize, scale: f32) -> Vec3 {
        let wp = &template.waypoints[ordinal];
        self.hand.position(geometry::scaled(wp.position, scale))
    }

    /// Waypoint rotation for this hand.  Rotations are never scaled.
    pub fn target_rotation(&self, template: &SpellTemplate, ordinal: usize) -> Vec3 {
        self.hand.rotation(template.waypoints[ordinal].rotation)
    }
}

impl Index<TemplateId> for CandidateTable {
    type Output = CandidateState;

    fn index(&self, id: TemplateId) -> &CandidateState {
        &self.candidates[id.0]
    }
}

impl IndexMut<TemplateId> for CandidateTable {
    fn index_mut(&mut self, id: TemplateId) -> &mut CandidateState {
        &mut self.candidates[id.0]
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn grenade_table(hand: Hand) -> (TemplateLibrary, CandidateTable, TemplateId) {
        let lib = TemplateLibrary::builtin();
        let table = CandidateTable::new(hand, &lib, 0.2);
        let id = lib.find("grenade").unwrap();
        (lib, table, id)
    }

    #[test]
    fn test_new_table_all_valid_at_min_scale() {
        let (lib, table, _) = grenade_table(Hand::Right);
        assert_eq!(table.valid_count(), lib.len());
        for (_, c) in table.iter() {
            assert_eq!(c.scale(), 0.2);
            assert!(!c.origin_reached());
            assert_eq!(c.next_waypoint(), 0);
        }
    }

    #[test]
    fn test_next_target_scans_from_one() {
        let (_, mut table, id) = grenade_table(Hand::Right);
        let c = table.get_mut(id).unwrap();
        c.mark_reached(0);
        assert_eq!(c.next_target(), Some(1));
        c.mark_reached(1);
        c.mark_reached(2);
        assert_eq!(c.next_target(), Some(3));
        assert_eq!(c.next_waypoint(), 3);
        c.mark_reached(3);
        c.mark_reached(4);
        assert_eq!(c.next_target(), None);
        assert_eq!(c.next_waypoint(), 5);
    }

    #[test]
    fn test_grow_scale_never_decreases() {
        let (_, mut table, id) = grenade_table(Hand::Right);
        let c = table.get_mut(id).unwrap();
        c.grow_scale(0.05, 0.2);
        assert_eq!(c.scale(), 0.2);
        c.grow_scale(0.35, 0.2);
        assert_eq!(c.scale(), 0.35);
        c.grow_scale(0.25, 0.2);
        assert_eq!(c.scale(), 0.35);
    }

    #[test]
    fn test_reset_restores_cast_start() {
        let (_, mut table, id) = grenade_table(Hand::Left);
        {
            let c = table.get_mut(id).unwrap();
            c.mark_reached(0);
            c.mark_reached(1);
            c.grow_scale(0.5, 0.2);
            c.invalidate();
        }
        table.reset(0.2);
        let c = table.get(id).unwrap();
        assert!(c.is_valid());
        assert!(!c.is_reached(0));
        assert!(!c.is_reached(1));
        assert_eq!(c.scale(), 0.2);
    }

    #[test]
    fn test_left_targets_are_mirrored() {
        let lib = TemplateLibrary::builtin();
        let id = lib.find("grenade").unwrap();
        let left = CandidateTable::new(Hand::Left, &lib, 0.2);
        let right = CandidateTable::new(Hand::Right, &lib, 0.2);
        let grenade = &lib[id];
        assert_eq!(right.target_position(grenade, 2, 0.5), [0.5, 0.5, 0.0]);
        assert_eq!(left.target_position(grenade, 2, 0.5), [-0.5, 0.5, 0.0]);

        let missile = &lib[lib.find("missile").unwrap()];
        assert_eq!(right.target_rotation(missile, 2), [0.0, 0.0, -90.0]);
        assert_eq!(left.target_rotation(missile, 2), [0.0, 0.0, 90.0]);
    }

    #[test]
    fn test_hands_do_not_share_state() {
        let lib = TemplateLibrary::builtin();
        let id = lib.find("grenade").unwrap();
        let mut left = CandidateTable::new(Hand::Left, &lib, 0.2);
        let right = CandidateTable::new(Hand::Right, &lib, 0.2);
        left.get_mut(id).unwrap().invalidate();
        assert!(!left.get(id).unwrap().is_valid());
        assert!(right.get(id).unwrap().is_valid());
    }
}
