//! Spell effect kinds handed to the projectile subsystem.
//!
//! The engine only selects the effect; spawning, physics and lifetime
//! belong to the host.

/// Closed set of effects a completed template can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpellEffect {
    /// Thrown, fused explosive.
    Grenade,
    /// Straight-line guided projectile.
    Missile,
    /// Two-handed overhead bombardment.
    Artillery,
    /// Two-handed outward push.
    Shockwave,
}

impl SpellEffect {
    /// String representation for IPC and template files.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grenade => "grenade",
            Self::Missile => "missile",
            Self::Artillery => "artillery",
            Self::Shockwave => "shockwave",
        }
    }

    /// Parse an effect from its string representation.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "grenade" => Some(Self::Grenade),
            "missile" => Some(Self::Missile),
            "artillery" => Some(Self::Artillery),
            "shockwave" => Some(Self::Shockwave),
            _ => None,
        }
    }

    /// Whether the effect is spawned from both hands at once.
    pub fn is_two_handed(&self) -> bool {
        matches!(self, Self::Artillery | Self::Shockwave)
    }
}
