//! Template library files.
//!
//! A library file is a list of template plists:
//!
//! ```text
//! ((:spell "grenade" :charges 3 :dual nil :effect grenade
//!   :waypoints ((:pos (0 0 0) :rot (0 0 0))
//!               (:pos (0 1 0))
//!               (:index 4 :pos (1 1 0) :pos-mask (t t nil))))
//!  ...)
//! ```
//!
//! `:index` defaults to the waypoint's position in the list, `:rot` to the
//! zero rotation, masks to all axes, `:effect` to the spell id when that
//! names an effect, and `:dual` to whether the effect is two-handed.  The
//! result is validated by [`TemplateLibrary::new`].

use lexpr::Value;
use thiserror::Error;
use tracing::info;

use super::effect::SpellEffect;
use super::geometry::{AxisMask, ZERO};
use super::template::{LibraryError, SpellTemplate, TemplateLibrary, Waypoint};
use crate::sexp::{self, SexpError};

/// Why a library file could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Sexp(#[from] SexpError),
    #[error("template {spell}: {source}")]
    Template {
        spell: String,
        #[source]
        source: SexpError,
    },
    #[error("template {spell}: unknown effect {effect}")]
    UnknownEffect { spell: String, effect: String },
    #[error("invalid template library: {0}")]
    Library(#[from] LibraryError),
}

/// Parse and validate a template library.
pub fn library_from_str(raw: &str) -> Result<TemplateLibrary, LoadError> {
    let doc = sexp::parse(raw)?;
    let templates = sexp::list_items(&doc)
        .into_iter()
        .map(template_from_value)
        .collect::<Result<Vec<_>, _>>()?;
    let library = TemplateLibrary::new(templates)?;
    info!("loaded {} spell templates", library.len());
    Ok(library)
}

fn template_from_value(value: &Value) -> Result<SpellTemplate, LoadError> {
    let spell = sexp::get_string(value, "spell").ok_or(SexpError::Missing("spell"))?;
    let in_template = |source: SexpError| LoadError::Template {
        spell: spell.clone(),
        source,
    };

    let charges = match sexp::get_int(value, "charges") {
        Some(n) => u32::try_from(n).map_err(|_| {
            in_template(SexpError::Invalid {
                field: "charges",
                expected: "a non-negative integer",
            })
        })?,
        None => return Err(in_template(SexpError::Missing("charges"))),
    };
    let effect_name = sexp::get_keyword(value, "effect").unwrap_or_else(|| spell.clone());
    let effect = SpellEffect::from_str(&effect_name).ok_or_else(|| LoadError::UnknownEffect {
        spell: spell.clone(),
        effect: effect_name.clone(),
    })?;
    let dual_only = sexp::get_bool(value, "dual").unwrap_or_else(|| effect.is_two_handed());

    let list = sexp::get_value(value, "waypoints")
        .ok_or_else(|| in_template(SexpError::Missing("waypoints")))?;
    let waypoints = sexp::list_items(list)
        .into_iter()
        .enumerate()
        .map(|(ordinal, wp)| waypoint_from_value(ordinal, wp))
        .collect::<Result<Vec<_>, _>>()
        .map_err(in_template)?;

    Ok(SpellTemplate::new(
        &spell, charges, dual_only, effect, waypoints,
    ))
}

fn waypoint_from_value(ordinal: usize, value: &Value) -> Result<Waypoint, SexpError> {
    let index = match sexp::get_int(value, "index") {
        Some(i) => usize::try_from(i).map_err(|_| SexpError::Invalid {
            field: "index",
            expected: "a non-negative integer",
        })?,
        None => ordinal,
    };
    let position = sexp::get_vec3(value, "pos")?.ok_or(SexpError::Missing("pos"))?;
    let rotation = sexp::get_vec3(value, "rot")?.unwrap_or(ZERO);
    let position_mask = sexp::get_mask(value, "pos-mask")?.unwrap_or(AxisMask::ALL);
    let rotation_mask = sexp::get_mask(value, "rot-mask")?.unwrap_or(AxisMask::ALL);
    Ok(Waypoint::new(index, position, rotation).with_masks(position_mask, rotation_mask))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
        ((:spell "grenade" :charges 3 :dual nil :effect grenade
          :waypoints ((:pos (0 0 0) :rot (0 0 0))
                      (:pos (0 1 0))
                      (:pos (1 1 0))
                      (:pos (1 0 0))
                      (:pos (0 0 0))))
         (:spell "slam" :charges 2 :dual t :effect artillery
          :waypoints ((:index 0 :pos (0 0 0))
                      (:index 2 :pos (0 1 0) :rot-mask (t t nil))
                      (:index 5 :pos (0 0 -1) :rot (-45 0 0) :pos-mask (t t nil)))))
    "#;

    #[test]
    fn test_load_catalog() {
        let lib = library_from_str(CATALOG).unwrap();
        assert_eq!(lib.len(), 2);

        let grenade = &lib[lib.find("grenade").unwrap()];
        assert_eq!(grenade.default_charges, 3);
        assert!(!grenade.dual_only);
        assert_eq!(grenade.len(), 5);
        assert_eq!(grenade.waypoints[2].position, [1.0, 1.0, 0.0]);
        assert_eq!(grenade.waypoints[3].index, 3);

        let slam = &lib[lib.find("slam").unwrap()];
        assert!(slam.dual_only);
        assert_eq!(slam.effect, SpellEffect::Artillery);
        assert_eq!(slam.waypoints[2].index, 5);
        assert_eq!(slam.waypoints[2].rotation, [-45.0, 0.0, 0.0]);
        assert_eq!(slam.waypoints[2].position_mask, AxisMask::new(true, true, false));
        assert_eq!(slam.waypoints[1].rotation_mask, AxisMask::new(true, true, false));
        assert_eq!(slam.waypoints[1].position_mask, AxisMask::ALL);
    }

    #[test]
    fn test_demo_catalog_matches_builtin() {
        let lib = library_from_str(include_str!("../../demos/templates.sexp")).unwrap();
        let builtin = TemplateLibrary::builtin();
        assert_eq!(lib.len(), builtin.len());
        for ((_, loaded), (_, expected)) in lib.iter().zip(builtin.iter()) {
            assert_eq!(loaded, expected, "{} differs", expected.spell_id);
        }
    }

    #[test]
    fn test_effect_defaults_to_spell_id() {
        let lib = library_from_str(
            r#"((:spell "missile" :charges 5 :waypoints ((:pos (0 0 0)) (:pos (0 0 -1)))))"#,
        )
        .unwrap();
        let missile = &lib[lib.find("missile").unwrap()];
        assert_eq!(missile.effect, SpellEffect::Missile);
        assert!(!missile.dual_only);
    }

    #[test]
    fn test_dual_defaults_to_two_handed_effect() {
        let lib = library_from_str(
            r#"((:spell "slam" :charges 2 :effect artillery
                 :waypoints ((:pos (0 0 0)) (:pos (0 1 0))))
                (:spell "wave" :charges 1 :effect shockwave :dual nil
                 :waypoints ((:pos (0 0 0)) (:pos (1 0 0)))))"#,
        )
        .unwrap();
        assert!(lib[lib.find("slam").unwrap()].dual_only);
        assert!(!lib[lib.find("wave").unwrap()].dual_only);
    }

    #[test]
    fn test_unknown_effect_rejected() {
        let err = library_from_str(
            r#"((:spell "zap" :charges 1 :waypoints ((:pos (0 0 0)) (:pos (1 0 0)))))"#,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnknownEffect { .. }), "{}", err);
    }

    #[test]
    fn test_nonzero_origin_rejects_library() {
        let err = library_from_str(
            r#"((:spell "grenade" :charges 3 :waypoints ((:pos (0 0.5 0)) (:pos (0 1 0)))))"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Library(LibraryError::OriginNotZero(_))
        ));
    }

    #[test]
    fn test_index_order_rejects_library() {
        let err = library_from_str(
            r#"((:spell "grenade" :charges 3
                 :waypoints ((:pos (0 0 0)) (:index 3 :pos (0 1 0)) (:index 2 :pos (1 1 0)))))"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Library(LibraryError::IndexOrder { previous: 3, index: 2, .. })
        ));
    }

    #[test]
    fn test_missing_fields() {
        let err = library_from_str(r#"((:charges 3 :waypoints ()))"#).unwrap_err();
        assert!(matches!(err, LoadError::Sexp(SexpError::Missing("spell"))));

        let err = library_from_str(r#"((:spell "grenade" :waypoints ()))"#).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Template {
                source: SexpError::Missing("charges"),
                ..
            }
        ));

        let err =
            library_from_str(r#"((:spell "grenade" :charges 3 :waypoints ((:rot (0 0 0)))))"#)
                .unwrap_err();
        assert!(err.to_string().contains("grenade"), "{}", err);
    }

    #[test]
    fn test_empty_and_malformed() {
        assert!(matches!(
            library_from_str("()"),
            Err(LoadError::Library(LibraryError::Empty))
        ));
        assert!(matches!(
            library_from_str("((:spell"),
            Err(LoadError::Sexp(SexpError::Parse(_)))
        ));
    }

    #[test]
    fn test_negative_charges_rejected() {
        let err = library_from_str(
            r#"((:spell "grenade" :charges -1 :waypoints ((:pos (0 0 0)))))"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Template {
                source: SexpError::Invalid { field: "charges", .. },
                ..
            }
        ));
    }
}
