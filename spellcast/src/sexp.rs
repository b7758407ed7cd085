//! S-expression plist helpers shared by config, template and script readers.
//!
//! Keys are looked up as `:key`.  Both `Value::Keyword("key")` (elisp
//! parser) and `Value::Symbol(":key")` (default parser) forms are accepted.

use lexpr::Value;
use thiserror::Error;

use crate::cast::geometry::{AxisMask, Vec3};

/// Structural problems in an s-expression document.
#[derive(Debug, Error)]
pub enum SexpError {
    #[error("malformed s-expression: {0}")]
    Parse(#[from] lexpr::parse::Error),
    #[error("missing :{0} field")]
    Missing(&'static str),
    #[error("field :{field} expects {expected}")]
    Invalid {
        field: &'static str,
        expected: &'static str,
    },
}

/// Parse a document.
pub fn parse(raw: &str) -> Result<Value, SexpError> {
    Ok(lexpr::from_str(raw)?)
}

/// Find the value following `:key` in a plist.
/// Walks cons pairs directly.
pub fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            return match pair.cdr() {
                Value::Cons(next) => Some(next.car()),
                _ => None,
            };
        }
        current = pair.cdr();
    }
    None
}

/// Extract a keyword value from an s-expression plist as a string.
pub fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).map(atom_string)
}

/// Extract an integer value from an s-expression plist.
pub fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a string value from an s-expression plist.
pub fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Extract a boolean value from an s-expression plist.
/// Treats "t" as true, "nil" as false.
pub fn get_bool(value: &Value, key: &str) -> Option<bool> {
    get_keyword(value, key).map(|s| s != "nil")
}

/// Extract a floating-point value from an s-expression plist.
pub fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Items of a proper list.  `()` and `nil` yield an empty vector.
pub fn list_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        items.push(pair.car());
        current = pair.cdr();
    }
    items
}

/// Read `:key (x y z)` as a vector.
pub fn get_vec3(value: &Value, key: &'static str) -> Result<Option<Vec3>, SexpError> {
    let Some(list) = get_value(value, key) else {
        return Ok(None);
    };
    let items = list_items(list);
    if items.len() != 3 {
        return Err(SexpError::Invalid {
            field: key,
            expected: "a list of three numbers",
        });
    }
    let mut out = [0.0_f32; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = match item {
            Value::Number(n) => n.as_f64().map(|f| f as f32),
            _ => None,
        }
        .ok_or(SexpError::Invalid {
            field: key,
            expected: "a list of three numbers",
        })?;
    }
    Ok(Some(out))
}

/// Read `:key (t nil t)` as an axis mask.
pub fn get_mask(value: &Value, key: &'static str) -> Result<Option<AxisMask>, SexpError> {
    let Some(list) = get_value(value, key) else {
        return Ok(None);
    };
    let items = list_items(list);
    if items.len() != 3 {
        return Err(SexpError::Invalid {
            field: key,
            expected: "a list of three flags",
        });
    }
    let flags: Vec<bool> = items.iter().map(|v| atom_string(v) != "nil").collect();
    Ok(Some(AxisMask::new(flags[0], flags[1], flags[2])))
}

fn atom_string(val: &Value) -> String {
    match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "t" } else { "nil" }.to_string(),
        Value::Null | Value::Nil => "nil".to_string(),
        _ => val.to_string(),
    }
}

/// Escape a string for s-expression output.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Format an event s-expression.
pub fn format_event(event_type: &str, fields: &[(&str, &str)]) -> String {
    let mut s = format!("(:type :event :event :{}", event_type);
    for (key, val) in fields {
        s.push_str(&format!(" :{} {}", key, val));
    }
    s.push(')');
    s
}

/// Format a vector as `(x y z)`.  Negative zero prints as `0.000`.
pub fn vec3_sexp(v: Vec3) -> String {
    format!("({:.3} {:.3} {:.3})", v[0] + 0.0, v[1] + 0.0, v[2] + 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_keyword_from_plist() {
        let v = lexpr::from_str("(:type :hello :version 1)").unwrap();
        assert_eq!(get_keyword(&v, "type"), Some("hello".to_string()));
        assert_eq!(get_keyword(&v, "version"), Some("1".to_string()));
    }

    #[test]
    fn test_get_keyword_missing_key() {
        let v = lexpr::from_str("(:spell \"grenade\")").unwrap();
        assert_eq!(get_keyword(&v, "charges"), None);
        let empty = lexpr::from_str("()").unwrap();
        assert_eq!(get_keyword(&empty, "spell"), None);
    }

    #[test]
    fn test_get_string_int_float_bool() {
        let v = lexpr::from_str("(:spell \"missile\" :charges 5 :dt 11.5 :dual t :x -3 :off nil)")
            .unwrap();
        assert_eq!(get_string(&v, "spell"), Some("missile".to_string()));
        assert_eq!(get_int(&v, "charges"), Some(5));
        assert_eq!(get_int(&v, "x"), Some(-3));
        assert_eq!(get_float(&v, "dt"), Some(11.5));
        assert_eq!(get_float(&v, "charges"), Some(5.0));
        assert_eq!(get_bool(&v, "dual"), Some(true));
        assert_eq!(get_bool(&v, "off"), Some(false));
    }

    #[test]
    fn test_get_vec3() {
        let v = lexpr::from_str("(:pos (0 1.5 -2) :bad (1 2) :word (a b c))").unwrap();
        assert_eq!(get_vec3(&v, "pos").unwrap(), Some([0.0, 1.5, -2.0]));
        assert_eq!(get_vec3(&v, "rot").unwrap(), None);
        assert!(get_vec3(&v, "bad").is_err());
        assert!(get_vec3(&v, "word").is_err());
    }

    #[test]
    fn test_get_mask() {
        let v = lexpr::from_str("(:pos-mask (t nil t) :short (t))").unwrap();
        assert_eq!(
            get_mask(&v, "pos-mask").unwrap(),
            Some(AxisMask::new(true, false, true))
        );
        assert_eq!(get_mask(&v, "rot-mask").unwrap(), None);
        assert!(get_mask(&v, "short").is_err());
    }

    #[test]
    fn test_list_items() {
        let v = lexpr::from_str("((:a 1) (:b 2) (:c 3))").unwrap();
        assert_eq!(list_items(&v).len(), 3);
        assert!(list_items(&lexpr::from_str("()").unwrap()).is_empty());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse("(:open"), Err(SexpError::Parse(_))));
    }

    #[test]
    fn test_format_event_is_valid_sexp() {
        let e = format_event("cast-complete", &[("hand", ":left"), ("spell", "\"grenade\"")]);
        assert!(e.starts_with("(:type :event :event :cast-complete"));
        let v = lexpr::from_str(&e).unwrap();
        assert_eq!(get_keyword(&v, "spell"), Some("grenade".to_string()));
        assert_eq!(get_keyword(&v, "hand"), Some("left".to_string()));
    }

    #[test]
    fn test_vec3_sexp() {
        assert_eq!(vec3_sexp([-0.0, 0.25, -1.5]), "(0.000 0.250 -1.500)");
    }

    #[test]
    fn test_escape_string() {
        assert_eq!(escape_string("a\"b\\c"), "a\\\"b\\\\c");
    }
}
