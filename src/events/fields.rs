//! Field-path tables over untyped provider JSON.
//!
//! Each provider declares, per canonical field, an ordered list of dotted key
//! paths (`"competitions.0.competitors"`; numeric segments index arrays). A
//! lookup yields the first path that is present and not null, or `None` when
//! the field is absent. Coercion to canonical types happens after lookup and
//! never fails: unusable values become 0 or an empty string.

use serde_json::Value;

/// One canonical field and the key paths that may hold it, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    paths: &'static [&'static str],
}

impl Field {
    pub const fn new(paths: &'static [&'static str]) -> Self {
        Self { paths }
    }

    /// First present, non-null value.
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.paths.iter().find_map(|p| lookup(root, p))
    }

    pub fn text(&self, root: &Value) -> Option<String> {
        self.paths
            .iter()
            .filter_map(|p| lookup(root, p))
            .find_map(coerce_text)
    }

    /// `None` when absent; `Some(0)` when present but unusable.
    pub fn int(&self, root: &Value) -> Option<i64> {
        self.get(root).map(coerce_int)
    }

    pub fn array<'a>(&self, root: &'a Value) -> &'a [Value] {
        self.paths
            .iter()
            .filter_map(|p| lookup(root, p))
            .find_map(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Walk a dotted path. Null counts as absent.
pub fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cur = root;
    for seg in path.split('.') {
        cur = match cur {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    (!cur.is_null()).then_some(cur)
}

/// Integer view of a provider value: numbers (truncated), numeric strings,
/// and objects carrying a `value` field. Anything else is 0.
pub fn coerce_int(v: &Value) -> i64 {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Value::String(s) => parse_int(s),
        Value::Object(map) => map.get("value").map(coerce_int).unwrap_or(0),
        Value::Bool(_) | Value::Array(_) | Value::Null => 0,
    }
}

fn parse_int(s: &str) -> i64 {
    let s = s.trim();
    s.parse::<i64>()
        .ok()
        .or_else(|| {
            s.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| f.trunc() as i64)
        })
        .unwrap_or(0)
}

/// Non-empty text; numbers are rendered, other shapes are not text.
pub fn coerce_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
