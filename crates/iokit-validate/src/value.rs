use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// A raw or coerced argument value.
///
/// Raw values arrive as whatever the source produced (mostly `Str` from argv
/// and forms, native JSON types from programmatic mappings). Coerced values
/// always have the variant matching the validator's semantic type.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    DateTime(NaiveDateTime),
    Path(PathBuf),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::DateTime(_) => "datetime",
            Value::Path(_) => "path",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&std::path::Path> {
        match self {
            Value::Path(p) => Some(p.as_path()),
            _ => None,
        }
    }

    /// Null, `false`, zero and empty strings or containers are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
            Value::DateTime(_) => true,
            Value::Path(p) => !p.as_os_str().is_empty(),
        }
    }

    /// Quoted rendering for error messages: strings are quoted, everything
    /// else renders as [`fmt::Display`].
    pub fn repr(&self) -> String {
        match self {
            Value::Str(s) => format!("{s:?}"),
            other => other.to_string(),
        }
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::DateTime(_) | Value::Path(_) => write!(f, "{:?}", self.to_string()),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// Whole floats keep a `.0` and very large or small magnitudes use an
/// exponent, so the text always reads back as a float.
fn fmt_float(v: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let magnitude = v.abs();
    if !v.is_finite() {
        write!(f, "{v}")
    } else if magnitude >= 1e16 || (magnitude != 0.0 && magnitude < 1e-5) {
        write!(f, "{v:e}")
    } else if v.fract() == 0.0 {
        write!(f, "{v:.1}")
    } else {
        write!(f, "{v}")
    }
}

/// Renders scalars plainly and containers in literal syntax, so that the
/// output of a list or mapping can be read back by [`crate::literal::parse`].
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => fmt_float(*v, f),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_nested(f)?;
                }
                f.write_str("]")
            }
            Value::Map(map) => {
                f.write_str("{")?;
                for (idx, (key, item)) in map.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key:?}: ")?;
                    item.fmt_nested(f)?;
                }
                f.write_str("}")
            }
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::Path(p) => write!(f, "{}", p.display()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::Path(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(v: IndexMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_containers_as_literals() {
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::Int(1));
        map.insert("b".to_string(), Value::List(vec![Value::from("x"), Value::Float(2.0)]));
        assert_eq!(Value::Map(map).to_string(), r#"{"a": 1, "b": ["x", 2.0]}"#);
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::from("plain").repr(), "\"plain\"");
    }

    #[test]
    fn float_text_reads_back_as_float() {
        for v in [1e16, -2.5e17, 1e300, 1.5e-7, 3.0, 0.25] {
            let list = Value::List(vec![Value::Float(v)]);
            assert_eq!(crate::literal::parse(&list.to_string()).unwrap(), list, "{v}");
            let scalar = Value::Float(v);
            assert_eq!(crate::literal::parse(&scalar.to_string()).unwrap(), scalar);
        }
        assert_eq!(Value::Float(1e16).to_string(), "1e16");
        assert_eq!(Value::Float(3.0).to_string(), "3.0");
    }

    #[test]
    fn truthiness() {
        let falsy = [
            Value::Null,
            Value::Bool(false),
            Value::Int(0),
            Value::Float(0.0),
            Value::from(""),
            Value::List(vec![]),
        ];
        for falsy in falsy {
            assert!(!falsy.is_truthy(), "{falsy:?}");
        }
        let truthy = [
            Value::Bool(true),
            Value::Int(-1),
            Value::from("0"),
            Value::List(vec![Value::Null]),
        ];
        for truthy in truthy {
            assert!(truthy.is_truthy(), "{truthy:?}");
        }
    }

    #[test]
    fn converts_from_json() {
        let json = serde_json::json!({"n": 3, "f": 1.5, "s": "x", "l": [true, null]});
        let value = Value::from(json);
        let map = value.as_map().unwrap();
        assert_eq!(map["n"], Value::Int(3));
        assert_eq!(map["f"], Value::Float(1.5));
        assert_eq!(map["s"], Value::from("x"));
        assert_eq!(map["l"], Value::List(vec![Value::Bool(true), Value::Null]));
    }

    #[test]
    fn serializes_untagged() {
        let value = Value::List(vec![Value::Int(1), Value::from("a"), Value::Null]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"a",null]"#);
    }
}
