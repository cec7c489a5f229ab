use crate::validator::{Kind, SemanticType, Strictness, Validator, mismatch};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct BooleanKind;

fn parse_bool_word(s: &str, strictness: Strictness) -> Option<bool> {
    let lowered = s.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ if strictness != Strictness::Loose => None,
        "yes" | "y" | "on" | "t" | "1" => Some(true),
        "no" | "n" | "off" | "f" | "0" => Some(false),
        _ => None,
    }
}

impl Kind for BooleanKind {
    const TYPE: SemanticType = SemanticType::Boolean;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        match (value, strictness) {
            (Value::Bool(b), _) => Ok(Value::Bool(*b)),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (Value::Int(0), _) => Ok(Value::Bool(false)),
            (Value::Int(1), _) => Ok(Value::Bool(true)),
            (Value::Int(i), _) => Err(format!("{i} is neither 0 nor 1")),
            (Value::Float(f), Strictness::Loose) if *f == 0.0 || *f == 1.0 => {
                Ok(Value::Bool(*f == 1.0))
            }
            (Value::Str(s), _) => parse_bool_word(s, strictness)
                .map(Value::Bool)
                .ok_or_else(|| format!("{s:?} is not a boolean")),
            _ => Err(mismatch(value, strictness)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StringKind {
    min_len: Option<usize>,
    max_len: Option<usize>,
}

impl Kind for StringKind {
    const TYPE: SemanticType = SemanticType::String;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        match (value, strictness) {
            (Value::Str(s), _) => Ok(Value::Str(s.clone())),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (
                Value::Int(_) | Value::Float(_) | Value::Bool(_) | Value::Path(_) | Value::DateTime(_),
                _,
            ) => Ok(Value::Str(value.to_string())),
            (_, Strictness::Loose) => Ok(Value::Str(value.to_string())),
            _ => Err(mismatch(value, strictness)),
        }
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(s) = value.as_str() else {
            return Ok(());
        };
        let len = s.chars().count();
        if let Some(min) = self.min_len {
            if len < min {
                return Err(format!("is shorter than {min} characters"));
            }
        }
        if let Some(max) = self.max_len {
            if len > max {
                return Err(format!("is longer than {max} characters"));
            }
        }
        Ok(())
    }

    fn describe_bounds(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(min) = self.min_len {
            out.push(format!("len(val) >= {min}"));
        }
        if let Some(max) = self.max_len {
            out.push(format!("len(val) <= {max}"));
        }
        out
    }
}

impl Validator<StringKind> {
    /// Inclusive minimum length in characters.
    pub fn min_len(mut self, len: usize) -> Self {
        self.kind.min_len = Some(len);
        self
    }

    /// Inclusive maximum length in characters.
    pub fn max_len(mut self, len: usize) -> Self {
        self.kind.max_len = Some(len);
        self
    }
}
