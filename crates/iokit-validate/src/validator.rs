use crate::condition::Condition;
use crate::error::{CoercionError, ValidateError, ValidationError};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The logical category a validator targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    #[serde(alias = "int")]
    Integer,
    Float,
    #[serde(alias = "bool")]
    Boolean,
    #[serde(alias = "str")]
    String,
    List,
    #[serde(alias = "dict", alias = "map")]
    Mapping,
    #[serde(alias = "date")]
    DateTime,
    Path,
    File,
    #[serde(alias = "dir")]
    Directory,
}

impl SemanticType {
    pub const ALL: [SemanticType; 10] = [
        SemanticType::Integer,
        SemanticType::Float,
        SemanticType::Boolean,
        SemanticType::String,
        SemanticType::List,
        SemanticType::Mapping,
        SemanticType::DateTime,
        SemanticType::Path,
        SemanticType::File,
        SemanticType::Directory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemanticType::Integer => "integer",
            SemanticType::Float => "float",
            SemanticType::Boolean => "boolean",
            SemanticType::String => "string",
            SemanticType::List => "list",
            SemanticType::Mapping => "mapping",
            SemanticType::DateTime => "datetime",
            SemanticType::Path => "path",
            SemanticType::File => "file",
            SemanticType::Directory => "directory",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown semantic type '{0}'")]
pub struct UnknownSemanticType(pub String);

impl FromStr for SemanticType {
    type Err = UnknownSemanticType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => SemanticType::Integer,
            "float" => SemanticType::Float,
            "boolean" | "bool" => SemanticType::Boolean,
            "string" | "str" => SemanticType::String,
            "list" => SemanticType::List,
            "mapping" | "dict" | "map" => SemanticType::Mapping,
            "datetime" | "date" => SemanticType::DateTime,
            "path" => SemanticType::Path,
            "file" => SemanticType::File,
            "directory" | "dir" => SemanticType::Directory,
            _ => return Err(UnknownSemanticType(s.to_string())),
        };
        Ok(ty)
    }
}

/// How permissive conversion is before validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Only values already of the target representation.
    Strict,
    /// Compatible representations, e.g. numeric strings for numbers.
    #[default]
    Coerce,
    /// A broader set of source representations, e.g. `"yes"` for booleans.
    Loose,
}

impl fmt::Display for Strictness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strictness::Strict => "strict",
            Strictness::Coerce => "coerce",
            Strictness::Loose => "loose",
        })
    }
}

/// Per-type conversion strategy plus its type-specific bounds.
pub trait Kind: Clone + fmt::Debug + Default + Send + Sync + 'static {
    const TYPE: SemanticType;

    /// Convert `value` to this kind's representation. `Null` never reaches here.
    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String>;

    /// Check type-specific bounds against an already converted value.
    fn check(&self, _value: &Value) -> Result<(), String> {
        Ok(())
    }

    /// Human readable bounds for help output.
    fn describe_bounds(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Configuration shared by every validator kind.
#[derive(Debug, Clone, Default)]
pub struct Rules {
    nullable: bool,
    strictness: Strictness,
    choices: Option<Vec<Value>>,
    conditions: Vec<Condition>,
}

impl Rules {
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn choices(&self) -> Option<&[Value]> {
        self.choices.as_deref()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.conditions.as_slice()
    }
}

/// A validator for one semantic type.
///
/// Builder methods consume and return the validator, so configuration reads
/// as a chain: `Validate::int().nullable(true).max_value(7)`. Once built, a
/// validator holds no per-value state and can be reused for any number of
/// values.
#[derive(Debug, Clone, Default)]
pub struct Validator<K> {
    pub(crate) rules: Rules,
    pub(crate) kind: K,
}

impl<K: Kind> Validator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.rules.nullable = nullable;
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.rules.strictness = strictness;
        self
    }

    pub fn strict(self) -> Self {
        self.strictness(Strictness::Strict)
    }

    pub fn loose(self) -> Self {
        self.strictness(Strictness::Loose)
    }

    /// Restrict coerced values to a fixed set.
    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rules.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn add_condition<F>(self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.with_condition(Condition::new(name, predicate))
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.rules.conditions.push(condition);
        self
    }

    pub fn semantic_type(&self) -> SemanticType {
        K::TYPE
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn is_valid(&self, value: &Value) -> bool {
        self.coerce(value).is_ok()
    }

    /// Convert `value` to the target type, then check choices, bounds and
    /// conditions against the converted value.
    pub fn coerce(&self, value: &Value) -> Result<Value, ValidateError> {
        if value.is_null() {
            if self.rules.nullable {
                return Ok(Value::Null);
            }
            return Err(self.coercion_error(value, "value is not nullable".to_string()).into());
        }

        let converted = self
            .kind
            .convert(value, self.rules.strictness)
            .map_err(|reason| self.coercion_error(value, reason))?;

        if let Some(choices) = &self.rules.choices {
            let allowed = choices.iter().any(|choice| {
                self.kind
                    .convert(choice, Strictness::Coerce)
                    .is_ok_and(|choice| choice == converted)
            });
            if !allowed {
                let listed: Vec<String> = choices.iter().map(Value::repr).collect();
                return Err(ValidationError {
                    value: converted.repr(),
                    reason: format!("is not one of the choices: {}", listed.join(", ")),
                }
                .into());
            }
        }

        self.kind.check(&converted).map_err(|reason| ValidationError {
            value: converted.repr(),
            reason,
        })?;

        for condition in &self.rules.conditions {
            if !condition.check(&converted) {
                return Err(ValidationError {
                    value: converted.repr(),
                    reason: format!("does not satisfy the condition '{condition}'"),
                }
                .into());
            }
        }

        Ok(converted)
    }

    /// Names of bounds and conditions, for help output.
    pub fn describe_rules(&self) -> Vec<String> {
        let mut out = self.kind.describe_bounds();
        out.extend(self.rules.conditions.iter().map(|c| c.name().to_string()));
        out
    }

    fn coercion_error(&self, value: &Value, reason: String) -> CoercionError {
        CoercionError {
            target: K::TYPE,
            strictness: self.rules.strictness,
            value: value.repr(),
            actual: value.type_name(),
            reason,
        }
    }
}

pub(crate) fn mismatch(value: &Value, strictness: Strictness) -> String {
    match strictness {
        Strictness::Strict => format!("strict conversion does not accept a {}", value.type_name()),
        _ => format!("a {} cannot be converted", value.type_name()),
    }
}
