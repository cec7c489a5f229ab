use crate::literal;
use crate::registry::Validate;
use crate::validator::{Kind, SemanticType, Strictness, Validator, mismatch};
use crate::value::Value;
use indexmap::IndexMap;

const EMPTY_LIST_HINT: &str = "an empty string is not a list; write \"[]\" for an empty list";
const EMPTY_MAP_HINT: &str = "an empty string is not a mapping; write \"{}\" for an empty mapping";

#[derive(Debug, Clone, Default)]
pub struct ListKind {
    element: Option<SemanticType>,
    min_len: Option<usize>,
    max_len: Option<usize>,
}

fn split_plain(s: &str) -> Vec<Value> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Value::from)
        .collect()
}

impl ListKind {
    fn raw_items(&self, value: &Value, strictness: Strictness) -> Result<Vec<Value>, String> {
        match (value, strictness) {
            (Value::List(items), _) => Ok(items.clone()),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (Value::Str(s), _) => {
                if s.trim().is_empty() {
                    return Err(EMPTY_LIST_HINT.to_string());
                }
                match literal::parse(s) {
                    Ok(Value::List(items)) => Ok(items),
                    Ok(_) if strictness == Strictness::Loose => Ok(split_plain(s)),
                    Ok(other) => Err(format!("literal is a {}, not a list", other.type_name())),
                    Err(_) if strictness == Strictness::Loose => Ok(split_plain(s)),
                    Err(err) => Err(format!("not a list literal: {err}")),
                }
            }
            _ => Err(mismatch(value, strictness)),
        }
    }
}

impl Kind for ListKind {
    const TYPE: SemanticType = SemanticType::List;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        let items = self.raw_items(value, strictness)?;
        let Some(element) = self.element else {
            return Ok(Value::List(items));
        };

        let validator = Validate::for_type(element).nullable(true);
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                validator
                    .coerce(item)
                    .map_err(|err| format!("element {idx}: {err}"))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn check(&self, value: &Value) -> Result<(), String> {
        let Some(items) = value.as_list() else {
            return Ok(());
        };
        if let Some(min) = self.min_len {
            if items.len() < min {
                return Err(format!("has fewer than {min} elements"));
            }
        }
        if let Some(max) = self.max_len {
            if items.len() > max {
                return Err(format!("has more than {max} elements"));
            }
        }
        Ok(())
    }

    fn describe_bounds(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(element) = self.element {
            out.push(format!("items: {element}"));
        }
        if let Some(min) = self.min_len {
            out.push(format!("len(val) >= {min}"));
        }
        if let Some(max) = self.max_len {
            out.push(format!("len(val) <= {max}"));
        }
        out
    }
}

impl Validator<ListKind> {
    /// Coerce every element through a nullable validator of `element`.
    pub fn of_type(mut self, element: SemanticType) -> Self {
        self.kind.element = Some(element);
        self
    }

    pub fn min_len(mut self, len: usize) -> Self {
        self.kind.min_len = Some(len);
        self
    }

    pub fn max_len(mut self, len: usize) -> Self {
        self.kind.max_len = Some(len);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct MappingKind {
    key: Option<SemanticType>,
    value: Option<SemanticType>,
}

fn split_pairs(s: &str) -> Result<IndexMap<String, Value>, String> {
    let mut out = IndexMap::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| format!("{part:?} is not a key=value pair"))?;
        out.insert(key.trim().to_string(), Value::from(value.trim()));
    }
    Ok(out)
}

impl MappingKind {
    fn raw_entries(
        &self,
        value: &Value,
        strictness: Strictness,
    ) -> Result<IndexMap<String, Value>, String> {
        match (value, strictness) {
            (Value::Map(map), _) => Ok(map.clone()),
            (_, Strictness::Strict) => Err(mismatch(value, strictness)),
            (Value::Str(s), _) => {
                if s.trim().is_empty() {
                    return Err(EMPTY_MAP_HINT.to_string());
                }
                match literal::parse(s) {
                    Ok(Value::Map(map)) => Ok(map),
                    Ok(_) if strictness == Strictness::Loose => split_pairs(s),
                    Ok(other) => Err(format!("literal is a {}, not a mapping", other.type_name())),
                    Err(_) if strictness == Strictness::Loose => split_pairs(s),
                    Err(err) => Err(format!("not a mapping literal: {err}")),
                }
            }
            _ => Err(mismatch(value, strictness)),
        }
    }
}

impl Kind for MappingKind {
    const TYPE: SemanticType = SemanticType::Mapping;

    fn convert(&self, value: &Value, strictness: Strictness) -> Result<Value, String> {
        let entries = self.raw_entries(value, strictness)?;
        if self.key.is_none() && self.value.is_none() {
            return Ok(Value::Map(entries));
        }

        let key_validator = self.key.map(|ty| Validate::for_type(ty).nullable(true));
        let value_validator = self.value.map(|ty| Validate::for_type(ty).nullable(true));
        let mut out = IndexMap::with_capacity(entries.len());
        for (key, item) in entries {
            let key = match &key_validator {
                Some(v) => v
                    .coerce(&Value::Str(key.clone()))
                    .map_err(|err| format!("key {key:?}: {err}"))?
                    .to_string(),
                None => key,
            };
            let item = match &value_validator {
                Some(v) => v
                    .coerce(&item)
                    .map_err(|err| format!("value for {key:?}: {err}"))?,
                None => item,
            };
            out.insert(key, item);
        }
        Ok(Value::Map(out))
    }

    fn describe_bounds(&self) -> Vec<String> {
        match (self.key, self.value) {
            (None, None) => Vec::new(),
            (key, value) => vec![format!(
                "entries: {} -> {}",
                key.map_or("any".to_string(), |k| k.to_string()),
                value.map_or("any".to_string(), |v| v.to_string())
            )],
        }
    }
}

impl Validator<MappingKind> {
    /// Coerce keys (as strings) and values through the given types.
    pub fn of_types(mut self, key: SemanticType, value: SemanticType) -> Self {
        self.kind.key = Some(key);
        self.kind.value = Some(value);
        self
    }

    pub fn of_value_type(mut self, value: SemanticType) -> Self {
        self.kind.value = Some(value);
        self
    }
}
