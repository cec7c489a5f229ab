use crate::error::{Error, Result};
use iokit_argparse::claplike::ArgDefLike;
use iokit_validate::{AnyValidator, Condition, SemanticType, Strictness, Validate, ValidateError, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the arguments named by a [`Dependency`] combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyMode {
    #[default]
    Any,
    All,
}

impl DependencyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyMode::Any => "any",
            DependencyMode::All => "all",
        }
    }
}

impl fmt::Display for DependencyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An argument with a dependency must have a value exactly when its
/// dependency is met, that is when any (or all) of the named arguments
/// resolved to a truthy value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    names: Vec<String>,
    mode: DependencyMode,
}

impl Dependency {
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn mode(&self) -> DependencyMode {
        self.mode
    }

    /// Whether the dependency is met, given each named argument's truthiness.
    pub fn is_met(&self, truthy: impl IntoIterator<Item = bool>) -> bool {
        let mut truthy = truthy.into_iter();
        match self.mode {
            DependencyMode::Any => truthy.any(|t| t),
            DependencyMode::All => truthy.all(|t| t),
        }
    }

    /// Help text, e.g. `any of: verbose, debug`.
    pub fn describe(&self) -> String {
        format!("{} of: {}", self.mode, self.names.join(", "))
    }
}

/// One argument the handler knows how to collect.
///
/// Built through [`ArgumentSpec::builder`]; immutable afterwards except for
/// the short flag the handler may assign on registration.
#[derive(Debug, Clone)]
pub struct ArgumentSpec {
    name: String,
    semantic_type: SemanticType,
    required: bool,
    nullable: bool,
    default: Option<Value>,
    long_aliases: Vec<String>,
    short: Option<char>,
    short_aliases: Vec<char>,
    env: Option<String>,
    positional: bool,
    help: String,
    dependency: Option<Dependency>,
    validator: AnyValidator,
    rendered: Rendered,
}

/// Text columns for help output, computed once at build time.
#[derive(Debug, Clone, Default)]
struct Rendered {
    type_name: String,
    default: Option<String>,
    choices: Vec<String>,
    conditions: Vec<String>,
}

impl ArgumentSpec {
    pub fn builder(name: impl Into<String>, semantic_type: SemanticType) -> ArgumentSpecBuilder {
        ArgumentSpecBuilder {
            name: name.into(),
            semantic_type,
            default: None,
            required: None,
            nullable: false,
            aliases: Vec::new(),
            short: None,
            env: None,
            positional: false,
            help: String::new(),
            dependency: None,
            strictness: None,
            choices: None,
            conditions: Vec::new(),
            validator: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semantic_type(&self) -> SemanticType {
        self.semantic_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The default, already in coerced form.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Every alternative name: long aliases, then one-letter aliases.
    pub fn aliases(&self) -> impl Iterator<Item = String> + '_ {
        self.long_aliases
            .iter()
            .cloned()
            .chain(self.short_aliases.iter().map(|c| c.to_string()))
    }

    pub fn short(&self) -> Option<char> {
        self.short
    }

    pub fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    pub fn is_positional(&self) -> bool {
        self.positional
    }

    pub fn help_text(&self) -> &str {
        &self.help
    }

    pub fn validator(&self) -> &AnyValidator {
        &self.validator
    }

    pub fn dependency(&self) -> Option<&Dependency> {
        self.dependency.as_ref()
    }

    pub fn choices(&self) -> Option<&[Value]> {
        self.validator.rules().choices()
    }

    /// Coerce a raw value through this argument's validator.
    pub fn coerce(&self, raw: &Value) -> Result<Value, ValidateError> {
        self.validator.coerce(raw)
    }

    pub fn long_aliases(&self) -> &[String] {
        &self.long_aliases
    }

    pub fn short_aliases(&self) -> &[char] {
        &self.short_aliases
    }

    pub(crate) fn assign_short(&mut self, short: char) {
        self.short = Some(short);
    }
}

impl ArgDefLike for ArgumentSpec {
    fn name(&self) -> &str {
        &self.name
    }

    fn short(&self) -> Option<char> {
        self.short
    }

    fn long(&self) -> Option<&str> {
        if self.positional {
            None
        } else {
            Some(&self.name)
        }
    }

    fn help(&self) -> &str {
        &self.help
    }

    fn required(&self) -> bool {
        self.required
    }

    fn default_value(&self) -> Option<&str> {
        self.rendered.default.as_deref()
    }

    fn env(&self) -> Option<&str> {
        self.env.as_deref()
    }

    fn aliases(&self) -> &[String] {
        &self.long_aliases
    }

    fn short_aliases(&self) -> &[char] {
        &self.short_aliases
    }

    fn positional(&self) -> bool {
        self.positional
    }

    fn switch(&self) -> bool {
        self.semantic_type == SemanticType::Boolean
    }

    fn nullable(&self) -> bool {
        self.nullable
    }

    fn value_type(&self) -> Option<&str> {
        Some(&self.rendered.type_name)
    }

    fn possible_values(&self) -> &[String] {
        &self.rendered.choices
    }

    fn conditions(&self) -> &[String] {
        &self.rendered.conditions
    }
}

#[derive(Debug, Clone)]
pub struct ArgumentSpecBuilder {
    name: String,
    semantic_type: SemanticType,
    default: Option<Value>,
    required: Option<bool>,
    nullable: bool,
    aliases: Vec<String>,
    short: Option<char>,
    env: Option<String>,
    positional: bool,
    help: String,
    dependency: Option<Dependency>,
    strictness: Option<Strictness>,
    choices: Option<Vec<Value>>,
    conditions: Vec<Condition>,
    validator: Option<AnyValidator>,
}

impl ArgumentSpecBuilder {
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Override the derived rule (required when there is no default and
    /// the argument is not nullable).
    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// One-letter aliases become extra short flags, longer ones extra long
    /// flags and extra mapping keys.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Environment variable consulted when the flag is absent.
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.env = Some(var.into());
        self
    }

    pub fn positional(mut self, positional: bool) -> Self {
        self.positional = positional;
        self
    }

    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = help.into();
        self
    }

    /// Only accept a value when `mode` of the named arguments are truthy,
    /// and demand one then. Such an argument is nullable and never required.
    pub fn depends_on<I, S>(mut self, names: I, mode: DependencyMode) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency = Some(Dependency {
            names: names.into_iter().map(Into::into).collect(),
            mode,
        });
        self
    }

    pub fn strictness(mut self, strictness: Strictness) -> Self {
        self.strictness = Some(strictness);
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    pub fn condition<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.conditions.push(Condition::new(name, predicate));
        self
    }

    /// Use a pre-configured validator (bounds, strictness, conditions).
    pub fn validator(mut self, validator: impl Into<AnyValidator>) -> Self {
        self.validator = Some(validator.into());
        self
    }

    pub fn build(self) -> Result<ArgumentSpec> {
        let name = self.name;
        let invalid = |reason: String| Error::InvalidSpec {
            name: name.clone(),
            reason,
        };

        if !is_identifier(&name) {
            return Err(invalid(
                "names must start with a letter or '_' and contain only letters, digits, '_' or '-'"
                    .to_string(),
            ));
        }

        let mut validator = match self.validator {
            Some(v) if v.semantic_type() != self.semantic_type => {
                return Err(invalid(format!(
                    "validator targets {} but the argument is declared as {}",
                    v.semantic_type(),
                    self.semantic_type
                )));
            }
            Some(v) => v,
            None => Validate::for_type(self.semantic_type),
        };
        if let Some(strictness) = self.strictness {
            validator = validator.strictness(strictness);
        }
        if let Some(choices) = self.choices {
            validator = validator.choices(choices);
        }
        for condition in self.conditions {
            validator = validator.with_condition(condition);
        }
        if let Some(dependency) = &self.dependency {
            if dependency.names.is_empty() {
                return Err(invalid("a dependency must name at least one argument".to_string()));
            }
            if dependency.names.contains(&name) {
                return Err(invalid("an argument cannot depend on itself".to_string()));
            }
            if self.required == Some(true) {
                return Err(invalid("an argument with a dependency cannot be required".to_string()));
            }
            if self.default.is_some() {
                return Err(invalid("an argument with a dependency cannot have a default".to_string()));
            }
        }
        let nullable = self.nullable || self.dependency.is_some();
        let validator = validator.nullable(nullable);

        let required = self.required.unwrap_or(self.default.is_none() && !nullable);
        if required && self.default.is_some() {
            return Err(invalid("a required argument cannot have a default".to_string()));
        }

        let default = match self.default {
            Some(raw) => Some(
                validator
                    .coerce(&raw)
                    .map_err(|err| invalid(format!("default {} is invalid: {err}", raw.repr())))?,
            ),
            None => None,
        };

        let mut long_aliases = Vec::new();
        let mut short_aliases = Vec::new();
        for alias in self.aliases {
            let alias = alias.trim().trim_start_matches('-').to_string();
            let mut chars = alias.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_alphanumeric() => short_aliases.push(c),
                _ if is_identifier(&alias) && alias != name => long_aliases.push(alias),
                _ => return Err(invalid(format!("'{alias}' is not a usable alias"))),
            }
        }

        if let Some(short) = self.short {
            if !short.is_ascii_alphanumeric() {
                return Err(invalid(format!("short flag '{short}' must be a letter or digit")));
            }
        }
        if self.positional && (self.short.is_some() || !short_aliases.is_empty()) {
            return Err(invalid("a positional argument cannot have short flags".to_string()));
        }

        let rendered = Rendered {
            type_name: self.semantic_type.to_string(),
            default: default.as_ref().map(|v| v.to_string()),
            choices: validator
                .rules()
                .choices()
                .map(|c| c.iter().map(|v| v.to_string()).collect())
                .unwrap_or_default(),
            conditions: validator
                .describe_rules()
                .into_iter()
                .chain(self.dependency.as_ref().map(|d| format!("requires {}", d.describe())))
                .collect(),
        };

        Ok(ArgumentSpec {
            name,
            semantic_type: self.semantic_type,
            required,
            nullable,
            default,
            long_aliases,
            short: self.short,
            short_aliases,
            env: self.env,
            positional: self.positional,
            help: self.help,
            dependency: self.dependency,
            validator,
            rendered,
        })
    }
}

pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}
