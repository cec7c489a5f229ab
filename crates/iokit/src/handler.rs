use crate::error::{Error, FieldError, Result};
use crate::form::{Form, FormOutcome, FormProvider};
use crate::spec::{self, ArgumentSpec};
use crate::terminal::TerminalForm;
use indexmap::IndexMap;
use iokit_argparse::args::Matches;
use iokit_argparse::claplike::{self, CommandMetaLike, ParseError, ParseOutcome};
use iokit_validate::{Validate, ValidationError, Value};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::ops::Index;
use std::str::FromStr;
use tracing::{debug, info, warn};

const RESERVED_LONG: &str = "help";
const RESERVED_SHORT: char = 'h';

/// Where `collect_input` takes its values from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// A supplied mapping, else the command line when it has arguments,
    /// else an interactive form.
    #[default]
    Smart,
    Programmatic,
    CommandLine,
    Form,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Smart => "smart",
            RunMode::Programmatic => "programmatic",
            RunMode::CommandLine => "command-line",
            RunMode::Form => "form",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "smart" => Ok(RunMode::Smart),
            "programmatic" | "mapping" => Ok(RunMode::Programmatic),
            "command-line" | "cli" => Ok(RunMode::CommandLine),
            "form" | "gui" => Ok(RunMode::Form),
            other => Err(format!(
                "unknown run mode '{other}' (expected smart, programmatic, command-line or form)"
            )),
        }
    }
}

/// Collected values keyed by argument name, in registration order.
///
/// When a subcommand was chosen, its own namespace is nested under the
/// verb; it serializes as one more entry keyed by the verb.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultNamespace {
    values: IndexMap<String, Value>,
    subcommand: Option<(String, Box<ResultNamespace>)>,
}

impl ResultNamespace {
    /// The chosen verb, if any.
    pub fn command(&self) -> Option<&str> {
        self.subcommand.as_ref().map(|(verb, _)| verb.as_str())
    }

    /// The chosen verb and the values collected for it.
    pub fn subcommand(&self) -> Option<(&str, &ResultNamespace)> {
        self.subcommand
            .as_ref()
            .map(|(verb, ns)| (verb.as_str(), ns.as_ref()))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn into_inner(self) -> IndexMap<String, Value> {
        self.values
    }
}

impl Serialize for ResultNamespace {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let len = self.values.len() + usize::from(self.subcommand.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for (name, value) in &self.values {
            map.serialize_entry(name, value)?;
        }
        if let Some((verb, ns)) = &self.subcommand {
            map.serialize_entry(verb, ns)?;
        }
        map.end()
    }
}

impl Index<&str> for ResultNamespace {
    type Output = Value;

    fn index(&self, name: &str) -> &Value {
        &self.values[name]
    }
}

/// Raw values for one handler level, plus the chosen subcommand's.
#[derive(Debug, Clone, Default)]
struct RawInput {
    values: IndexMap<String, Value>,
    subcommand: Option<(String, Box<RawInput>)>,
}

impl RawInput {
    fn flat(values: IndexMap<String, Value>) -> Self {
        Self {
            values,
            subcommand: None,
        }
    }

    fn from_matches(matches: &Matches) -> Self {
        Self {
            values: matches
                .iter()
                .map(|(name, m)| {
                    let value = m.value.clone().map(Value::Str).unwrap_or(Value::Null);
                    (name.to_string(), value)
                })
                .collect(),
            subcommand: matches
                .subcommand()
                .map(|(verb, sub)| (verb.to_string(), Box::new(Self::from_matches(sub)))),
        }
    }
}

/// Collects typed argument values from a mapping, the command line or a
/// form, depending on the run mode.
///
/// Subcommands are handlers of their own, selected by a verb on the
/// command line or by a nested mapping keyed by the verb.
#[derive(Debug, Clone)]
pub struct IOHandler {
    app_name: String,
    /// The verb for a subcommand, the application name at the root.
    name: String,
    /// `app verb ...`, for usage lines.
    path: String,
    description: String,
    run_mode: RunMode,
    specs: Vec<ArgumentSpec>,
    subcommands: Vec<IOHandler>,
}

impl IOHandler {
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            name: app_name.clone(),
            path: app_name.clone(),
            app_name,
            description: String::new(),
            run_mode: RunMode::default(),
            specs: Vec::new(),
            subcommands: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Like [`IOHandler::description`], for handlers reached through
    /// [`IOHandler::add_subcommand`].
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = description.into();
        self
    }

    pub fn run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn mode(&self) -> RunMode {
        self.run_mode
    }

    pub fn specs(&self) -> &[ArgumentSpec] {
        &self.specs
    }

    pub fn spec(&self, name: &str) -> Option<&ArgumentSpec> {
        self.specs.iter().find(|s| s.name() == name)
    }

    /// The verb for a subcommand, the application name at the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn subcommands(&self) -> &[IOHandler] {
        &self.subcommands
    }

    pub fn subcommand(&self, verb: &str) -> Option<&IOHandler> {
        self.subcommands.iter().find(|s| s.name == verb)
    }

    /// Register a subcommand and return its handler for adding arguments.
    ///
    /// The child shares the application name and run mode. Its verb must not
    /// clash with another subcommand or with an argument name or alias.
    pub fn add_subcommand(&mut self, verb: impl Into<String>) -> Result<&mut IOHandler> {
        let verb = verb.into();
        if !spec::is_identifier(&verb) {
            return Err(Error::InvalidSpec {
                name: verb,
                reason: "subcommand names must start with a letter or '_' and contain only letters, digits, '_' or '-'"
                    .to_string(),
            });
        }
        if self.subcommand(&verb).is_some() || self.claims_long(&verb) {
            return Err(Error::DuplicateArgument { name: verb });
        }

        debug!(app = %self.app_name, subcommand = %verb, "added subcommand");
        let child = IOHandler {
            app_name: self.app_name.clone(),
            path: format!("{} {verb}", self.path),
            name: verb,
            description: String::new(),
            run_mode: self.run_mode,
            specs: Vec::new(),
            subcommands: Vec::new(),
        };
        let idx = self.subcommands.len();
        self.subcommands.push(child);
        Ok(&mut self.subcommands[idx])
    }

    fn claims_long(&self, long: &str) -> bool {
        self.specs
            .iter()
            .any(|s| s.name() == long || s.long_aliases().iter().any(|a| a == long))
    }

    /// Register an argument.
    ///
    /// Names and long aliases share one namespace, short flags another;
    /// `help` and `h` are taken. A flagged argument without an explicit short
    /// flag gets the first free letter or digit of its name.
    pub fn add_arg(&mut self, mut spec: ArgumentSpec) -> Result<&mut Self> {
        let mut longs: HashSet<String> = HashSet::from([RESERVED_LONG.to_string()]);
        let mut shorts: HashSet<char> = HashSet::from([RESERVED_SHORT]);
        for existing in &self.specs {
            longs.insert(existing.name().to_string());
            longs.extend(existing.long_aliases().iter().cloned());
            shorts.extend(existing.short());
            shorts.extend(existing.short_aliases().iter().copied());
        }

        longs.extend(self.subcommands.iter().map(|s| s.name.clone()));

        let mut new_longs = vec![spec.name().to_string()];
        new_longs.extend(spec.long_aliases().iter().cloned());
        for long in &new_longs {
            if longs.contains(long) || new_longs.iter().filter(|l| *l == long).count() > 1 {
                return Err(Error::DuplicateArgument { name: long.clone() });
            }
        }

        if let Some(dependency) = spec.dependency() {
            if let Some(unknown) = dependency
                .names()
                .iter()
                .find(|name| self.spec(name).is_none())
            {
                return Err(Error::InvalidSpec {
                    name: spec.name().to_string(),
                    reason: format!("depends on unknown argument '{unknown}'"),
                });
            }
        }

        let mut new_shorts: Vec<char> = spec.short().into_iter().collect();
        new_shorts.extend(spec.short_aliases().iter().copied());
        for (idx, short) in new_shorts.iter().enumerate() {
            if shorts.contains(short) || new_shorts[..idx].contains(short) {
                return Err(Error::DuplicateArgument {
                    name: short.to_string(),
                });
            }
        }

        if spec.short().is_none() && !spec.is_positional() {
            let free = spec
                .name()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .find(|c| !shorts.contains(c) && !new_shorts.contains(c));
            if let Some(short) = free {
                debug!(argument = spec.name(), short = %short, "assigned short flag");
                spec.assign_short(short);
            }
        }

        self.specs.push(spec);
        Ok(self)
    }

    pub fn usage(&self) -> String {
        claplike::usage(self)
    }

    pub fn help(&self) -> String {
        claplike::help(self)
    }

    /// Collect values along the path chosen by the run mode.
    ///
    /// On the command-line path, `-h/--help` prints help and exits with
    /// status 0, and a parse failure prints the error and usage to stderr
    /// and exits with status 2. Use [`IOHandler::collect_from_args`] to get
    /// those as errors instead.
    pub fn collect_input(
        &self,
        values: Option<&IndexMap<String, Value>>,
    ) -> Result<ResultNamespace> {
        match (self.run_mode, values) {
            (RunMode::Smart | RunMode::Programmatic, Some(values)) => {
                self.collect_from_mapping(values)
            }
            (RunMode::Programmatic, None) => self.collect_from_mapping(&IndexMap::new()),
            (RunMode::CommandLine, _) => self.collect_from_process_args(),
            (RunMode::Form, _) => self.collect_with_terminal(),
            (RunMode::Smart, None) => {
                if std::env::args_os().len() > 1 {
                    self.collect_from_process_args()
                } else {
                    self.collect_with_terminal()
                }
            }
        }
    }

    /// Resolve values from a caller-supplied mapping. Keys may be argument
    /// names or aliases; unknown keys are ignored. A key naming a subcommand
    /// selects it, and its value (a mapping, or a dict literal string) holds
    /// that subcommand's values.
    pub fn collect_from_mapping(&self, values: &IndexMap<String, Value>) -> Result<ResultNamespace> {
        debug!(app = %self.app_name, "collecting from mapping");
        let mut errors = Vec::new();
        let raw = self.raw_from_mapping(values, "", &mut errors);
        self.resolve_with(&raw, errors)
    }

    fn raw_from_mapping(
        &self,
        values: &IndexMap<String, Value>,
        prefix: &str,
        errors: &mut Vec<FieldError>,
    ) -> RawInput {
        let mut raw: IndexMap<String, Value> = IndexMap::new();
        let mut known: HashSet<String> = HashSet::new();
        for spec in &self.specs {
            let keys: Vec<String> = std::iter::once(spec.name().to_string())
                .chain(spec.aliases())
                .collect();
            if let Some(value) = keys.iter().find_map(|key| values.get(key.as_str())) {
                raw.insert(spec.name().to_string(), value.clone());
            }
            known.extend(keys);
        }

        let mut subcommand = None;
        for sub in &self.subcommands {
            known.insert(sub.name.clone());
            let Some(nested) = values.get(sub.name.as_str()) else {
                continue;
            };
            if subcommand.is_some() {
                debug!(subcommand = %sub.name, "ignoring second subcommand");
                continue;
            }
            let qualified = format!("{prefix}{}", sub.name);
            match Validate::dict().coerce(nested) {
                Ok(Value::Map(nested)) => {
                    let inner = sub.raw_from_mapping(&nested, &format!("{qualified}."), errors);
                    subcommand = Some((sub.name.clone(), Box::new(inner)));
                }
                Ok(_) => {}
                Err(error) => {
                    warn!(subcommand = %qualified, %error, "rejected subcommand values");
                    errors.push(FieldError {
                        argument: qualified,
                        error,
                    });
                }
            }
        }

        for key in values.keys().filter(|k| !known.contains(k.as_str())) {
            debug!(key = %key, "ignoring unknown key");
        }
        RawInput {
            values: raw,
            subcommand,
        }
    }

    /// Parse `argv` (without the program name), falling back to `env` and
    /// then to defaults.
    pub fn collect_from_args(
        &self,
        argv: &[String],
        env: &[(String, String)],
    ) -> Result<ResultNamespace> {
        debug!(app = %self.app_name, args = argv.len(), "collecting from command line");
        let matches = match claplike::parse_with_env(self, argv, env) {
            Ok(ParseOutcome::Matches(matches)) => matches,
            Ok(ParseOutcome::Help(text)) => return Err(Error::HelpRequested(text)),
            Err(ParseError::InvalidArgs(message)) => {
                return Err(Error::Parse {
                    message,
                    usage: self.usage(),
                });
            }
            Err(ParseError::Failed(reason)) => {
                return Err(Error::InvalidSpec {
                    name: self.app_name.clone(),
                    reason,
                });
            }
        };

        self.resolve(&RawInput::from_matches(&matches))
    }

    /// Present a form until it is submitted with valid values, cancelled, or
    /// the provider declines to retry. The form covers this handler's own
    /// arguments; subcommands are chosen on the command line or in a mapping.
    pub fn collect_with_form<P>(&self, provider: &mut P) -> Result<ResultNamespace>
    where
        P: FormProvider + ?Sized,
    {
        debug!(app = %self.app_name, "collecting from form");
        let mut form = Form::from_specs(&self.app_name, &self.description, &self.specs);
        loop {
            let submitted = match provider.present(&form)? {
                FormOutcome::Submitted(values) => values,
                FormOutcome::Cancelled => {
                    info!("form cancelled");
                    return Err(Error::Cancelled);
                }
            };
            match self.resolve(&RawInput::flat(submitted.clone())) {
                Err(err @ (Error::InvalidArguments(_) | Error::MissingArgument { .. })) => {
                    if !provider.retry(&err)? {
                        return Err(err);
                    }
                    form.prefill(&submitted);
                }
                other => return other,
            }
        }
    }

    fn collect_from_process_args(&self) -> Result<ResultNamespace> {
        let argv: Vec<String> = std::env::args_os()
            .skip(1)
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let env: Vec<(String, String)> = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        match self.collect_from_args(&argv, &env) {
            Err(Error::HelpRequested(text)) => {
                print!("{text}");
                std::process::exit(0);
            }
            Err(Error::Parse { message, usage }) => {
                eprintln!("error: {message}\n\n{usage}");
                std::process::exit(2);
            }
            other => other,
        }
    }

    fn collect_with_terminal(&self) -> Result<ResultNamespace> {
        let stdin = io::stdin();
        let mut form = TerminalForm::new(stdin.lock(), io::stdout());
        self.collect_with_form(&mut form)
    }

    fn resolve(&self, raw: &RawInput) -> Result<ResultNamespace> {
        self.resolve_with(raw, Vec::new())
    }

    /// Turn raw values keyed by canonical name into typed values. Missing
    /// arguments and rejected values from every level are reported together.
    fn resolve_with(&self, raw: &RawInput, mut errors: Vec<FieldError>) -> Result<ResultNamespace> {
        let mut missing = Vec::new();
        let ns = self.resolve_level(raw, "", &mut missing, &mut errors);
        if !missing.is_empty() {
            return Err(Error::MissingArgument {
                names: missing,
                errors,
            });
        }
        if !errors.is_empty() {
            return Err(Error::InvalidArguments(errors));
        }
        Ok(ns)
    }

    /// Names below the root are reported as `verb.argument`.
    fn resolve_level(
        &self,
        raw: &RawInput,
        prefix: &str,
        missing: &mut Vec<String>,
        errors: &mut Vec<FieldError>,
    ) -> ResultNamespace {
        let mut values = IndexMap::new();

        for spec in &self.specs {
            let name = spec.name();
            let Some(value) = raw.values.get(name) else {
                if let Some(default) = spec.default_value() {
                    values.insert(name.to_string(), default.clone());
                } else if spec.is_required() {
                    missing.push(format!("{prefix}{name}"));
                } else {
                    values.insert(name.to_string(), Value::Null);
                }
                continue;
            };

            match spec.coerce(value) {
                Ok(coerced) => {
                    values.insert(name.to_string(), coerced);
                }
                Err(error) => {
                    warn!(argument = name, %error, "rejected value");
                    errors.push(FieldError {
                        argument: format!("{prefix}{name}"),
                        error,
                    });
                }
            }
        }

        self.check_dependencies(&values, prefix, errors);

        let subcommand = raw.subcommand.as_ref().and_then(|(verb, sub_raw)| {
            let sub = self.subcommand(verb)?;
            let ns = sub.resolve_level(sub_raw, &format!("{prefix}{verb}."), missing, errors);
            Some((verb.clone(), Box::new(ns)))
        });
        ResultNamespace { values, subcommand }
    }

    /// An argument with a dependency needs a value exactly when the
    /// dependency is met. Skipped when any involved value was rejected.
    fn check_dependencies(
        &self,
        values: &IndexMap<String, Value>,
        prefix: &str,
        errors: &mut Vec<FieldError>,
    ) {
        for spec in &self.specs {
            let Some(dependency) = spec.dependency() else {
                continue;
            };
            let Some(value) = values.get(spec.name()) else {
                continue;
            };
            let truthy: Option<Vec<bool>> = dependency
                .names()
                .iter()
                .map(|name| values.get(name.as_str()).map(Value::is_truthy))
                .collect();
            let Some(truthy) = truthy else {
                continue;
            };

            let reason = match (dependency.is_met(truthy), value.is_null()) {
                (true, true) => format!("is required when {} are truthy", dependency.describe()),
                (false, false) => {
                    format!("is not allowed unless {} are truthy", dependency.describe())
                }
                _ => continue,
            };
            warn!(argument = spec.name(), %reason, "dependency not satisfied");
            errors.push(FieldError {
                argument: format!("{prefix}{}", spec.name()),
                error: ValidationError {
                    value: value.repr(),
                    reason,
                }
                .into(),
            });
        }
    }
}

impl CommandMetaLike for IOHandler {
    type ArgDef = ArgumentSpec;

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn args(&self) -> &[ArgumentSpec] {
        &self.specs
    }

    fn display_name(&self) -> &str {
        &self.path
    }

    fn subcommands(&self) -> &[IOHandler] {
        &self.subcommands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::DependencyMode;
    use iokit_validate::SemanticType;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn map(pairs: &[(&str, Value)]) -> IndexMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn handler() -> IOHandler {
        let mut h = IOHandler::new("demo").description("Demo tool.");
        h.add_arg(
            ArgumentSpec::builder("name", SemanticType::String)
                .help("Who to greet")
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("count", SemanticType::Integer)
                .alias("times")
                .default(1)
                .env("DEMO_COUNT")
                .validator(Validate::int().min_value(1).max_value(10))
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("verbose", SemanticType::Boolean)
                .default(false)
                .build()
                .unwrap(),
        )
        .unwrap()
        .add_arg(
            ArgumentSpec::builder("note", SemanticType::String)
                .nullable(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        h
    }

    #[test]
    fn mapping_values_are_coerced_and_defaults_filled() {
        let ns = handler()
            .collect_input(Some(&map(&[
                ("name", Value::from("Ada")),
                ("times", Value::from("4")),
                ("unknown", Value::from(1)),
            ])))
            .unwrap();
        assert_eq!(ns["name"], Value::from("Ada"));
        assert_eq!(ns["count"], Value::Int(4));
        assert_eq!(ns["verbose"], Value::Bool(false));
        assert_eq!(ns["note"], Value::Null);
        assert!(!ns.contains("unknown"));
        assert_eq!(
            ns.iter().map(|(k, _)| k).collect::<Vec<_>>(),
            ["name", "count", "verbose", "note"]
        );
    }

    #[test]
    fn missing_required_names_every_argument() {
        let mut h = handler();
        h.add_arg(
            ArgumentSpec::builder("target", SemanticType::Path)
                .build()
                .unwrap(),
        )
        .unwrap();
        let err = h.collect_from_mapping(&IndexMap::new()).unwrap_err();
        match err {
            Error::MissingArgument { names, errors } => {
                assert_eq!(names, ["name", "target"]);
                assert!(errors.is_empty());
            }
            other => panic!("expected MissingArgument, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_values_are_reported_per_argument() {
        let err = handler()
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("count", Value::from(11)),
                ("verbose", Value::from("maybe")),
            ]))
            .unwrap_err();
        let Error::InvalidArguments(errors) = err else {
            panic!("expected InvalidArguments");
        };
        let names: Vec<&str> = errors.iter().map(|e| e.argument.as_str()).collect();
        assert_eq!(names, ["count", "verbose"]);
        assert!(errors[0].error.is_validation());
        assert!(errors[1].error.is_coercion());
    }

    #[test]
    fn command_line_precedence_is_argv_env_default() {
        let h = handler();
        let env = vec![("DEMO_COUNT".to_string(), "5".to_string())];

        let ns = h.collect_from_args(&argv(&["--name", "Ada"]), &[]).unwrap();
        assert_eq!(ns["count"], Value::Int(1));

        let ns = h.collect_from_args(&argv(&["--name", "Ada"]), &env).unwrap();
        assert_eq!(ns["count"], Value::Int(5));

        let ns = h
            .collect_from_args(&argv(&["--name", "Ada", "--times", "7"]), &env)
            .unwrap();
        assert_eq!(ns["count"], Value::Int(7));
    }

    #[test]
    fn bare_flags_on_the_command_line() {
        let ns = handler()
            .collect_from_args(&argv(&["-n", "Ada", "--verbose", "--note"]), &[])
            .unwrap();
        assert_eq!(ns["verbose"], Value::Bool(true));
        assert_eq!(ns["note"], Value::Null);
    }

    #[test]
    fn switch_before_a_positional_leaves_it_alone() {
        let mut h = handler();
        h.add_arg(
            ArgumentSpec::builder("target", SemanticType::Path)
                .positional(true)
                .build()
                .unwrap(),
        )
        .unwrap();
        let ns = h
            .collect_from_args(&argv(&["-n", "Ada", "--verbose", "out.txt"]), &[])
            .unwrap();
        assert_eq!(ns["verbose"], Value::Bool(true));
        assert_eq!(ns["target"], Value::Path("out.txt".into()));

        let ns = h
            .collect_from_args(&argv(&["out.txt", "--verbose=false", "-n", "Ada"]), &[])
            .unwrap();
        assert_eq!(ns["verbose"], Value::Bool(false));
    }

    #[test]
    fn missing_and_invalid_are_reported_together() {
        let err = handler()
            .collect_from_mapping(&map(&[("count", Value::from(11))]))
            .unwrap_err();
        let Error::MissingArgument { names, errors } = err else {
            panic!("expected MissingArgument");
        };
        assert_eq!(names, ["name"]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].argument, "count");
    }

    fn with_dependency(mode: DependencyMode) -> IOHandler {
        let mut h = handler();
        h.add_arg(
            ArgumentSpec::builder("level", SemanticType::Integer)
                .depends_on(["verbose", "note"], mode)
                .build()
                .unwrap(),
        )
        .unwrap();
        h
    }

    #[test]
    fn dependency_demands_a_value_when_met() {
        let h = with_dependency(DependencyMode::Any);
        let ns = h
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("verbose", Value::Bool(true)),
                ("level", Value::from("2")),
            ]))
            .unwrap();
        assert_eq!(ns["level"], Value::Int(2));

        let err = h
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("verbose", Value::Bool(true)),
            ]))
            .unwrap_err();
        let Error::InvalidArguments(errors) = err else {
            panic!("expected InvalidArguments");
        };
        assert_eq!(errors[0].argument, "level");
        let message = errors[0].to_string();
        assert!(message.contains("is required when any of: verbose, note"), "{message}");

        let ns = h
            .collect_from_mapping(&map(&[("name", Value::from("Ada"))]))
            .unwrap();
        assert_eq!(ns["level"], Value::Null);
    }

    #[test]
    fn dependency_rejects_a_value_when_unmet() {
        let h = with_dependency(DependencyMode::All);
        let err = h
            .collect_from_args(&argv(&["-n", "Ada", "--verbose", "--level=3"]), &[])
            .unwrap_err();
        let Error::InvalidArguments(errors) = err else {
            panic!("expected InvalidArguments");
        };
        let message = errors[0].to_string();
        assert!(message.contains("is not allowed unless all of: verbose, note"), "{message}");

        let ns = h
            .collect_from_args(
                &argv(&["-n", "Ada", "--verbose", "--note=hi", "--level=3"]),
                &[],
            )
            .unwrap();
        assert_eq!(ns["level"], Value::Int(3));
    }

    #[test]
    fn dependency_on_unknown_argument_is_rejected() {
        let mut h = handler();
        let spec = ArgumentSpec::builder("level", SemanticType::Integer)
            .depends_on(["debug"], DependencyMode::Any)
            .build()
            .unwrap();
        assert!(matches!(
            h.add_arg(spec),
            Err(Error::InvalidSpec { ref reason, .. }) if reason.contains("'debug'")
        ));
    }

    fn with_subcommands() -> IOHandler {
        let mut h = handler();
        h.add_subcommand("deploy")
            .unwrap()
            .set_description("Ship the build.")
            .add_arg(
                ArgumentSpec::builder("region", SemanticType::String)
                    .env("DEMO_REGION")
                    .build()
                    .unwrap(),
            )
            .unwrap()
            .add_arg(
                ArgumentSpec::builder("replicas", SemanticType::Integer)
                    .default(1)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        h.add_subcommand("status").unwrap();
        h
    }

    #[test]
    fn subcommand_from_the_command_line() {
        let h = with_subcommands();
        let env = vec![("DEMO_REGION".to_string(), "eu".to_string())];
        let ns = h
            .collect_from_args(
                &argv(&["-n", "Ada", "--verbose", "deploy", "--replicas", "3"]),
                &env,
            )
            .unwrap();
        assert_eq!(ns["verbose"], Value::Bool(true));
        assert_eq!(ns.command(), Some("deploy"));
        let (_, deploy) = ns.subcommand().unwrap();
        assert_eq!(deploy["region"], Value::from("eu"));
        assert_eq!(deploy["replicas"], Value::Int(3));

        let ns = h.collect_from_args(&argv(&["-n", "Ada"]), &[]).unwrap();
        assert_eq!(ns.command(), None);

        match h.collect_from_args(&argv(&["-n", "Ada", "deploy"]), &[]) {
            Err(Error::MissingArgument { names, .. }) => assert_eq!(names, ["deploy.region"]),
            other => panic!("expected MissingArgument, got: {other:?}"),
        }

        match h.collect_from_args(&argv(&["deploy", "--help"]), &[]) {
            Err(Error::HelpRequested(text)) => {
                assert!(text.starts_with("Usage: demo deploy"), "{text}");
                assert!(text.contains("Ship the build."), "{text}");
            }
            other => panic!("expected HelpRequested, got: {other:?}"),
        }
        assert!(h.help().contains("Commands:"));
    }

    #[test]
    fn subcommand_from_a_nested_mapping() {
        let h = with_subcommands();
        let deploy = map(&[("region", Value::from("us")), ("replicas", Value::from("2"))]);
        let ns = h
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("deploy", Value::Map(deploy)),
            ]))
            .unwrap();
        assert_eq!(ns.command(), Some("deploy"));
        assert_eq!(ns.subcommand().unwrap().1["replicas"], Value::Int(2));
        assert_eq!(
            serde_json::to_value(&ns).unwrap(),
            serde_json::json!({
                "name": "Ada", "count": 1, "verbose": false, "note": null,
                "deploy": {"region": "us", "replicas": 2}
            })
        );

        let ns = h
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("deploy", Value::from("{'region': 'eu'}")),
            ]))
            .unwrap();
        assert_eq!(ns.subcommand().unwrap().1["region"], Value::from("eu"));

        let err = h
            .collect_from_mapping(&map(&[
                ("name", Value::from("Ada")),
                ("deploy", Value::from(5)),
            ]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(ref e) if e[0].argument == "deploy"), "{err}");
    }

    #[test]
    fn subcommand_names_must_be_unique() {
        let mut h = with_subcommands();
        assert!(matches!(h.add_subcommand("status"), Err(Error::DuplicateArgument { .. })));
        assert!(matches!(h.add_subcommand("count"), Err(Error::DuplicateArgument { .. })));
        assert!(matches!(h.add_subcommand("times"), Err(Error::DuplicateArgument { .. })));
        assert!(matches!(h.add_subcommand("bad verb"), Err(Error::InvalidSpec { .. })));
        let clash = ArgumentSpec::builder("deploy", SemanticType::Boolean)
            .default(false)
            .build()
            .unwrap();
        assert!(matches!(h.add_arg(clash), Err(Error::DuplicateArgument { .. })));
    }

    #[test]
    fn help_and_parse_errors_are_returned() {
        let h = handler();
        match h.collect_from_args(&argv(&["--help"]), &[]) {
            Err(Error::HelpRequested(text)) => {
                assert!(text.contains("Required Arguments:"));
                assert!(text.contains("Optional Arguments:"));
                assert!(text.contains("Demo tool."));
            }
            other => panic!("expected HelpRequested, got: {other:?}"),
        }
        match h.collect_from_args(&argv(&["--nope"]), &[]) {
            Err(Error::Parse { message, usage }) => {
                assert!(message.contains("--nope"), "{message}");
                assert!(usage.starts_with("Usage: demo"), "{usage}");
            }
            other => panic!("expected Parse, got: {other:?}"),
        }
    }

    #[test]
    fn short_flags_are_assigned_and_skip_h() {
        let mut h = IOHandler::new("t");
        for name in ["host", "hash", "alpha"] {
            h.add_arg(
                ArgumentSpec::builder(name, SemanticType::String)
                    .default("x")
                    .build()
                    .unwrap(),
            )
            .unwrap();
        }
        let shorts: Vec<Option<char>> = h.specs().iter().map(|s| s.short()).collect();
        assert_eq!(shorts, [Some('o'), Some('a'), Some('l')]);
    }

    #[test]
    fn duplicates_and_reserved_names_are_rejected() {
        let mut h = handler();
        let dup = ArgumentSpec::builder("count", SemanticType::Float)
            .build()
            .unwrap();
        assert!(matches!(h.add_arg(dup), Err(Error::DuplicateArgument { .. })));

        let alias = ArgumentSpec::builder("repeat", SemanticType::Integer)
            .alias("times")
            .build()
            .unwrap();
        assert!(matches!(h.add_arg(alias), Err(Error::DuplicateArgument { name }) if name == "times"));

        let help = ArgumentSpec::builder("help", SemanticType::Boolean)
            .build()
            .unwrap();
        assert!(matches!(h.add_arg(help), Err(Error::DuplicateArgument { .. })));

        let short = ArgumentSpec::builder("hue", SemanticType::Integer)
            .short('h')
            .build()
            .unwrap();
        assert!(matches!(h.add_arg(short), Err(Error::DuplicateArgument { name }) if name == "h"));
    }

    struct Scripted {
        submissions: Vec<FormOutcome>,
        presented: Vec<Form>,
        retries: usize,
    }

    impl FormProvider for Scripted {
        fn present(&mut self, form: &Form) -> Result<FormOutcome> {
            self.presented.push(form.clone());
            Ok(self.submissions.remove(0))
        }

        fn retry(&mut self, _error: &Error) -> Result<bool> {
            self.retries += 1;
            Ok(!self.submissions.is_empty())
        }
    }

    #[test]
    fn form_retries_with_prefilled_values() {
        let mut provider = Scripted {
            submissions: vec![
                FormOutcome::Submitted(map(&[
                    ("name", Value::from("Ada")),
                    ("count", Value::from("99")),
                ])),
                FormOutcome::Submitted(map(&[
                    ("name", Value::from("Ada")),
                    ("count", Value::from("3")),
                ])),
            ],
            presented: Vec::new(),
            retries: 0,
        };
        let ns = handler().collect_with_form(&mut provider).unwrap();
        assert_eq!(ns["count"], Value::Int(3));
        assert_eq!(provider.retries, 1);
        assert_eq!(provider.presented.len(), 2);
        let second = &provider.presented[1];
        assert_eq!(second.field("count").unwrap().current(), Some(&Value::from("99")));
        assert_eq!(second.title, "demo");
    }

    #[test]
    fn form_cancel_and_declined_retry() {
        let mut provider = Scripted {
            submissions: vec![FormOutcome::Cancelled],
            presented: Vec::new(),
            retries: 0,
        };
        assert!(matches!(
            handler().collect_with_form(&mut provider),
            Err(Error::Cancelled)
        ));

        let mut provider = Scripted {
            submissions: vec![FormOutcome::Submitted(IndexMap::new())],
            presented: Vec::new(),
            retries: 0,
        };
        assert!(matches!(
            handler().collect_with_form(&mut provider),
            Err(Error::MissingArgument { .. })
        ));
        assert_eq!(provider.retries, 1);
    }

    #[test]
    fn namespace_serializes_as_object() {
        let ns = handler()
            .collect_from_mapping(&map(&[("name", Value::from("Ada"))]))
            .unwrap();
        let json = serde_json::to_value(&ns).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Ada", "count": 1, "verbose": false, "note": null})
        );
    }

    #[test]
    fn run_mode_parses() {
        assert_eq!("command_line".parse::<RunMode>().unwrap(), RunMode::CommandLine);
        assert_eq!("Form".parse::<RunMode>().unwrap(), RunMode::Form);
        assert!("batch".parse::<RunMode>().is_err());
    }
}
