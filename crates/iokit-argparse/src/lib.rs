//! Argument metadata, command-line parsing and help rendering for iokit.
//!
//! Callers describe their arguments through [`claplike::ArgDefLike`] and
//! [`claplike::CommandMetaLike`]; this crate builds a `clap::Command` from
//! that description at runtime, hands tokenizing to clap and reports what
//! was found. Help output is rendered here as typed tables instead of
//! clap's own layout.

pub mod args {
    use indexmap::IndexMap;

    /// Where a raw value came from.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Source {
        CommandLine,
        Env,
    }

    /// One argument found on the command line or in the environment.
    ///
    /// `value` is `None` when a flag was given bare and has no implied value.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Match {
        pub value: Option<String>,
        pub source: Source,
    }

    /// Raw values keyed by argument name, in declaration order, plus the
    /// subcommand chosen on the command line, if any.
    #[derive(Debug, Clone, Default)]
    pub struct Matches {
        found: IndexMap<String, Match>,
        subcommand: Option<(String, Box<Matches>)>,
    }

    impl Matches {
        pub fn get(&self, name: &str) -> Option<&Match> {
            self.found.get(name)
        }

        pub fn value(&self, name: &str) -> Option<&str> {
            self.found.get(name).and_then(|m| m.value.as_deref())
        }

        pub fn is_present(&self, name: &str) -> bool {
            self.found.contains_key(name)
        }

        pub fn source(&self, name: &str) -> Option<Source> {
            self.found.get(name).map(|m| m.source)
        }

        pub fn len(&self) -> usize {
            self.found.len()
        }

        pub fn is_empty(&self) -> bool {
            self.found.is_empty()
        }

        pub fn iter(&self) -> impl Iterator<Item = (&str, &Match)> {
            self.found.iter().map(|(k, v)| (k.as_str(), v))
        }

        /// The chosen subcommand and the values found after it.
        pub fn subcommand(&self) -> Option<(&str, &Matches)> {
            self.subcommand
                .as_ref()
                .map(|(name, matches)| (name.as_str(), matches.as_ref()))
        }

        pub(crate) fn insert(&mut self, name: &str, value: Option<String>, source: Source) {
            self.found.insert(name.to_string(), Match { value, source });
        }

        pub(crate) fn set_subcommand(&mut self, name: &str, matches: Matches) {
            self.subcommand = Some((name.to_string(), Box::new(matches)));
        }
    }
}

pub mod claplike {
    use super::args::{Matches, Source};
    use clap::parser::ValueSource;
    use clap::{Arg, ArgAction, ArgMatches, Command};
    use std::collections::{HashMap, HashSet};

    const BUILTIN_HELP_NAME: &str = "__iokit_help";

    /// Describes one argument for parsing and for help output.
    ///
    /// Flag names are given without leading dashes. Display-only fields
    /// (type, default, choices, conditions) are already rendered as text;
    /// this crate never interprets them.
    pub trait ArgDefLike {
        fn name(&self) -> &str;
        fn short(&self) -> Option<char>;
        fn long(&self) -> Option<&str>;
        fn help(&self) -> &str;
        fn required(&self) -> bool;
        fn default_value(&self) -> Option<&str>;
        fn env(&self) -> Option<&str> {
            None
        }
        fn value_name(&self) -> Option<&str> {
            None
        }
        /// Extra long flags accepted for this argument.
        fn aliases(&self) -> &[String] {
            &[]
        }
        /// Extra short flags accepted for this argument.
        fn short_aliases(&self) -> &[char] {
            &[]
        }
        /// Positional arguments are matched by order and have no flags.
        fn positional(&self) -> bool {
            false
        }
        /// A bare switch means `true`.
        fn switch(&self) -> bool {
            false
        }
        /// A bare flag is accepted and reported without a value.
        fn nullable(&self) -> bool {
            false
        }
        fn value_type(&self) -> Option<&str> {
            None
        }
        fn possible_values(&self) -> &[String] {
            &[]
        }
        fn conditions(&self) -> &[String] {
            &[]
        }
    }

    pub trait CommandMetaLike {
        type ArgDef: ArgDefLike;

        /// The command's name; for a subcommand, the verb that selects it.
        fn name(&self) -> &str;
        fn description(&self) -> &str;
        fn args(&self) -> &[Self::ArgDef];
        /// Shown in usage lines, e.g. `app verb` for a subcommand.
        fn display_name(&self) -> &str {
            self.name()
        }
        /// Child commands selected by their verb.
        fn subcommands(&self) -> &[Self]
        where
            Self: Sized,
        {
            &[]
        }
    }

    #[derive(Debug, Clone, thiserror::Error)]
    pub enum ParseError {
        /// The command line does not match the declared arguments.
        #[error("{0}")]
        InvalidArgs(String),
        /// The declared arguments themselves are inconsistent.
        #[error("{0}")]
        Failed(String),
    }

    impl ParseError {
        pub fn message(&self) -> &str {
            match self {
                Self::InvalidArgs(msg) | Self::Failed(msg) => msg.as_str(),
            }
        }
    }

    impl From<String> for ParseError {
        fn from(msg: String) -> Self {
            Self::InvalidArgs(msg)
        }
    }

    pub type ParseResult<T> = Result<T, ParseError>;

    #[derive(Debug, Clone)]
    pub enum ParseOutcome {
        Matches(Matches),
        Help(String),
    }

    fn normalize_long(raw: &str) -> &str {
        raw.trim().trim_start_matches('-')
    }

    fn format_value_name(def: &dyn ArgDefLike) -> String {
        def.value_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| def.name().to_ascii_uppercase())
    }

    fn format_flags(def: &dyn ArgDefLike) -> String {
        if def.positional() {
            return format!("<{}>", format_value_name(def));
        }
        let mut names: Vec<String> = Vec::new();
        if let Some(s) = def.short() {
            names.push(format!("-{s}"));
        }
        names.extend(def.short_aliases().iter().map(|s| format!("-{s}")));
        if let Some(l) = def.long() {
            names.push(format!("--{}", normalize_long(l)));
        }
        names.extend(def.aliases().iter().map(|a| format!("--{}", normalize_long(a))));
        names.join(", ")
    }

    /// The flag a user would type for `def`, for usage lines and messages.
    fn arg_display_name(def: &dyn ArgDefLike) -> String {
        if def.positional() {
            return format!("<{}>", format_value_name(def));
        }
        def.long()
            .map(|l| format!("--{}", normalize_long(l)))
            .or_else(|| def.short().map(|s| format!("-{s}")))
            .unwrap_or_else(|| def.name().to_string())
    }

    /// Check that names and flags are unique and that no argument claims
    /// the built-in `-h/--help`.
    pub fn validate_flags<A: ArgDefLike>(defs: &[A]) -> ParseResult<()> {
        let mut owners: HashMap<String, &str> = HashMap::new();
        owners.insert("-h".to_string(), "help");
        owners.insert("--help".to_string(), "help");

        let mut names: HashSet<&str> = HashSet::new();
        for def in defs {
            let name = def.name();
            if name.trim().is_empty() {
                return Err(ParseError::Failed("argument name must not be empty".to_string()));
            }
            if !names.insert(name) {
                return Err(ParseError::Failed(format!("duplicate argument '{name}'")));
            }
            if def.positional() {
                continue;
            }

            let mut flags: Vec<String> = Vec::new();
            for short in def.short().into_iter().chain(def.short_aliases().iter().copied()) {
                if !short.is_ascii_alphanumeric() {
                    return Err(ParseError::Failed(format!(
                        "short flag '-{short}' of '{name}' must be an ASCII letter or digit"
                    )));
                }
                flags.push(format!("-{short}"));
            }
            for long in def.long().into_iter().chain(def.aliases().iter().map(String::as_str)) {
                let long = normalize_long(long);
                if long.is_empty() {
                    return Err(ParseError::Failed(format!("empty long flag on '{name}'")));
                }
                flags.push(format!("--{long}"));
            }

            for flag in flags {
                if let Some(prev) = owners.insert(flag.clone(), name) {
                    if prev != name {
                        return Err(ParseError::Failed(format!(
                            "flag conflict: '{flag}' is used by both '{prev}' and '{name}'"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Build the clap command that tokenizes argv for `meta`.
    ///
    /// Requiredness, choices and types are not enforced here; the caller
    /// validates typed values after environment fallback has been applied.
    pub fn command<M: CommandMetaLike>(meta: &M) -> ParseResult<Command> {
        Ok(build_command(meta)?.no_binary_name(true))
    }

    fn build_command<M: CommandMetaLike>(meta: &M) -> ParseResult<Command> {
        validate_flags(meta.args())?;

        let mut verbs: HashSet<&str> = HashSet::new();
        for sub in meta.subcommands() {
            if !verbs.insert(sub.name()) {
                return Err(ParseError::Failed(format!(
                    "duplicate subcommand '{}' in '{}'",
                    sub.name(),
                    meta.name()
                )));
            }
        }

        let mut cmd = Command::new(meta.name().to_string())
            .disable_help_flag(true)
            .disable_help_subcommand(true)
            .disable_version_flag(true)
            .args_override_self(true)
            .arg(
                Arg::new(BUILTIN_HELP_NAME)
                    .short('h')
                    .long("help")
                    .action(ArgAction::SetTrue),
            );

        let mut index = 1;
        for def in meta.args() {
            let mut arg = Arg::new(def.name().to_string())
                .action(ArgAction::Set)
                .value_name(format_value_name(def))
                .allow_negative_numbers(true);
            if def.positional() {
                arg = arg.index(index);
                index += 1;
            } else {
                if let Some(long) = def.long() {
                    arg = arg.long(normalize_long(long).to_string());
                }
                if let Some(short) = def.short() {
                    arg = arg.short(short);
                }
                for alias in def.aliases() {
                    arg = arg.alias(normalize_long(alias).to_string());
                }
                for short in def.short_aliases() {
                    arg = arg.short_alias(*short);
                }
                // Optional values must be attached with `=`, so a bare flag
                // never takes the next token.
                if def.switch() {
                    arg = arg
                        .num_args(0..=1)
                        .require_equals(true)
                        .default_missing_value("true");
                } else if def.nullable() {
                    arg = arg.num_args(0..=1).require_equals(true);
                }
            }
            cmd = cmd.arg(arg);
        }
        for sub in meta.subcommands() {
            cmd = cmd.subcommand(build_command(sub)?);
        }
        Ok(cmd)
    }

    fn clap_message(err: &clap::Error) -> String {
        let rendered = err.render().to_string();
        let first = rendered.lines().next().unwrap_or_default().trim();
        first.strip_prefix("error: ").unwrap_or(first).to_string()
    }

    fn env_lookup<'e>(env: &'e [(String, String)], key: &str) -> Option<&'e str> {
        env.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn parse<M: CommandMetaLike>(meta: &M, argv: &[String]) -> ParseResult<ParseOutcome> {
        parse_with_env(meta, argv, &[])
    }

    /// Parse `argv`, falling back to `env` for arguments not given on the
    /// command line. Defaults are left to the caller.
    pub fn parse_with_env<M: CommandMetaLike>(
        meta: &M,
        argv: &[String],
        env: &[(String, String)],
    ) -> ParseResult<ParseOutcome> {
        let cmd = command(meta)?;
        let found = cmd
            .try_get_matches_from(argv.iter())
            .map_err(|err| ParseError::InvalidArgs(clap_message(&err)))?;
        Ok(read_matches(meta, &found, env))
    }

    /// Collect what clap found for `meta`, descending into the chosen
    /// subcommand. A help flag at any level wins.
    fn read_matches<M: CommandMetaLike>(
        meta: &M,
        found: &ArgMatches,
        env: &[(String, String)],
    ) -> ParseOutcome {
        if found.get_flag(BUILTIN_HELP_NAME) {
            return ParseOutcome::Help(help(meta));
        }

        let mut matches = Matches::default();
        for def in meta.args() {
            let name = def.name();
            if found.value_source(name) == Some(ValueSource::CommandLine) {
                let value = found.get_one::<String>(name).cloned();
                tracing::debug!(argument = name, "found on the command line");
                matches.insert(name, value, Source::CommandLine);
                continue;
            }
            if let Some(value) = def.env().and_then(|key| env_lookup(env, key)) {
                tracing::debug!(argument = name, "found in the environment");
                matches.insert(name, Some(value.to_string()), Source::Env);
            }
        }

        if let Some((verb, sub_found)) = found.subcommand() {
            if let Some(sub) = meta.subcommands().iter().find(|s| s.name() == verb) {
                tracing::debug!(subcommand = verb, "subcommand selected");
                match read_matches(sub, sub_found, env) {
                    ParseOutcome::Matches(sub_matches) => matches.set_subcommand(verb, sub_matches),
                    help @ ParseOutcome::Help(_) => return help,
                }
            }
        }
        ParseOutcome::Matches(matches)
    }

    /// One-line usage summary.
    pub fn usage<M: CommandMetaLike>(meta: &M) -> String {
        let mut parts = vec![meta.display_name().to_string()];
        let mut has_optional = false;
        for def in meta.args().iter().filter(|d| !d.positional()) {
            if def.required() {
                parts.push(format!("{} <{}>", arg_display_name(def), format_value_name(def)));
            } else {
                has_optional = true;
            }
        }
        if has_optional {
            parts.insert(1, "[OPTIONS]".to_string());
        }
        for def in meta.args().iter().filter(|d| d.positional()) {
            let n = format_value_name(def);
            if def.required() {
                parts.push(format!("<{n}>"));
            } else {
                parts.push(format!("[{n}]"));
            }
        }
        if !meta.subcommands().is_empty() {
            parts.push("[COMMAND]".to_string());
        }
        format!("Usage: {}", parts.join(" "))
    }

    const COLUMNS: [&str; 8] = [
        "NAME",
        "FLAGS",
        "TYPE",
        "DEFAULT",
        "NULLABLE",
        "CHOICES",
        "CONDITIONS",
        "DESCRIPTION",
    ];

    fn format_row(def: &dyn ArgDefLike) -> [String; 8] {
        [
            def.name().to_string(),
            format_flags(def),
            def.value_type().unwrap_or_default().to_string(),
            def.default_value().unwrap_or_default().to_string(),
            if def.nullable() { "yes".to_string() } else { String::new() },
            def.possible_values().join(", "),
            def.conditions().join(", "),
            def.help().trim().to_string(),
        ]
    }

    fn push_line(out: &mut String, cells: &[&str], widths: &[usize]) {
        let mut line = String::from("  ");
        for (i, (cell, &width)) in cells.iter().zip(widths).enumerate() {
            if i + 1 == cells.len() {
                line.push_str(cell);
            } else {
                line.push_str(&format!("{cell:<width$}  "));
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    /// Render one table; columns empty in every row are left out.
    fn push_table(out: &mut String, title: &str, defs: &[&dyn ArgDefLike]) {
        if defs.is_empty() {
            return;
        }
        let rows: Vec<[String; 8]> = defs.iter().map(|d| format_row(*d)).collect();
        let keep: Vec<usize> = (0..COLUMNS.len())
            .filter(|&i| rows.iter().any(|r| !r[i].is_empty()))
            .collect();
        let widths: Vec<usize> = keep
            .iter()
            .map(|&i| {
                rows.iter()
                    .map(|r| r[i].chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(COLUMNS[i].len())
            })
            .collect();

        out.push_str(&format!("\n{title}:\n"));
        let header: Vec<&str> = keep.iter().map(|&i| COLUMNS[i]).collect();
        push_line(out, &header, &widths);
        for row in &rows {
            let cells: Vec<&str> = keep.iter().map(|&i| row[i].as_str()).collect();
            push_line(out, &cells, &widths);
        }
    }

    /// Render the help text: usage, description, then required and
    /// optional arguments as aligned tables.
    pub fn help<M: CommandMetaLike>(meta: &M) -> String {
        let mut out = usage(meta);
        out.push('\n');

        if !meta.description().trim().is_empty() {
            out.push('\n');
            out.push_str(meta.description().trim_end());
            out.push('\n');
        }

        let mut required: Vec<&dyn ArgDefLike> = Vec::new();
        let mut optional: Vec<&dyn ArgDefLike> = Vec::new();
        for def in meta.args() {
            let as_dyn: &dyn ArgDefLike = def;
            if def.required() {
                required.push(as_dyn);
            } else {
                optional.push(as_dyn);
            }
        }
        push_table(&mut out, "Required Arguments", &required);
        push_table(&mut out, "Optional Arguments", &optional);

        let subcommands = meta.subcommands();
        if !subcommands.is_empty() {
            let width = subcommands
                .iter()
                .map(|s| s.name().chars().count())
                .max()
                .unwrap_or(0);
            out.push_str("\nCommands:\n");
            for sub in subcommands {
                let line = format!("  {:<width$}  {}", sub.name(), sub.description().trim());
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }

        out.push_str("\n  -h, --help  Show this help and exit\n");
        out
    }
}
