use anyhow::{Context, Result, bail};
use iokit::{
    AnyValidator, ArgumentSpec, DependencyMode, IOHandler, RunMode, SemanticType, Strictness,
    Validate, Value,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MANIFEST_NAME: &str = "iokit.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,

    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_mode: Option<RunMode>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentManifest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<SubcommandManifest>,
}

/// A verb with its own arguments, and possibly verbs of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcommandManifest {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<ArgumentManifest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subcommands: Vec<SubcommandManifest>,
}

/// One declared argument. Bounds only apply to the types that have them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgumentManifest {
    pub name: String,

    #[serde(rename = "type")]
    pub semantic_type: SemanticType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub positional: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strictness: Option<Strictness>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_len: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,

    /// Element type for lists, value type for mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<SemanticType>,

    /// Arguments that decide whether this one may or must have a value.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_mode: Option<DependencyMode>,
}

impl ArgumentManifest {
    fn new(name: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            default: None,
            required: None,
            nullable: false,
            aliases: Vec::new(),
            short: None,
            env: None,
            positional: false,
            help: None,
            strictness: None,
            choices: Vec::new(),
            min: None,
            max: None,
            min_len: None,
            max_len: None,
            item_type: None,
            depends_on: Vec::new(),
            dependency_mode: None,
        }
    }

    fn validator(&self) -> Result<AnyValidator> {
        let ty = self.semantic_type;
        let has_range = self.min.is_some() || self.max.is_some();
        let has_len = self.min_len.is_some() || self.max_len.is_some();

        let validator: AnyValidator = match ty {
            SemanticType::Integer => {
                let mut v = Validate::int();
                if let Some(min) = self.min {
                    v = v.min_value(integral(min, "min")?);
                }
                if let Some(max) = self.max {
                    v = v.max_value(integral(max, "max")?);
                }
                v.into()
            }
            SemanticType::Float => {
                let mut v = Validate::float();
                if let Some(min) = self.min {
                    v = v.min_value(min);
                }
                if let Some(max) = self.max {
                    v = v.max_value(max);
                }
                v.into()
            }
            SemanticType::String => {
                let mut v = Validate::str();
                if let Some(len) = self.min_len {
                    v = v.min_len(len);
                }
                if let Some(len) = self.max_len {
                    v = v.max_len(len);
                }
                v.into()
            }
            SemanticType::List => {
                let mut v = Validate::list();
                if let Some(item) = self.item_type {
                    v = v.of_type(item);
                }
                if let Some(len) = self.min_len {
                    v = v.min_len(len);
                }
                if let Some(len) = self.max_len {
                    v = v.max_len(len);
                }
                v.into()
            }
            SemanticType::Mapping => {
                let mut v = Validate::dict();
                if let Some(item) = self.item_type {
                    v = v.of_value_type(item);
                }
                v.into()
            }
            other => Validate::for_type(other),
        };

        let takes_range = matches!(ty, SemanticType::Integer | SemanticType::Float);
        let takes_len = matches!(ty, SemanticType::String | SemanticType::List);
        let takes_item = matches!(ty, SemanticType::List | SemanticType::Mapping);
        if has_range && !takes_range {
            bail!("'min'/'max' do not apply to {ty} arguments");
        }
        if has_len && !takes_len {
            bail!("'minLen'/'maxLen' do not apply to {ty} arguments");
        }
        if self.item_type.is_some() && !takes_item {
            bail!("'itemType' does not apply to {ty} arguments");
        }
        Ok(validator)
    }

    pub fn to_spec(&self) -> Result<ArgumentSpec> {
        let mut builder = ArgumentSpec::builder(&self.name, self.semantic_type)
            .validator(self.validator().with_context(|| format!("argument '{}'", self.name))?)
            .nullable(self.nullable)
            .aliases(self.aliases.iter().cloned())
            .positional(self.positional);
        if let Some(default) = &self.default {
            builder = builder.default(Value::from(default.clone()));
        }
        if let Some(required) = self.required {
            builder = builder.required(required);
        }
        if let Some(short) = self.short {
            builder = builder.short(short);
        }
        if let Some(env) = &self.env {
            builder = builder.env(env);
        }
        if let Some(help) = &self.help {
            builder = builder.help(help);
        }
        if let Some(strictness) = self.strictness {
            builder = builder.strictness(strictness);
        }
        if !self.choices.is_empty() {
            builder = builder.choices(self.choices.iter().cloned().map(Value::from));
        }
        if !self.depends_on.is_empty() {
            builder = builder.depends_on(
                self.depends_on.iter().cloned(),
                self.dependency_mode.unwrap_or_default(),
            );
        } else if self.dependency_mode.is_some() {
            bail!("'dependencyMode' needs 'dependsOn' on argument '{}'", self.name);
        }
        Ok(builder.build()?)
    }
}

fn integral(bound: f64, field: &str) -> Result<i64> {
    if bound.fract() != 0.0 || !bound.is_finite() {
        bail!("'{field}' must be a whole number for integer arguments, got {bound}");
    }
    Ok(bound as i64)
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest JSON: {}", path.display()))?;
        if manifest.name.trim().is_empty() {
            bail!("manifest {} has an empty name", path.display());
        }
        Ok(manifest)
    }

    pub fn to_handler(&self) -> Result<IOHandler> {
        let mut handler = IOHandler::new(&self.name)
            .description(&self.description)
            .run_mode(self.run_mode.unwrap_or_default());
        populate(&mut handler, &self.arguments, &self.subcommands)?;
        Ok(handler)
    }
}

fn populate(
    handler: &mut IOHandler,
    arguments: &[ArgumentManifest],
    subcommands: &[SubcommandManifest],
) -> Result<()> {
    for arg in arguments {
        handler.add_arg(arg.to_spec()?)?;
    }
    for sub in subcommands {
        let child = handler.add_subcommand(&sub.name)?;
        child.set_description(&sub.description);
        populate(child, &sub.arguments, &sub.subcommands)
            .with_context(|| format!("subcommand '{}'", sub.name))?;
    }
    Ok(())
}

pub fn write_default_manifest(project_dir: &Path) -> Result<PathBuf> {
    let dest = project_dir.join(DEFAULT_MANIFEST_NAME);
    if dest.exists() {
        bail!("{DEFAULT_MANIFEST_NAME} already exists in {}", project_dir.display());
    }

    let project_name = guess_project_name(project_dir).unwrap_or_else(|| "greet".to_string());

    let mut name = ArgumentManifest::new("name", SemanticType::String);
    name.help = Some("Who to greet".to_string());
    name.min_len = Some(1);

    let mut count = ArgumentManifest::new("count", SemanticType::Integer);
    count.help = Some("How many times to greet".to_string());
    count.default = Some(serde_json::json!(1));
    count.min = Some(1.0);
    count.max = Some(10.0);
    count.env = Some("GREET_COUNT".to_string());

    let mut format = ArgumentManifest::new("format", SemanticType::String);
    format.help = Some("Output style".to_string());
    format.choices = vec![serde_json::json!("plain"), serde_json::json!("fancy")];
    format.default = Some(serde_json::json!("plain"));

    let mut loud = ArgumentManifest::new("loud", SemanticType::Boolean);
    loud.help = Some("Shout the greeting".to_string());
    loud.default = Some(serde_json::json!(false));

    let manifest = Manifest {
        schema_version: Some(1),
        name: project_name,
        description: "Greets someone a few times.".to_string(),
        run_mode: None,
        arguments: vec![name, count, format, loud],
        subcommands: Vec::new(),
    };

    let mut out =
        serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    out.push('\n');
    fs::write(&dest, out).with_context(|| format!("failed to write {}", dest.display()))?;
    Ok(dest)
}

fn guess_project_name(project_dir: &Path) -> Option<String> {
    // For `.` or other non-meaningful paths, try the current directory name.
    let file_name = project_dir.file_name().and_then(|s| s.to_str());
    let direct = file_name.filter(|s| !s.is_empty() && *s != "." && *s != "..");
    if let Some(name) = direct {
        return Some(name.to_string());
    }

    let cwd = std::env::current_dir().ok()?;
    cwd.file_name()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| s.to_string())
}
