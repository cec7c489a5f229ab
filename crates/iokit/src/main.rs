mod manifest;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use iokit::{Error, IOHandler, ResultNamespace, RunMode, TerminalForm, Value};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tracing_subscriber::{EnvFilter, fmt};

use crate::manifest::{DEFAULT_MANIFEST_NAME, Manifest};

#[derive(Parser)]
#[command(name = "iokit")]
#[command(version, about = "Collect typed arguments declared in an iokit.json manifest", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write an example iokit.json
    Init(InitArgs),

    /// Load a manifest and check its argument declarations
    Check(ManifestArgs),

    /// Print the help text the declared arguments produce
    Help(ManifestArgs),

    /// Collect values and print them as JSON
    Run(RunArgs),
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,
}

#[derive(Parser)]
struct ManifestArgs {
    /// Path to iokit.json manifest
    #[arg(short, long, default_value = DEFAULT_MANIFEST_NAME, value_name = "FILE")]
    manifest: PathBuf,
}

#[derive(Parser)]
struct RunArgs {
    #[command(flatten)]
    manifest: ManifestArgs,

    /// JSON object with values to use instead of the command line
    #[arg(long, value_name = "FILE")]
    values: Option<PathBuf>,

    /// Override the manifest's run mode (smart, programmatic, command-line, form)
    #[arg(long, value_name = "MODE")]
    mode: Option<RunMode>,

    /// Arguments for the declared command line, after `--`
    #[arg(last = true, value_name = "ARGS")]
    args: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Check(args) => check(args),
        Commands::Help(args) => help(args),
        Commands::Run(args) => run(args),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let manifest_path = manifest::write_default_manifest(&dir)?;

    eprintln!("Created: {}", manifest_path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {DEFAULT_MANIFEST_NAME} to declare your arguments");
    eprintln!("  2. Run: iokit check");
    eprintln!("  3. Run: iokit run -- --name World");

    Ok(())
}

fn load_handler(path: &Path) -> Result<IOHandler> {
    let manifest = Manifest::from_file(path)?;
    manifest
        .to_handler()
        .with_context(|| format!("invalid arguments in {}", path.display()))
}

fn check(args: ManifestArgs) -> Result<()> {
    tracing::debug!("executing check command");
    let handler = load_handler(&args.manifest)?;

    let width = handler
        .specs()
        .iter()
        .map(|s| s.name().len())
        .max()
        .unwrap_or(0);
    for spec in handler.specs() {
        let mut notes = vec![spec.semantic_type().to_string()];
        if spec.is_required() {
            notes.push("required".to_string());
        }
        if spec.is_nullable() {
            notes.push("nullable".to_string());
        }
        if let Some(short) = spec.short() {
            notes.push(format!("-{short}"));
        }
        println!("  {:width$}  {}", spec.name(), notes.join(", "), width = width);
    }
    for sub in handler.subcommands() {
        println!(
            "  {} (subcommand, {} argument(s))",
            sub.name(),
            sub.specs().len()
        );
    }
    eprintln!(
        "OK: {} argument(s) in {}",
        handler.specs().len(),
        args.manifest.display()
    );
    Ok(())
}

fn help(args: ManifestArgs) -> Result<()> {
    let handler = load_handler(&args.manifest)?;
    print!("{}", handler.help());
    Ok(())
}

fn run(args: RunArgs) -> Result<()> {
    tracing::debug!("executing run command");
    let handler = load_handler(&args.manifest.manifest)?;
    // Env-backed arguments should see values from a local .env file.
    dotenvy::dotenv().ok();

    let mode = args.mode.unwrap_or(handler.mode());
    let namespace = if let Some(path) = &args.values {
        let values = read_values(path)?;
        handler.collect_from_mapping(&values)?
    } else {
        match mode {
            RunMode::Programmatic => handler.collect_from_mapping(&IndexMap::new())?,
            RunMode::CommandLine => from_command_line(&handler, &args.args)?,
            RunMode::Smart if !args.args.is_empty() => from_command_line(&handler, &args.args)?,
            RunMode::Smart | RunMode::Form => {
                let stdin = io::stdin();
                let mut form = TerminalForm::new(stdin.lock(), io::stderr());
                handler.collect_with_form(&mut form)?
            }
        }
    };

    println!("{}", serde_json::to_string_pretty(&namespace)?);
    Ok(())
}

fn read_values(path: &Path) -> Result<IndexMap<String, Value>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read values: {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse values JSON: {}", path.display()))?;
    let serde_json::Value::Object(object) = json else {
        bail!("{} must contain a JSON object", path.display());
    };
    Ok(object
        .into_iter()
        .map(|(k, v)| (k, Value::from(v)))
        .collect())
}

fn from_command_line(handler: &IOHandler, argv: &[String]) -> Result<ResultNamespace> {
    let env: Vec<(String, String)> = std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect();
    match handler.collect_from_args(argv, &env) {
        Ok(namespace) => Ok(namespace),
        Err(Error::HelpRequested(text)) => {
            print!("{text}");
            std::process::exit(0);
        }
        Err(Error::Parse { message, usage }) => {
            eprintln!("error: {message}\n\n{usage}");
            std::process::exit(2);
        }
        Err(err) => Err(err.into()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
