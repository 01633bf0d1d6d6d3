//! wlm - Workload manifest CLI tool
//!
//! Validates manifests and prints them resolved for an environment.

use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use workload_manifest::exclusive;
use workload_manifest::loader::{self, Loader, LoaderBuilder};
use workload_manifest::manifest::{Manifest, KINDS};

#[derive(Debug, Parser)]
#[command(name = "wlm", version, about = "Workload manifest tool")]
struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List manifest kinds and their mutually exclusive fields
    ListTypes,
    /// Validate a manifest, optionally resolved for an environment
    Validate {
        file: PathBuf,
        #[arg(short, long)]
        env: Option<String>,
        #[command(flatten)]
        vars: VarArgs,
    },
    /// Print a manifest resolved for an environment
    Resolve {
        file: PathBuf,
        #[arg(short, long)]
        env: String,
        #[arg(short, long, value_enum, default_value_t = Format::Yaml)]
        format: Format,
        /// Print the result even if it fails validation
        #[arg(long)]
        no_validate: bool,
        #[command(flatten)]
        vars: VarArgs,
    },
    /// List the environments a manifest overrides
    Envs {
        file: PathBuf,
        #[command(flatten)]
        vars: VarArgs,
    },
}

#[derive(Debug, Args)]
struct VarArgs {
    /// Application name, available as ${APP_NAME}
    #[arg(long)]
    app: Option<String>,

    /// Interpolation variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    vars: Vec<(String, String)>,
}

impl VarArgs {
    /// Starts a loader with the process environment, then the flags, as variables.
    /// Environment entries that are not valid UTF-8 are skipped.
    fn builder(self) -> LoaderBuilder {
        let mut builder = Loader::builder().variables(utf8_vars(std::env::vars_os()));
        if let Some(app) = self.app {
            builder = builder.app(app);
        }
        builder.variables(self.vars)
    }
}

fn utf8_vars(
    vars: impl IntoIterator<Item = (OsString, OsString)>,
) -> impl Iterator<Item = (String, String)> {
    vars.into_iter()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("\"{}\" is not of the form KEY=VALUE", s))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Load(#[from] loader::Error),
    #[error("encoding YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("encoding JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    match command {
        Command::ListTypes => {
            writeln!(out, "Kinds:")?;
            for kind in KINDS {
                writeln!(out, "  {}", kind)?;
            }
            writeln!(out, "\nExclusive fields:")?;
            for (type_name, pairs) in exclusive::registry().describe() {
                for pair in pairs {
                    writeln!(out, "  {}: {}", type_name, pair)?;
                }
            }
        }
        Command::Validate { file, env, vars } => {
            let mut builder = vars.builder();
            if let Some(env) = &env {
                builder = builder.environment(env);
            }
            let manifest = builder.build().load_file(&file)?;
            match env {
                Some(env) => writeln!(out, "{} ({}) is valid for {}", manifest.name(), manifest.kind(), env)?,
                None => writeln!(out, "{} ({}) is valid", manifest.name(), manifest.kind())?,
            }
        }
        Command::Resolve {
            file,
            env,
            format,
            no_validate,
            vars,
        } => {
            let manifest = vars
                .builder()
                .environment(env)
                .skip_validation(no_validate)
                .build()
                .load_file(&file)?;
            write_manifest(&mut out, &manifest, format)?;
        }
        Command::Envs { file, vars } => {
            let manifest = vars.builder().skip_validation(true).build().load_file(&file)?;
            for name in manifest.environment_names() {
                writeln!(out, "{}", name)?;
            }
        }
    }
    Ok(())
}

fn write_manifest(out: &mut impl Write, manifest: &Manifest, format: Format) -> Result<(), CliError> {
    match format {
        Format::Yaml => write!(out, "{}", manifest.to_yaml()?)?,
        Format::Json => writeln!(out, "{}", serde_json::to_string_pretty(manifest)?)?,
    }
    Ok(())
}

fn report(err: &CliError) {
    match err {
        CliError::Load(loader::Error::Validation(errors)) => {
            eprintln!("error: manifest is invalid");
            for e in errors {
                eprintln!("  - {}", e);
                if let Some(hint) = e.hint() {
                    eprintln!("    hint: {}", hint);
                }
            }
        }
        CliError::Load(loader::Error::Merge(e)) => {
            eprintln!("error: {}", err);
            if let Some(hint) = e.hint() {
                eprintln!("  hint: {}", hint);
            }
        }
        _ => eprintln!("error: {}", err),
    }
}
