//! Purpose: `glide-native` CLI entry point for inspecting and exercising native library loading.
//! Role: Binary crate root; parses args, runs one command, emits JSON on stdout.
//! Invariants: Command output is a single JSON document on stdout.
//! Invariants: Errors are emitted as JSON on stderr; exit code comes from `api::to_exit_code`.
//! Invariants: Logs go to stderr through `tracing-subscriber`, filtered by `RUST_LOG`.
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use glide_native::api::{
    DeletionMode, EmbeddedResources, Error, ErrorKind, LoaderConfig, NativeRuntime, identify,
    resource_path, to_exit_code,
};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

#[derive(Parser)]
#[command(
    name = "glide-native",
    version,
    about = "Resolve, extract, and load the embedded libglide_rs native library",
    long_about = None,
    after_help = r#"EXAMPLES
  $ glide-native platform
  $ glide-native resources
  $ glide-native --deletion deferred load
  $ RUST_LOG=debug glide-native load"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(long, global = true, help = "Override the detected OS name")]
    os: Option<String>,
    #[arg(long, global = true, help = "Override the detected CPU architecture")]
    arch: Option<String>,
    #[arg(
        long,
        global = true,
        help = "Root for the extraction directory (default: system temp dir)",
        value_hint = ValueHint::DirPath
    )]
    tmpdir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        help = "Read libraries from this directory instead of the embedded bundle",
        value_hint = ValueHint::DirPath
    )]
    resource_dir: Option<PathBuf>,
    #[arg(long, global = true, value_enum, help = "Extracted file deletion: auto|eager|deferred")]
    deletion: Option<DeletionArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DeletionArg {
    Auto,
    Eager,
    Deferred,
}

impl From<DeletionArg> for DeletionMode {
    fn from(arg: DeletionArg) -> Self {
        match arg {
            DeletionArg::Auto => DeletionMode::Auto,
            DeletionArg::Eager => DeletionMode::Eager,
            DeletionArg::Deferred => DeletionMode::Deferred,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Print the detected platform key and its library resource path.
    Platform,
    /// List the libraries available in the resource bundle.
    Resources,
    /// Extract and load this platform's library.
    Load,
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Run `glide-native --help` for usage."));
            }
        },
    };

    let config = config_from_cli(&cli);
    match cli.command {
        Command::Platform => platform(&config),
        Command::Resources => resources(&config),
        Command::Load => load(config),
    }
}

fn config_from_cli(cli: &Cli) -> LoaderConfig {
    let mut config = LoaderConfig::from_env();
    if let Some(os) = &cli.os {
        config.os = os.clone();
    }
    if let Some(arch) = &cli.arch {
        config.arch = arch.clone();
    }
    if let Some(tmpdir) = &cli.tmpdir {
        config = config.with_temp_root(tmpdir);
    }
    if let Some(dir) = &cli.resource_dir {
        config = config.with_resource_dir(dir);
    }
    if let Some(deletion) = cli.deletion {
        config = config.with_deletion(deletion.into());
    }
    config
}

fn platform(config: &LoaderConfig) -> Result<RunOutcome, Error> {
    let key = identify(&config.os, &config.arch)?;
    emit_json(json!({
        "os": config.os,
        "arch": config.arch,
        "platform": key.as_str(),
        "resource": resource_path(key).as_str(),
    }));
    Ok(RunOutcome::ok())
}

fn resources(config: &LoaderConfig) -> Result<RunOutcome, Error> {
    let runtime = NativeRuntime::new(config.clone());
    let wanted = identify(&config.os, &config.arch).ok().map(resource_path);

    let entries: Vec<Value> = match &config.resource_dir {
        Some(dir) => glide_native::api::LIBRARY_FILE_NAMES
            .iter()
            .filter_map(|name| {
                let meta = std::fs::metadata(dir.join(name)).ok()?;
                meta.is_file()
                    .then(|| json!({ "resource": format!("/{name}"), "bytes": meta.len() }))
            })
            .collect(),
        None => EmbeddedResources
            .entries()
            .map(|(path, len)| json!({ "resource": path, "bytes": len }))
            .collect(),
    };
    let present = wanted.as_ref().is_some_and(|resource| {
        entries
            .iter()
            .any(|entry| entry["resource"].as_str() == Some(resource.as_str()))
    });

    emit_json(json!({
        "source": runtime.resources().describe(),
        "resources": entries,
        "platform_resource": wanted.as_ref().map(|resource| resource.as_str()),
        "platform_resource_present": present,
    }));
    Ok(RunOutcome::ok())
}

fn load(config: LoaderConfig) -> Result<RunOutcome, Error> {
    let runtime = NativeRuntime::new(config);
    let outcome = runtime.ensure_loaded()?;
    emit_json(json!({
        "loaded": runtime.is_loaded(),
        "outcome": outcome.as_str(),
        "platform": runtime.platform()?.as_str(),
        "path": runtime.loaded_path().map(|path| path.display().to_string()),
        "temp_dir": runtime.temp_dir().map(|dir| dir.display().to_string()),
        "policy": runtime.deletion_policy().as_str(),
    }));
    Ok(RunOutcome::ok())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "resource not found".to_string(),
        ErrorKind::InvalidArgument => "invalid argument".to_string(),
        ErrorKind::Unsupported => "unsupported platform".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Load => "native library failed to load".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(err.kind().as_str()));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json};
    use clap::Parser;
    use glide_native::api::{Error, ErrorKind};

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["glide-native", "load", "--os", "linux", "--deletion", "deferred"])
            .expect("parse");
        assert!(matches!(cli.command, Command::Load));
        assert_eq!(cli.os.as_deref(), Some("linux"));
        assert!(cli.deletion.is_some());
    }

    #[test]
    fn error_json_includes_causes() {
        let io = std::io::Error::other("disk full");
        let err = Error::new(ErrorKind::Io)
            .with_message("failed to extract /libglide_rs-linux-x86_64.so")
            .with_path("/tmp/nativeutils1/libglide_rs-linux-x86_64.so")
            .with_source(io);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Io");
        assert_eq!(value["error"]["causes"][0], "disk full");
        assert_eq!(
            value["error"]["path"],
            "/tmp/nativeutils1/libglide_rs-linux-x86_64.so"
        );
    }
}
