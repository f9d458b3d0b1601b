//! Provstamp command line
//!
//! ```text
//! provstamp stamp <file> [--repo DIR] [--search-ancestors] [--no-wipe|--wipe-all] [--format HINT]
//! provstamp extract <file> [--vocabulary N | --all] [--format HINT]
//! provstamp record [--repo DIR] [--search-ancestors]
//! ```
//!
//! Global flags: `--config FILE` (or `PROVSTAMP_CONFIG`), `--json`,
//! `--verbose`, `--log-json`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use provstamp_engine::{
    EngineConfig, ProvenanceRecord, StampRequest, StampingEngine, TagMap, Vocabulary, WipeMode,
};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file
pub const CONFIG_ENV: &str = "PROVSTAMP_CONFIG";

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Artifact to operate on")
}

fn repo_args() -> [Arg; 2] {
    [
        Arg::new("repo")
            .long("repo")
            .value_name("DIR")
            .value_parser(value_parser!(PathBuf))
            .help("Repository to describe (default: search from the working directory)"),
        Arg::new("search-ancestors")
            .long("search-ancestors")
            .action(ArgAction::SetTrue)
            .help("Allow --repo to point inside the repository rather than at its root"),
    ]
}

fn format_arg() -> Arg {
    Arg::new("format")
        .long("format")
        .value_name("HINT")
        .help("Treat the file as this format instead of sniffing its content")
}

/// Build the command definition
#[must_use]
pub fn command() -> Command {
    Command::new("provstamp")
        .version(provstamp_engine::VERSION)
        .about("Embed and recover source provenance in artifact metadata")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .help("Engine config (TOML); defaults to $PROVSTAMP_CONFIG"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Output as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Debug logging on stderr"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("stamp")
                .about("Write a fresh provenance record into an artifact")
                .arg(file_arg())
                .args(repo_args())
                .arg(
                    Arg::new("no-wipe")
                        .long("no-wipe")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("wipe-all")
                        .help("Do not clear recognised tags before writing"),
                )
                .arg(
                    Arg::new("wipe-all")
                        .long("wipe-all")
                        .action(ArgAction::SetTrue)
                        .help("Clear every text tag, including other tools' tags"),
                )
                .arg(format_arg()),
        )
        .subcommand(
            Command::new("extract")
                .about("Print the provenance tags stored in an artifact")
                .arg(file_arg())
                .arg(
                    Arg::new("vocabulary")
                        .long("vocabulary")
                        .value_name("N")
                        .value_parser(value_parser!(u32).range(1..=2))
                        .help("Vocabulary version to read (default: configured)"),
                )
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .conflicts_with("vocabulary")
                        .help("Print every text tag, not only provenance tags"),
                )
                .arg(format_arg()),
        )
        .subcommand(
            Command::new("record")
                .about("Print the record that would be written, without writing it")
                .args(repo_args()),
        )
}

/// Load `--config`, then `$PROVSTAMP_CONFIG`, else defaults
///
/// # Errors
/// Returns error if a named config cannot be loaded
pub fn load_config(matches: &ArgMatches) -> Result<EngineConfig> {
    let path = matches
        .get_one::<PathBuf>("config")
        .cloned()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

    match path {
        Some(path) => EngineConfig::load(&path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

fn write_record(out: &mut dyn Write, record: &ProvenanceRecord, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, record)?;
        writeln!(out)?;
    } else {
        for (tag, value) in record.iter() {
            writeln!(out, "{tag}: {value}")?;
        }
    }
    Ok(())
}

fn write_tags(out: &mut dyn Write, tags: &TagMap, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, tags)?;
        writeln!(out)?;
    } else {
        for (tag, value) in tags {
            writeln!(out, "{tag}: {value}")?;
        }
    }
    Ok(())
}

fn stamp_request(engine: &StampingEngine, args: &ArgMatches, file: &Path) -> StampRequest {
    let mut request = engine
        .request(file)
        .with_search_ancestors(args.get_flag("search-ancestors"));

    if let Some(repo) = args.get_one::<PathBuf>("repo") {
        request = request.with_repo(repo);
    }
    if args.get_flag("no-wipe") {
        request = request.with_wipe(WipeMode::None);
    } else if args.get_flag("wipe-all") {
        request = request.with_wipe(WipeMode::All);
    }
    if let Some(hint) = args.get_one::<String>("format") {
        request = request.with_format_hint(hint.clone());
    }
    request
}

/// Execute parsed arguments against `engine`, writing results to `out`
///
/// # Errors
/// Any engine failure, with the file as context
pub fn run_with(engine: &StampingEngine, matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let json = matches.get_flag("json");

    match matches.subcommand() {
        Some(("stamp", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing artifact path")?;
            let request = stamp_request(engine, args, file);
            let record = engine
                .stamp_with(&request)
                .with_context(|| format!("stamping {}", file.display()))?;
            write_record(out, &record, json)
        }
        Some(("extract", args)) => {
            let file = args
                .get_one::<PathBuf>("file")
                .context("missing artifact path")?;
            let hint = args.get_one::<String>("format").map(String::as_str);
            let tags = if args.get_flag("all") {
                engine.extract_all(file, hint)
            } else {
                let vocabulary = match args.get_one::<u32>("vocabulary") {
                    Some(version) => Vocabulary::from_version(*version)?,
                    None => engine.vocabulary(),
                };
                engine.extract_with(file, vocabulary, hint)
            }
            .with_context(|| format!("extracting {}", file.display()))?;
            write_tags(out, &tags, json)
        }
        Some(("record", args)) => {
            let repo = args.get_one::<PathBuf>("repo").map(PathBuf::as_path);
            let record = engine.assemble_record(repo, args.get_flag("search-ancestors"));
            write_record(out, &record, json)
        }
        Some((other, _)) => anyhow::bail!("unknown command `{other}`"),
        None => anyhow::bail!("no command given"),
    }
}

/// Execute parsed arguments with an engine built from the loaded config
///
/// # Errors
/// Config or engine failure
pub fn run(matches: &ArgMatches, out: &mut dyn Write) -> Result<()> {
    let config = load_config(matches)?;
    tracing::debug!(
        "Using vocabulary {} with {:?} tool backend",
        config.vocabulary,
        config.tool.backend
    );
    let engine = StampingEngine::from_config(config);
    run_with(&engine, matches, out)
}
