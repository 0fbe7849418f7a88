mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use reqparse_core::{
    DefaultProvider, ParsedEntry, ReqFileError, RequirementsFile, ResolveOptions, Resolver,
};

use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Requirements file parser.
#[derive(Parser)]
#[command(name = "reqparse", version, about = "Requirements file parser")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to reqparse.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every parsed entry of a manifest and the manifests it includes
    Parse {
        /// Path or URL of the requirements file
        manifest: String,
        /// Treat the manifest as a constraints file
        #[arg(long)]
        constraint: bool,
        /// Do not expand -r/-c directives
        #[arg(long)]
        no_nested: bool,
        /// Do not fail on inclusion cycles
        #[arg(long)]
        no_cycle_check: bool,
    },

    /// Report invalid lines; exits 1 if there are any
    Check {
        /// Path or URL of the requirements file
        manifest: String,
    },

    /// Reassemble the manifest from its parsed logical lines
    Dump {
        /// Path or URL of the requirements file
        manifest: String,
    },
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    let mut options = match config.resolve_options() {
        Ok(options) => options,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Parse {
            manifest,
            constraint,
            no_nested,
            no_cycle_check,
        } => {
            if no_nested {
                options.include_nested = false;
            }
            if no_cycle_check {
                options.detect_cycles = false;
            }
            cmd_parse(&manifest, constraint, options, cli.output, cli.quiet);
        }
        Commands::Check { manifest } => cmd_check(&manifest, options, cli.output, cli.quiet),
        Commands::Dump { manifest } => cmd_dump(&manifest, options, cli.output, cli.quiet),
    }
}

fn setup_logging(verbosity: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

fn cmd_parse(
    manifest: &str,
    constraint: bool,
    options: ResolveOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let provider = DefaultProvider::default();
    let resolver = Resolver::new(&provider).with_options(options);

    match output {
        OutputFormat::Text => {
            for entry in resolver.resolve(manifest, constraint) {
                match entry {
                    Ok(entry) => println!("{}", describe(&entry)),
                    Err(e) => fail(&e, output, quiet),
                }
            }
        }
        OutputFormat::Json => {
            let entries: Vec<ParsedEntry> =
                match resolver.resolve(manifest, constraint).collect() {
                    Ok(entries) => entries,
                    Err(e) => fail(&e, output, quiet),
                };
            let pretty = serde_json::to_string_pretty(&entries)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}

fn cmd_check(manifest: &str, options: ResolveOptions, output: OutputFormat, quiet: bool) {
    let file = load(manifest, options, output, quiet);
    match output {
        OutputFormat::Text => {
            for invalid in &file.invalid_lines {
                println!("{}", invalid.error_message);
            }
            if file.is_valid() && !quiet {
                println!(
                    "ok: {} requirements, {} options",
                    file.requirements.len(),
                    file.options.len()
                );
            }
        }
        OutputFormat::Json => {
            let errors: Vec<&str> = file
                .invalid_lines
                .iter()
                .map(|e| e.error_message.as_str())
                .collect();
            let result = serde_json::json!({
                "valid": file.is_valid(),
                "errors": errors,
            });
            let pretty = serde_json::to_string_pretty(&result)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
    if !file.is_valid() {
        process::exit(1);
    }
}

fn cmd_dump(manifest: &str, options: ResolveOptions, output: OutputFormat, quiet: bool) {
    let file = load(manifest, options, output, quiet);
    match output {
        OutputFormat::Text => print!("{}", file.dumps()),
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&file)
                .unwrap_or_else(|e| format!("serialization error: {}", e));
            println!("{}", pretty);
        }
    }
}

fn load(
    manifest: &str,
    options: ResolveOptions,
    output: OutputFormat,
    quiet: bool,
) -> RequirementsFile {
    match RequirementsFile::parse(manifest, &DefaultProvider::default(), options) {
        Ok(file) => file,
        Err(e) => fail(&e, output, quiet),
    }
}

/// One line per entry: `file:line kind detail`.
fn describe(entry: &ParsedEntry) -> String {
    let line = entry.requirement_line();
    let detail = match entry {
        ParsedEntry::Requirement(req) if req.is_constraint => {
            format!("{} (constraint)", line.raw_text)
        }
        ParsedEntry::Invalid(invalid) => invalid
            .error_message
            .lines()
            .collect::<Vec<_>>()
            .join(": "),
        _ => line.raw_text.clone(),
    };
    format!(
        "{}:{} {} {}",
        line.manifest_id,
        line.line_number,
        entry.kind(),
        detail
    )
}

fn fail(e: &ReqFileError, output: OutputFormat, quiet: bool) -> ! {
    match output {
        OutputFormat::Json => {
            let err_json = serde_json::to_string_pretty(&e.to_json_value())
                .unwrap_or_else(|_| format!("{{\"error\": \"{:?}\"}}", e));
            eprintln!("{}", err_json);
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {}", e);
            }
        }
    }
    process::exit(1);
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
