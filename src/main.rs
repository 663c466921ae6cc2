//! # Script Optimizer - Main Entry Point
//!
//! Command-line host for the script processor.
//!
//! ## Responsibilities:
//! - Parsing command line arguments with `clap`
//! - Initializing `tracing` (INFO, DEBUG with `--verbose`, or `RUST_LOG`)
//! - Loading the configuration file and locating the Closure Compiler
//! - Dispatching to single-file, batch, audit and tool report commands
//!
//! ## Examples:
//! ```bash
//! script-optimizer minify app.js -o app.min.js -O compilationLevel=simple -O failOnWarning=true
//! script-optimizer batch ./clientlibs --output ./dist --workers 8
//! script-optimizer audit ./content
//! script-optimizer tools
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use script_optimizer::audit::{audit, FsNode, Unversioned};
use script_optimizer::batch::BatchOptimizer;
use script_optimizer::closure::ClosureCompiler;
use script_optimizer::json_output::JsonMessage;
use script_optimizer::tool_resolver::ToolPathResolver;
use script_optimizer::{Config, FileScript, LibraryKind, ScriptProcessor};

#[derive(Parser)]
#[command(name = "script-optimizer")]
#[command(about = "Optimize client library scripts with the Closure Compiler")]
struct Args {
    /// Configuration file (default: ~/.script-optimizer/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Optimize a single file
    Minify {
        /// Script to optimize
        file: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Library kind (default: inferred from the extension)
        #[arg(long, value_enum)]
        kind: Option<LibraryKind>,

        /// Processor option as key=value (e.g. compilationLevel=simple, --debug=)
        #[arg(short = 'O', long = "option", value_parser = parse_option, allow_hyphen_values = true)]
        options: Vec<(String, String)>,

        /// Write the original source when optimization fails
        #[arg(long)]
        fallback_original: bool,
    },

    /// Optimize every script under a directory
    Batch {
        /// Directory containing scripts
        directory: PathBuf,

        /// Output directory (default: <name>.min.js next to each script)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of parallel engine sessions
        #[arg(short, long)]
        workers: Option<usize>,

        /// Processor option as key=value
        #[arg(short = 'O', long = "option", value_parser = parse_option, allow_hyphen_values = true)]
        options: Vec<(String, String)>,

        /// Write the original source when optimization fails
        #[arg(long)]
        fallback_original: bool,

        /// Emit JSON lines instead of a progress bar
        #[arg(long)]
        json: bool,
    },

    /// Log every binary file under a content tree
    Audit {
        /// Root of the content tree
        root: PathBuf,

        /// Emit the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show where the Closure Compiler was found
    Tools,
}

/// Parse `key=value`; a missing `=` means an empty value
fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw.split_once('=').unwrap_or((raw, ""));
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("option '{}' has no key", raw));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = args.config.clone().or_else(Config::default_path);
    let mut config = match config_path {
        Some(ref path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    match args.command {
        Command::Minify {
            file,
            output,
            kind,
            options,
            fallback_original,
        } => {
            config.fallback_to_original |= fallback_original;
            let ok = minify(&config, &file, output.as_deref(), kind, options).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Command::Batch {
            directory,
            output,
            workers,
            options,
            fallback_original,
            json,
        } => {
            if let Some(ref output_dir) = output {
                if !output_dir.exists() {
                    std::fs::create_dir_all(output_dir)?;
                    info!("Created output directory: {}", output_dir.display());
                }
                config.output_path = Some(output_dir.clone());
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.fallback_to_original |= fallback_original;
            config.json_output |= json;

            let engine = ClosureCompiler::locate(&ToolPathResolver::new(config.engine_path.clone()))?;
            let processor = ScriptProcessor::new(&config, engine);
            let json_output = config.json_output;
            let optimizer = BatchOptimizer::new(processor, config, options);
            match optimizer.run(&directory).await {
                Ok(stats) => {
                    if !json_output {
                        println!("{}", stats.format_summary());
                    }
                    if stats.files_failed > stats.files_fallback {
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    if json_output {
                        JsonMessage::error("Batch failed".to_string(), Some(e.to_string())).emit();
                    }
                    return Err(e);
                }
            }
        }
        Command::Audit { root, json } => {
            let audited_root = root.clone();
            let summary = tokio::task::spawn_blocking(move || audit(FsNode::new(audited_root), &Unversioned)).await?;
            if json {
                JsonMessage::Audit { root, summary }.emit();
            } else {
                println!(
                    "Visited {} node(s), {} binary propert(ies), {} unreadable node(s), {} unreadable propert(ies)",
                    summary.nodes_visited, summary.binary_properties, summary.failed_nodes, summary.failed_properties
                );
            }
        }
        Command::Tools => {
            println!("{}", ToolPathResolver::new(config.engine_path.clone()).get_tools_report());
        }
    }

    Ok(())
}

async fn minify(
    config: &Config,
    file: &Path,
    output: Option<&Path>,
    kind: Option<LibraryKind>,
    options: Vec<(String, String)>,
) -> Result<bool> {
    if !file.is_file() {
        return Err(anyhow::anyhow!("Script does not exist: {}", file.display()));
    }
    let kind = kind
        .or_else(|| LibraryKind::from_path(file))
        .ok_or_else(|| anyhow::anyhow!("Cannot infer library kind of {}, pass --kind", file.display()))?;

    let engine = ClosureCompiler::locate(&ToolPathResolver::new(config.engine_path.clone()))?;
    let processor = ScriptProcessor::new(config, engine);
    let script = FileScript::new(file);

    let mut buffer = Vec::new();
    let mut ok = processor.process(kind, &script, &mut buffer, options).await?;
    if !ok && config.fallback_to_original {
        error!("Keeping original source of {}", file.display());
        buffer = tokio::fs::read(file).await?;
        ok = true;
    }
    if !ok {
        return Ok(false);
    }

    match output {
        Some(path) => tokio::fs::write(path, &buffer).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&buffer).await?;
            stdout.flush().await?;
        }
    }
    Ok(true)
}
