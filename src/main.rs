use clap::{Parser as ClapParser, Subcommand};
use papyrus::analysis::ScriptSummary;
use papyrus::config::Config;
use papyrus::driver::{self, FileReport};
use papyrus::error::CompilerError;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(author, version, about = "Papyrus script parser")]
struct Cli {
    /// Log parser activity to stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one script and print its syntax tree
    Parse {
        file: PathBuf,
        /// Print the full tree as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse every script under the given paths and report errors
    Check {
        /// Files or directories; defaults to the configured scripts directory
        paths: Vec<PathBuf>,
        /// Worker threads; defaults to the configured value
        #[arg(short, long)]
        jobs: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Print structural statistics for one script
    Stats { file: PathBuf },
    /// Manage papyrus configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Write a default config file if none exists
    Init,
    /// Print the config file location
    Path,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "papyrus=debug",
        _ => "papyrus=trace",
    };
    let filter = EnvFilter::try_from_env("PAPYRUS_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_diagnostics(report: &FileReport) {
    for diagnostic in &report.result.diagnostics {
        println!("{}:{}", report.path.display(), diagnostic);
    }
}

fn fail_on_diagnostics(files: usize, count: usize) -> Result<(), CompilerError> {
    if count > 0 {
        return Err(CompilerError::Diagnostics { files, count });
    }
    Ok(())
}

fn parse_command(file: &Path, as_json: bool) -> Result<(), CompilerError> {
    let report = driver::parse_file(file)?;
    let script = &report.result.script;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report.result)?);
    } else {
        println!(
            "{}: {} member(s), {} import(s)",
            script.name.name,
            script.members.len(),
            script.imports.len()
        );
        print_diagnostics(&report);
    }

    let count = report.result.diagnostics.len();
    fail_on_diagnostics(usize::from(count > 0), count)
}

fn check_command(
    paths: Vec<PathBuf>,
    jobs: Option<usize>,
    as_json: bool,
    config: &Config,
) -> Result<(), CompilerError> {
    let roots = if paths.is_empty() {
        vec![config.scripts_dir.clone()]
    } else {
        paths
    };

    let pattern = config.source_regex()?;
    let mut files = Vec::new();
    for root in &roots {
        files.extend(driver::discover(root, &pattern)?);
    }

    let jobs = jobs.unwrap_or_else(|| config.worker_count());
    tracing::debug!(files = files.len(), jobs, "checking scripts");
    let results = driver::parse_files(&files, jobs);

    let mut failed_files = 0;
    let mut count = 0;
    let mut entries = Vec::new();
    for (path, result) in &results {
        match result {
            Ok(report) => {
                if !report.is_success() {
                    failed_files += 1;
                    count += report.result.diagnostics.len();
                }
                if as_json {
                    entries.push(json!({
                        "path": path,
                        "diagnostics": report.result.diagnostics,
                    }));
                } else {
                    print_diagnostics(report);
                }
            }
            Err(error) => {
                failed_files += 1;
                count += 1;
                if as_json {
                    entries.push(json!({ "path": path, "error": error.to_string() }));
                } else {
                    eprintln!("{}: {}", path.display(), error);
                }
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if count == 0 {
        println!("checked {} file(s), no errors", results.len());
    }

    fail_on_diagnostics(failed_files, count)
}

fn stats_command(file: &Path) -> Result<(), CompilerError> {
    let report = driver::parse_file(file)?;
    print!("{}", ScriptSummary::of(&report.result.script));
    print_diagnostics(&report);
    Ok(())
}

fn config_command(command: ConfigCommands, config: &Config) -> Result<(), CompilerError> {
    match command {
        ConfigCommands::Show => {
            println!("Environment: {}", config.env_name);
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Init => {
            let config_path = Config::get_config_path();
            if config_path.exists() {
                println!("Config file already exists at: {}", config_path.display());
            } else {
                let config_path = Config::default().save()?;
                println!("Initialized new config file at: {}", config_path.display());
            }
        }
        ConfigCommands::Path => {
            println!("{}", Config::get_config_path().display());
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), CompilerError> {
    let config = Config::load();

    match cli.command {
        Commands::Parse { file, json } => parse_command(&file, json),
        Commands::Check { paths, jobs, json } => check_command(paths, jobs, json, &config),
        Commands::Stats { file } => stats_command(&file),
        Commands::Config { command } => config_command(command, &config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}
