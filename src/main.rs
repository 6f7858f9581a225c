use chatgpt_md_export::exporter;
use chatgpt_md_export::naming::NamingMode;
use chatgpt_md_export::renderer::RenderStyle;
use chatgpt_md_export::utils::{Clock, ExportConfig};
use clap::Parser;
use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Convert a ChatGPT data export (conversations.json) to Markdown files.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to write markdown files into.
    /// Defaults to ./ChatGPT if not set in config.
    #[arg(value_name = "TARGET_DIR")]
    target_dir: Option<PathBuf>,

    /// Path to conversations.json from the ChatGPT export.
    /// Defaults to ./conversations.json if not set in config.
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Path to a specific configuration file.
    /// Defaults to $XDG_CONFIG_HOME/chatgpt-md-export/config.toml
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// How output files are named. Keep one mode per output directory.
    #[arg(long, value_enum)]
    naming: Option<NamingMode>,

    /// Document layout.
    #[arg(long, value_enum)]
    style: Option<RenderStyle>,

    /// Backslash-escape Markdown characters in message bodies.
    #[arg(long)]
    escape: bool,

    /// Show timestamps in UTC instead of local time.
    #[arg(long)]
    utc: bool,

    /// Pause between file writes, in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 10)]
    write_delay_ms: u64,

    /// Print each file written or skipped.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress standard output.
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize, Default)]
struct FileConfig {
    target_dir: Option<PathBuf>,
    input: Option<PathBuf>,
    naming: Option<NamingMode>,
    style: Option<RenderStyle>,
}

fn load_file_config(explicit_path: Option<&Path>) -> Result<FileConfig> {
    let path = if let Some(p) = explicit_path {
        if !p.exists() {
            return Err(eyre!("Config file not found: {}", p.display()));
        }
        Some(p.to_path_buf())
    } else {
        // Search: XDG/OS config dir, then nothing
        dirs::config_dir()
            .map(|d| d.join("chatgpt-md-export/config.toml"))
            .filter(|p| p.exists())
    };

    match path {
        None => Ok(FileConfig::default()),
        Some(p) => {
            let content = fs::read_to_string(&p)
                .wrap_err_with(|| format!("Failed to read config: {}", p.display()))?;
            toml::from_str(&content)
                .wrap_err_with(|| format!("Failed to parse config: {}", p.display()))
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    // 1. Load config file (CLI path > default path)
    let file_cfg = load_file_config(cli.config.as_deref())?;

    // 2. Resolve everything (CLI > Config > Default)
    let defaults = ExportConfig::default();
    let config = ExportConfig {
        input: cli.input.or(file_cfg.input).unwrap_or(defaults.input),
        target_dir: cli
            .target_dir
            .or(file_cfg.target_dir)
            .unwrap_or(defaults.target_dir),
        naming: cli.naming.or(file_cfg.naming).unwrap_or(defaults.naming),
        style: cli.style.or(file_cfg.style).unwrap_or(defaults.style),
        escape: cli.escape,
        clock: if cli.utc { Clock::Utc } else { Clock::Local },
        write_delay: Duration::from_millis(cli.write_delay_ms),
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if !config.input.exists() {
        return Err(eyre!(
            "{} not found.\nPlease use the conversations.json file from your ChatGPT data export, or pass --input.",
            config.input.display()
        ));
    }

    // 3. Run the Business Logic
    exporter::execute(&config)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    // Per-conversation failures are already in the summary; boundary failures
    // are reported here. Either way the exit status stays zero.
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
    }
}
