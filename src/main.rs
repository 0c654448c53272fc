use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use i18next_harvest::commands::{extract, init};
use i18next_harvest::config::Config;
use i18next_harvest::logging;
use i18next_harvest::watcher::FileWatcher;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "i18next-harvest")]
#[command(author, version, about = "Extract react-i18next messages into JSON catalogs", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info or debug (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract messages from source files and merge them into the catalogs
    Extract {
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<String>,

        /// Report what would change without writing any file
        #[arg(long)]
        dry_run: bool,

        /// Fail on warnings
        #[arg(long)]
        fail_on_warnings: bool,
    },

    /// Watch for file changes and extract messages automatically
    Watch {
        /// Output directory (overrides config)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Create a starter configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,

        /// Input glob patterns, comma-separated
        #[arg(long, default_value = "src/**/*.{js,jsx,ts,tsx}")]
        input: String,

        /// Output directory
        #[arg(long, default_value = "locales")]
        output: String,

        /// Locales, comma-separated
        #[arg(long, default_value = "en")]
        locales: String,

        /// Default namespace
        #[arg(long, default_value = "translation")]
        namespace: String,

        /// Translate function names, comma-separated
        #[arg(long, default_value = "t")]
        functions: String,
    },
}

fn main() {
    if let Err(e) = run() {
        logging::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let base_dir = std::env::current_dir().context("Failed to read the working directory")?;

    match cli.command {
        Commands::Extract {
            output,
            dry_run,
            fail_on_warnings,
        } => {
            let config = load_config(cli.config.as_ref(), cli.log_level.as_deref())?;
            extract::run(&config, &base_dir, output, dry_run, fail_on_warnings)?;
            logging::info("\nDone!");
        }
        Commands::Watch { output } => {
            let config = load_config(cli.config.as_ref(), cli.log_level.as_deref())?;
            logging::info("=== i18next-harvest watch ===\n");
            let base_dir = base_dir.canonicalize().unwrap_or(base_dir);
            let watcher = FileWatcher::new(config, base_dir, output)?;
            watcher.run()?;
        }
        Commands::Init {
            force,
            input,
            output,
            locales,
            namespace,
            functions,
        } => {
            logging::configure(cli.log_level.as_deref(), None);
            let options = init::InitOptions {
                force,
                input,
                output,
                locales,
                namespace,
                functions,
            };
            init::run(&base_dir, &options)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>, log_level: Option<&str>) -> Result<Config> {
    let config = Config::load_or_default(path)?;
    logging::configure(log_level, config.log_level.as_deref());
    Ok(config)
}
