//! PBS Import - load PBS schedule data into SQLite

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pbs_common::logging::{init_logging, LogConfig, LogLevel};
use pbs_ingest::{api, text, ApiConfig, TextConfig};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "pbs-import")]
#[command(author, version, about = "PBS schedule to SQLite importer")]
struct Cli {
    /// Data source to import
    #[command(subcommand)]
    source: Source,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Source {
    /// Import the current schedule from the PBS data API
    Api {
        /// Seconds between the starts of consecutive requests
        #[arg(short, long, env = "PBS_API_REQUEST_DELAY_SECS")]
        delay: Option<u64>,

        /// Directory for the output database
        #[arg(short, long, env = "PBS_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,

        /// API base URL
        #[arg(long, env = "PBS_API_BASE_URL")]
        base_url: Option<String>,
    },

    /// Import a text extract archive
    Text {
        /// Zip archive of text extracts
        archive: PathBuf,

        /// SQL script creating the tables that have no usable header
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Directory for the output database
        #[arg(short, long, env = "PBS_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        error!("Import failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("pbs-import")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    init_logging(&log_config)?;

    match cli.source {
        Source::Api {
            delay,
            output_dir,
            base_url,
        } => {
            let mut config = ApiConfig::from_env();
            if let Some(delay) = delay {
                config = config.with_request_delay(delay);
            }
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }
            if let Some(url) = base_url {
                config = config.with_base_url(url);
            }

            info!(base_url = %config.base_url, "Importing from the PBS API");
            let result = api::run_api_import(config).await?;
            println!("{}", result.database.display());
        },
        Source::Text {
            archive,
            schema,
            output_dir,
        } => {
            let mut config = TextConfig::new(archive);
            if let Some(script) = schema {
                config = config.with_schema_script(script);
            }
            if let Some(dir) = output_dir {
                config = config.with_output_dir(dir);
            }

            info!(archive = %config.archive.display(), "Importing text extract");
            let result = text::run_text_import(config).await?;
            println!("{}", result.database.display());
        },
    }

    Ok(())
}
