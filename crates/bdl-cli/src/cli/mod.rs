//! CLI for the BDL bucket downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_download_job, run_job_id, run_status};

/// Top-level CLI for the BDL bucket downloader.
#[derive(Debug, Parser)]
#[command(name = "bdl")]
#[command(about = "BDL: resumable, concurrent bulk download of bucket objects", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download every listed object of a bucket into a local directory.
    Download {
        /// Job config file (TOML).
        config: PathBuf,
        /// Concurrent transfers (1..=2000). Defaults to `default_threads` from config.toml.
        #[arg(long, value_name = "N")]
        threads: Option<usize>,
    },

    /// Print the job id and working directory for a destination/bucket pair.
    JobId {
        /// Local destination directory.
        dest: PathBuf,
        /// Bucket name.
        bucket: String,
    },

    /// Show how many objects the job's resume store tracks.
    Status {
        /// Job config file (TOML).
        config: PathBuf,
    },
}

impl CliCommand {
    /// Returns `Ok(false)` when the command completed but some objects failed.
    pub async fn run_from_args() -> Result<bool> {
        let cli = Cli::parse();
        match cli.command {
            CliCommand::Download { config, threads } => run_download_job(&config, threads).await,
            CliCommand::JobId { dest, bucket } => {
                run_job_id(&dest, &bucket)?;
                Ok(true)
            }
            CliCommand::Status { config } => {
                run_status(&config).await?;
                Ok(true)
            }
        }
    }
}
