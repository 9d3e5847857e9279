//! Argument parsing for download, job-id and status.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;
use std::path::PathBuf;

#[test]
fn cli_parse_download() {
    match parse(&["bdl", "download", "job.toml"]) {
        CliCommand::Download { config, threads } => {
            assert_eq!(config, PathBuf::from("job.toml"));
            assert!(threads.is_none());
        }
        _ => panic!("expected Download"),
    }
}

#[test]
fn cli_parse_download_threads() {
    match parse(&["bdl", "download", "/etc/bdl/photos.toml", "--threads", "16"]) {
        CliCommand::Download { config, threads } => {
            assert_eq!(config, PathBuf::from("/etc/bdl/photos.toml"));
            assert_eq!(threads, Some(16));
        }
        _ => panic!("expected Download with --threads"),
    }
}

#[test]
fn cli_parse_download_rejects_bad_threads() {
    assert!(Cli::try_parse_from(["bdl", "download", "job.toml", "--threads", "many"]).is_err());
}

#[test]
fn cli_parse_job_id() {
    match parse(&["bdl", "job-id", "/data/backup", "photos"]) {
        CliCommand::JobId { dest, bucket } => {
            assert_eq!(dest, PathBuf::from("/data/backup"));
            assert_eq!(bucket, "photos");
        }
        _ => panic!("expected JobId"),
    }
}

#[test]
fn cli_parse_status() {
    match parse(&["bdl", "status", "job.toml"]) {
        CliCommand::Status { config } => assert_eq!(config, PathBuf::from("job.toml")),
        _ => panic!("expected Status"),
    }
}

#[test]
fn cli_requires_subcommand() {
    assert!(Cli::try_parse_from(["bdl"]).is_err());
}
