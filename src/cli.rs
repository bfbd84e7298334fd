//! Command-line interface definition.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::duplicates::HashAlgorithm;

/// Background file indexing and duplicate detection.
#[derive(Debug, Parser)]
#[command(name = "filescope", version, about, long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output and non-error logs.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Metadata database path.
    #[arg(long, global = true, env = "FILESCOPE_DB")]
    pub db: Option<PathBuf>,

    /// Configuration file path.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build or refresh the file index.
    Index {
        /// Re-index everything, ignoring the cache.
        #[arg(long)]
        full: bool,
        /// Roots to index instead of the discovered drives.
        #[arg(long)]
        root: Vec<PathBuf>,
    },

    /// Search the index by file name.
    Search {
        /// Case-insensitive substring to match against file names.
        query: String,
        /// Restrict matches to paths containing this substring.
        #[arg(long, default_value = "")]
        folder: String,
    },

    /// Find likely duplicates by normalized file name (no content reads).
    Fast {
        /// Directory to scan.
        root: PathBuf,
        /// Also require matching file sizes.
        #[arg(long)]
        match_size: bool,
    },

    /// Find exact duplicates by content hash.
    Deep {
        /// Directory to scan.
        root: PathBuf,
        /// Digest algorithm.
        #[arg(long, value_enum, default_value_t)]
        algo: HashAlgorithm,
    },

    /// Delete the given files, reporting per-file success.
    Delete {
        /// Files to delete.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Show aggregate index statistics.
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_deep_with_algorithm() {
        let cli = Cli::parse_from(["filescope", "deep", "/data", "--algo", "sha256"]);
        match cli.command {
            Command::Deep { root, algo } => {
                assert_eq!(root, PathBuf::from("/data"));
                assert_eq!(algo, HashAlgorithm::Sha256);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn delete_requires_at_least_one_path() {
        assert!(Cli::try_parse_from(["filescope", "delete"]).is_err());
    }

    #[test]
    fn verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["filescope", "-v", "-q", "stats"]).is_err());
    }
}
