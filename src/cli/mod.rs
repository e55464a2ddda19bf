//! CLI module - Command-line interface for DramaTracker
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// DramaTracker - sync your watch collection with Appwrite
#[derive(Parser)]
#[command(name = "dramatracker")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and sign in
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in, replacing any current session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out of the current session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Add a title to your collection
    #[command(alias = "a")]
    Add(AddArgs),

    /// Remove a title from your collection by source id
    #[command(alias = "rm", alias = "r")]
    Remove {
        /// Source id of the title (e.g. the Douban subject id)
        source_id: String,
    },

    /// Remove a collection entry by its document id
    RemoveEntry {
        collection_id: String,
    },

    /// Mark a collected title as watched or unwatched
    Watch {
        media_id: String,
        #[arg(long)]
        unwatched: bool,
    },

    /// List your collection
    #[command(alias = "ls", alias = "l")]
    List,

    /// Show a stored media record
    #[command(alias = "i")]
    Media {
        media_id: String,
    },

    /// Check whether a source id is already collected
    Collected {
        source_id: String,
    },

    /// Remove orphaned and duplicate documents
    Reconcile {
        /// Only report what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// Run as background daemon with scheduler
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

/// A search result given either as a JSON file or through flags.
#[derive(Args)]
pub struct AddArgs {
    /// JSON file holding a search result ("-" reads stdin)
    #[arg(long, short, conflicts_with_all = ["source_id", "title", "release_date"])]
    pub file: Option<PathBuf>,

    #[arg(long, default_value = "douban")]
    pub source_type: String,

    #[arg(long)]
    pub source_id: Option<String>,

    #[arg(long)]
    pub source_url: Option<String>,

    /// movie, tv or anime
    #[arg(long, default_value = "tv")]
    pub media_type: String,

    /// Chinese title
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub title_original: Option<String>,

    /// First-air date, e.g. 2023-09-29
    #[arg(long)]
    pub release_date: Option<String>,

    #[arg(long)]
    pub poster_url: Option<String>,

    #[arg(long)]
    pub rating_douban: Option<f64>,

    #[arg(long)]
    pub rating_imdb: Option<f64>,

    #[arg(long)]
    pub rating_bangumi: Option<f64>,

    /// Episode length, e.g. "45 min"
    #[arg(long)]
    pub duration: Option<String>,

    #[arg(long)]
    pub summary: Option<String>,

    /// Director and cast line
    #[arg(long)]
    pub staff: Option<String>,
}

pub use commands::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_watch_flags() {
        let cli = Cli::parse_from(["dramatracker", "watch", "m1", "--unwatched"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Watch { ref media_id, unwatched: true }) if media_id == "m1"
        ));
    }

    #[test]
    fn add_file_conflicts_with_flags() {
        let result = Cli::try_parse_from([
            "dramatracker",
            "add",
            "--file",
            "result.json",
            "--source-id",
            "1",
        ]);
        assert!(result.is_err());
    }
}
