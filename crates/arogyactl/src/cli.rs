//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Arogya health assistant CLI
#[derive(Parser, Debug)]
#[command(name = "arogyactl")]
#[command(about = "Arogya - health awareness question answering", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $AROGYA_CONFIG and defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the external summary lookup
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer one question
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Output JSON with stage, source and score
        #[arg(long)]
        json: bool,
    },

    /// Interactive session (type "quit" to leave)
    Chat {
        /// Write the session transcript to this file on exit
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Load the data files and report what was found
    Check,

    /// Show the top intent candidates with per-signal scores
    Explain {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,

        /// Number of candidates
        #[arg(long, default_value_t = 5)]
        top: usize,
    },

    /// Print the effective configuration
    Config {
        /// Write the default configuration to this path instead
        #[arg(long)]
        init: Option<PathBuf>,
    },
}
