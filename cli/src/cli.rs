//! Command-line argument surface

use clap::Parser;
use std::path::PathBuf;

/// Local-first knowledge synthesis through deliberating model agents.
#[derive(Parser, Debug)]
#[command(name = "colloquy", version, about)]
pub struct Cli {
    /// The brief to work on; quotes optional, words are joined
    #[arg(required = true)]
    pub brief: Vec<String>,

    /// Execution mode: research, project, or learn
    #[arg(short, long, default_value = "research")]
    pub mode: String,

    /// Path to a config file (overrides discovered configs)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Ignore config files and use built-in defaults
    #[arg(long)]
    pub no_config: bool,

    /// Write the rendered artifact to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Session identifier; generated when absent
    #[arg(long)]
    pub session_id: Option<String>,

    /// Overall wall-clock budget in seconds
    #[arg(long)]
    pub budget_seconds: Option<u64>,

    /// Use one model for every agent (no swapping)
    #[arg(long)]
    pub single_model: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable the session log file
    #[arg(long)]
    pub no_log_file: bool,

    /// Plain console output without progress decoration
    #[arg(long)]
    pub plain: bool,
}

impl Cli {
    pub fn brief_text(&self) -> String {
        self.brief.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brief_words_joined() {
        let cli = Cli::parse_from(["colloquy", "explain", "blockchain", "consensus"]);
        assert_eq!(cli.brief_text(), "explain blockchain consensus");
        assert_eq!(cli.mode, "research");
    }

    #[test]
    fn test_mode_flag() {
        let cli = Cli::parse_from(["colloquy", "-m", "learn", "teach", "me", "rust"]);
        assert_eq!(cli.mode, "learn");
    }
}
