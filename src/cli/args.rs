use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    name = "prionotes",
    version,
    about = "Prioritized notes, newest first"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the notes directory
    #[clap(long, value_parser)]
    pub notes_dir: Option<PathBuf>,

    /// Keep notes in memory only for this run
    #[clap(long)]
    pub volatile: bool,

    /// Refuse changes that cannot be written to disk
    #[clap(long)]
    pub strict: bool,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the prionotes application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use crate::Priority;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_requires_a_known_priority() {
        let cli = Cli::try_parse_from(["prionotes", "add", "Buy milk", "-p", "low"]).unwrap();
        match cli.command {
            Commands::Add { text, priority, edit } => {
                assert_eq!(text.as_deref(), Some("Buy milk"));
                assert_eq!(priority, Priority::Low);
                assert!(!edit);
            }
            _ => panic!("expected add"),
        }

        assert!(Cli::try_parse_from(["prionotes", "add", "Buy milk"]).is_err());
        assert!(Cli::try_parse_from(["prionotes", "add", "x", "-p", "purple"]).is_err());
    }

    #[test]
    fn global_flags_parse() {
        let cli = Cli::try_parse_from([
            "prionotes",
            "--volatile",
            "--strict",
            "--notes-dir",
            "/tmp/n",
            "list",
            "--json",
        ])
        .unwrap();
        assert!(cli.volatile && cli.strict);
        assert_eq!(cli.notes_dir, Some(PathBuf::from("/tmp/n")));
        assert!(matches!(cli.command, Commands::List { json: true, limit: None }));
    }
}
