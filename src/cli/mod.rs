use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "voxpost",
    about = "voxpost - Turn spoken audio into social-media-ready posts",
    version,
    long_about = "Transcribe an audio file or video link, rewrite the transcript as social media content and refine it with typed or spoken instructions. Permanent instructions are remembered across runs."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Transcribe, rewrite and interactively improve content from a file or link
    Run {
        /// Local audio/video file or video link (YouTube, TikTok, Instagram, ...)
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Stop after transcription and rewrite instead of entering the improvement loop
        #[arg(long)]
        no_interactive: bool,

        /// Write the final document to this directory when the session ends
        #[arg(long, value_name = "DIR")]
        export_dir: Option<PathBuf>,
    },

    /// Print the transcript of a file or link
    Transcribe {
        #[arg(value_name = "FILE_OR_URL")]
        source: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Manage permanent instructions
    Instructions {
        #[command(subcommand)]
        action: InstructionAction,
    },

    /// Show or edit configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Subcommand)]
pub enum InstructionAction {
    /// List permanent instructions
    List,

    /// Add a permanent instruction
    Add {
        #[arg(value_name = "TEXT")]
        text: String,
    },

    /// Remove a permanent instruction by its listed number
    Remove {
        #[arg(value_name = "NUMBER")]
        number: usize,
    },

    /// Replace all permanent instructions with the lines of a text file
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Write permanent instructions to a text file, one per line
    Export {
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_instruction_remove() {
        let cli = Cli::try_parse_from(["voxpost", "instructions", "remove", "2"]).unwrap();
        match cli.command {
            Commands::Instructions {
                action: InstructionAction::Remove { number },
            } => assert_eq!(number, 2),
            _ => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["voxpost", "run", "pitch.mp3", "--quiet", "-v"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.verbose);
    }
}
