use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::logging::LogDestination;

#[derive(Parser, Debug)]
#[command(
    name = "neurolearn",
    version,
    about = "Upload study material, learn from it, and test yourself from the terminal"
)]
pub struct Cli {
    /// Backend base URL; overrides the config file.
    #[arg(long, global = true, env = "NEUROLEARN_API_BASE_URL")]
    pub base_url: Option<String>,

    /// RON config file. Defaults to ./neurolearn.ron when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Where log output goes.
    #[arg(long, global = true, value_enum)]
    pub log_to: Option<LogDestination>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Check that the backend is reachable.
    Ping,
    /// Upload PDF documents and wait until their processing settles.
    Upload {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Show the processing status of an uploaded document.
    Status { filename: String },
    /// List documents known to the backend.
    Files {
        /// Bypass the cached list.
        #[arg(long)]
        refresh: bool,
    },
    /// Print the generated study summary.
    Summary {
        /// Bypass the cached summary.
        #[arg(long)]
        refresh: bool,
        /// Also request a spoken version.
        #[arg(long)]
        speak: bool,
    },
    /// Print reference links for the current material.
    Links,
    /// Ask one question about the material.
    Ask {
        question: String,
        /// Document to ask about; defaults to the most recent one.
        #[arg(long)]
        file: Option<String>,
    },
    /// Ask a question from a recorded audio clip.
    Voice {
        clip: PathBuf,
        #[arg(long)]
        file: Option<String>,
    },
    /// Synthesize speech for a piece of text.
    Tts {
        text: String,
        /// Use the learning voice instead of the Q&A voice.
        #[arg(long)]
        learning: bool,
    },
    /// Interactive chat about the material.
    Chat,
    /// Interactive self-assessment.
    Assess,
}
