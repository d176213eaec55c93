//! voxpost - turn spoken audio into social-media-ready posts
//!
//! This library resolves an audio source (local file or video link), transcribes it,
//! rewrites the transcript into a social-media draft and iteratively improves that
//! draft from typed or spoken instructions, using a generative language backend.

pub mod backend;
pub mod capture;
pub mod cli;
pub mod config;
pub mod export;
pub mod instructions;
pub mod pipeline;
pub mod session;
pub mod source;
pub mod utils;

pub use backend::{ContentPart, GenerativeBackend, ModelProfile};
pub use capture::{AudioBlob, AudioInstructionCapture, Microphone};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use instructions::InstructionStore;
pub use pipeline::{Pipeline, PipelineError};
pub use source::{MediaFile, SourceDescriptor};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;
