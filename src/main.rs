use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxpost::backend::GeminiClient;
use voxpost::capture::AudioInstructionCapture;
use voxpost::cli::{Cli, Commands, InstructionAction};
use voxpost::config::Config;
use voxpost::export;
use voxpost::instructions::{InstructionStore, JsonFileStore};
use voxpost::pipeline::Pipeline;
use voxpost::session::{self, SessionOptions};
use voxpost::source::{MediaFile, SourceInput};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let config = Config::load().await?;

    match cli.command {
        Commands::Run {
            source,
            no_interactive,
            export_dir,
        } => {
            let pipeline = build_pipeline(&config, open_instructions(&config)?)?;
            resolve_source(&pipeline, &source).await?;

            let options = SessionOptions {
                interactive: !no_interactive,
                quiet: cli.quiet,
                export_on_exit: export_dir.is_some(),
                export_dir: match export_dir {
                    Some(dir) => dir,
                    None => config.export_dir()?,
                },
            };

            let mut capture = AudioInstructionCapture::new(default_microphone());
            session::run(&pipeline, &mut capture, &options).await?;
        }
        Commands::Transcribe { source, output } => {
            let pipeline = build_pipeline(&config, InstructionStore::in_memory())?;
            resolve_source(&pipeline, &source).await?;

            let outcome =
                session::with_spinner(cli.quiet, "Transcribing audio...", pipeline.transcribe())
                    .await;
            let transcript = match outcome {
                Ok(transcript) => transcript,
                Err(e) => anyhow::bail!("{}", session::failure_message(&pipeline, &e)),
            };

            match output {
                Some(path) => {
                    fs_err::write(&path, &transcript).context("Failed to write transcript")?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => println!("{}", transcript),
            }
        }
        Commands::Instructions { action } => {
            let mut store = open_instructions(&config)?;
            manage_instructions(&mut store, action).await?;
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                config.interactive_setup().await?;
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose { "voxpost=debug" } else { "voxpost=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn open_instructions(config: &Config) -> Result<InstructionStore> {
    let path = config.store_path()?;
    tracing::debug!("Using instruction store at {}", path.display());
    Ok(InstructionStore::load(Arc::new(JsonFileStore::new(path))))
}

fn build_pipeline(config: &Config, instructions: InstructionStore) -> Result<Pipeline> {
    let backend = GeminiClient::from_config(&config.backend)
        .context("Failed to set up the generative backend")?;
    Ok(Pipeline::new(Arc::new(backend), instructions))
}

async fn resolve_source(pipeline: &Pipeline, input: &str) -> Result<()> {
    match SourceInput::parse(input)? {
        SourceInput::Url(url) => pipeline.set_url(&url),
        SourceInput::Path(path) => {
            let file = MediaFile::load(&path).await?;
            pipeline.select_file(file);
        }
    }
    println!("{}", pipeline.status());
    Ok(())
}

async fn manage_instructions(store: &mut InstructionStore, action: InstructionAction) -> Result<()> {
    match action {
        InstructionAction::List => {
            if store.is_empty() {
                println!("No permanent instructions.");
            }
            for (i, entry) in store.entries().iter().enumerate() {
                println!("{}. {}", i + 1, entry);
            }
        }
        InstructionAction::Add { text } => {
            if store.add(&text)? {
                println!("Added permanent instruction: {}", text);
            } else {
                println!("Instruction is empty or already present; nothing changed.");
            }
        }
        InstructionAction::Remove { number } => {
            let index = number
                .checked_sub(1)
                .context("Instruction numbers start at 1")?;
            let removed = store.remove(index)?;
            println!("Removed permanent instruction: {}", removed);
        }
        InstructionAction::Import { file } => {
            let text = fs_err::read_to_string(&file).context("Failed to read import file")?;
            let entries = InstructionStore::parse_import(&text);
            let count = entries.len();
            store.replace_all(entries)?;
            println!("{} instructions imported.", count);
        }
        InstructionAction::Export { output } => {
            if store.is_empty() {
                println!("No permanent instructions to export.");
                return Ok(());
            }

            let text = store.export_text();
            match output {
                Some(path) => {
                    export::save_text(&text, &path).await?;
                    println!("Instructions exported to: {}", path.display());
                }
                None => println!("{}", text),
            }
        }
    }

    Ok(())
}

#[cfg(feature = "microphone")]
fn default_microphone() -> voxpost::capture::CpalMicrophone {
    voxpost::capture::CpalMicrophone::new()
}

#[cfg(not(feature = "microphone"))]
fn default_microphone() -> voxpost::capture::UnavailableMicrophone {
    voxpost::capture::UnavailableMicrophone
}
