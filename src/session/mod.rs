//! Interactive terminal session driving one pipeline run.

use anyhow::Result;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::capture::{AudioInstructionCapture, Microphone, Toggle};
use crate::export;
use crate::pipeline::{Pipeline, PipelineError};

pub struct SessionOptions {
    /// Enter the improvement loop after the first draft
    pub interactive: bool,

    /// Hide spinners
    pub quiet: bool,

    /// Where `:export` writes by default
    pub export_dir: PathBuf,

    /// Export automatically when the session ends
    pub export_on_exit: bool,
}

/// One line of user input in the improvement loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Improve { text: String, persist: bool },
    Record,
    ApplyRecording,
    Retranscribe,
    Redraft,
    /// Replace the draft; `None` reads a multi-line block
    Edit(Option<String>),
    Show,
    Export(Option<PathBuf>),
    Rules,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();

        if line.is_empty() {
            return SessionCommand::Empty;
        }

        if let Some(text) = line.strip_prefix('!') {
            let text = text.trim();
            if text.is_empty() {
                return SessionCommand::Empty;
            }
            return SessionCommand::Improve {
                text: text.to_string(),
                persist: true,
            };
        }

        let Some(command) = line.strip_prefix(':') else {
            return SessionCommand::Improve {
                text: line.to_string(),
                persist: false,
            };
        };

        let mut words = command.splitn(2, char::is_whitespace);
        let name = words.next().unwrap_or_default();
        let arg = words.next().map(str::trim).filter(|a| !a.is_empty());

        match name {
            "record" | "r" => SessionCommand::Record,
            "apply" | "a" => SessionCommand::ApplyRecording,
            "transcribe" | "t" => SessionCommand::Retranscribe,
            "draft" => SessionCommand::Redraft,
            "edit" => SessionCommand::Edit(arg.map(str::to_string)),
            "show" | "s" => SessionCommand::Show,
            "export" | "e" => SessionCommand::Export(arg.map(PathBuf::from)),
            "rules" => SessionCommand::Rules,
            "help" | "h" | "?" => SessionCommand::Help,
            "quit" | "q" | "exit" => SessionCommand::Quit,
            other => SessionCommand::Unknown(other.to_string()),
        }
    }
}

const HELP: &str = "\
  <text>          improve the content with this instruction
  !<text>         improve and keep the instruction as a permanent rule
  :record         start/stop recording a spoken instruction
  :apply          improve using the recorded instruction only
  :transcribe     transcribe the source again
  :draft          regenerate the alternative content from the transcript
  :edit [text]    replace the content by hand (no text: paste lines, end with '.')
  :show           print transcript, content and pending inputs
  :export [dir]   write transcript and content to a text file
  :rules          list permanent instructions
  :quit           end the session";

/// Transcribe, draft, then loop over improvement commands until quit or EOF
pub async fn run<M: Microphone>(
    pipeline: &Pipeline,
    capture: &mut AudioInstructionCapture<M>,
    options: &SessionOptions,
) -> Result<()> {
    match with_spinner(options.quiet, "Transcribing audio...", pipeline.transcribe()).await {
        Ok(_) => {
            print_section("Transcript", &pipeline.transcript());
            match with_spinner(
                options.quiet,
                "Generating alternative content...",
                pipeline.generate_draft(),
            )
            .await
            {
                Ok(_) => print_section("Alternative content", &pipeline.draft()),
                Err(e) => stage_failed(pipeline, e, options)?,
            }
        }
        Err(e) => stage_failed(pipeline, e, options)?,
    }

    if options.interactive {
        improvement_loop(pipeline, capture, options).await?;
    }

    if capture.is_recording() {
        capture.stop()?;
    }

    if options.export_on_exit {
        export_document(pipeline, &options.export_dir).await?;
    }

    Ok(())
}

/// Interactive sessions report a failed stage and stay open for a retry;
/// batch runs stop with the status line.
fn stage_failed(
    pipeline: &Pipeline,
    error: PipelineError,
    options: &SessionOptions,
) -> Result<()> {
    if options.interactive {
        report(pipeline, Err(error));
        Ok(())
    } else {
        anyhow::bail!("{}", failure_message(pipeline, &error))
    }
}

/// Backend failures carry their context in the status line
pub fn failure_message(pipeline: &Pipeline, error: &PipelineError) -> String {
    match error {
        PipelineError::Backend(_) => pipeline.status(),
        other => other.to_string(),
    }
}

async fn improvement_loop<M: Microphone>(
    pipeline: &Pipeline,
    capture: &mut AudioInstructionCapture<M>,
    options: &SessionOptions,
) -> Result<()> {
    println!(
        "{}",
        style("Type an instruction to improve the content (:help for commands).").dim()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print_prompt(capture.is_recording());
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match SessionCommand::parse(&line) {
            SessionCommand::Empty => continue,
            SessionCommand::Quit => break,
            SessionCommand::Help => println!("{}", HELP),
            SessionCommand::Unknown(name) => {
                println!("{} unknown command :{}", style("?").yellow(), name)
            }
            SessionCommand::Improve { text, persist } => {
                pipeline.set_instruction(text);
                improve(pipeline, persist, options).await;
            }
            SessionCommand::ApplyRecording => {
                pipeline.set_instruction(String::new());
                improve(pipeline, false, options).await;
            }
            SessionCommand::Record => match capture.toggle() {
                Ok(Toggle::Started) => {
                    pipeline.set_status("Recording spoken instruction... run :record again to stop.");
                    print_status(pipeline);
                }
                Ok(Toggle::Stopped(blob)) => {
                    pipeline.attach_audio(blob);
                    print_status(pipeline);
                }
                Err(e) => {
                    tracing::warn!("Microphone unavailable: {}", e);
                    pipeline.set_status(format!(
                        "Could not access the microphone. Check permissions. ({})",
                        e
                    ));
                    print_status(pipeline);
                }
            },
            SessionCommand::Retranscribe => {
                let outcome =
                    with_spinner(options.quiet, "Transcribing audio...", pipeline.transcribe())
                        .await;
                let transcribed = outcome.is_ok();
                report(pipeline, outcome.map(|_| ()));
                if transcribed {
                    print_section("Transcript", &pipeline.transcript());
                }
            }
            SessionCommand::Edit(text) => {
                let text = match text {
                    Some(text) => text,
                    None => {
                        println!(
                            "{}",
                            style("Paste the new content. End with a line containing only '.'")
                                .dim()
                        );
                        let mut block = Vec::new();
                        while let Some(line) = lines.next_line().await? {
                            if line.trim() == "." {
                                break;
                            }
                            block.push(line);
                        }
                        block.join("\n")
                    }
                };
                let outcome = pipeline.set_draft(text);
                let edited = outcome.is_ok();
                report(pipeline, outcome);
                if edited {
                    print_section("Alternative content", &pipeline.draft());
                }
            }
            SessionCommand::Redraft => {
                let outcome = with_spinner(
                    options.quiet,
                    "Generating alternative content...",
                    pipeline.generate_draft(),
                )
                .await;
                report(pipeline, outcome.map(|_| ()));
                print_section("Alternative content", &pipeline.draft());
            }
            SessionCommand::Show => show(pipeline),
            SessionCommand::Export(dir) => {
                let dir = dir.unwrap_or_else(|| options.export_dir.clone());
                if let Err(e) = export_document(pipeline, &dir).await {
                    pipeline.set_status(format!("Export failed: {:#}", e));
                    print_status(pipeline);
                }
            }
            SessionCommand::Rules => print_rules(pipeline),
        }
    }

    Ok(())
}

async fn improve(pipeline: &Pipeline, persist: bool, options: &SessionOptions) {
    let outcome = with_spinner(
        options.quiet,
        "Applying improvements...",
        pipeline.improve(persist),
    )
    .await;

    let improved = outcome.is_ok();
    report(pipeline, outcome.map(|_| ()));
    if improved {
        print_section("Alternative content", &pipeline.draft());
    }
}

async fn export_document(pipeline: &Pipeline, dir: &std::path::Path) -> Result<()> {
    match export::save_document(&pipeline.snapshot(), dir).await? {
        Some(path) => pipeline.set_status(format!("Document written to {}", path.display())),
        None => pipeline.set_status("Nothing to export yet."),
    }
    print_status(pipeline);
    Ok(())
}

pub async fn with_spinner<T, F>(quiet: bool, message: &'static str, future: F) -> T
where
    F: Future<Output = T>,
{
    if quiet {
        return future.await;
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(spinner_style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        progress.set_style(spinner_style);
    }
    progress.set_message(message);
    progress.enable_steady_tick(Duration::from_millis(120));

    let output = future.await;
    progress.finish_and_clear();
    output
}

fn report(pipeline: &Pipeline, outcome: std::result::Result<(), PipelineError>) {
    match outcome {
        Ok(()) => print_status(pipeline),
        Err(PipelineError::Busy) => println!("{} {}", style("!").yellow(), PipelineError::Busy),
        Err(e) if e.is_precondition() => println!("{} {}", style("!").yellow(), e),
        Err(e) => println!("{} {}", style("✗").red(), failure_message(pipeline, &e)),
    }
}

fn print_prompt(recording: bool) {
    use std::io::Write;

    if recording {
        print!("{} ", style("● rec >").red().bold());
    } else {
        print!("{} ", style(">").cyan().bold());
    }
    let _ = std::io::stdout().flush();
}

fn print_status(pipeline: &Pipeline) {
    println!("{} {}", style("•").green(), pipeline.status());
}

fn print_section(title: &str, body: &str) {
    println!("\n{}", style(title).bold().underlined());
    println!("{}\n", body);
}

fn print_rules(pipeline: &Pipeline) {
    let rules = pipeline.instructions();
    if rules.is_empty() {
        println!("{}", style("No permanent instructions.").dim());
        return;
    }
    for (i, rule) in rules.entries().iter().enumerate() {
        println!("  {}. {}", i + 1, rule);
    }
}

fn show(pipeline: &Pipeline) {
    let state = pipeline.snapshot();
    println!("{} {}", style("Source:").bold(), state.source);
    print_section("Transcript", &state.transcript);
    print_section("Alternative content", &state.draft);
    if !state.instruction.is_empty() {
        println!("{} {}", style("Pending instruction:").bold(), state.instruction);
    }
    if let Some(audio) = &state.pending_audio {
        println!(
            "{} {} ({})",
            style("Pending recording:").bold(),
            audio.mime_type,
            crate::utils::format_file_size(audio.len() as u64)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_text_is_one_shot() {
        assert_eq!(
            SessionCommand::parse("  make it shorter "),
            SessionCommand::Improve {
                text: "make it shorter".into(),
                persist: false
            }
        );
    }

    #[test]
    fn test_parse_bang_persists() {
        assert_eq!(
            SessionCommand::parse("! always add #launch"),
            SessionCommand::Improve {
                text: "always add #launch".into(),
                persist: true
            }
        );
        assert_eq!(SessionCommand::parse("!"), SessionCommand::Empty);
    }

    #[test]
    fn test_parse_colon_commands() {
        assert_eq!(SessionCommand::parse(":record"), SessionCommand::Record);
        assert_eq!(SessionCommand::parse(":apply"), SessionCommand::ApplyRecording);
        assert_eq!(SessionCommand::parse(":transcribe"), SessionCommand::Retranscribe);
        assert_eq!(SessionCommand::parse(":q"), SessionCommand::Quit);
        assert_eq!(SessionCommand::parse(":export"), SessionCommand::Export(None));
        assert_eq!(
            SessionCommand::parse(":export  out/docs "),
            SessionCommand::Export(Some(PathBuf::from("out/docs")))
        );
        assert_eq!(
            SessionCommand::parse(":dance"),
            SessionCommand::Unknown("dance".into())
        );
        assert_eq!(SessionCommand::parse("   "), SessionCommand::Empty);
    }

    #[test]
    fn test_parse_edit() {
        assert_eq!(SessionCommand::parse(":edit"), SessionCommand::Edit(None));
        assert_eq!(
            SessionCommand::parse(":edit  Launch day is here! "),
            SessionCommand::Edit(Some("Launch day is here!".into()))
        );
    }
}
