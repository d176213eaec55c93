use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

use crate::pipeline::PipelineState;
use crate::source::SourceDescriptor;
use crate::utils;

const RULE: &str = "=========================================";
const SECTION_RULE: &str = "-----------------------------------------";
const FALLBACK_STEM: &str = "alternative-content";
const URL_STEM_LEN: usize = 30;

/// Default file name for exported permanent instructions
pub const INSTRUCTIONS_FILE_NAME: &str = "permanent-instructions.txt";

/// Plain-text record of one run: header, transcript and current draft
pub fn render_document(
    source_label: Option<&str>,
    transcript: &str,
    draft: &str,
    processed_at: DateTime<Local>,
) -> String {
    let content = format!(
        "{RULE}\nCONTENT RECORD\n{RULE}\n\n\
         Original Source: {}\n\
         Processed At: {}\n\n\
         {SECTION_RULE}\n1. BASE TRANSCRIPT\n{SECTION_RULE}\n\n\
         {}\n\n\
         {SECTION_RULE}\n2. ANOTHER WAY TO SAY IT (social media content)\n{SECTION_RULE}\n\n\
         {}",
        source_label.unwrap_or("Voice recording"),
        processed_at.format("%Y-%m-%d %H:%M:%S"),
        transcript,
        draft,
    );
    content.trim().to_string()
}

/// File stem derived from the source: file stem, else a slug of the link
pub fn export_file_stem(source: &SourceDescriptor) -> String {
    let stem = match source {
        SourceDescriptor::File(file) => utils::sanitize_filename(file.stem()),
        SourceDescriptor::Url(url) => utils::slugify_ascii(url, URL_STEM_LEN),
        SourceDescriptor::None => String::new(),
    };

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem
    }
}

/// Render the document for the current state, if there is anything to record
pub fn document_for(state: &PipelineState, processed_at: DateTime<Local>) -> Option<String> {
    if !state.has_source() && state.transcript.is_empty() {
        return None;
    }

    Some(render_document(
        state.source.label(),
        &state.transcript,
        &state.draft,
        processed_at,
    ))
}

/// Write the document into `dir`. Returns `None` when there is nothing to export.
pub async fn save_document(state: &PipelineState, dir: &Path) -> Result<Option<PathBuf>> {
    let Some(content) = document_for(state, Local::now()) else {
        return Ok(None);
    };

    fs_err::create_dir_all(dir).context("Failed to create export directory")?;
    let path = dir.join(format!("{}.txt", export_file_stem(&state.source)));

    fs_err::write(&path, content).context("Failed to write exported document")?;
    tracing::info!("Exported document to {}", path.display());

    Ok(Some(path))
}

/// Write exported instructions. Returns `false` when the text is empty.
pub async fn save_text(text: &str, path: &Path) -> Result<bool> {
    if text.is_empty() {
        return Ok(false);
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs_err::create_dir_all(parent)?;
        }
    }

    fs_err::write(path, text).context("Failed to write export file")?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MediaFile;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_render_document_sections() {
        let doc = render_document(Some("pitch.mp3"), "hello world", "Hello! 👋", at());

        assert!(doc.starts_with(RULE));
        assert!(doc.contains("Original Source: pitch.mp3"));
        assert!(doc.contains("Processed At: 2026-03-14 09:30:00"));
        let transcript_at = doc.find("hello world").unwrap();
        let draft_at = doc.find("Hello! 👋").unwrap();
        assert!(transcript_at < draft_at);
        assert!(doc.ends_with("Hello! 👋"));
    }

    #[test]
    fn test_render_document_without_source() {
        let doc = render_document(None, "t", "d", at());
        assert!(doc.contains("Original Source: Voice recording"));
    }

    #[test]
    fn test_export_file_stem() {
        let file = SourceDescriptor::File(MediaFile::new("my pitch.final.mp3", "audio/mpeg", vec![1]));
        assert_eq!(export_file_stem(&file), "my pitch.final");

        let url = SourceDescriptor::Url("https://www.youtube.com/watch?v=dQw4w9WgXcQ".into());
        let stem = export_file_stem(&url);
        assert_eq!(stem, "https___www_youtube_com_watch_");
        assert_eq!(stem.len(), 30);

        assert_eq!(export_file_stem(&SourceDescriptor::None), FALLBACK_STEM);
    }

    #[test]
    fn test_document_for_requires_source_or_transcript() {
        let state = PipelineState::default();
        assert_eq!(document_for(&state, at()), None);

        let mut state = PipelineState::default();
        state.select_source(SourceDescriptor::Url("https://x.com/v/1".into()));
        assert!(document_for(&state, at()).is_some());
    }

    #[tokio::test]
    async fn test_save_document_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = PipelineState::default();
        state.select_source(SourceDescriptor::File(MediaFile::new("pitch.mp3", "audio/mpeg", vec![1])));
        state.apply_transcript("hello world".into());
        state.apply_draft("Hi!".into());

        let path = save_document(&state, dir.path()).await.unwrap().unwrap();
        assert_eq!(path, dir.path().join("pitch.txt"));
        let content = fs_err::read_to_string(&path).unwrap();
        assert!(content.contains("hello world"));
        assert!(content.contains("Hi!"));
    }

    #[tokio::test]
    async fn test_save_text_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(INSTRUCTIONS_FILE_NAME);
        assert!(!save_text("", &path).await.unwrap());
        assert!(!path.exists());
        assert!(save_text("a\nb", &path).await.unwrap());
    }
}
