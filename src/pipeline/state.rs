use uuid::Uuid;

use crate::capture::AudioBlob;
use crate::source::SourceDescriptor;

pub const INITIAL_STATUS: &str =
    "Select an audio file or paste a video link to begin.";

/// Everything one pipeline run owns
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub source: SourceDescriptor,

    /// Set only by transcription
    pub transcript: String,

    /// Set by the rewrite, overwritten by each improvement
    pub draft: String,

    /// True while a backend call is outstanding
    pub busy: bool,

    /// Latest progress or error description
    pub status: String,

    /// One-shot typed instruction for the next improvement
    pub instruction: String,

    /// Recorded instruction waiting to be used
    pub pending_audio: Option<AudioBlob>,

    /// Bumped on every change to source, transcript or draft
    pub revision: u64,

    /// Identifies the current source selection in logs
    pub run_id: Uuid,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            source: SourceDescriptor::None,
            transcript: String::new(),
            draft: String::new(),
            busy: false,
            status: INITIAL_STATUS.to_string(),
            instruction: String::new(),
            pending_audio: None,
            revision: 0,
            run_id: Uuid::new_v4(),
        }
    }
}

impl PipelineState {
    /// Replace the source and invalidate everything derived from it
    pub fn select_source(&mut self, source: SourceDescriptor) {
        self.source = source;
        self.transcript.clear();
        self.draft.clear();
        self.revision += 1;
        self.run_id = Uuid::new_v4();
    }

    pub fn apply_transcript(&mut self, transcript: String) {
        self.transcript = transcript;
        self.draft.clear();
        self.revision += 1;
    }

    pub fn apply_draft(&mut self, draft: String) {
        self.draft = draft;
        self.revision += 1;
    }

    pub fn has_source(&self) -> bool {
        !self.source.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MediaFile;

    #[test]
    fn select_source_resets_derived_state() {
        let mut state = PipelineState::default();
        state.apply_transcript("hello".into());
        state.apply_draft("Hi!".into());
        state.instruction = "shorter".into();
        let before = state.revision;
        let run = state.run_id;

        state.select_source(SourceDescriptor::Url("https://x.com/v".into()));

        assert!(state.transcript.is_empty());
        assert!(state.draft.is_empty());
        assert!(state.revision > before);
        assert_ne!(state.run_id, run);
        assert_eq!(state.instruction, "shorter");
    }

    #[test]
    fn apply_transcript_clears_draft() {
        let mut state = PipelineState::default();
        state.select_source(SourceDescriptor::File(MediaFile::new("a.mp3", "audio/mpeg", vec![1])));
        state.apply_draft("old".into());
        state.apply_transcript("new transcript".into());
        assert!(state.draft.is_empty());
        assert!(state.has_source());
    }
}
