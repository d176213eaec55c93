use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::{BackendError, GenerativeBackend, ModelProfile};
use crate::capture::AudioBlob;
use crate::instructions::InstructionStore;
use crate::source::{MediaFile, SourceDescriptor};
use crate::utils;

pub mod request;
pub mod state;

pub use request::{ImprovementRequest, RewriteRequest, TranscriptionRequest};
pub use state::PipelineState;

const URL_EXTRACTION_HINT: &str =
    "(extracting audio from a link may not be supported by the backend)";

/// Reasons a stage did not produce a result
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Select an audio file or paste a video link first.")]
    NoSource,

    #[error("Another request is still running.")]
    Busy,

    #[error("There is no transcript to rewrite.")]
    NothingToRewrite,

    #[error("Generate the alternative content first, then improve it.")]
    NoDraft,

    #[error("Type or record an instruction for the improvement.")]
    NoInstruction,

    #[error("The source changed while the request was running; the response was discarded.")]
    Stale,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl PipelineError {
    /// Detected locally, before any backend call
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            PipelineError::NoSource
                | PipelineError::NothingToRewrite
                | PipelineError::NoDraft
                | PipelineError::NoInstruction
        )
    }
}

/// Clears the busy flag when a stage finishes, however it finishes
struct BusyGuard<'a> {
    state: &'a Mutex<PipelineState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .busy = false;
    }
}

/// Source → transcript → draft → improved draft.
///
/// Stages serialize through one busy flag and never queue. The state lock is
/// never held across a backend call; a response is applied only if the
/// state revision it was built from is still current.
pub struct Pipeline {
    backend: Arc<dyn GenerativeBackend>,
    state: Mutex<PipelineState>,
    instructions: Mutex<InstructionStore>,
}

impl Pipeline {
    pub fn new(backend: Arc<dyn GenerativeBackend>, instructions: InstructionStore) -> Self {
        Self {
            backend,
            state: Mutex::new(PipelineState::default()),
            instructions: Mutex::new(instructions),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The permanent instruction store
    pub fn instructions(&self) -> MutexGuard<'_, InstructionStore> {
        self.instructions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn permanent_clause(&self) -> Option<String> {
        self.instructions().joined()
    }

    pub fn snapshot(&self) -> PipelineState {
        self.lock_state().clone()
    }

    pub fn transcript(&self) -> String {
        self.lock_state().transcript.clone()
    }

    pub fn draft(&self) -> String {
        self.lock_state().draft.clone()
    }

    pub fn status(&self) -> String {
        self.lock_state().status.clone()
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.lock_state().status = status.into();
    }

    pub fn is_busy(&self) -> bool {
        self.lock_state().busy
    }

    // ---- Source resolver ----

    /// Make a local file the active source, replacing any link
    pub fn select_file(&self, file: MediaFile) {
        let mut state = self.lock_state();
        let status = format!(
            "Selected file: {} ({})",
            file.name,
            utils::format_file_size(file.size())
        );
        state.select_source(SourceDescriptor::File(file));
        state.status = status;
        tracing::info!(run_id = %state.run_id, "{}", state.status);
    }

    /// Make a link the active source, replacing any file. Blank text clears the source.
    pub fn set_url(&self, text: &str) {
        let url = text.trim();
        let mut state = self.lock_state();

        if url.is_empty() {
            state.select_source(SourceDescriptor::None);
            state.status = state::INITIAL_STATUS.to_string();
        } else {
            state.select_source(SourceDescriptor::Url(url.to_string()));
            state.status = match utils::extract_domain(url) {
                Some(domain) => format!("Link set: {} ({})", url, domain),
                None => format!("Link set: {}", url),
            };
        }
        tracing::info!(run_id = %state.run_id, "{}", state.status);
    }

    pub fn current(&self) -> SourceDescriptor {
        self.lock_state().source.clone()
    }

    pub fn can_transcribe(&self) -> bool {
        let state = self.lock_state();
        state.has_source() && !state.busy
    }

    // ---- One-shot instruction inputs ----

    pub fn set_instruction(&self, text: impl Into<String>) {
        self.lock_state().instruction = text.into();
    }

    pub fn instruction(&self) -> String {
        self.lock_state().instruction.clone()
    }

    /// Store a finished recording, replacing any unused one
    pub fn attach_audio(&self, blob: AudioBlob) {
        let mut state = self.lock_state();
        if state.pending_audio.is_some() {
            tracing::debug!("Replacing unused recorded instruction");
        }
        state.pending_audio = Some(blob);
        state.status = "Recording finished. Apply it to improve the content.".to_string();
    }

    pub fn has_pending_audio(&self) -> bool {
        self.lock_state().pending_audio.is_some()
    }

    /// Replace the draft with hand-edited text; later improvements build on it
    pub fn set_draft(&self, text: impl Into<String>) -> Result<(), PipelineError> {
        let mut state = self.lock_state();
        if state.busy {
            return Err(PipelineError::Busy);
        }
        if state.draft.is_empty() {
            return Err(reject(&mut state, PipelineError::NoDraft));
        }

        state.apply_draft(text.into());
        state.status = "Alternative content edited.".to_string();
        tracing::debug!("Draft edited by hand ({} chars)", state.draft.len());
        Ok(())
    }

    // ---- Stages ----

    /// Transcribe the active source with the fast model
    pub async fn transcribe(&self) -> Result<String, PipelineError> {
        let (request, revision, label) = {
            let mut state = self.lock_state();
            if state.busy {
                return Err(PipelineError::Busy);
            }

            let request = match TranscriptionRequest::from_source(&state.source) {
                Some(request) => request,
                None => return Err(reject(&mut state, PipelineError::NoSource)),
            };

            let label = state.source.display_name();
            state.busy = true;
            state.status = format!("Transcribing {}...", label);
            tracing::info!(run_id = %state.run_id, "Transcribing {}", state.source);
            (request, state.revision, label)
        };
        let _busy = BusyGuard { state: &self.state };

        let is_reference = request.is_reference();
        let result = self
            .backend
            .generate(ModelProfile::Fast, request.into_parts())
            .await;

        let mut state = self.lock_state();
        if state.revision != revision {
            tracing::warn!("Discarding transcription of {} after the source changed", label);
            return Err(PipelineError::Stale);
        }

        match result {
            Ok(transcript) => {
                state.apply_transcript(transcript.clone());
                state.status = format!(
                    "Transcription of {} complete. You can now generate the alternative content.",
                    label
                );
                tracing::info!("Transcript ready ({} chars)", transcript.len());
                Ok(transcript)
            }
            Err(e) => {
                state.status = if is_reference {
                    format!("Transcription failed: {} {}", e, URL_EXTRACTION_HINT)
                } else {
                    format!("Transcription failed: {}", e)
                };
                tracing::error!("Transcription failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Rewrite the transcript into a social-media draft with the quality model
    pub async fn generate_draft(&self) -> Result<String, PipelineError> {
        let permanent = self.permanent_clause();

        let (request, revision) = {
            let mut state = self.lock_state();
            if state.busy {
                return Err(PipelineError::Busy);
            }

            let request = match RewriteRequest::new(&state.transcript, permanent) {
                Ok(request) => request,
                Err(e) => return Err(reject(&mut state, e)),
            };

            state.busy = true;
            state.status = "Generating alternative content...".to_string();
            (request, state.revision)
        };
        let _busy = BusyGuard { state: &self.state };

        tracing::info!(
            "Generating draft (permanent rules: {})",
            request.permanent.is_some()
        );
        let result = self
            .backend
            .generate(ModelProfile::Quality, request.into_parts())
            .await;

        let mut state = self.lock_state();
        if state.revision != revision {
            tracing::warn!("Discarding draft generated for a previous source");
            return Err(PipelineError::Stale);
        }

        match result {
            Ok(draft) => {
                state.apply_draft(draft.clone());
                state.status =
                    "Alternative content generated. You can improve it next.".to_string();
                Ok(draft)
            }
            Err(e) => {
                state.status = format!("Generating alternative content failed: {}", e);
                tracing::error!("Draft generation failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Improve the draft with the pending typed and/or recorded instruction.
    ///
    /// With `persist`, a typed instruction is also added to the permanent set
    /// on success. Recorded instructions are never persisted. On failure the
    /// typed instruction and the recording are kept for a retry.
    pub async fn improve(&self, persist: bool) -> Result<String, PipelineError> {
        let permanent = self.permanent_clause();

        let (request, revision) = {
            let mut state = self.lock_state();
            if state.busy {
                return Err(PipelineError::Busy);
            }

            let typed = Some(state.instruction.clone());
            let request = match ImprovementRequest::new(
                &state.transcript,
                &state.draft,
                typed,
                permanent,
                state.pending_audio.clone(),
            ) {
                Ok(request) => request,
                Err(e) => return Err(reject(&mut state, e)),
            };

            state.busy = true;
            state.status = "Applying improvements to the alternative content...".to_string();
            (request, state.revision)
        };
        let _busy = BusyGuard { state: &self.state };

        let typed = request.instruction.clone();
        let used_audio = request.audio.clone();
        tracing::info!(
            "Improving draft (typed: {}, recorded: {})",
            typed.is_some(),
            used_audio.is_some()
        );

        let result = self
            .backend
            .generate(ModelProfile::Quality, request.into_parts())
            .await;

        let improved = {
            let mut state = self.lock_state();
            if state.revision != revision {
                tracing::warn!("Discarding improvement made for a previous draft");
                return Err(PipelineError::Stale);
            }

            match result {
                Ok(improved) => {
                    state.apply_draft(improved.clone());
                    if typed.as_deref() == Some(state.instruction.as_str()) {
                        state.instruction.clear();
                    }
                    if used_audio.is_some() && state.pending_audio == used_audio {
                        state.pending_audio = None;
                    }
                    state.status = "Alternative content improved.".to_string();
                    improved
                }
                Err(e) => {
                    state.status = format!("Improving the content failed: {}", e);
                    tracing::error!("Improvement failed: {}", e);
                    return Err(e.into());
                }
            }
        };

        if persist {
            if let Some(text) = typed {
                self.persist_instruction(&text);
            }
        }

        Ok(improved)
    }

    fn persist_instruction(&self, text: &str) {
        let outcome = self.instructions().add(text);
        match outcome {
            Ok(true) => {
                tracing::info!("Saved permanent instruction: {}", text);
                self.set_status(format!(
                    "Alternative content improved. \"{}\" is now a permanent instruction.",
                    text
                ));
            }
            Ok(false) => tracing::debug!("Instruction already permanent: {}", text),
            Err(e) => {
                tracing::warn!("Could not save permanent instruction: {}", e);
                self.set_status(format!(
                    "Alternative content improved, but the instruction could not be saved: {}",
                    e
                ));
            }
        }
    }
}

fn reject(state: &mut PipelineState, error: PipelineError) -> PipelineError {
    state.status = error.to_string();
    tracing::debug!("Rejected: {}", error);
    error
}
