//! Typed requests for each backend call, assembled from pipeline state.
//!
//! These are pure: nothing here touches the network, so prompt construction
//! can be tested on its own.

use crate::backend::ContentPart;
use crate::capture::AudioBlob;
use crate::source::SourceDescriptor;

use super::PipelineError;

pub const TRANSCRIPTION_DIRECTIVE: &str = "Transcribe this audio in the original language of \
the dialogue, leaving out filler words and background noise, to produce a clean text ready to \
be used as the basis for new content. Return only the spoken content.";

pub const URL_REFERENCE_DIRECTIVE: &str = "The audio to transcribe is the speech in the video at \
the following link. Extract only what is spoken. Ignore titles, descriptions, comments, captions \
and any other text or metadata around the video.";

pub const REWRITE_DIRECTIVE: &str = "You are a viral content creator. Based on the following \
\"Original Transcript\", rewrite the text in a creative way with a social media tone (more \
dynamic, with hashtags, emojis and casual language) so it is ready to be published as new \
content.";

pub const IMPROVE_DIRECTIVE: &str = "Improve the following \"Current Alternative Content\" based \
on the \"Original Transcript\" and the \"Improvement Instruction\" provided.";

/// Stands in for the typed instruction when only a recording is supplied
pub const SPOKEN_INSTRUCTION_PLACEHOLDER: &str =
    "the instruction was recorded as audio and is attached.";

/// What the transcription call carries as its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionPayload {
    InlineAudio { mime_type: String, bytes: Vec<u8> },
    Reference { url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionRequest {
    pub payload: TranscriptionPayload,
}

impl TranscriptionRequest {
    /// Build from the active source. `None` when no source is selected.
    pub fn from_source(source: &SourceDescriptor) -> Option<Self> {
        let payload = match source {
            SourceDescriptor::File(file) => TranscriptionPayload::InlineAudio {
                mime_type: file.mime_type.clone(),
                bytes: file.bytes.clone(),
            },
            SourceDescriptor::Url(url) => TranscriptionPayload::Reference { url: url.clone() },
            SourceDescriptor::None => return None,
        };

        Some(Self { payload })
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.payload, TranscriptionPayload::Reference { .. })
    }

    /// Payload part first, then the directive
    pub fn into_parts(self) -> Vec<ContentPart> {
        let payload = match self.payload {
            TranscriptionPayload::InlineAudio { mime_type, bytes } => {
                ContentPart::inline(mime_type, bytes)
            }
            TranscriptionPayload::Reference { url } => {
                ContentPart::text(format!("{}\n{}", URL_REFERENCE_DIRECTIVE, url))
            }
        };

        vec![payload, ContentPart::text(TRANSCRIPTION_DIRECTIVE)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteRequest {
    pub transcript: String,

    /// Permanent instructions already joined into one clause
    pub permanent: Option<String>,
}

impl RewriteRequest {
    pub fn new(transcript: &str, permanent: Option<String>) -> Result<Self, PipelineError> {
        if transcript.trim().is_empty() {
            return Err(PipelineError::NothingToRewrite);
        }

        Ok(Self {
            transcript: transcript.to_string(),
            permanent,
        })
    }

    pub fn prompt(&self) -> String {
        let mut prompt = String::from(REWRITE_DIRECTIVE);
        prompt.push_str("\n\n");

        if let Some(rules) = &self.permanent {
            prompt.push_str(&format!(
                "For this rewrite, apply these permanent rules and instructions at all times: {}\n\n",
                rules
            ));
        }

        prompt.push_str(&format!(
            "Original Transcript:\n---\n{}\n---\n\nPlease generate the new alternative content.",
            self.transcript
        ));
        prompt
    }

    pub fn into_parts(self) -> Vec<ContentPart> {
        vec![ContentPart::text(self.prompt())]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImprovementRequest {
    pub transcript: String,
    pub draft: String,

    /// Typed one-shot instruction, if any
    pub instruction: Option<String>,

    pub permanent: Option<String>,
    pub audio: Option<AudioBlob>,
}

impl ImprovementRequest {
    /// Checks, in order: a draft exists, then some instruction is supplied
    pub fn new(
        transcript: &str,
        draft: &str,
        instruction: Option<String>,
        permanent: Option<String>,
        audio: Option<AudioBlob>,
    ) -> Result<Self, PipelineError> {
        if draft.trim().is_empty() {
            return Err(PipelineError::NoDraft);
        }

        let instruction = instruction.filter(|text| !text.trim().is_empty());
        if instruction.is_none() && audio.is_none() {
            return Err(PipelineError::NoInstruction);
        }

        Ok(Self {
            transcript: transcript.to_string(),
            draft: draft.to_string(),
            instruction,
            permanent,
            audio,
        })
    }

    /// Literal typed instruction, or the spoken-instruction placeholder
    pub fn instruction_text(&self) -> &str {
        self.instruction
            .as_deref()
            .unwrap_or(SPOKEN_INSTRUCTION_PLACEHOLDER)
    }

    pub fn prompt(&self) -> String {
        let mut prompt = String::from(IMPROVE_DIRECTIVE);
        prompt.push_str("\n\n");

        if let Some(rules) = &self.permanent {
            prompt.push_str(&format!(
                "Additionally, apply these permanent rules and instructions at all times: {}\n\n",
                rules
            ));
        }

        prompt.push_str(&format!(
            "Improvement Instruction: \"{}\"\n\n\
             Original Transcript:\n---\n{}\n---\n\n\
             Current Alternative Content:\n---\n{}\n---\n\n\
             Please generate the \"New Improved Alternative Content\":",
            self.instruction_text(),
            self.transcript,
            self.draft
        ));
        prompt
    }

    /// Text block first, recorded instruction second
    pub fn into_parts(self) -> Vec<ContentPart> {
        let mut parts = vec![ContentPart::text(self.prompt())];
        if let Some(audio) = self.audio {
            parts.push(ContentPart::inline(audio.mime_type, audio.bytes));
        }
        parts
    }
}
