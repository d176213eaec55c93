use std::fmt;
use url::Url;

pub mod local;

pub use local::MediaFile;

/// The resolved input to transcribe. File and link are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Audio or video bytes read from a local file
    File(MediaFile),

    /// A remote video/audio link, forwarded to the backend as a reference
    Url(String),

    #[default]
    None,
}

impl SourceDescriptor {
    pub fn is_none(&self) -> bool {
        matches!(self, SourceDescriptor::None)
    }

    /// Human-readable label used in status messages and document headers
    pub fn label(&self) -> Option<&str> {
        match self {
            SourceDescriptor::File(file) => Some(&file.name),
            SourceDescriptor::Url(url) => Some(url),
            SourceDescriptor::None => None,
        }
    }

    /// Short name for status lines: the file name, or the last segment of a link
    pub fn display_name(&self) -> String {
        match self {
            SourceDescriptor::File(file) => file.name.clone(),
            SourceDescriptor::Url(url) => {
                crate::utils::url_display_name(url).unwrap_or_else(|| url.clone())
            }
            SourceDescriptor::None => "no source".to_string(),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::File(file) => write!(f, "file {}", file.name),
            SourceDescriptor::Url(url) => write!(f, "link {}", url),
            SourceDescriptor::None => write!(f, "no source"),
        }
    }
}

/// Audio container formats recognised from file extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Mp3,
    M4a,
    Wav,
    Flac,
    Ogg,
    Webm,
    Mp4,
    Mov,
    Mkv,
}

impl MediaFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(MediaFormat::Mp3),
            "m4a" | "aac" => Some(MediaFormat::M4a),
            "wav" => Some(MediaFormat::Wav),
            "flac" => Some(MediaFormat::Flac),
            "ogg" | "oga" => Some(MediaFormat::Ogg),
            "webm" => Some(MediaFormat::Webm),
            "mp4" | "m4v" => Some(MediaFormat::Mp4),
            "mov" => Some(MediaFormat::Mov),
            "mkv" => Some(MediaFormat::Mkv),
            _ => None,
        }
    }

    /// Get MIME type for the format
    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "audio/mpeg",
            MediaFormat::M4a => "audio/mp4",
            MediaFormat::Wav => "audio/wav",
            MediaFormat::Flac => "audio/flac",
            MediaFormat::Ogg => "audio/ogg",
            MediaFormat::Webm => "audio/webm",
            MediaFormat::Mp4 => "video/mp4",
            MediaFormat::Mov => "video/quicktime",
            MediaFormat::Mkv => "video/x-matroska",
        }
    }
}

/// Errors raised while resolving a source
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("File does not exist: {0}")]
    NotFound(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("File is empty: {0}")]
    Empty(String),

    #[error("Cannot read file {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid link: {0}")]
    InvalidUrl(String),
}

/// Classified command-line input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceInput {
    Path(std::path::PathBuf),
    Url(String),
}

impl SourceInput {
    /// Decide whether the input names a link or a local path
    pub fn parse(input: &str) -> Result<Self, SourceError> {
        let input = input.trim();

        if input.starts_with("http://") || input.starts_with("https://") {
            let url = validate_url(input)?;
            return Ok(SourceInput::Url(url.to_string()));
        }

        Ok(SourceInput::Path(std::path::PathBuf::from(input)))
    }
}

/// Validate a link and return the parsed form
pub fn validate_url(url: &str) -> Result<Url, SourceError> {
    let parsed = Url::parse(url).map_err(|_| SourceError::InvalidUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SourceError::InvalidUrl(format!(
            "{} (must use HTTP or HTTPS)",
            url
        )));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_format_from_extension() {
        assert_eq!(MediaFormat::from_extension("MP3"), Some(MediaFormat::Mp3));
        assert_eq!(MediaFormat::from_extension("aac"), Some(MediaFormat::M4a));
        assert_eq!(MediaFormat::from_extension("txt"), None);
        assert_eq!(MediaFormat::Webm.mime_type(), "audio/webm");
    }

    #[test]
    fn test_source_input_parse() {
        assert_eq!(
            SourceInput::parse("https://www.youtube.com/watch?v=abc").unwrap(),
            SourceInput::Url("https://www.youtube.com/watch?v=abc".to_string())
        );
        assert_eq!(
            SourceInput::parse("./pitch.mp3").unwrap(),
            SourceInput::Path("./pitch.mp3".into())
        );
        assert!(SourceInput::parse("https://").is_err());
    }

    #[test]
    fn test_validate_url_rejects_other_schemes() {
        assert!(validate_url("ftp://example.com/a.mp3").is_err());
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("http://example.com").is_ok());
    }

    #[test]
    fn test_descriptor_label() {
        assert_eq!(SourceDescriptor::None.label(), None);
        let url = SourceDescriptor::Url("https://x.com/a".into());
        assert_eq!(url.label(), Some("https://x.com/a"));
        assert!(SourceDescriptor::default().is_none());
        assert_eq!(url.display_name(), "a");
        assert_eq!(SourceDescriptor::Url("https://x.com/".into()).display_name(), "https://x.com/");
    }
}
