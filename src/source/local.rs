use std::fmt;
use std::path::Path;

use super::{MediaFormat, SourceError};

const FALLBACK_MIME: &str = "application/octet-stream";

/// A local media file loaded into memory for inline upload
#[derive(Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// File name without directories, e.g. `pitch.mp3`
    pub name: String,

    pub mime_type: String,

    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Read a media file from disk, deriving its MIME type from the extension
    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        validate_file(path).await?;

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| SourceError::Unreadable {
                path: path.display().to_string(),
                source,
            })?;

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        Ok(Self {
            mime_type: mime_for_path(path).to_string(),
            name,
            bytes,
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// File name without its final extension
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

impl fmt::Debug for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

fn mime_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(MediaFormat::from_extension)
        .map(|format| format.mime_type())
        .unwrap_or(FALLBACK_MIME)
}

/// Check if the file exists, is a regular file and is not empty
async fn validate_file(path: &Path) -> Result<(), SourceError> {
    let display = path.display().to_string();

    if !path.exists() {
        return Err(SourceError::NotFound(display));
    }

    if !path.is_file() {
        return Err(SourceError::NotAFile(display));
    }

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|source| SourceError::Unreadable {
            path: display.clone(),
            source,
        })?;

    if metadata.len() == 0 {
        return Err(SourceError::Empty(display));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_reads_bytes_and_mime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pitch.mp3");
        fs_err::write(&path, b"ID3fake").unwrap();

        let file = MediaFile::load(&path).await.unwrap();
        assert_eq!(file.name, "pitch.mp3");
        assert_eq!(file.mime_type, "audio/mpeg");
        assert_eq!(file.bytes, b"ID3fake");
        assert_eq!(file.stem(), "pitch");
    }

    #[tokio::test]
    async fn test_load_unknown_extension_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memo.xyz");
        fs_err::write(&path, b"data").unwrap();

        let file = MediaFile::load(&path).await.unwrap();
        assert_eq!(file.mime_type, FALLBACK_MIME);
    }

    #[tokio::test]
    async fn test_load_rejects_missing_and_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.mp3");
        assert!(matches!(
            MediaFile::load(&missing).await,
            Err(SourceError::NotFound(_))
        ));

        let empty = dir.path().join("empty.wav");
        fs_err::write(&empty, b"").unwrap();
        assert!(matches!(
            MediaFile::load(&empty).await,
            Err(SourceError::Empty(_))
        ));

        assert!(matches!(
            MediaFile::load(dir.path()).await,
            Err(SourceError::NotAFile(_))
        ));
    }
}
