//! The file a user has picked, before it is encoded.
//!
//! A candidate only *describes* its bytes. For files on disk nothing is read
//! at selection time beyond `stat` (and a short header peek when the
//! extension is unknown); the full read happens once per submission inside
//! [`crate::pipeline::encode::encode`]. That way a file that is deleted or
//! locked after selection surfaces as an [`crate::error::EncodingError`] on
//! submit, exactly where the user expects the failure.

use crate::error::{EncodingError, StoryError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PDF_HEADER: &[u8] = b"%PDF-";

/// How far into a file the PDF header may start.
pub const PDF_HEADER_WINDOW: usize = 1024;

/// The three kinds of input that can become a story.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::Pdf, DocumentKind::Png, DocumentKind::Jpeg];

    /// IANA media type sent alongside the payload.
    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentKind::Pdf => "application/pdf",
            DocumentKind::Png => "image/png",
            DocumentKind::Jpeg => "image/jpeg",
        }
    }

    /// Parse a media type, ignoring parameters and case (`image/JPEG; q=1`).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Some(DocumentKind::Pdf),
            "image/png" => Some(DocumentKind::Png),
            "image/jpeg" | "image/jpg" | "image/pjpeg" => Some(DocumentKind::Jpeg),
            _ => None,
        }
    }

    /// Map a file extension (without the dot) to a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "png" => Some(DocumentKind::Png),
            "jpg" | "jpeg" => Some(DocumentKind::Jpeg),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Detect the kind from leading magic bytes.
    ///
    /// PDF readers accept the `%PDF-` header anywhere in the first
    /// [`PDF_HEADER_WINDOW`] bytes, so a leading BOM or blank line still
    /// counts as a PDF.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let window = &bytes[..bytes.len().min(PDF_HEADER_WINDOW)];
        if window.windows(PDF_HEADER.len()).any(|w| w == PDF_HEADER) {
            return Some(DocumentKind::Pdf);
        }
        match image::guess_format(bytes) {
            Ok(image::ImageFormat::Png) => Some(DocumentKind::Png),
            Ok(image::ImageFormat::Jpeg) => Some(DocumentKind::Jpeg),
            _ => None,
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, DocumentKind::Pdf)
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Pdf => f.write_str("PDF"),
            DocumentKind::Png => f.write_str("PNG"),
            DocumentKind::Jpeg => f.write_str("JPEG"),
        }
    }
}

/// Where a candidate's bytes live.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// On disk; read at submission time.
    File(PathBuf),
    /// Already in memory (uploads, downloads, tests).
    Memory(Arc<[u8]>),
}

/// The file currently selected for conversion.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    name: String,
    kind: DocumentKind,
    size_bytes: u64,
    source: CandidateSource,
}

impl UploadCandidate {
    /// Select a file on disk.
    ///
    /// The kind comes from the extension (`.pdf`, `.png`, `.jpg`, `.jpeg`);
    /// files without a recognised extension are sniffed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, StoryError> {
        let path = path.as_ref().to_path_buf();
        let meta = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(StoryError::PermissionDenied { path });
            }
            Err(_) => return Err(StoryError::FileNotFound { path }),
        };
        if !meta.is_file() {
            return Err(StoryError::InvalidInput {
                input: path.display().to_string(),
            });
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let kind = match DocumentKind::from_path(&path) {
            Some(k) => k,
            None => sniff_file(&path)?.ok_or_else(|| StoryError::UnsupportedFileType {
                name: name.clone(),
            })?,
        };

        Ok(Self {
            name,
            kind,
            size_bytes: meta.len(),
            source: CandidateSource::File(path),
        })
    }

    /// Select bytes that are already in memory.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>, kind: DocumentKind) -> Self {
        let bytes: Arc<[u8]> = bytes.into();
        Self {
            name: name.into(),
            kind,
            size_bytes: bytes.len() as u64,
            source: CandidateSource::Memory(bytes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn source(&self) -> &CandidateSource {
        &self.source
    }

    /// Size in megabytes with two decimals, e.g. `2.00 MB`.
    pub fn size_label(&self) -> String {
        format!("{:.2} MB", self.size_bytes as f64 / 1024.0 / 1024.0)
    }
}

fn sniff_file(path: &Path) -> Result<Option<DocumentKind>, StoryError> {
    let f = std::fs::File::open(path).map_err(|e| io_error(path, e))?;
    let mut head = Vec::with_capacity(PDF_HEADER_WINDOW);
    f.take(PDF_HEADER_WINDOW as u64)
        .read_to_end(&mut head)
        .map_err(|e| io_error(path, e))?;
    Ok(DocumentKind::sniff(&head))
}

fn io_error(path: &Path, e: std::io::Error) -> StoryError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => StoryError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => StoryError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => StoryError::Encoding(EncodingError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn kind_from_extension() {
        assert_eq!(DocumentKind::from_extension("PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_extension("jpg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_extension("jpeg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_extension("png"), Some(DocumentKind::Png));
        assert_eq!(DocumentKind::from_extension("gif"), None);
    }

    #[test]
    fn kind_from_mime_ignores_params() {
        assert_eq!(
            DocumentKind::from_mime("application/pdf; charset=binary"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::from_mime("IMAGE/JPEG"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_mime("text/html"), None);
    }

    #[test]
    fn mime_round_trips_through_from_mime() {
        for kind in DocumentKind::ALL {
            assert_eq!(DocumentKind::from_mime(kind.mime_type()), Some(kind));
        }
    }

    #[test]
    fn sniff_magic_bytes() {
        assert_eq!(DocumentKind::sniff(b"%PDF-1.7\n"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::sniff(PNG_MAGIC), Some(DocumentKind::Png));
        assert_eq!(
            DocumentKind::sniff(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]),
            Some(DocumentKind::Jpeg)
        );
        assert_eq!(DocumentKind::sniff(b"hello"), None);
        assert_eq!(DocumentKind::sniff(b""), None);
    }

    #[test]
    fn sniff_finds_pdf_header_after_junk() {
        assert_eq!(
            DocumentKind::sniff(b"\xEF\xBB\xBF%PDF-1.4\n"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(DocumentKind::sniff(b"\r\n%PDF-1.4\n"), Some(DocumentKind::Pdf));

        let mut late = vec![b' '; PDF_HEADER_WINDOW];
        late.extend_from_slice(b"%PDF-1.4\n");
        assert_eq!(DocumentKind::sniff(&late), None);
    }

    #[test]
    fn from_path_sniffs_pdf_with_bom() {
        let mut f = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        f.write_all(b"\xEF\xBB\xBF%PDF-1.4\n%%EOF").unwrap();
        let c = UploadCandidate::from_path(f.path()).unwrap();
        assert_eq!(c.kind(), DocumentKind::Pdf);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_header_is_a_read_error() {
        // Opening a directory succeeds on unix; reading it does not.
        let dir = tempfile::tempdir().unwrap();
        let err = sniff_file(dir.path()).unwrap_err();
        assert!(
            matches!(err, StoryError::Encoding(EncodingError::Read { .. })),
            "got: {err}"
        );
    }

    #[test]
    fn from_path_uses_extension_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.pdf");
        std::fs::write(&path, b"%PDF-1.4 tiny").unwrap();

        let c = UploadCandidate::from_path(&path).unwrap();
        assert_eq!(c.name(), "book.pdf");
        assert_eq!(c.kind(), DocumentKind::Pdf);
        assert_eq!(c.size_bytes(), 13);
        assert!(matches!(c.source(), CandidateSource::File(_)));
    }

    #[test]
    fn from_path_sniffs_unknown_extension() {
        let mut f = tempfile::Builder::new().suffix(".bin").tempfile().unwrap();
        f.write_all(PNG_MAGIC).unwrap();
        let c = UploadCandidate::from_path(f.path()).unwrap();
        assert_eq!(c.kind(), DocumentKind::Png);
    }

    #[test]
    fn from_path_rejects_unsupported() {
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"just words").unwrap();
        let err = UploadCandidate::from_path(f.path()).unwrap_err();
        assert!(matches!(err, StoryError::UnsupportedFileType { .. }), "got: {err}");
    }

    #[test]
    fn from_path_missing_file() {
        let err = UploadCandidate::from_path("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, StoryError::FileNotFound { .. }));
    }

    #[test]
    fn size_label_in_megabytes() {
        let c = UploadCandidate::from_bytes("a.png", vec![0u8; 2 * 1024 * 1024], DocumentKind::Png);
        assert_eq!(c.size_label(), "2.00 MB");
    }
}
