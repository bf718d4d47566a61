//! Payload encoding: candidate bytes → base64 `EncodedPayload`.
//!
//! Generation APIs take binary inputs as base64 strings inside the JSON
//! request body. The whole file is encoded in one pass: either a complete
//! payload comes back or an [`EncodingError`], never a partial payload.

use crate::candidate::{CandidateSource, DocumentKind, UploadCandidate};
use crate::error::EncodingError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Base64 form of a candidate's bytes plus its declared media type.
///
/// Built fresh for every submission and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedPayload {
    data: String,
    mime_type: &'static str,
}

impl EncodedPayload {
    /// Standard-alphabet, padded base64.
    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Decode back to the original bytes.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// Read the candidate once and encode all of its bytes.
///
/// The declared kind is passed through as the payload's media type after
/// checking that the leading bytes agree with it.
pub async fn encode(candidate: &UploadCandidate) -> Result<EncodedPayload, EncodingError> {
    let payload = match candidate.source() {
        CandidateSource::File(path) => {
            let bytes = read_file(path).await?;
            encode_bytes(candidate.name(), &bytes, candidate.kind())?
        }
        CandidateSource::Memory(bytes) => encode_bytes(candidate.name(), bytes, candidate.kind())?,
    };
    Ok(payload)
}

/// Encode bytes that are already in memory.
pub fn encode_bytes(
    name: &str,
    bytes: &[u8],
    declared: DocumentKind,
) -> Result<EncodedPayload, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::Empty {
            name: name.to_string(),
        });
    }
    if DocumentKind::sniff(bytes) != Some(declared) {
        return Err(EncodingError::ContentMismatch {
            name: name.to_string(),
            declared,
        });
    }

    let data = STANDARD.encode(bytes);
    debug!(
        "Encoded '{}' ({} bytes) → {} bytes base64",
        name,
        bytes.len(),
        data.len()
    );

    Ok(EncodedPayload {
        data,
        mime_type: declared.mime_type(),
    })
}

async fn read_file(path: &Path) -> Result<Vec<u8>, EncodingError> {
    tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => EncodingError::NotFound {
            path: path.to_path_buf(),
        },
        ErrorKind::PermissionDenied => EncodingError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => EncodingError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_pdf(len: usize) -> Vec<u8> {
        let mut bytes = b"%PDF-1.7\n".to_vec();
        bytes.extend((0..len).map(|i| (i % 251) as u8));
        bytes
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let original = fake_pdf(10_000);
        let payload = encode_bytes("doc.pdf", &original, DocumentKind::Pdf).unwrap();
        assert_eq!(payload.mime_type(), "application/pdf");
        assert_eq!(payload.decode().unwrap(), original);
    }

    #[test]
    fn pdf_with_leading_bom_or_newline_encodes() {
        for prefix in [&b"\xEF\xBB\xBF"[..], b"\r\n", b"   \n"] {
            let mut original = prefix.to_vec();
            original.extend_from_slice(b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF");
            let payload = encode_bytes("book.pdf", &original, DocumentKind::Pdf).unwrap();
            assert_eq!(payload.mime_type(), "application/pdf");
            assert_eq!(payload.decode().unwrap(), original);
        }
    }

    #[test]
    fn empty_bytes_fail() {
        let err = encode_bytes("empty.png", &[], DocumentKind::Png).unwrap_err();
        assert!(matches!(err, EncodingError::Empty { .. }));
    }

    #[test]
    fn declared_type_must_match_content() {
        let err = encode_bytes("fake.png", &fake_pdf(10), DocumentKind::Png).unwrap_err();
        assert!(matches!(
            err,
            EncodingError::ContentMismatch {
                declared: DocumentKind::Png,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn encode_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.pdf");
        let original = fake_pdf(4096);
        std::fs::write(&path, &original).unwrap();

        let candidate = UploadCandidate::from_path(&path).unwrap();
        let payload = encode(&candidate).await.unwrap();
        assert_eq!(payload.decode().unwrap(), original);
    }

    #[tokio::test]
    async fn file_removed_after_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.pdf");
        std::fs::write(&path, fake_pdf(16)).unwrap();
        let candidate = UploadCandidate::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let err = encode(&candidate).await.unwrap_err();
        assert!(matches!(err, EncodingError::NotFound { .. }), "got: {err}");
    }

    #[test]
    fn in_memory_candidate_encodes_without_io() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xDB, 0x00, 0x43];
        let candidate = UploadCandidate::from_bytes("p.jpg", jpeg.to_vec(), DocumentKind::Jpeg);
        let payload = tokio_test::block_on(encode(&candidate)).unwrap();
        assert_eq!(payload.mime_type(), "image/jpeg");
        assert_eq!(payload.decode().unwrap(), jpeg);
    }

    #[tokio::test]
    async fn zero_length_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.pdf");
        std::fs::write(&path, b"").unwrap();
        let candidate = UploadCandidate::from_path(&path).unwrap();

        let err = encode(&candidate).await.unwrap_err();
        assert!(matches!(err, EncodingError::Empty { .. }));
    }
}
