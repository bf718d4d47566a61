//! Input resolution: turn a user-supplied path or URL into an
//! [`UploadCandidate`].
//!
//! Local files are only described (name, kind, size); their bytes are read
//! later by the encoder. URLs are downloaded immediately into memory, since
//! there is no file to come back to at submission time.

use crate::candidate::{DocumentKind, UploadCandidate};
use crate::error::StoryError;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a candidate.
///
/// If the input is a URL, download it. If it is a local file, validate it
/// exists and has a supported type.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<UploadCandidate, StoryError> {
    if input.trim().is_empty() {
        return Err(StoryError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        let candidate = UploadCandidate::from_path(input)?;
        debug!(
            "Resolved local {} '{}' ({})",
            candidate.kind(),
            candidate.name(),
            candidate.size_label()
        );
        Ok(candidate)
    }
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadCandidate, StoryError> {
    info!("Downloading from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StoryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StoryError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StoryError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(StoryError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let filename = extract_filename(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| StoryError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let kind = detect_kind(content_type.as_deref(), &filename, &bytes).ok_or_else(|| {
        StoryError::UnsupportedFileType {
            name: filename.clone(),
        }
    })?;

    info!("Downloaded {} bytes ({})", bytes.len(), kind);
    Ok(UploadCandidate::from_bytes(filename, bytes.to_vec(), kind))
}

/// Pick the kind from the `Content-Type` header, then the extension, then
/// the magic bytes.
fn detect_kind(content_type: Option<&str>, filename: &str, bytes: &[u8]) -> Option<DocumentKind> {
    content_type
        .and_then(DocumentKind::from_mime)
        .or_else(|| DocumentKind::from_path(std::path::Path::new(filename)))
        .or_else(|| DocumentKind::sniff(bytes))
}

/// Extract a reasonable filename from the URL path.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "download".to_string()
}
