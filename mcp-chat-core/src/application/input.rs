//! Builds the content of a user turn from typed text and attached files.

use crate::domain::{Blob, Part, TurnContent};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// MIME type guessed from the file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("csv") => "text/csv",
        Some("md") => "text/markdown",
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("ts") => "application/typescript",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Text first (when not blank), then one inline part per attachment.
///
/// A file that cannot be read becomes a text part describing the failure so
/// the model still sees that something was attached.
pub async fn prepare_user_content(text: &str, attachments: &[PathBuf]) -> TurnContent {
    if attachments.is_empty() {
        return TurnContent::Text(text.to_string());
    }

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    if !text.trim().is_empty() {
        parts.push(Part::text(text));
    }

    for path in attachments {
        let name = display_name(path);
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let mime_type = mime_type_for(path);
                info!(file = %name, bytes = bytes.len(), mime_type, "Attached file");
                parts.push(Part::InlineData(Blob {
                    mime_type: mime_type.to_string(),
                    data: STANDARD.encode(bytes),
                }));
            }
            Err(err) => {
                error!(file = %name, %err, "Could not read attachment");
                parts.push(Part::text(format!(
                    "[File Error: Could not load file '{name}'. Reason: {err}]"
                )));
            }
        }
    }

    TurnContent::Parts(parts)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
