//! Plain-text rendering for terminal output.

use elecdocs_core::Document;
use elecdocs_services::UploadEvent;

use crate::api_client::CategoryInfo;

/// Truncate to `max_len` characters, appending "..." if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn documents_table(documents: &[Document]) -> String {
    if documents.is_empty() {
        return "No files found in this folder.".to_string();
    }
    let mut out = format!(
        "{:<40} {:<6} {:>12} {:<17} {}\n",
        "NAME", "KIND", "SIZE", "UPLOADED", "URL"
    );
    for doc in documents {
        out.push_str(&format!(
            "{:<40} {:<6} {:>12} {:<17} {}\n",
            truncate(&doc.name, 40),
            kind_label(doc),
            doc.display_size(),
            doc.last_modified.format("%Y-%m-%d %H:%M"),
            doc.url,
        ));
    }
    out.push_str(&format!("{} file(s)", documents.len()));
    out
}

fn kind_label(doc: &Document) -> &'static str {
    match doc.kind() {
        elecdocs_core::DocumentKind::Image => "image",
        elecdocs_core::DocumentKind::Pdf => "pdf",
        elecdocs_core::DocumentKind::Other => "file",
    }
}

pub fn categories_table(categories: &[CategoryInfo]) -> String {
    let mut out = format!("{:<8} {:<34} {:<12} {}\n", "ID", "LABEL", "FOLDER", "ACCEPTS");
    for category in categories {
        out.push_str(&format!(
            "{:<8} {:<34} {:<12} {}\n",
            category.id,
            truncate(&category.label, 34),
            category.folder,
            category.accept
        ));
    }
    out.trim_end().to_string()
}

/// One human-readable line per upload event.
pub fn describe_event(event: &UploadEvent) -> String {
    match event {
        UploadEvent::Progress { percent } => format!("Uploading... {}%", percent),
        UploadEvent::Completed => "Upload complete.".to_string(),
        UploadEvent::Failed { message } => format!("Upload failed: {}", message),
        UploadEvent::Refreshed { documents } => {
            format!("Folder now holds {} file(s).", documents.len())
        }
        UploadEvent::RefreshFailed { message } => {
            format!("Uploaded, but the listing could not be refreshed: {}", message)
        }
    }
}
