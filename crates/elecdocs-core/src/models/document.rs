use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::constants::{IMAGE_CONTENT_TYPE_PREFIX, PDF_CONTENT_TYPE};

/// One stored file as displayed to the user.
///
/// Built fresh on every directory listing and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// File name, unique within its folder
    pub name: String,
    /// Retrieval URL resolved at listing time (may be time-bounded)
    pub url: String,
    /// MIME type
    #[serde(rename = "type")]
    pub content_type: String,
    /// Size in bytes
    pub size: u64,
    /// Creation/upload time
    pub last_modified: DateTime<Utc>,
}

/// Coarse file kind used to pick an icon in list views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Image,
    Pdf,
    Other,
}

impl Document {
    pub fn kind(&self) -> DocumentKind {
        if self.content_type.starts_with(IMAGE_CONTENT_TYPE_PREFIX) {
            DocumentKind::Image
        } else if self.content_type == PDF_CONTENT_TYPE {
            DocumentKind::Pdf
        } else {
            DocumentKind::Other
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind() == DocumentKind::Image
    }

    /// Size in kilobytes with one decimal, e.g. `12.5 KB`.
    pub fn display_size(&self) -> String {
        format!("{:.1} KB", self.size as f64 / 1024.0)
    }

    /// Content-equality that ignores the retrieval URL, which may be re-signed
    /// on every listing.
    pub fn same_content(&self, other: &Document) -> bool {
        self.name == other.name && self.content_type == other.content_type && self.size == other.size
    }
}
