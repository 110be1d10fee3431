//! Data models shared across elecdocs components.

mod document;
mod identity;

pub use document::{Document, DocumentKind};
pub use identity::Identity;
