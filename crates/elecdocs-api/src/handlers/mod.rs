pub mod categories;
pub mod delete;
pub mod documents;
pub mod files;
pub mod session;
pub mod upload;

use crate::state::AppState;
use elecdocs_core::{AppError, Category};

/// Resolve a path segment naming a category by id (`SWL`) or folder (`swl`).
pub(crate) fn resolve_category(state: &AppState, segment: &str) -> Result<Category, AppError> {
    state
        .directory
        .categories()
        .lookup(segment)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown category '{}'", segment)))
}
