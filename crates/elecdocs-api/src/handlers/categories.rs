use crate::state::AppState;
use axum::{extract::State, Json};
use elecdocs_core::Category;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryDescriptor {
    pub id: Category,
    pub label: String,
    pub folder: String,
    /// Content types the upload picker should offer
    pub accept: String,
    pub is_photo: bool,
}

/// The fixed category set with each category's resolved folder.
#[utoipa::path(
    get,
    path = "/api/v0/categories",
    tag = "categories",
    responses((status = 200, description = "All categories", body = Vec<CategoryDescriptor>))
)]
pub async fn list_categories(State(state): State<Arc<AppState>>) -> Json<Vec<CategoryDescriptor>> {
    let registry = state.directory.categories();
    Json(
        Category::ALL
            .iter()
            .map(|&category| CategoryDescriptor {
                id: category,
                label: category.label().to_string(),
                folder: registry.resolve_folder(category).to_string(),
                accept: category.accept_hint().to_string(),
                is_photo: category.is_photo(),
            })
            .collect(),
    )
}
