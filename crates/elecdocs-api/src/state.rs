//! Application state shared by every handler.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use elecdocs_core::{Category, Config};
use elecdocs_services::{AdminAllowList, DirectoryService, DirectoryView, UploadWorkflow};
use elecdocs_storage::{Storage, UrlSigner};

use crate::auth::Authenticator;
use crate::services::DeleteRequests;

pub struct AppState {
    pub config: Config,
    pub directory: Arc<DirectoryService>,
    /// One view per category, shared by every request touching that category.
    pub views: HashMap<Category, Arc<DirectoryView>>,
    pub uploads: UploadWorkflow,
    pub delete_requests: DeleteRequests,
    pub admins: AdminAllowList,
    pub authenticator: Authenticator,
    /// Verifies retrieval tokens for files served by this process (local backend only).
    pub file_signer: Option<UrlSigner>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        authenticator: Authenticator,
        file_signer: Option<UrlSigner>,
    ) -> Self {
        let directory = Arc::new(DirectoryService::new(
            storage,
            config.categories().clone(),
        ));
        let views = Category::ALL
            .iter()
            .map(|&category| {
                (
                    category,
                    Arc::new(DirectoryView::new(directory.clone(), category)),
                )
            })
            .collect();

        Self {
            admins: AdminAllowList::new(config.admin_emails()),
            delete_requests: DeleteRequests::new(Duration::from_secs(
                config.delete_request_ttl_secs(),
            )),
            uploads: UploadWorkflow::new(),
            directory,
            views,
            authenticator,
            file_signer,
            config,
        }
    }

    pub fn view(&self, category: Category) -> Arc<DirectoryView> {
        match self.views.get(&category) {
            Some(view) => view.clone(),
            None => Arc::new(DirectoryView::new(self.directory.clone(), category)),
        }
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.directory.storage()
    }
}
