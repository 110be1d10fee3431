//! Shared pieces of the `elecdocs` command-line client.

pub mod api_client;
pub mod output;

pub use api_client::{ApiClient, CategoryInfo, DeleteConfirmation, DeleteRequest, SessionInfo};

/// Initialize tracing for the CLI. Logs go to stderr so command output stays
/// pipeable.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
}

/// Only an explicit `y` confirms a delete.
pub fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("y")
}
