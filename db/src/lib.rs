pub mod models;
pub mod test_utils;

use sea_orm::{Database, DatabaseConnection, DbErr};
use std::path::Path;

/// Open the grading database.
///
/// Accepts either a full DSN or a bare SQLite file path.
pub async fn connect(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    // If it's already a DSN, use it as-is; otherwise treat it as a SQLite file path.
    let url = if path_or_url.starts_with("sqlite:")
        || path_or_url.starts_with("postgres://")
        || path_or_url.starts_with("mysql://")
    {
        path_or_url.to_string()
    } else {
        // Ensure parent directory exists (SQLite won't create intermediate dirs).
        if let Some(parent) = Path::new(path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    tracing::debug!(url = %url, "connecting to database");
    Database::connect(&url).await
}
