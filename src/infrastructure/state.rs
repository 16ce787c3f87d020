//! Application state containing the services handlers depend on

use std::path::PathBuf;
use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::domain::{BookRepository, CoverStore};
use crate::fetcher::CoverFetcher;
use crate::infrastructure::{DiskCoverStore, SeaOrmBookRepository};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    /// Book record store
    pub books: Arc<dyn BookRepository>,
    /// Cover file storage
    pub covers: Arc<dyn CoverStore>,
    /// Remote cover downloader
    pub fetcher: CoverFetcher,
}

impl AppState {
    pub fn new(db: DatabaseConnection, media_root: impl Into<PathBuf>) -> Self {
        let books = Arc::new(SeaOrmBookRepository::new(db.clone()));
        let covers = Arc::new(DiskCoverStore::new(media_root));

        Self {
            db,
            books,
            covers,
            fetcher: CoverFetcher::new(),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

// Allow handlers that only need the database to extract it directly
impl axum::extract::FromRef<AppState> for DatabaseConnection {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}
