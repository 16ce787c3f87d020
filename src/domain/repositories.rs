//! Service trait definitions
//!
//! These traits define the contracts for data access and cover-file storage.
//! Implementations live in the infrastructure layer.

use async_trait::async_trait;

use super::DomainError;
use crate::models::book::{Book, Location};

/// Filter criteria for book queries. All criteria are combined conjunctively;
/// `term` is a case-insensitive substring match against name OR author, while
/// `author` and `genre` match exactly.
#[derive(Debug, Default, Clone)]
pub struct BookFilter {
    pub location: Option<Location>,
    pub term: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

impl BookFilter {
    /// The same filter narrowed to a single shelf.
    pub fn on_shelf(&self, location: Location) -> Self {
        Self {
            location: Some(location),
            ..self.clone()
        }
    }
}

/// Full field state written by create and update.
#[derive(Debug, Clone)]
pub struct BookInput {
    pub name: String,
    pub author: String,
    pub genre: String,
    pub location: Location,
    pub cover_path: Option<String>,
}

/// Repository for Book records. Every method is scoped to the owning user:
/// rows belonging to other users are invisible to queries and untouchable by
/// mutations.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Find the user's books matching the filter, ordered by name.
    async fn find_all(&self, user_id: i32, filter: &BookFilter) -> Result<Vec<Book>, DomainError>;

    /// Distinct authors across the user's books, alphabetically ordered.
    async fn distinct_authors(&self, user_id: i32) -> Result<Vec<String>, DomainError>;

    /// Distinct genres across the user's books, alphabetically ordered.
    async fn distinct_genres(&self, user_id: i32) -> Result<Vec<String>, DomainError>;

    /// Find one of the user's books by id.
    async fn find_by_id(&self, user_id: i32, id: i32) -> Result<Option<Book>, DomainError>;

    /// Create a new book owned by the user.
    async fn create(&self, user_id: i32, input: BookInput) -> Result<Book, DomainError>;

    /// Overwrite an existing book's fields. `NotFound` if the id does not
    /// exist or belongs to another user.
    async fn update(&self, user_id: i32, id: i32, input: BookInput) -> Result<Book, DomainError>;

    /// Delete one of the user's books, returning the deleted record so the
    /// caller can clean up its stored cover.
    async fn delete(&self, user_id: i32, id: i32) -> Result<Book, DomainError>;
}

/// Storage for cover image files under the media root.
#[async_trait]
pub trait CoverStore: Send + Sync {
    /// Persist `data` under a name derived from `logical_name` (collisions are
    /// avoided by the store's own naming policy). Returns the stored name.
    async fn save(&self, logical_name: &str, data: &[u8]) -> Result<String, DomainError>;

    /// Remove a stored file. Removing a name that no longer exists is not an
    /// error.
    async fn delete(&self, stored_name: &str) -> Result<(), DomainError>;
}
