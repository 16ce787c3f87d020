use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::ApiError;
use crate::auth::Claims;
use crate::domain::{BookFilter, BookInput, DomainError};
use crate::infrastructure::AppState;
use crate::models::book::{Book, Location};

/// Logical filename for covers downloaded during add, where the original
/// filename is irrelevant.
const DOWNLOADED_COVER_NAME: &str = "capa_baixada.jpg";

// ---------------------------------------------------------------------------
// Listing / filtering
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct HomeQuery {
    /// Free-text term matched against name or author.
    #[serde(default, alias = "q")]
    pub term: Option<String>,
    #[serde(default, alias = "autor")]
    pub author: Option<String>,
    #[serde(default, alias = "genero")]
    pub genre: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Shelves {
    pub physical: Vec<Book>,
    pub kindle: Vec<Book>,
    pub play_books: Vec<Book>,
    pub wishlist: Vec<Book>,
}

#[derive(Debug, Serialize)]
pub struct AppliedFilters {
    pub q: Option<String>,
    pub author: Option<String>,
    pub genre: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub shelves: Shelves,
    /// Distinct authors across the user's books, for the filter dropdown.
    pub authors: Vec<String>,
    /// Distinct genres across the user's books, for the filter dropdown.
    pub genres: Vec<String>,
    pub filters: AppliedFilters,
}

fn clean(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn home(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<HomeQuery>,
) -> Result<Json<HomePage>, ApiError> {
    let filter = BookFilter {
        location: None,
        term: clean(query.term),
        author: clean(query.author),
        genre: clean(query.genre),
    };

    let shelves = Shelves {
        physical: state
            .books
            .find_all(claims.uid, &filter.on_shelf(Location::Physical))
            .await?,
        kindle: state
            .books
            .find_all(claims.uid, &filter.on_shelf(Location::Kindle))
            .await?,
        play_books: state
            .books
            .find_all(claims.uid, &filter.on_shelf(Location::PlayBooks))
            .await?,
        wishlist: state
            .books
            .find_all(claims.uid, &filter.on_shelf(Location::Wishlist))
            .await?,
    };

    let authors = state.books.distinct_authors(claims.uid).await?;
    let genres = state.books.distinct_genres(claims.uid).await?;

    Ok(Json(HomePage {
        shelves,
        authors,
        genres,
        filters: AppliedFilters {
            q: filter.term,
            author: filter.author,
            genre: filter.genre,
        },
    }))
}

// ---------------------------------------------------------------------------
// Form parsing and validation
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct CoverUpload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Raw multipart submission for add and edit.
#[derive(Debug, Default)]
pub struct BookForm {
    name: Option<String>,
    author: Option<String>,
    genre: Option<String>,
    location: Option<String>,
    cover: Option<CoverUpload>,
    cover_url: Option<String>,
}

/// The validated fields of a BookForm.
pub struct ValidBook {
    pub name: String,
    pub author: String,
    pub genre: String,
    pub location: Location,
}

fn bad_form(e: impl std::fmt::Display) -> ApiError {
    ApiError::Domain(DomainError::Validation(format!(
        "malformed form data: {}",
        e
    )))
}

impl BookForm {
    pub async fn from_multipart(multipart: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = BookForm::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
            let name = field.name().map(str::to_owned);
            match name.as_deref() {
                Some("name") => form.name = Some(field.text().await.map_err(bad_form)?),
                Some("author") => form.author = Some(field.text().await.map_err(bad_form)?),
                Some("genre") => form.genre = Some(field.text().await.map_err(bad_form)?),
                Some("location") => form.location = Some(field.text().await.map_err(bad_form)?),
                Some("cover_url") => form.cover_url = Some(field.text().await.map_err(bad_form)?),
                Some("cover") => {
                    let filename = field
                        .file_name()
                        .map(str::to_owned)
                        .unwrap_or_else(|| "cover.jpg".to_string());
                    let data = field.bytes().await.map_err(bad_form)?;
                    // Browsers submit an empty part for an untouched file input
                    if !data.is_empty() {
                        form.cover = Some(CoverUpload {
                            filename,
                            data: data.to_vec(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }

    pub fn validate(&self) -> Result<ValidBook, ApiError> {
        fn required(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        }

        let mut errors: BTreeMap<&'static str, String> = BTreeMap::new();

        let name = required(&self.name);
        if name.is_none() {
            errors.insert("name", "This field is required.".to_string());
        }

        let author = required(&self.author);
        if author.is_none() {
            errors.insert("author", "This field is required.".to_string());
        }

        let genre = required(&self.genre);
        if genre.is_none() {
            errors.insert("genre", "This field is required.".to_string());
        }

        let location = match required(&self.location) {
            None => {
                errors.insert("location", "This field is required.".to_string());
                None
            }
            Some(raw) => match Location::parse(&raw) {
                Some(location) => Some(location),
                None => {
                    errors.insert(
                        "location",
                        format!("'{}' is not one of the available choices.", raw),
                    );
                    None
                }
            },
        };

        match (name, author, genre, location) {
            (Some(name), Some(author), Some(genre), Some(location)) if errors.is_empty() => {
                Ok(ValidBook {
                    name,
                    author,
                    genre,
                    location,
                })
            }
            _ => Err(ApiError::Form(errors)),
        }
    }

    pub fn cover_url(&self) -> Option<&str> {
        self.cover_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    pub fn take_cover(&mut self) -> Option<CoverUpload> {
        self.cover.take()
    }
}

/// Logical filename for a cover downloaded during edit: the basename of the
/// URL path, like the original upload would have carried.
fn cover_name_from_url(raw: &str) -> String {
    url::Url::parse(raw)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| DOWNLOADED_COVER_NAME.to_string())
}

/// Download a cover and hand it to the store. Failures are non-fatal: they
/// surface as a warning on the response while the record still saves.
async fn download_cover(
    state: &AppState,
    url: &str,
    logical_name: &str,
    warning: &mut Option<String>,
) -> Option<String> {
    let data = match state.fetcher.fetch(url).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!("Failed to download cover from {}: {}", url, e);
            *warning = Some(format!("Failed to download cover image from URL: {}", e));
            return None;
        }
    };

    match state.covers.save(logical_name, &data).await {
        Ok(stored) => Some(stored),
        Err(e) => {
            tracing::warn!("Failed to store downloaded cover: {}", e);
            *warning = Some(format!("Failed to store downloaded cover image: {}", e));
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Add
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FormOptions {
    pub locations: Vec<&'static str>,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            locations: Location::ALL.iter().map(Location::as_str).collect(),
        }
    }
}

pub async fn new_book_form(_claims: Claims) -> Json<FormOptions> {
    Json(FormOptions::default())
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub book: Book,
}

pub async fn add_book(
    State(state): State<AppState>,
    claims: Claims,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut form = BookForm::from_multipart(&mut multipart).await?;
    let valid = form.validate()?;

    let mut warning = None;
    let cover_path = if let Some(upload) = form.take_cover() {
        Some(state.covers.save(&upload.filename, &upload.data).await?)
    } else if let Some(url) = form.cover_url() {
        download_cover(&state, url, DOWNLOADED_COVER_NAME, &mut warning).await
    } else {
        None
    };

    let book = state
        .books
        .create(
            claims.uid,
            BookInput {
                name: valid.name,
                author: valid.author,
                genre: valid.genre,
                location: valid.location,
                cover_path,
            },
        )
        .await?;

    tracing::info!(user = %claims.sub, book = book.id, "book added");

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse {
            message: "Book added successfully.".to_string(),
            warning,
            book,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

pub async fn book_detail(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state
        .books
        .find_by_id(claims.uid, id)
        .await?
        .ok_or(DomainError::NotFound)?;

    Ok(Json(json!({ "book": book })))
}

// ---------------------------------------------------------------------------
// Edit
// ---------------------------------------------------------------------------

pub async fn edit_book_form(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state
        .books
        .find_by_id(claims.uid, id)
        .await?
        .ok_or(DomainError::NotFound)?;

    Ok(Json(json!({
        "book": book,
        "locations": FormOptions::default().locations,
    })))
}

pub async fn edit_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<MutationResponse>, ApiError> {
    let existing = state
        .books
        .find_by_id(claims.uid, id)
        .await?
        .ok_or(DomainError::NotFound)?;

    let mut form = BookForm::from_multipart(&mut multipart).await?;
    let valid = form.validate()?;

    // Cover resolution: a new URL takes precedence over a simultaneous
    // upload; either replacement removes the previous stored file first.
    let mut warning = None;
    let cover_path = if let Some(url) = form.cover_url().map(str::to_owned) {
        if let Some(old) = &existing.cover_path {
            if let Err(e) = state.covers.delete(old).await {
                tracing::warn!("Failed to remove previous cover {}: {}", old, e);
            }
        }
        download_cover(&state, &url, &cover_name_from_url(&url), &mut warning).await
    } else if let Some(upload) = form.take_cover() {
        if let Some(old) = &existing.cover_path {
            if let Err(e) = state.covers.delete(old).await {
                tracing::warn!("Failed to remove previous cover {}: {}", old, e);
            }
        }
        Some(state.covers.save(&upload.filename, &upload.data).await?)
    } else {
        existing.cover_path.clone()
    };

    let book = state
        .books
        .update(
            claims.uid,
            id,
            BookInput {
                name: valid.name,
                author: valid.author,
                genre: valid.genre,
                location: valid.location,
                cover_path,
            },
        )
        .await?;

    tracing::info!(user = %claims.sub, book = book.id, "book updated");

    Ok(Json(MutationResponse {
        message: "Book updated successfully.".to_string(),
        warning,
        book,
    }))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

pub async fn confirm_delete(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let book = state
        .books
        .find_by_id(claims.uid, id)
        .await?
        .ok_or(DomainError::NotFound)?;

    Ok(Json(json!({ "book": book })))
}

pub async fn delete_book(
    State(state): State<AppState>,
    claims: Claims,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.books.delete(claims.uid, id).await?;

    // Remove the stored cover explicitly rather than leaning on any cascade
    if let Some(cover) = &deleted.cover_path {
        if let Err(e) = state.covers.delete(cover).await {
            tracing::warn!("Failed to remove cover {} of deleted book: {}", cover, e);
        }
    }

    tracing::info!(user = %claims.sub, book = deleted.id, "book deleted");

    Ok(Json(json!({ "message": "Book deleted successfully." })))
}
