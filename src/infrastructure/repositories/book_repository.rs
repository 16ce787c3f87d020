//! SeaORM implementation of BookRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::{BookFilter, BookInput, BookRepository, DomainError};
use crate::models::Book;
use crate::models::book::{ActiveModel, Column, Entity as BookEntity};

/// SeaORM-based implementation of BookRepository
pub struct SeaOrmBookRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl BookRepository for SeaOrmBookRepository {
    async fn find_all(&self, user_id: i32, filter: &BookFilter) -> Result<Vec<Book>, DomainError> {
        let mut query = BookEntity::find().filter(Column::UserId.eq(user_id));

        if let Some(location) = filter.location {
            query = query.filter(Column::Location.eq(location));
        }

        // Substring match on name OR author; LIKE is case-insensitive for
        // ASCII under SQLite.
        if let Some(term) = &filter.term
            && !term.is_empty()
        {
            let cond = Condition::any()
                .add(Column::Name.contains(term))
                .add(Column::Author.contains(term));
            query = query.filter(cond);
        }

        if let Some(author) = &filter.author
            && !author.is_empty()
        {
            query = query.filter(Column::Author.eq(author));
        }

        if let Some(genre) = &filter.genre
            && !genre.is_empty()
        {
            query = query.filter(Column::Genre.eq(genre));
        }

        let books = query.order_by_asc(Column::Name).all(&self.db).await?;

        Ok(books.into_iter().map(Book::from).collect())
    }

    async fn distinct_authors(&self, user_id: i32) -> Result<Vec<String>, DomainError> {
        let authors = BookEntity::find()
            .select_only()
            .column(Column::Author)
            .filter(Column::UserId.eq(user_id))
            .distinct()
            .order_by_asc(Column::Author)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(authors)
    }

    async fn distinct_genres(&self, user_id: i32) -> Result<Vec<String>, DomainError> {
        let genres = BookEntity::find()
            .select_only()
            .column(Column::Genre)
            .filter(Column::UserId.eq(user_id))
            .distinct()
            .order_by_asc(Column::Genre)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(genres)
    }

    async fn find_by_id(&self, user_id: i32, id: i32) -> Result<Option<Book>, DomainError> {
        let book = BookEntity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;

        Ok(book.map(Book::from))
    }

    async fn create(&self, user_id: i32, input: BookInput) -> Result<Book, DomainError> {
        let now = chrono::Utc::now().to_rfc3339();

        let new_book = ActiveModel {
            name: Set(input.name),
            author: Set(input.author),
            genre: Set(input.genre),
            location: Set(input.location),
            cover_path: Set(input.cover_path),
            user_id: Set(user_id),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = new_book.insert(&self.db).await?;
        Ok(Book::from(result))
    }

    async fn update(&self, user_id: i32, id: i32, input: BookInput) -> Result<Book, DomainError> {
        let existing = BookEntity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let mut active: ActiveModel = existing.into();
        active.name = Set(input.name);
        active.author = Set(input.author);
        active.genre = Set(input.genre);
        active.location = Set(input.location);
        active.cover_path = Set(input.cover_path);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let result = active.update(&self.db).await?;
        Ok(Book::from(result))
    }

    async fn delete(&self, user_id: i32, id: i32) -> Result<Book, DomainError> {
        let existing = BookEntity::find_by_id(id)
            .filter(Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or(DomainError::NotFound)?;

        let book = Book::from(existing.clone());
        existing.delete(&self.db).await?;

        Ok(book)
    }
}
