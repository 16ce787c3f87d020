use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub author: String,
    pub genre: String,
    pub location: Location,
    pub cover_path: Option<String>,
    pub user_id: i32,
    pub created_at: String,
    pub updated_at: String,
}

/// The four fixed shelves a book can live on.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(None)")]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[sea_orm(string_value = "physical")]
    Physical,
    #[sea_orm(string_value = "kindle")]
    Kindle,
    #[sea_orm(string_value = "play_books")]
    PlayBooks,
    #[sea_orm(string_value = "wishlist")]
    Wishlist,
}

impl Location {
    pub const ALL: [Location; 4] = [
        Location::Physical,
        Location::Kindle,
        Location::PlayBooks,
        Location::Wishlist,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Physical => "physical",
            Location::Kindle => "kindle",
            Location::PlayBooks => "play_books",
            Location::Wishlist => "wishlist",
        }
    }

    pub fn parse(value: &str) -> Option<Location> {
        match value {
            "physical" => Some(Location::Physical),
            "kindle" => Some(Location::Kindle),
            "play_books" => Some(Location::PlayBooks),
            "wishlist" => Some(Location::Wishlist),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// DTO for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: i32,
    pub name: String,
    pub author: String,
    pub genre: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

impl From<Model> for Book {
    fn from(model: Model) -> Self {
        let cover_url = model.cover_path.as_ref().map(|p| format!("/media/{}", p));

        Self {
            id: model.id,
            name: model.name,
            author: model.author,
            genre: model.genre,
            location: model.location,
            cover_path: model.cover_path,
            cover_url,
        }
    }
}
