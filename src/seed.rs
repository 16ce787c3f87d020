use crate::auth::hash_password;
use crate::models::book::{self, Location};
use crate::models::user;
use sea_orm::*;

pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<(), DbErr> {
    let now = chrono::Utc::now().to_rfc3339();

    // 1. Create demo user
    let password_hash = hash_password("demo-password")
        .map_err(|e| DbErr::Custom(format!("failed to hash demo password: {}", e)))?;

    let demo = user::ActiveModel {
        username: Set("demo".to_owned()),
        password_hash: Set(password_hash),
        role: Set("user".to_owned()),
        created_at: Set(now.clone()),
        updated_at: Set(now.clone()),
        ..Default::default()
    };

    match user::Entity::insert(demo)
        .on_conflict(
            sea_orm::sea_query::OnConflict::column(user::Column::Username)
                .do_nothing()
                .to_owned(),
        )
        .exec(db)
        .await
    {
        Ok(_) | Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e),
    }

    let Some(demo_user) = user::Entity::find()
        .filter(user::Column::Username.eq("demo"))
        .one(db)
        .await?
    else {
        return Err(DbErr::Custom("demo user missing after seed".to_owned()));
    };

    // 2. Create demo books, once
    let existing = book::Entity::find()
        .filter(book::Column::UserId.eq(demo_user.id))
        .count(db)
        .await?;

    if existing > 0 {
        return Ok(());
    }

    let books = [
        ("The Hobbit", "J.R.R. Tolkien", "Fantasy", Location::Physical),
        ("Dune", "Frank Herbert", "Sci-Fi", Location::Kindle),
        ("Foundation", "Isaac Asimov", "Sci-Fi", Location::PlayBooks),
        (
            "The Silmarillion",
            "J.R.R. Tolkien",
            "Fantasy",
            Location::Wishlist,
        ),
    ];

    for (name, author, genre, location) in books {
        let model = book::ActiveModel {
            name: Set(name.to_owned()),
            author: Set(author.to_owned()),
            genre: Set(genre.to_owned()),
            location: Set(location),
            cover_path: Set(None),
            user_id: Set(demo_user.id),
            created_at: Set(now.clone()),
            updated_at: Set(now.clone()),
            ..Default::default()
        };
        book::Entity::insert(model).exec(db).await?;
    }

    Ok(())
}
