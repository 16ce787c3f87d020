use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use tower::util::ServiceExt; // for `oneshot`

use estante::infrastructure::AppState;
use estante::models::book::Location;
use estante::models::{book, user};
use estante::{api, auth, db};

const BOUNDARY: &str = "----estante-test-boundary";

async fn setup_test_db() -> DatabaseConnection {
    db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB")
}

fn test_media_root(tag: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("estante-books-{}-{}", tag, std::process::id()));
    std::fs::create_dir_all(&dir).expect("Failed to create media root");
    dir
}

fn test_app(db: DatabaseConnection, tag: &str) -> axum::Router {
    api::api_router(AppState::new(db, test_media_root(tag)))
}

async fn create_test_user(db: &DatabaseConnection, username: &str) -> (i32, String) {
    let now = chrono::Utc::now().to_rfc3339();
    let model = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set("$argon2id$unused".to_string()),
        role: Set("user".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    let uid = user::Entity::insert(model)
        .exec(db)
        .await
        .expect("Failed to create user")
        .last_insert_id;
    let token = auth::create_jwt(username, uid, "user").expect("Failed to create token");
    (uid, token)
}

async fn create_test_book(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    author: &str,
    genre: &str,
    location: Location,
) -> i32 {
    let now = chrono::Utc::now().to_rfc3339();
    let model = book::ActiveModel {
        name: Set(name.to_string()),
        author: Set(author.to_string()),
        genre: Set(genre.to_string()),
        location: Set(location),
        cover_path: Set(None),
        user_id: Set(user_id),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };
    book::Entity::insert(model)
        .exec(db)
        .await
        .expect("Failed to create book")
        .last_insert_id
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("Authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((name, filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(
    uri: &str,
    method: &str,
    token: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method(method)
        .header("Authorization", format!("Bearer {}", token))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(fields, file)))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

#[tokio::test]
async fn test_books_require_auth() {
    let db = setup_test_db().await;
    let app = test_app(db, "unauth");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/books")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/books")
                .header("Authorization", "Bearer bogus")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_home_partitions_and_filters() {
    let db = setup_test_db().await;
    let (uid, token) = create_test_user(&db, "reader").await;
    create_test_book(&db, uid, "War and Peace", "Tolstoy", "Classic", Location::Physical).await;
    create_test_book(&db, uid, "Anna Karenina", "Tolstoy", "Classic", Location::Kindle).await;
    let app = test_app(db, "home");

    // Unfiltered: both books, each on its own shelf
    let response = app.clone().oneshot(get("/books", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["shelves"]["physical"].as_array().unwrap().len(), 1);
    assert_eq!(body["shelves"]["kindle"].as_array().unwrap().len(), 1);
    assert_eq!(body["shelves"]["play_books"].as_array().unwrap().len(), 0);
    assert_eq!(body["shelves"]["wishlist"].as_array().unwrap().len(), 0);
    assert_eq!(body["authors"], serde_json::json!(["Tolstoy"]));
    assert_eq!(body["genres"], serde_json::json!(["Classic"]));

    // Free-text term keeps only the matching book
    let response = app
        .clone()
        .oneshot(get("/books?q=Anna", &token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["shelves"]["physical"].as_array().unwrap().len(), 0);
    let kindle = body["shelves"]["kindle"].as_array().unwrap();
    assert_eq!(kindle.len(), 1);
    assert_eq!(kindle[0]["name"], "Anna Karenina");
    assert_eq!(body["filters"]["q"], "Anna");

    // Original wire names still work for the other filters
    let response = app
        .clone()
        .oneshot(get("/books?autor=Tolstoy", &token))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["shelves"]["physical"].as_array().unwrap().len(), 1);
    assert_eq!(body["shelves"]["kindle"].as_array().unwrap().len(), 1);
    assert_eq!(body["filters"]["author"], "Tolstoy");

    // Unmatched genre empties every shelf
    let response = app
        .oneshot(get("/books?genero=Poetry", &token))
        .await
        .unwrap();
    let body = body_json(response).await;
    for shelf in ["physical", "kindle", "play_books", "wishlist"] {
        assert_eq!(body["shelves"][shelf].as_array().unwrap().len(), 0);
    }
}

#[tokio::test]
async fn test_home_is_scoped_to_the_requesting_user() {
    let db = setup_test_db().await;
    let (owner, _) = create_test_user(&db, "owner").await;
    let (_, other_token) = create_test_user(&db, "other").await;
    create_test_book(&db, owner, "Dune", "Herbert", "Sci-Fi", Location::Physical).await;
    let app = test_app(db, "home-scope");

    let response = app.oneshot(get("/books", &other_token)).await.unwrap();
    let body = body_json(response).await;
    for shelf in ["physical", "kindle", "play_books", "wishlist"] {
        assert_eq!(body["shelves"][shelf].as_array().unwrap().len(), 0);
    }
    assert_eq!(body["authors"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_new_book_form_lists_locations() {
    let db = setup_test_db().await;
    let (_, token) = create_test_user(&db, "reader").await;
    let app = test_app(db, "new-form");

    let response = app.oneshot(get("/books/new", &token)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(
        body["locations"],
        serde_json::json!(["physical", "kindle", "play_books", "wishlist"])
    );
}

#[tokio::test]
async fn test_add_book() {
    let db = setup_test_db().await;
    let (_, token) = create_test_user(&db, "adder").await;
    let app = test_app(db, "add");

    let response = app
        .clone()
        .oneshot(multipart_request(
            "/books",
            "POST",
            &token,
            &[
                ("name", "The Hobbit"),
                ("author", "Tolkien"),
                ("genre", "Fantasy"),
                ("location", "wishlist"),
            ],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["book"]["name"], "The Hobbit");
    assert_eq!(body["book"]["location"], "wishlist");
    assert!(body["message"].is_string());

    let response = app.oneshot(get("/books", &token)).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["shelves"]["wishlist"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_add_book_validation_errors() {
    let db = setup_test_db().await;
    let (_, token) = create_test_user(&db, "sloppy").await;
    let app = test_app(db, "add-invalid");

    // Everything missing
    let response = app
        .clone()
        .oneshot(multipart_request("/books", "POST", &token, &[], None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    for field in ["name", "author", "genre", "location"] {
        assert!(body["errors"][field].is_string(), "missing error for {}", field);
    }

    // Unknown location value
    let response = app
        .oneshot(multipart_request(
            "/books",
            "POST",
            &token,
            &[
                ("name", "Dune"),
                ("author", "Herbert"),
                ("genre", "Sci-Fi"),
                ("location", "attic"),
            ],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert!(body["errors"]["location"].is_string());
}

#[tokio::test]
async fn test_book_detail_and_not_found() {
    let db = setup_test_db().await;
    let (uid, token) = create_test_user(&db, "reader").await;
    let (_, other_token) = create_test_user(&db, "other").await;
    let book_id =
        create_test_book(&db, uid, "Dune", "Herbert", "Sci-Fi", Location::Kindle).await;
    let app = test_app(db, "detail");

    let response = app
        .clone()
        .oneshot(get(&format!("/books/{}", book_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["book"]["name"], "Dune");

    // Unknown id
    let response = app
        .clone()
        .oneshot(get("/books/9999", &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Someone else's book looks exactly like a missing one
    let response = app
        .oneshot(get(&format!("/books/{}", book_id), &other_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_edit_book() {
    let db = setup_test_db().await;
    let (uid, token) = create_test_user(&db, "editor").await;
    let (_, other_token) = create_test_user(&db, "other").await;
    let book_id =
        create_test_book(&db, uid, "Drafts", "Herbert", "Sci-Fi", Location::Wishlist).await;
    let app = test_app(db, "edit");

    // The edit form is pre-populated
    let response = app
        .clone()
        .oneshot(get(&format!("/books/{}/edit", book_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["book"]["name"], "Drafts");
    assert_eq!(body["locations"].as_array().unwrap().len(), 4);

    // Update moves the book to another shelf
    let response = app
        .clone()
        .oneshot(multipart_request(
            &format!("/books/{}", book_id),
            "PUT",
            &token,
            &[
                ("name", "Dune"),
                ("author", "Herbert"),
                ("genre", "Sci-Fi"),
                ("location", "physical"),
            ],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["book"]["name"], "Dune");
    assert_eq!(body["book"]["location"], "physical");

    // Not editable through another user's session
    let response = app
        .oneshot(multipart_request(
            &format!("/books/{}", book_id),
            "PUT",
            &other_token,
            &[
                ("name", "Hijacked"),
                ("author", "Nobody"),
                ("genre", "None"),
                ("location", "kindle"),
            ],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_requires_confirmation_step() {
    let db = setup_test_db().await;
    let (uid, token) = create_test_user(&db, "remover").await;
    let (_, other_token) = create_test_user(&db, "other").await;
    let book_id =
        create_test_book(&db, uid, "Dune", "Herbert", "Sci-Fi", Location::Physical).await;
    let app = test_app(db, "delete");

    // GET shows the confirmation context without deleting anything
    let response = app
        .clone()
        .oneshot(get(&format!("/books/{}/delete", book_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["book"]["name"], "Dune");

    let response = app
        .clone()
        .oneshot(get(&format!("/books/{}", book_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Another user cannot delete it
    let response = app
        .clone()
        .oneshot(multipart_request(
            &format!("/books/{}/delete", book_id),
            "POST",
            &other_token,
            &[],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // POST performs the deletion
    let response = app
        .clone()
        .oneshot(multipart_request(
            &format!("/books/{}/delete", book_id),
            "POST",
            &token,
            &[],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get(&format!("/books/{}", book_id), &token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Deleting again is a 404, not an error
    let response = app
        .oneshot(multipart_request(
            &format!("/books/{}/delete", book_id),
            "POST",
            &token,
            &[],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
