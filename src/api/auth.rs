use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{create_jwt, hash_password, verify_password, Claims};
use crate::models::user;

#[derive(Deserialize)]
pub struct LoginRequest {
    username: String,
    password: String,
}

pub async fn login(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    tracing::info!("Login attempt for user: {}", payload.username);

    let found = user::Entity::find()
        .filter(user::Column::Username.eq(&payload.username))
        .one(&db)
        .await;

    let user = match found {
        Ok(Some(u)) => u,
        _ => {
            tracing::warn!("User not found: {}", payload.username);
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response();
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => match create_jwt(&user.username, user.id, &user.role) {
            Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))).into_response(),
            Err(e) => {
                tracing::error!("Failed to issue token for {}: {}", user.username, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to issue token" })),
                )
                    .into_response()
            }
        },
        _ => {
            tracing::warn!("Password verification failed for user: {}", user.username);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Invalid credentials" })),
            )
                .into_response()
        }
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    username: String,
    password: String,
    password_confirm: String,
}

/// Create a new account and hand back a token right away, so the fresh
/// session is authenticated without a separate login round-trip.
pub async fn register(
    State(db): State<DatabaseConnection>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let username = payload.username.trim();

    let mut errors: BTreeMap<&'static str, String> = BTreeMap::new();
    if username.is_empty() {
        errors.insert("username", "This field is required.".to_string());
    }
    if payload.password.len() < 8 {
        errors.insert(
            "password",
            "Password must be at least 8 characters.".to_string(),
        );
    }
    if payload.password != payload.password_confirm {
        errors.insert("password_confirm", "Passwords do not match.".to_string());
    }

    if !errors.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "errors": errors })),
        )
            .into_response();
    }

    match user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(&db)
        .await
    {
        Ok(Some(_)) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({ "errors": { "username": "This username is already taken." } })),
            )
                .into_response();
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!("Failed to check username availability: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Registration failed" })),
            )
                .into_response();
        }
    }

    let password_hash = match hash_password(&payload.password) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("Failed to hash password: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Registration failed" })),
            )
                .into_response();
        }
    };

    let now = chrono::Utc::now().to_rfc3339();
    let new_user = user::ActiveModel {
        username: Set(username.to_string()),
        password_hash: Set(password_hash),
        role: Set("user".to_string()),
        created_at: Set(now.clone()),
        updated_at: Set(now),
        ..Default::default()
    };

    let created = match new_user.insert(&db).await {
        Ok(model) => model,
        Err(e) => {
            tracing::error!("Failed to create user {}: {}", username, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Registration failed" })),
            )
                .into_response();
        }
    };

    tracing::info!("Account created for user: {}", created.username);

    match create_jwt(&created.username, created.id, &created.role) {
        Ok(token) => (
            StatusCode::CREATED,
            Json(json!({
                "token": token,
                "user": { "id": created.id, "username": created.username }
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to issue token for {}: {}", created.username, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Registration failed" })),
            )
                .into_response()
        }
    }
}

pub async fn me(claims: Claims) -> impl IntoResponse {
    Json(json!({
        "id": claims.uid,
        "username": claims.sub,
        "role": claims.role
    }))
}
