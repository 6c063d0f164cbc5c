//! HTTP surface over the registry
//!
//! Thin glue: decode the request, call the registry, map the typed result
//! to a status code. No business rules live here.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use userstore::User;

use crate::registry::{RegistryError, UserRegistry};

/// Error body: `{"error": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create response: `{"userId": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateUserResponse {
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Get response: `{"user": {...}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct GetUserResponse {
    pub user: User,
}

/// Plain message body: `{"message": "..."}`
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create request body. There is deliberately no id field to bind - a
/// supplied id is ignored, the registry always generates one. Missing
/// fields decode as empty strings and fail validation instead of producing
/// a body-shape error.
#[derive(Debug, Deserialize)]
struct CreateUserRequest {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
}

/// Update request body.
#[derive(Debug, Deserialize)]
struct UpdateUserRequest {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default, rename = "lastName")]
    last_name: String,
}

/// Build the application router.
pub fn router(registry: UserRegistry) -> Router {
    Router::new()
        .route("/users", post(create_user))
        .route("/users", put(update_user))
        .route("/users/:user_id", get(get_user))
        .route("/users/:user_id", delete(remove_user))
        .with_state(registry)
}

/// Serve the router until ctrl-c.
pub async fn run(listener: tokio::net::TcpListener, registry: UserRegistry) -> eyre::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "http server listening");

    let app = router(registry);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    Ok(())
}

fn error_status(err: &RegistryError) -> StatusCode {
    match err {
        RegistryError::Validation(_) => StatusCode::BAD_REQUEST,
        RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::ChannelClosed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: RegistryError) -> Response {
    let status = error_status(&err);
    (status, Json(ErrorResponse { error: err.to_string() })).into_response()
}

async fn create_user(State(registry): State<UserRegistry>, Json(body): Json<CreateUserRequest>) -> Response {
    info!("create user request received");

    match registry.create(&body.name, &body.last_name).await {
        Ok(user_id) => (StatusCode::OK, Json(CreateUserResponse { user_id })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_user(State(registry): State<UserRegistry>, Path(user_id): Path<String>) -> Response {
    match registry.get(&user_id).await {
        Ok(user) => (StatusCode::OK, Json(GetUserResponse { user })).into_response(),
        Err(err) => error_response(err),
    }
}

async fn update_user(State(registry): State<UserRegistry>, Json(body): Json<UpdateUserRequest>) -> Response {
    info!(user_id = %body.id, "update user request received");

    let user = User::with_id(body.id, body.name, body.last_name);
    let user_id = user.id.clone();

    match registry.update(user).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("user updated successfully. UserId: {user_id}"),
            }),
        )
            .into_response(),
        Ok(false) => error_response(RegistryError::NotFound(user_id)),
        Err(err) => error_response(err),
    }
}

async fn remove_user(State(registry): State<UserRegistry>, Path(user_id): Path<String>) -> Response {
    match registry.remove(&user_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(MessageResponse {
                message: format!("user removed successfully. UserId: {user_id}"),
            }),
        )
            .into_response(),
        Ok(false) => error_response(RegistryError::NotFound(user_id)),
        Err(err) => error_response(err),
    }
}
