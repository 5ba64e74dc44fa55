use crate::auth::AuthError;
use crate::models::{Credentials, NewPhoto, PhotoUpdate};
use crate::service::ServiceError;
use crate::state::AppState;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, DefaultBodyLimit, FromRequest, Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    /// A request body axum could not turn into JSON, with its status.
    Rejected(StatusCode, String),
    Internal(&'static str),
}

impl ApiError {
    /// Map a service failure; store errors collapse into `generic`.
    fn service(e: ServiceError, generic: &'static str) -> Self {
        match e {
            ServiceError::ValidationFailed(msg) => ApiError::BadRequest(msg),
            ServiceError::NotFound(id) => ApiError::NotFound(format!("Photo {id} not found")),
            ServiceError::Store(e) => {
                tracing::error!(error = %e, "{generic}");
                ApiError::Internal(generic)
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UnknownUser | AuthError::WrongPassword => {
                ApiError::Unauthorized(e.to_string())
            }
            AuthError::UsernameTaken => ApiError::Conflict(e.to_string()),
            AuthError::ValidationFailed(msg) => ApiError::BadRequest(msg),
            AuthError::Database(_) | AuthError::Security(_) => {
                tracing::error!(error = %e, "Authentication backend failure");
                ApiError::Internal("Database error")
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "Rejected request body");
        ApiError::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Rejected(status, msg) => (status, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// `Json` whose rejections answer with the API's `{"error"}` body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

pub fn router(
    state: AppState,
    body_limit: usize,
    static_dir: Option<&std::path::Path>,
) -> Router {
    let api = Router::new()
        .route("/login", post(login))
        .route("/signup", post(signup))
        .route("/photos", post(create_photo))
        .route("/photos/:id", get(list_photos).put(update_photo).delete(delete_photo))
        .route("/health", get(health));

    let app = Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    }
}

/// Serve `app` on `addr` until `shutdown` resolves.
pub async fn start_server<F>(addr: SocketAddr, app: Router, shutdown: F) -> std::io::Result<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Photo gallery server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on the first SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("Received shutdown signal");
}

async fn login(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<Json<Value>, ApiError> {
    let auth = state.auth.clone();
    let identity = tokio::task::spawn_blocking(move || {
        auth.login(&credentials.username, credentials.password.as_deref())
    })
    .await
    .map_err(|_| ApiError::Internal("Login failed"))??;

    Ok(Json(json!(identity)))
}

async fn signup(
    State(state): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    let auth = state.auth.clone();
    let identity = tokio::task::spawn_blocking(move || {
        auth.signup(
            &credentials.username,
            credentials.password.as_deref().unwrap_or_default(),
        )
    })
    .await
    .map_err(|_| ApiError::Internal("Signup failed"))??;

    Ok((StatusCode::CREATED, Json(json!(identity))))
}

async fn list_photos(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let photos = state
        .photos
        .list(&user_id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to load photos"))?;
    Ok(Json(json!({ "photos": photos })))
}

async fn create_photo(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewPhoto>,
) -> Result<Json<Value>, ApiError> {
    let photo = state
        .photos
        .save(new)
        .await
        .map_err(|e| ApiError::service(e, "Failed to save photo"))?;
    Ok(Json(json!({ "id": photo.id })))
}

async fn update_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(update): ApiJson<PhotoUpdate>,
) -> Result<Json<Value>, ApiError> {
    state
        .photos
        .update(&id, update)
        .await
        .map_err(|e| ApiError::service(e, "Failed to update photo"))?;
    Ok(Json(json!({ "success": true })))
}

async fn delete_photo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .photos
        .delete(&id)
        .await
        .map_err(|e| ApiError::service(e, "Failed to delete photo"))?;
    Ok(Json(json!({ "success": true })))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "remote": state.photos.has_remote() }))
}
