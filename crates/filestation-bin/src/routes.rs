//! HTTP surface: public file sharing plus the gated admin routes.
use std::net::SocketAddr;
use std::time::{Duration, SystemTime};

use axum::{
    extract::{ConnectInfo, DefaultBodyLimit, FromRef, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue},
    middleware::from_fn_with_state,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use filestation_lib::{
    error::AuthError,
    middleware::{require_csrf, require_session, session_cookie, LOGIN_PATH, SESSION_COOKIE},
    AppState,
};

use crate::error::ShareError;
use crate::store::{FileMetadata, FileStore};

/// Upload size cap.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024 * 1024;

/// Expiration applied when the uploader picks none.
const DEFAULT_EXPIRATION_HOURS: u64 = 24;

/// State for the full server: the auth core plus the file collaborator.
#[derive(Clone)]
pub struct ServerState {
    pub app: AppState,
    pub store: FileStore,
}

impl FromRef<ServerState> for AppState {
    fn from_ref(state: &ServerState) -> AppState {
        state.app.clone()
    }
}

impl FromRef<ServerState> for FileStore {
    fn from_ref(state: &ServerState) -> FileStore {
        state.store.clone()
    }
}

pub fn router(state: ServerState) -> Router {
    let admin = Router::new()
        .route("/admin", get(dashboard))
        .route("/admin/password", get(password_form).post(change_password))
        .route("/admin/logout", get(logout))
        .route("/admin/delete/{filename}", post(delete_file))
        .route_layer(from_fn_with_state(state.app.clone(), require_session))
        .route("/admin/login", get(login_form).post(login))
        .route_layer(from_fn_with_state(state.app.clone(), require_csrf));

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/download/{filename}", get(download).post(download_post))
        .merge(admin)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
struct LoginForm {
    password: String,
}

#[derive(Deserialize)]
struct PasswordForm {
    old_password: String,
    new_password: String,
}

#[derive(Deserialize)]
struct DownloadForm {
    #[serde(default)]
    password: String,
}

/// Public listing of unexpired shared files.
async fn index(
    State(app): State<AppState>,
    State(store): State<FileStore>,
) -> Result<Json<serde_json::Value>, ShareError> {
    let files = store.list().await?;
    Ok(Json(serde_json::json!({
        "site_title": app.settings.site_title,
        "files": files,
    })))
}

/// Anonymous multipart upload: `file` plus optional `description`,
/// `password`, and `expiration` (hours) fields. A password is hashed with
/// the same primitives as the admin credential but is independent of it.
async fn upload(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ShareError> {
    let mut data = None;
    let mut original = String::new();
    let mut description = String::new();
    let mut password = None;
    let mut expiration_hours = DEFAULT_EXPIRATION_HOURS;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ShareError::BadUpload(err.to_string()))?
    {
        match field.name() {
            Some("file") => {
                original = field.file_name().unwrap_or("upload").to_string();
                data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|err| ShareError::BadUpload(err.to_string()))?,
                );
            },
            Some("description") => {
                description = field
                    .text()
                    .await
                    .map_err(|err| ShareError::BadUpload(err.to_string()))?;
            },
            Some("password") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ShareError::BadUpload(err.to_string()))?;
                if !text.is_empty() {
                    password = Some(text);
                }
            },
            Some("expiration") => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| ShareError::BadUpload(err.to_string()))?;
                expiration_hours = match text.parse() {
                    Ok(0) | Err(_) => DEFAULT_EXPIRATION_HOURS,
                    Ok(hours) => hours,
                };
            },
            _ => {},
        }
    }

    let data = data.ok_or_else(|| ShareError::BadUpload("no file uploaded".to_string()))?;
    if description.is_empty() {
        description = "no description provided".to_string();
    }
    let password_hash = match password {
        Some(plain) => Some(state.app.auth.hash_password(&plain)?),
        None => None,
    };

    let now = SystemTime::now();
    let meta = FileMetadata {
        description,
        original_filename: original.clone(),
        uploader_addr: client_addr(&headers, peer),
        upload_time: now,
        expiration_time: now + Duration::from_secs(expiration_hours * 3600),
        password_hash,
    };
    let stored = state.store.save(&original, &data, meta).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "filename": stored,
    })))
}

/// Download a shared file. Password-protected files answer with a
/// `password_required` marker instead of the content; the client retries
/// with a POST carrying the password.
async fn download(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> Result<Response, ShareError> {
    let meta = state.store.metadata(&filename).await?;
    if meta.is_expired(SystemTime::now()) {
        return Err(ShareError::NotFound);
    }
    if meta.has_password() {
        return Ok(Json(serde_json::json!({
            "password_required": true,
            "filename": meta.original_filename,
        }))
        .into_response());
    }
    serve_file(&state.store, &filename, &meta).await
}

async fn download_post(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
    Form(form): Form<DownloadForm>,
) -> Result<Response, ShareError> {
    let meta = state.store.metadata(&filename).await?;
    if meta.is_expired(SystemTime::now()) {
        return Err(ShareError::NotFound);
    }
    if let Some(hash) = &meta.password_hash {
        if !state.app.auth.verify_password(hash, &form.password) {
            return Err(ShareError::WrongPassword);
        }
    }
    serve_file(&state.store, &filename, &meta).await
}

async fn serve_file(
    store: &FileStore,
    stored: &str,
    meta: &FileMetadata,
) -> Result<Response, ShareError> {
    let data = store.read(stored).await?;
    let mut response = data.into_response();
    let disposition = format!(
        "attachment; filename=\"{}\"",
        meta.original_filename.replace('"', "")
    );
    set_header(&mut response, header::CONTENT_DISPOSITION, &disposition);
    Ok(response)
}

/// Hand the login flow a fresh one-time CSRF token.
async fn login_form(State(app): State<AppState>) -> Json<serde_json::Value> {
    let csrf_token = app.auth.issue_csrf_token();
    Json(serde_json::json!({
        "site_title": app.settings.site_title,
        "csrf_token": csrf_token,
    }))
}

async fn login(
    State(app): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AuthError> {
    let addr = client_addr(&headers, peer);
    let token = app.auth.login(&form.password, &addr)?;

    let mut response = Redirect::to("/admin").into_response();
    set_header(
        &mut response,
        header::SET_COOKIE,
        &format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict"),
    );
    Ok(response)
}

async fn logout(State(app): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = session_cookie(&headers) {
        app.auth.logout(&token);
    }
    let mut response = Redirect::to(LOGIN_PATH).into_response();
    set_header(
        &mut response,
        header::SET_COOKIE,
        &format!("{SESSION_COOKIE}=; Path=/; HttpOnly; Max-Age=0"),
    );
    response
}

/// Hand the change-password form a fresh one-time CSRF token.
async fn password_form(State(app): State<AppState>) -> Json<serde_json::Value> {
    let csrf_token = app.auth.issue_csrf_token();
    Json(serde_json::json!({
        "site_title": app.settings.site_title,
        "csrf_token": csrf_token,
    }))
}

async fn change_password(
    State(app): State<AppState>,
    Form(form): Form<PasswordForm>,
) -> Result<Response, AuthError> {
    app.auth
        .change_password(&form.old_password, &form.new_password)?;
    // every session is revoked now, including the caller's
    Ok(Redirect::to(LOGIN_PATH).into_response())
}

/// Admin dashboard: the full file listing plus a CSRF token for the
/// delete forms.
async fn dashboard(
    State(app): State<AppState>,
    State(store): State<FileStore>,
) -> Result<Json<serde_json::Value>, ShareError> {
    let files = store.list().await?;
    let csrf_token = app.auth.issue_csrf_token();
    Ok(Json(serde_json::json!({
        "site_title": app.settings.site_title,
        "files": files,
        "csrf_token": csrf_token,
    })))
}

async fn delete_file(
    State(store): State<FileStore>,
    Path(filename): Path<String>,
) -> Result<Response, ShareError> {
    store.delete(&filename).await?;
    Ok(Redirect::to("/admin").into_response())
}

/// Best-effort client address for the rate limiter: first `X-Forwarded-For`
/// entry, then `X-Real-IP`, then the socket peer. The auth core trusts
/// whatever string it is handed.
fn client_addr(headers: &HeaderMap, peer: SocketAddr) -> String {
    if let Some(forwarded) = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip").and_then(|value| value.to_str().ok()) {
        return real_ip.to_string();
    }
    peer.ip().to_string()
}

fn set_header(response: &mut Response, name: header::HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        response.headers_mut().append(name, value);
    }
}
