use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use addrbook_core::models::{
    EntryForm, EntryPatch, RegistrationForm, UserProfile, ValidationErrors,
};
use addrbook_core::search::SearchOutcome;
use addrbook_core::services::{AddressBookService, CreateOutcome, RegistrationOutcome};
use addrbook_core::{EditOutcome, EditSession, Entry, EntryId, EntryVersion, UserId};
use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{extract_bearer_token, AuthenticatedUser, JwtVerifier};
use crate::config::AppConfig;
use crate::error::AppError;
use crate::extract::{ApiJson, ApiQuery};

const CONFLICT_MESSAGE: &str = "Another user has modified this record. Re-enter your changes.";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    jwt_verifier: Arc<JwtVerifier>,
    service: AddressBookService,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, service: AddressBookService) -> Self {
        Self {
            jwt_verifier: Arc::new(JwtVerifier::new(&config)),
            service,
            config,
        }
    }
}

pub fn app_router(state: AppState) -> Router {
    let entry_routes = Router::new()
        .route("/entries", get(search_entries).post(create_entry))
        .route(
            "/entries/{id}",
            get(begin_edit).put(submit_edit).delete(delete_entry),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_profile,
        ));

    let protected_routes = Router::new()
        .route("/register", post(register))
        .route("/me", get(me))
        .merge(entry_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/v1", protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods(Any),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: i64,
}

async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().timestamp(),
    })
}

async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let user = state.jwt_verifier.verify_access_token(token)?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Entry routes are only open to users who registered a profile.
async fn require_profile(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|user| user.user_id.clone())
        .ok_or_else(|| AppError::unauthorized("Missing authenticated user"))?;

    let profile = state
        .service
        .profile(user_id)
        .await?
        .ok_or_else(|| AppError::forbidden("Register a profile before using the address book"))?;
    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}

/// Body for responses that carry one entry.
#[derive(Debug, Serialize)]
struct EntryBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<ValidationErrors>,
    entry: Entry,
    version: EntryVersion,
}

impl EntryBody {
    fn new(entry: Entry) -> Self {
        Self {
            message: None,
            error: None,
            errors: None,
            version: entry.version(),
            entry,
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct ValidationBody {
    errors: ValidationErrors,
}

fn validation_failed(errors: ValidationErrors) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ValidationBody { errors }),
    )
        .into_response()
}

fn parse_entry_id(raw: &str) -> Result<EntryId, AppError> {
    raw.parse().map_err(|_| AppError::record_not_found(raw))
}

async fn register(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(form): ApiJson<RegistrationForm>,
) -> Result<Response, AppError> {
    let user_hash = user_fingerprint(&user.user_id);
    let session = user.session_id.unwrap_or_else(|| "none".to_string());
    match state.service.register(form, user.user_id).await? {
        RegistrationOutcome::Registered(profile) => {
            tracing::info!(
                endpoint = "register",
                user = user_hash,
                session = %session,
                "Registered profile"
            );
            Ok((StatusCode::CREATED, Json(profile)).into_response())
        }
        RegistrationOutcome::Invalid(errors) => Ok(validation_failed(errors)),
    }
}

async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<Json<UserProfile>, AppError> {
    state
        .service
        .profile(user.user_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("You are not registered.".to_string()))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    last: String,
}

async fn search_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<SearchQuery>,
) -> Result<Json<SearchOutcome>, AppError> {
    Ok(Json(state.service.search(&query.last).await?))
}

async fn create_entry(
    State(state): State<AppState>,
    Extension(profile): Extension<UserProfile>,
    ApiJson(form): ApiJson<EntryForm>,
) -> Result<Response, AppError> {
    match state.service.create(form, profile.id.clone()).await? {
        CreateOutcome::Created(entry) => {
            tracing::info!(
                endpoint = "create_entry",
                user = user_fingerprint(&profile.id),
                entry = %entry.id,
                "Created entry"
            );
            let body = EntryBody::new(entry).with_message("Entry created");
            Ok((StatusCode::CREATED, Json(body)).into_response())
        }
        CreateOutcome::Invalid(errors) => Ok(validation_failed(errors)),
    }
}

async fn begin_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EditSession>, AppError> {
    let id = parse_entry_id(&id)?;
    Ok(Json(state.service.begin_edit(id).await?))
}

#[derive(Debug, Deserialize)]
struct SubmitEditRequest {
    version: EntryVersion,
    #[serde(flatten)]
    changes: EntryPatch,
    #[serde(flatten)]
    unknown: BTreeMap<String, serde_json::Value>,
}

impl SubmitEditRequest {
    /// Keys that name no entry field, or an empty patch, are refused.
    fn into_changes(self) -> Result<(EntryVersion, EntryPatch), AppError> {
        if !self.unknown.is_empty() {
            let names: Vec<&str> = self.unknown.keys().map(String::as_str).collect();
            return Err(AppError::BadRequest(format!(
                "Unknown entry fields: {}",
                names.join(", ")
            )));
        }
        if self.changes.is_empty() {
            return Err(AppError::BadRequest(
                "An edit must change at least one field".to_string(),
            ));
        }
        Ok((self.version, self.changes))
    }
}

async fn submit_edit(
    State(state): State<AppState>,
    Extension(profile): Extension<UserProfile>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<SubmitEditRequest>,
) -> Result<Response, AppError> {
    let id = parse_entry_id(&id)?;
    let (version, changes) = request.into_changes()?;
    let user_hash = user_fingerprint(&profile.id);
    let outcome = state
        .service
        .submit_edit(id, version, changes, profile.id)
        .await?;

    match outcome {
        EditOutcome::Success(entry) => {
            tracing::info!(endpoint = "submit_edit", user = user_hash, entry = %id, "Updated entry");
            let body = EntryBody::new(entry).with_message("Entry updated.");
            Ok((StatusCode::OK, Json(body)).into_response())
        }
        EditOutcome::Conflict(current) => {
            tracing::info!(endpoint = "submit_edit", user = user_hash, entry = %id, "Edit conflict");
            let body = EntryBody {
                error: Some(CONFLICT_MESSAGE),
                ..EntryBody::new(current)
            };
            Ok((StatusCode::CONFLICT, Json(body)).into_response())
        }
        EditOutcome::Invalid { entry, errors } => {
            let body = EntryBody {
                errors: Some(errors),
                ..EntryBody::new(entry)
            };
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response())
        }
        EditOutcome::NotFound(id) => Err(AppError::record_not_found(id)),
    }
}

async fn delete_entry(
    State(state): State<AppState>,
    Extension(profile): Extension<UserProfile>,
    Path(id): Path<String>,
) -> Result<Json<EntryBody>, AppError> {
    let id = parse_entry_id(&id)?;
    let entry = state.service.delete(id).await?;
    tracing::info!(
        endpoint = "delete_entry",
        user = user_fingerprint(&profile.id),
        entry = %id,
        "Deleted entry"
    );
    let message = format!("Entry for {} has been deleted.", entry.display_name());
    Ok(Json(EntryBody::new(entry).with_message(message)))
}

fn user_fingerprint(user_id: &UserId) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    user_id.hash(&mut hasher);
    hasher.finish()
}
