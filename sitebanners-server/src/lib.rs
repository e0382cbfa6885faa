//! Admin HTTP API for the SiteBanners repository.
//!
//! Every handler goes through [`BannerRepository`], so the whole interceptor
//! chain applies to HTTP traffic exactly as it does to in-process callers.

pub mod demo;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sitebanners_intercept::interceptors::CacheStats;
use sitebanners_repository::{BannerRepository, MassActionReport, RepositoryError};
use sitebanners_types::{
    Banner, BannerField, BannerId, Clock, Filter, SearchCriteria, SearchResults,
};
use std::sync::Arc;
use tracing::{error, warn};

/// Fields a client may never set through an update.
const READ_ONLY_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Handler error, rendered as `{ "error": message }`.
#[derive(Debug)]
pub enum ApiError {
    Repository(RepositoryError),
    BadRequest(String),
    Disabled(&'static str),
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Disabled(_) => StatusCode::NOT_FOUND,
            Self::Repository(err) => match err {
                RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
                RepositoryError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                RepositoryError::OperationBlocked { .. } => StatusCode::CONFLICT,
                RepositoryError::TransientStore(_) => StatusCode::SERVICE_UNAVAILABLE,
                RepositoryError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                RepositoryError::Cancelled { .. }
                | RepositoryError::Interceptor { .. }
                | RepositoryError::UnexpectedOutcome { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Repository(err) => err.to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Disabled(what) => format!("{what} is disabled"),
        };
        if status.is_server_error() {
            error!(status = status.as_u16(), "{}", message);
        } else {
            warn!(status = status.as_u16(), "{}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;
type AppState = State<Arc<BannerRepository>>;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MassActionRequest {
    pub ids: Vec<BannerId>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MassActionResponse {
    pub message: String,
    pub processed: usize,
    pub errors: Vec<String>,
}

impl MassActionResponse {
    fn new(report: MassActionReport, verb: &str) -> Self {
        Self {
            message: format!("A total of {} record(s) have been {verb}.", report.processed),
            processed: report.processed,
            errors: report.errors,
        }
    }
}

async fn list_banners(
    State(repository): AppState,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<SearchResults>> {
    let mut builder = SearchCriteria::builder();
    if let Some(is_active) = params.is_active {
        builder = builder.add_filter(Filter::eq(BannerField::IsActive, is_active));
    }
    if let Some(page_size) = params.page_size {
        builder = builder.page_size(page_size);
    }
    if let Some(page) = params.page {
        builder = builder.current_page(page);
    }
    Ok(Json(repository.get_list(builder.build()).await?))
}

async fn search_banners(
    State(repository): AppState,
    Json(criteria): Json<SearchCriteria>,
) -> ApiResult<Json<SearchResults>> {
    Ok(Json(repository.get_list(criteria).await?))
}

async fn active_banners(State(repository): AppState) -> ApiResult<Json<Vec<Banner>>> {
    let now = repository.clock().now();
    Ok(Json(repository.active_banners(now).await?))
}

async fn get_banner(
    State(repository): AppState,
    Path(id): Path<BannerId>,
) -> ApiResult<Json<Banner>> {
    Ok(Json(repository.get_by_id(id).await?))
}

async fn create_banner(
    State(repository): AppState,
    Json(mut banner): Json<Banner>,
) -> ApiResult<(StatusCode, Json<Banner>)> {
    banner.id = None;
    let saved = repository.save(banner).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Merges the posted fields over the stored banner.
async fn update_banner(
    State(repository): AppState,
    Path(id): Path<BannerId>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Banner>> {
    let Value::Object(patch) = patch else {
        return Err(ApiError::BadRequest("expected a JSON object".into()));
    };
    let existing = repository.get_by_id(id).await?;
    let mut merged = serde_json::to_value(&existing)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if let Value::Object(fields) = &mut merged {
        for (key, value) in patch {
            if !READ_ONLY_FIELDS.contains(&key.as_str()) {
                fields.insert(key, value);
            }
        }
    }
    let updated: Banner = serde_json::from_value(merged)
        .map_err(|e| ApiError::BadRequest(format!("[Banner ID: {id}] {e}")))?;
    Ok(Json(repository.save(updated).await?))
}

async fn delete_banner(
    State(repository): AppState,
    Path(id): Path<BannerId>,
) -> ApiResult<Json<Value>> {
    let deleted = repository.delete_by_id(id).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

async fn mass_delete(
    State(repository): AppState,
    Json(request): Json<MassActionRequest>,
) -> Json<MassActionResponse> {
    let report = repository.delete_many(&request.ids).await;
    Json(MassActionResponse::new(report, "deleted"))
}

async fn mass_enable(
    State(repository): AppState,
    Json(request): Json<MassActionRequest>,
) -> Json<MassActionResponse> {
    let report = repository.enable_many(&request.ids).await;
    Json(MassActionResponse::new(report, "enabled"))
}

async fn cache_stats(State(repository): AppState) -> ApiResult<Json<CacheStats>> {
    let cache = repository.cache().ok_or(ApiError::Disabled("cache"))?;
    Ok(Json(cache.stats()))
}

async fn clear_cache(State(repository): AppState) -> ApiResult<Json<Value>> {
    let cache = repository.cache().ok_or(ApiError::Disabled("cache"))?;
    Ok(Json(json!({ "cleared": cache.clear() })))
}

/// Build the HTTP API router over the given repository.
pub fn build_router(repository: Arc<BannerRepository>) -> Router {
    Router::new()
        .route("/api/v1/banners", get(list_banners).post(create_banner))
        .route("/api/v1/banners/search", post(search_banners))
        .route("/api/v1/banners/active", get(active_banners))
        .route("/api/v1/banners/mass-delete", post(mass_delete))
        .route("/api/v1/banners/mass-enable", post(mass_enable))
        .route(
            "/api/v1/banners/{id}",
            get(get_banner).put(update_banner).delete(delete_banner),
        )
        .route("/api/v1/cache", get(cache_stats).delete(clear_cache))
        .with_state(repository)
}
