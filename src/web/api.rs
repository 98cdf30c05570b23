//! JSON API handlers.

use super::{parse_id, parse_optional, parse_page, AppState};
use crate::http::ApiError;
use crate::models::{MediaKind, NewWatchlistItem, Video, VideoList, WatchlistItem};
use crate::tmdb::TimeWindow;
use crate::watchlist::{WatchlistError, WatchlistStore};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ToggleResponse {
    pub status: &'static str,
    pub item: WatchlistItem,
}

#[derive(Debug, Serialize)]
pub struct WatchlistResponse {
    pub items: Vec<WatchlistItem>,
    pub count: usize,
}

/// Video list plus the trailer the details page should play.
#[derive(Debug, Serialize)]
pub struct VideosResponse {
    pub id: i64,
    pub trailer: Option<Video>,
    pub results: Vec<Video>,
}

impl From<VideoList> for VideosResponse {
    fn from(videos: VideoList) -> Self {
        let trailer = videos.trailer().cloned();
        Self {
            id: videos.id,
            trailer,
            results: videos.results,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub watchlist_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KindParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FilterParams {
    pub filter: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrendingParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub window: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OmdbTitleParams {
    pub t: Option<String>,
    pub y: Option<String>,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn watchlist_error(e: WatchlistError) -> Response {
    let status = match &e {
        WatchlistError::AlreadyExists { .. } => StatusCode::CONFLICT,
        WatchlistError::NotFound { .. } => StatusCode::NOT_FOUND,
        WatchlistError::Persistence(_) => {
            error!("Watchlist persistence failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_response(status, e.to_string())
}

/// Runs a store mutation on the blocking pool, since each one rewrites the
/// backing file while holding the write lock.
async fn mutate<T, F>(state: &AppState, op: F) -> Result<T, Response>
where
    F: FnOnce(&WatchlistStore) -> Result<T, WatchlistError> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(&state.watchlist);
    match tokio::task::spawn_blocking(move || op(&*store)).await {
        Ok(result) => result.map_err(watchlist_error),
        Err(e) => {
            error!("Watchlist task failed: {}", e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "watchlist update failed",
            ))
        }
    }
}

// Upstream details stay in the log; clients only get a generic message.
fn upstream_error(e: ApiError) -> Response {
    error!("Upstream request failed: {}", e);
    match e {
        ApiError::NotFound(_) => error_response(StatusCode::NOT_FOUND, "not found"),
        _ => error_response(StatusCode::BAD_GATEWAY, "upstream request failed"),
    }
}

fn required_kind(params: &KindParams) -> Result<MediaKind, Response> {
    let kind = params
        .kind
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "type parameter required"))?;
    kind.parse()
        .map_err(|e: String| error_response(StatusCode::BAD_REQUEST, e))
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        watchlist_count: state.watchlist.count(),
    })
}

/// GET /api/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.as_deref().unwrap_or("").trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "query parameter required");
    }
    let page = parse_page(params.page.as_deref());

    match params.kind.as_deref() {
        Some("tv") => match state.tmdb.search_tv(query, page).await {
            Ok(results) => Json(results).into_response(),
            Err(e) => upstream_error(e),
        },
        _ => match state.tmdb.search_movies(query, page).await {
            Ok(results) => Json(results).into_response(),
            Err(e) => upstream_error(e),
        },
    }
}

/// GET /api/watchlist
pub async fn list_watchlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FilterParams>,
) -> Json<WatchlistResponse> {
    let items = match params.filter.as_deref() {
        Some("watched") => state.watchlist.list_watched(),
        Some("unwatched") => state.watchlist.list_unwatched(),
        _ => state.watchlist.list_all(),
    };
    let count = items.len();
    Json(WatchlistResponse { items, count })
}

/// POST /api/watchlist
pub async fn add_to_watchlist(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<NewWatchlistItem>, JsonRejection>,
) -> Response {
    let Json(new_item) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected watchlist payload: {}", rejection);
            return error_response(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    let (kind, id) = (new_item.kind, new_item.id);
    let item = new_item.into_item(Utc::now());
    match mutate(&state, move |store| store.add(item)).await {
        Ok(()) => {
            info!("Added {} {} to watchlist", kind, id);
            Json(StatusResponse { status: "success" }).into_response()
        }
        Err(response) => response,
    }
}

/// GET /api/watchlist/{id}?type=movie|tv
pub async fn get_watchlist_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<KindParams>,
) -> Response {
    let id = match parse_id(&id, "Invalid ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let kind = match required_kind(&params) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match state.watchlist.get(kind, id) {
        Some(item) => Json(item).into_response(),
        None => watchlist_error(WatchlistError::NotFound { kind, id }),
    }
}

/// DELETE /api/watchlist/{id}?type=movie|tv
pub async fn remove_from_watchlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<KindParams>,
) -> Response {
    let id = match parse_id(&id, "Invalid ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let kind = match required_kind(&params) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match mutate(&state, move |store| store.remove(kind, id)).await {
        Ok(()) => {
            info!("Removed {} {} from watchlist", kind, id);
            Json(StatusResponse { status: "success" }).into_response()
        }
        Err(response) => response,
    }
}

/// PUT /api/watchlist/{id}/toggle?type=movie|tv
pub async fn toggle_watched(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<KindParams>,
) -> Response {
    let id = match parse_id(&id, "Invalid ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let kind = match required_kind(&params) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match mutate(&state, move |store| store.toggle_watched(kind, id)).await {
        Ok(item) => Json(ToggleResponse {
            status: "success",
            item,
        })
        .into_response(),
        Err(response) => response,
    }
}

/// GET /api/movies/{id}/videos
pub async fn movie_videos(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, "Invalid movie ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.tmdb.movie_videos(id).await {
        Ok(videos) => Json(VideosResponse::from(videos)).into_response(),
        Err(e) => upstream_error(e),
    }
}

/// GET /api/tv/{id}/videos
pub async fn tv_videos(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, "Invalid TV show ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    match state.tmdb.tv_videos(id).await {
        Ok(videos) => Json(VideosResponse::from(videos)).into_response(),
        Err(e) => upstream_error(e),
    }
}

/// GET /api/trending?type=movie|tv&window=day|week
pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TrendingParams>,
) -> Response {
    let window = TimeWindow::parse(params.window.as_deref());
    match params.kind.as_deref() {
        Some("tv") => match state.tmdb.trending_tv(window).await {
            Ok(results) => Json(results).into_response(),
            Err(e) => upstream_error(e),
        },
        _ => match state.tmdb.trending_movies(window).await {
            Ok(results) => Json(results).into_response(),
            Err(e) => upstream_error(e),
        },
    }
}

/// GET /api/ratings/{imdb_id}
pub async fn ratings(State(state): State<Arc<AppState>>, Path(imdb_id): Path<String>) -> Response {
    if !is_imdb_id(&imdb_id) {
        return error_response(StatusCode::BAD_REQUEST, "Invalid IMDb ID");
    }
    match state.omdb.ratings(&imdb_id).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => upstream_error(e),
    }
}

/// GET /api/omdb/search?q=&page=
pub async fn omdb_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = params.q.as_deref().unwrap_or("").trim();
    if query.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "query parameter required");
    }
    match state.omdb.search(query, parse_page(params.page.as_deref())).await {
        Ok(results) => Json(results).into_response(),
        Err(e) => upstream_error(e),
    }
}

/// GET /api/omdb/title?t=&y=
pub async fn omdb_title(
    State(state): State<Arc<AppState>>,
    Query(params): Query<OmdbTitleParams>,
) -> Response {
    let name = params.t.as_deref().unwrap_or("").trim();
    if name.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "title parameter required");
    }
    let year = parse_optional(params.y.as_deref());
    match state.omdb.title_by_name(name, year).await {
        Ok(title) => Json(title).into_response(),
        Err(e) => upstream_error(e),
    }
}

// `tt` followed by digits.
fn is_imdb_id(raw: &str) -> bool {
    raw.strip_prefix("tt")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
