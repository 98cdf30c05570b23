mod api;
mod pages;
pub mod views;

use crate::omdb::OmdbClient;
use crate::tmdb::{ImageUrls, TmdbClient};
use crate::watchlist::WatchlistStore;
use axum::{
    http::StatusCode,
    response::Response,
    routing::{get, put},
    Router,
};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Shared state handed to every handler. One instance lives for the whole
/// process.
pub struct AppState {
    pub tmdb: TmdbClient,
    pub omdb: OmdbClient,
    pub watchlist: Arc<WatchlistStore>,
    pub images: ImageUrls,
}

impl AppState {
    pub fn new(tmdb: TmdbClient, omdb: OmdbClient, watchlist: Arc<WatchlistStore>) -> Self {
        let images = tmdb.images();
        Self {
            tmdb,
            omdb,
            watchlist,
            images,
        }
    }
}

pub fn create_router(state: Arc<AppState>, static_dir: &Path) -> Router {
    let api_routes = Router::new()
        .route("/search", get(api::search))
        .route(
            "/watchlist",
            get(api::list_watchlist).post(api::add_to_watchlist),
        )
        .route(
            "/watchlist/{id}",
            get(api::get_watchlist_item).delete(api::remove_from_watchlist),
        )
        .route("/watchlist/{id}/toggle", put(api::toggle_watched))
        .route("/movies/{id}/videos", get(api::movie_videos))
        .route("/tv/{id}/videos", get(api::tv_videos))
        .route("/trending", get(api::trending))
        .route("/ratings/{imdb_id}", get(api::ratings))
        .route("/omdb/search", get(api::omdb_search))
        .route("/omdb/title", get(api::omdb_title));

    Router::new()
        .route("/", get(pages::home))
        .route("/movies", get(pages::movies))
        .route("/movies/{id}", get(pages::movie_details))
        .route("/tv", get(pages::tv_shows))
        .route("/tv/{id}", get(pages::tv_details))
        .route("/search", get(pages::search))
        .route("/discover", get(pages::discover))
        .route("/watchlist", get(pages::watchlist))
        .route("/health", get(api::health))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `page` query values that are missing, malformed or not positive mean page 1.
pub fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|p| p.trim().parse::<u32>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(1)
}

/// Lenient parse for optional form fields, where an empty value means unset.
pub fn parse_optional<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

pub fn parse_id(raw: &str, message: &str) -> Result<i64, Response> {
    raw.parse::<i64>()
        .map_err(|_| api::error_response(StatusCode::BAD_REQUEST, message))
}
