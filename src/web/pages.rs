//! HTML page handlers.
//!
//! Upstream failures never fail a page: they are logged and shown in the
//! error banner while the rest of the page still renders.

use super::views::{self, Card, PageShell};
use super::{parse_id, parse_optional, parse_page, AppState};
use crate::models::{DiscoverFilters, GenreList, MediaKind, Page};
use crate::tmdb::{MovieCategory, TimeWindow, TvCategory};
use axum::{
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

const HOME_ROW_SIZE: usize = 6;

#[derive(Debug, Deserialize, Default)]
pub struct ListingParams {
    pub category: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct DiscoverParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub genre: Option<String>,
    pub year: Option<String>,
    pub rating: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct WatchlistParams {
    pub filter: Option<String>,
}

fn shell(state: &AppState, title: &str) -> PageShell {
    PageShell::new(title, state.watchlist.count())
}

pub async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    let mut shell = shell(&state, "Home");

    let (movies, shows) = tokio::join!(
        state.tmdb.trending_movies(TimeWindow::Week),
        state.tmdb.trending_tv(TimeWindow::Week),
    );

    let movies = movies
        .map(|mut page| {
            page.results.truncate(HOME_ROW_SIZE);
            page.results
        })
        .unwrap_or_else(|e| {
            error!("Error fetching trending movies: {}", e);
            shell.fail("Failed to load trending movies");
            Vec::new()
        });
    let shows = shows
        .map(|mut page| {
            page.results.truncate(HOME_ROW_SIZE);
            page.results
        })
        .unwrap_or_else(|e| {
            error!("Error fetching trending TV shows: {}", e);
            shell.fail("Failed to load trending TV shows");
            Vec::new()
        });

    info!("Rendering home with {} movies and {} TV shows", movies.len(), shows.len());
    Html(views::home_page(&shell, &movies, &shows, &state.images))
}

pub async fn movies(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Html<String> {
    let mut shell = shell(&state, "Movies");
    let category = MovieCategory::parse(params.category.as_deref());
    let page = parse_page(params.page.as_deref());

    let result = state.tmdb.movies(category, page).await.unwrap_or_else(|e| {
        error!("Error fetching movies: {}", e);
        shell.fail("Failed to load movies");
        empty_page(page)
    });

    let listing = views::ListingPage {
        category: category.as_str(),
        cards: result.results.iter().map(Card::movie).collect(),
        page: result.page,
        total_pages: result.total_pages,
    };
    Html(views::movies_page(&shell, &listing, &state.images))
}

pub async fn movie_details(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Response {
    let id = match parse_id(&id, "Invalid movie ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut shell = shell(&state, "Movie Details");

    let (details, credits) = tokio::join!(state.tmdb.movie_details(id), state.tmdb.movie_credits(id));

    let details = match details {
        Ok(details) => details,
        Err(e) => {
            error!("Error fetching movie details for {}: {}", id, e);
            shell.fail("Failed to load movie details");
            return Html(views::layout(&shell, "")).into_response();
        }
    };
    shell.title = details.movie.title.clone();

    let credits = credits
        .map_err(|e| warn!("Error fetching movie credits for {}: {}", id, e))
        .ok();

    let omdb = match details.imdb_id.as_deref().filter(|i| !i.is_empty()) {
        Some(imdb_id) => state
            .omdb
            .title_by_imdb_id(imdb_id)
            .await
            .map_err(|e| warn!("Error fetching OMDb data for {}: {}", imdb_id, e))
            .ok(),
        None => None,
    };

    let page = views::MovieDetailsPage {
        details: &details,
        credits: credits.as_ref(),
        omdb: omdb.as_ref(),
        in_watchlist: state.watchlist.contains(MediaKind::Movie, id),
    };
    Html(views::movie_details_page(&shell, &page, &state.images)).into_response()
}

pub async fn tv_shows(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListingParams>,
) -> Html<String> {
    let mut shell = shell(&state, "TV Shows");
    let category = TvCategory::parse(params.category.as_deref());
    let page = parse_page(params.page.as_deref());

    let result = state.tmdb.tv_shows(category, page).await.unwrap_or_else(|e| {
        error!("Error fetching TV shows: {}", e);
        shell.fail("Failed to load TV shows");
        empty_page(page)
    });

    let listing = views::ListingPage {
        category: category.as_str(),
        cards: result.results.iter().map(Card::tv).collect(),
        page: result.page,
        total_pages: result.total_pages,
    };
    Html(views::tv_page(&shell, &listing, &state.images))
}

pub async fn tv_details(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    let id = match parse_id(&id, "Invalid TV show ID") {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mut shell = shell(&state, "TV Show Details");

    let details = match state.tmdb.tv_details(id).await {
        Ok(details) => details,
        Err(e) => {
            error!("Error fetching TV show details for {}: {}", id, e);
            shell.fail("Failed to load TV show details");
            return Html(views::layout(&shell, "")).into_response();
        }
    };
    shell.title = details.show.name.clone();

    let omdb = match details.external_ids.imdb_id.as_deref().filter(|i| !i.is_empty()) {
        Some(imdb_id) => state
            .omdb
            .title_by_imdb_id(imdb_id)
            .await
            .map_err(|e| warn!("Error fetching OMDb data for {}: {}", imdb_id, e))
            .ok(),
        None => None,
    };

    let page = views::TvDetailsPage {
        details: &details,
        omdb: omdb.as_ref(),
        in_watchlist: state.watchlist.contains(MediaKind::Tv, id),
    };
    Html(views::tv_details_page(&shell, &page, &state.images)).into_response()
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let mut shell = shell(&state, "Search");
    let query = params.q.as_deref().unwrap_or("").trim().to_string();
    let kind = match params.kind.as_deref() {
        Some("tv") => MediaKind::Tv,
        _ => MediaKind::Movie,
    };
    let page = parse_page(params.page.as_deref());

    if query.is_empty() {
        let search = views::SearchPage {
            query: "",
            kind,
            cards: Vec::new(),
            page: 1,
            total_pages: 0,
        };
        return Html(views::search_page(&shell, &search, &state.images));
    }

    // Both result types are held so the cards can borrow from whichever ran.
    let mut movies = empty_page(page);
    let mut shows = empty_page(page);
    match kind {
        MediaKind::Movie => match state.tmdb.search_movies(&query, page).await {
            Ok(result) => movies = result,
            Err(e) => {
                error!("Error searching movies: {}", e);
                shell.fail("Failed to search movies");
            }
        },
        MediaKind::Tv => match state.tmdb.search_tv(&query, page).await {
            Ok(result) => shows = result,
            Err(e) => {
                error!("Error searching TV shows: {}", e);
                shell.fail("Failed to search TV shows");
            }
        },
    }

    let (cards, current, total): (Vec<Card>, u32, u32) = match kind {
        MediaKind::Movie => (
            movies.results.iter().map(Card::movie).collect(),
            movies.page,
            movies.total_pages,
        ),
        MediaKind::Tv => (
            shows.results.iter().map(Card::tv).collect(),
            shows.page,
            shows.total_pages,
        ),
    };

    let search = views::SearchPage {
        query: &query,
        kind,
        cards,
        page: current,
        total_pages: total,
    };
    Html(views::search_page(&shell, &search, &state.images))
}

pub async fn discover(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiscoverParams>,
) -> Html<String> {
    let mut shell = shell(&state, "Discover");
    let kind = match params.kind.as_deref() {
        Some("tv") => MediaKind::Tv,
        _ => MediaKind::Movie,
    };
    let page = parse_page(params.page.as_deref());
    let filters = DiscoverFilters {
        genre: parse_optional(params.genre.as_deref()),
        year: parse_optional(params.year.as_deref()),
        min_rating: parse_optional(params.rating.as_deref()),
        sort_by: params.sort_by.clone().filter(|s| !s.is_empty()),
        sort_order: params.sort_order.clone().filter(|s| !s.is_empty()),
    };

    let genres = match kind {
        MediaKind::Movie => state.tmdb.movie_genres().await,
        MediaKind::Tv => state.tmdb.tv_genres().await,
    }
    .unwrap_or_else(|e| {
        error!("Error fetching genres: {}", e);
        GenreList::default()
    });

    let mut movies = empty_page(page);
    let mut shows = empty_page(page);
    match kind {
        MediaKind::Movie => match state.tmdb.discover_movies(&filters, page).await {
            Ok(result) => movies = result,
            Err(e) => {
                error!("Error discovering movies: {}", e);
                shell.fail("Failed to discover movies");
            }
        },
        MediaKind::Tv => match state.tmdb.discover_tv(&filters, page).await {
            Ok(result) => shows = result,
            Err(e) => {
                error!("Error discovering TV shows: {}", e);
                shell.fail("Failed to discover TV shows");
            }
        },
    }

    let (cards, current, total): (Vec<Card>, u32, u32) = match kind {
        MediaKind::Movie => (
            movies.results.iter().map(Card::movie).collect(),
            movies.page,
            movies.total_pages,
        ),
        MediaKind::Tv => (
            shows.results.iter().map(Card::tv).collect(),
            shows.page,
            shows.total_pages,
        ),
    };

    let discover = views::DiscoverPage {
        kind,
        genres: &genres.genres,
        selected_genre: filters.genre,
        year: filters.year,
        min_rating: filters.min_rating,
        sort_by: filters.sort_by.as_deref().unwrap_or(""),
        sort_order: filters.sort_order.as_deref().unwrap_or("desc"),
        cards,
        page: current,
        total_pages: total,
    };
    Html(views::discover_page(&shell, &discover, &state.images))
}

pub async fn watchlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WatchlistParams>,
) -> Html<String> {
    let shell = shell(&state, "My Watchlist");

    let (filter, mut items) = match params.filter.as_deref() {
        Some("watched") => ("watched", state.watchlist.list_watched()),
        Some("unwatched") => ("unwatched", state.watchlist.list_unwatched()),
        _ => ("all", state.watchlist.list_all()),
    };
    // Store order is arbitrary; newest first reads best.
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));

    Html(views::watchlist_page(&shell, filter, &items, &state.images))
}

fn empty_page<T>(page: u32) -> Page<T> {
    Page {
        page,
        results: Vec::new(),
        total_pages: 0,
        total_results: 0,
    }
}
