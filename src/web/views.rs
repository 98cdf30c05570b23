//! Server-side HTML rendering.
//!
//! Pages are plain `format!` templates. Every value that originates from an
//! upstream API or from the watchlist file goes through [`html_escape`].

use crate::models::{
    Credits, Genre, MediaKind, Movie, MovieDetails, OmdbTitle, TvShow, TvShowDetails,
    WatchlistItem,
};
use crate::omdb;
use crate::tmdb::ImageUrls;
use std::fmt::Write;

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Chrome shared by every page.
#[derive(Debug, Clone, Default)]
pub struct PageShell {
    pub title: String,
    pub watchlist_count: usize,
    pub error: Option<String>,
}

impl PageShell {
    pub fn new(title: impl Into<String>, watchlist_count: usize) -> Self {
        Self {
            title: title.into(),
            watchlist_count,
            error: None,
        }
    }

    /// Records the first error only; later failures on the same page are
    /// already covered by the banner.
    pub fn fail(&mut self, message: &str) {
        if self.error.is_none() {
            self.error = Some(message.to_string());
        }
    }
}

pub fn layout(shell: &PageShell, content: &str) -> String {
    let error_html = shell
        .error
        .as_deref()
        .map(|e| format!(r#"<div class="error-banner">{}</div>"#, html_escape(e)))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | Muvi</title>
    <link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
    <nav class="navbar">
        <a class="brand" href="/">Muvi</a>
        <a href="/movies">Movies</a>
        <a href="/tv">TV Shows</a>
        <a href="/discover">Discover</a>
        <a href="/watchlist">Watchlist <span class="badge" id="watchlist-count">{count}</span></a>
        <form class="nav-search" action="/search" method="get">
            <input type="search" name="q" placeholder="Search movies and TV">
        </form>
    </nav>
    <main>
        {error_html}
        {content}
    </main>
    <script src="/static/js/main.js"></script>
</body>
</html>"#,
        title = html_escape(&shell.title),
        count = shell.watchlist_count,
        error_html = error_html,
        content = content,
    )
}

/// The minimal data needed to draw a poster card.
#[derive(Debug, Clone)]
pub struct Card<'a> {
    pub kind: MediaKind,
    pub id: i64,
    pub title: &'a str,
    pub poster_path: Option<&'a str>,
    pub date: &'a str,
    pub vote_average: f64,
}

impl<'a> Card<'a> {
    pub fn movie(movie: &'a Movie) -> Self {
        Self {
            kind: MediaKind::Movie,
            id: movie.id,
            title: &movie.title,
            poster_path: movie.poster_path.as_deref(),
            date: &movie.release_date,
            vote_average: movie.vote_average,
        }
    }

    pub fn tv(show: &'a TvShow) -> Self {
        Self {
            kind: MediaKind::Tv,
            id: show.id,
            title: &show.name,
            poster_path: show.poster_path.as_deref(),
            date: &show.first_air_date,
            vote_average: show.vote_average,
        }
    }

    fn href(&self) -> String {
        match self.kind {
            MediaKind::Movie => format!("/movies/{}", self.id),
            MediaKind::Tv => format!("/tv/{}", self.id),
        }
    }
}

fn year(date: &str) -> &str {
    date.get(..4).unwrap_or(date)
}

pub fn card_grid(cards: &[Card<'_>], images: &ImageUrls) -> String {
    if cards.is_empty() {
        return r#"<p class="empty">Nothing to show.</p>"#.to_string();
    }

    let mut html = String::from(r#"<div class="card-grid">"#);
    for card in cards {
        let _ = write!(
            html,
            r#"
<a class="card" href="{href}">
    <img src="{poster}" alt="{title}" loading="lazy">
    <div class="card-body">
        <h3>{title}</h3>
        <span class="year">{year}</span>
        <span class="rating">&#9733; {rating:.1}</span>
    </div>
</a>"#,
            href = card.href(),
            poster = html_escape(&images.poster(card.poster_path)),
            title = html_escape(card.title),
            year = html_escape(year(card.date)),
            rating = card.vote_average,
        );
    }
    html.push_str("</div>");
    html
}

fn watchlist_button(card: &Card<'_>, in_watchlist: bool) -> String {
    let (class, label) = if in_watchlist {
        ("btn in-watchlist", "In Watchlist")
    } else {
        ("btn", "Add to Watchlist")
    };

    format!(
        r#"<button class="{class}" data-action="watchlist-add" data-id="{id}" data-type="{kind}" data-title="{title}" data-poster="{poster}" data-date="{date}" data-vote="{vote}"{disabled}>{label}</button>"#,
        class = class,
        id = card.id,
        kind = card.kind,
        title = html_escape(card.title),
        poster = html_escape(card.poster_path.unwrap_or("")),
        date = html_escape(card.date),
        vote = card.vote_average,
        disabled = if in_watchlist { " disabled" } else { "" },
        label = label,
    )
}

/// Page numbers shown around `current`, clamped to `1..=total`.
pub fn page_window(current: u32, total: u32, radius: u32) -> Vec<u32> {
    if total == 0 {
        return Vec::new();
    }
    let current = current.clamp(1, total);
    let start = current.saturating_sub(radius).max(1);
    let end = (current + radius).min(total);
    (start..=end).collect()
}

/// Renders prev/next and numbered links. `base` already carries every query
/// parameter except `page`.
pub fn pagination(base: &str, current: u32, total: u32) -> String {
    if total <= 1 {
        return String::new();
    }

    let sep = if base.contains('?') { '&' } else { '?' };
    let link = |page: u32, label: &str, class: &str| {
        let href = format!("{}{}page={}", base, sep, page);
        format!(r#"<a class="{}" href="{}">{}</a>"#, class, html_escape(&href), label)
    };

    let mut html = String::from(r#"<nav class="pagination">"#);
    if current > 1 {
        html.push_str(&link(current - 1, "&laquo; Prev", "page-link"));
    }
    for page in page_window(current, total, 2) {
        let class = if page == current { "page-link active" } else { "page-link" };
        html.push_str(&link(page, &page.to_string(), class));
    }
    if current < total {
        html.push_str(&link(current + 1, "Next &raquo;", "page-link"));
    }
    html.push_str("</nav>");
    html
}

fn tabs(base: &str, active: &str, options: &[(&str, &str)]) -> String {
    let mut html = String::from(r#"<div class="tabs">"#);
    for (value, label) in options {
        let class = if *value == active { "tab active" } else { "tab" };
        let _ = write!(
            html,
            r#"<a class="{}" href="{}?category={}">{}</a>"#,
            class, base, value, label
        );
    }
    html.push_str("</div>");
    html
}

pub fn home_page(shell: &PageShell, movies: &[Movie], shows: &[TvShow], images: &ImageUrls) -> String {
    let movie_cards: Vec<Card> = movies.iter().map(Card::movie).collect();
    let tv_cards: Vec<Card> = shows.iter().map(Card::tv).collect();

    let content = format!(
        r#"<section class="hero">
    <h1>Discover your next favourite</h1>
    <p>Trending movies and TV shows this week.</p>
</section>
<section>
    <h2>Trending Movies <a class="more" href="/movies">See all</a></h2>
    {movies}
</section>
<section>
    <h2>Trending TV Shows <a class="more" href="/tv">See all</a></h2>
    {shows}
</section>"#,
        movies = card_grid(&movie_cards, images),
        shows = card_grid(&tv_cards, images),
    );
    layout(shell, &content)
}

pub struct ListingPage<'a> {
    pub category: &'a str,
    pub cards: Vec<Card<'a>>,
    pub page: u32,
    pub total_pages: u32,
}

pub fn movies_page(shell: &PageShell, listing: &ListingPage<'_>, images: &ImageUrls) -> String {
    let content = format!(
        "<h1>Movies</h1>\n{}\n{}\n{}",
        tabs(
            "/movies",
            listing.category,
            &[("popular", "Popular"), ("top_rated", "Top Rated"), ("now_playing", "Now Playing")],
        ),
        card_grid(&listing.cards, images),
        pagination(
            &format!("/movies?category={}", listing.category),
            listing.page,
            listing.total_pages
        ),
    );
    layout(shell, &content)
}

pub fn tv_page(shell: &PageShell, listing: &ListingPage<'_>, images: &ImageUrls) -> String {
    let content = format!(
        "<h1>TV Shows</h1>\n{}\n{}\n{}",
        tabs("/tv", listing.category, &[("popular", "Popular"), ("top_rated", "Top Rated")]),
        card_grid(&listing.cards, images),
        pagination(
            &format!("/tv?category={}", listing.category),
            listing.page,
            listing.total_pages
        ),
    );
    layout(shell, &content)
}

fn genre_tags(genres: &[Genre]) -> String {
    genres
        .iter()
        .map(|g| format!(r#"<span class="tag">{}</span>"#, html_escape(&g.name)))
        .collect()
}

fn ratings_block(title: Option<&OmdbTitle>) -> String {
    let Some(title) = title else {
        return String::new();
    };

    let rows = [
        ("IMDb", omdb::imdb_rating(&title.ratings)),
        ("Rotten Tomatoes", omdb::rotten_tomatoes_rating(&title.ratings)),
        ("Metacritic", omdb::metacritic_rating(&title.ratings)),
    ];

    let mut html = String::from(r#"<div class="ratings">"#);
    for (label, value) in rows {
        if let Some(value) = value {
            let _ = write!(
                html,
                r#"<div class="rating-badge"><span class="source">{}</span><span class="value">{}</span></div>"#,
                label,
                html_escape(value)
            );
        }
    }
    if !title.awards.is_empty() && title.awards != "N/A" {
        let _ = write!(html, r#"<p class="awards">{}</p>"#, html_escape(&title.awards));
    }
    html.push_str("</div>");
    html
}

fn cast_list(credits: Option<&Credits>, images: &ImageUrls) -> String {
    let Some(credits) = credits.filter(|c| !c.cast.is_empty()) else {
        return String::new();
    };

    let mut html = String::from(r#"<section class="cast"><h2>Cast</h2><div class="cast-row">"#);
    for member in credits.cast.iter().take(10) {
        let _ = write!(
            html,
            r#"<div class="cast-member"><img src="{}" alt="{}" loading="lazy"><strong>{}</strong><span>{}</span></div>"#,
            html_escape(&images.thumbnail(member.profile_path.as_deref())),
            html_escape(&member.name),
            html_escape(&member.name),
            html_escape(&member.character),
        );
    }
    html.push_str("</div></section>");
    html
}

pub struct MovieDetailsPage<'a> {
    pub details: &'a MovieDetails,
    pub credits: Option<&'a Credits>,
    pub omdb: Option<&'a OmdbTitle>,
    pub in_watchlist: bool,
}

pub fn movie_details_page(shell: &PageShell, page: &MovieDetailsPage<'_>, images: &ImageUrls) -> String {
    let movie = &page.details.movie;
    let card = Card::movie(movie);
    let runtime = page
        .details
        .runtime
        .filter(|m| *m > 0)
        .map(|m| format!("{}h {}m", m / 60, m % 60))
        .unwrap_or_default();

    let content = format!(
        r#"<section class="details" style="background-image: url('{backdrop}')">
    <img class="poster" src="{poster}" alt="{title}">
    <div class="info">
        <h1>{title} <span class="year">({year})</span></h1>
        <p class="tagline">{tagline}</p>
        <div class="meta"><span>{runtime}</span> {genres}</div>
        <p class="overview">{overview}</p>
        <div class="actions">
            {button}
            <button class="btn" data-action="trailer" data-type="movie" data-id="{id}">Watch Trailer</button>
        </div>
        {ratings}
    </div>
</section>
{cast}"#,
        backdrop = html_escape(&images.backdrop(movie.backdrop_path.as_deref())),
        poster = html_escape(&images.poster(movie.poster_path.as_deref())),
        title = html_escape(&movie.title),
        year = html_escape(year(&movie.release_date)),
        tagline = html_escape(page.details.tagline.as_deref().unwrap_or("")),
        runtime = runtime,
        genres = genre_tags(&page.details.genres),
        overview = html_escape(&movie.overview),
        button = watchlist_button(&card, page.in_watchlist),
        id = movie.id,
        ratings = ratings_block(page.omdb),
        cast = cast_list(page.credits, images),
    );
    layout(shell, &content)
}

pub struct TvDetailsPage<'a> {
    pub details: &'a TvShowDetails,
    pub omdb: Option<&'a OmdbTitle>,
    pub in_watchlist: bool,
}

pub fn tv_details_page(shell: &PageShell, page: &TvDetailsPage<'_>, images: &ImageUrls) -> String {
    let show = &page.details.show;
    let card = Card::tv(show);

    let content = format!(
        r#"<section class="details" style="background-image: url('{backdrop}')">
    <img class="poster" src="{poster}" alt="{title}">
    <div class="info">
        <h1>{title} <span class="year">({year})</span></h1>
        <p class="tagline">{tagline}</p>
        <div class="meta"><span>{seasons} seasons, {episodes} episodes</span> <span>{status}</span> {genres}</div>
        <p class="overview">{overview}</p>
        <div class="actions">
            {button}
            <button class="btn" data-action="trailer" data-type="tv" data-id="{id}">Watch Trailer</button>
        </div>
        {ratings}
    </div>
</section>"#,
        backdrop = html_escape(&images.backdrop(show.backdrop_path.as_deref())),
        poster = html_escape(&images.poster(show.poster_path.as_deref())),
        title = html_escape(&show.name),
        year = html_escape(year(&show.first_air_date)),
        tagline = html_escape(page.details.tagline.as_deref().unwrap_or("")),
        seasons = page.details.number_of_seasons,
        episodes = page.details.number_of_episodes,
        status = html_escape(&page.details.status),
        genres = genre_tags(&page.details.genres),
        overview = html_escape(&show.overview),
        button = watchlist_button(&card, page.in_watchlist),
        id = show.id,
        ratings = ratings_block(page.omdb),
    );
    layout(shell, &content)
}

pub struct SearchPage<'a> {
    pub query: &'a str,
    pub kind: MediaKind,
    pub cards: Vec<Card<'a>>,
    pub page: u32,
    pub total_pages: u32,
}

pub fn search_page(shell: &PageShell, search: &SearchPage<'_>, images: &ImageUrls) -> String {
    let selected = |kind: MediaKind| if search.kind == kind { " selected" } else { "" };

    let results = if search.query.is_empty() {
        r#"<p class="empty">Type a title to start searching.</p>"#.to_string()
    } else {
        let base = format!(
            "/search?q={}&type={}",
            urlencoding::encode(search.query),
            search.kind
        );
        format!(
            r#"<h2>Results for "{}"</h2>{}{}"#,
            html_escape(search.query),
            card_grid(&search.cards, images),
            pagination(&base, search.page, search.total_pages)
        )
    };

    let content = format!(
        r#"<h1>Search</h1>
<form class="search-form" action="/search" method="get">
    <input type="search" name="q" value="{query}" placeholder="Title">
    <select name="type">
        <option value="movie"{movie_selected}>Movies</option>
        <option value="tv"{tv_selected}>TV Shows</option>
    </select>
    <button class="btn" type="submit">Search</button>
</form>
{results}"#,
        query = html_escape(search.query),
        movie_selected = selected(MediaKind::Movie),
        tv_selected = selected(MediaKind::Tv),
        results = results,
    );
    layout(shell, &content)
}

pub struct DiscoverPage<'a> {
    pub kind: MediaKind,
    pub genres: &'a [Genre],
    pub selected_genre: Option<i64>,
    pub year: Option<i32>,
    pub min_rating: Option<f64>,
    pub sort_by: &'a str,
    pub sort_order: &'a str,
    pub cards: Vec<Card<'a>>,
    pub page: u32,
    pub total_pages: u32,
}

pub fn discover_page(shell: &PageShell, discover: &DiscoverPage<'_>, images: &ImageUrls) -> String {
    let mut genre_options = String::from(r#"<option value="">Any genre</option>"#);
    for genre in discover.genres {
        let selected = if discover.selected_genre == Some(genre.id) { " selected" } else { "" };
        let _ = write!(
            genre_options,
            r#"<option value="{}"{}>{}</option>"#,
            genre.id,
            selected,
            html_escape(&genre.name)
        );
    }

    let option = |value: &str, current: &str, label: &str| {
        let selected = if value == current { " selected" } else { "" };
        format!(r#"<option value="{}"{}>{}</option>"#, value, selected, label)
    };

    let mut base = format!("/discover?type={}", discover.kind);
    if let Some(genre) = discover.selected_genre {
        let _ = write!(base, "&genre={}", genre);
    }
    if let Some(year) = discover.year {
        let _ = write!(base, "&year={}", year);
    }
    if let Some(rating) = discover.min_rating {
        let _ = write!(base, "&rating={}", rating);
    }
    if !discover.sort_by.is_empty() {
        let _ = write!(
            base,
            "&sort_by={}&sort_order={}",
            urlencoding::encode(discover.sort_by),
            urlencoding::encode(discover.sort_order)
        );
    }

    let content = format!(
        r#"<h1>Discover</h1>
<form class="discover-form" action="/discover" method="get">
    <select name="type">{type_movie}{type_tv}</select>
    <select name="genre">{genres}</select>
    <input type="number" name="year" min="1900" max="2100" placeholder="Year" value="{year}">
    <input type="number" name="rating" min="0" max="10" step="0.5" placeholder="Min rating" value="{rating}">
    <select name="sort_by">{sort_popularity}{sort_vote}{sort_date}</select>
    <select name="sort_order">{order_desc}{order_asc}</select>
    <button class="btn" type="submit">Apply</button>
</form>
{cards}
{pages}"#,
        type_movie = option("movie", discover.kind.as_str(), "Movies"),
        type_tv = option("tv", discover.kind.as_str(), "TV Shows"),
        genres = genre_options,
        year = discover.year.map(|y| y.to_string()).unwrap_or_default(),
        rating = discover.min_rating.map(|r| r.to_string()).unwrap_or_default(),
        sort_popularity = option("popularity", discover.sort_by, "Popularity"),
        sort_vote = option("vote_average", discover.sort_by, "Rating"),
        sort_date = option("primary_release_date", discover.sort_by, "Release date"),
        order_desc = option("desc", discover.sort_order, "Descending"),
        order_asc = option("asc", discover.sort_order, "Ascending"),
        cards = card_grid(&discover.cards, images),
        pages = pagination(&base, discover.page, discover.total_pages),
    );
    layout(shell, &content)
}

pub fn watchlist_page(shell: &PageShell, filter: &str, items: &[WatchlistItem], images: &ImageUrls) -> String {
    let mut filters = String::from(r#"<div class="tabs">"#);
    for (value, label) in [("all", "All"), ("unwatched", "To Watch"), ("watched", "Watched")] {
        let class = if value == filter { "tab active" } else { "tab" };
        let _ = write!(
            filters,
            r#"<a class="{}" href="/watchlist?filter={}">{}</a>"#,
            class, value, label
        );
    }
    filters.push_str("</div>");

    let mut rows = String::new();
    if items.is_empty() {
        rows.push_str(r#"<p class="empty">Your watchlist is empty.</p>"#);
    } else {
        rows.push_str(r#"<div class="watchlist">"#);
        for item in items {
            let href = match item.kind {
                MediaKind::Movie => format!("/movies/{}", item.id),
                MediaKind::Tv => format!("/tv/{}", item.id),
            };
            let status = match item.watched_at {
                Some(at) => format!("Watched {}", at.format("%Y-%m-%d")),
                None => "Not watched yet".to_string(),
            };
            let _ = write!(
                rows,
                r#"
<div class="watchlist-item{watched_class}" data-id="{id}" data-type="{kind}">
    <a href="{href}"><img src="{poster}" alt="{title}" loading="lazy"></a>
    <div class="item-info">
        <a href="{href}"><h3>{title}</h3></a>
        <span class="kind">{kind_label}</span>
        <span class="year">{year}</span>
        <span class="rating">&#9733; {rating:.1}</span>
        <span class="status">{status}</span>
        <span class="added">Added {added}</span>
    </div>
    <div class="item-actions">
        <button class="btn" data-action="watchlist-toggle" data-id="{id}" data-type="{kind}">{toggle_label}</button>
        <button class="btn btn-danger" data-action="watchlist-remove" data-id="{id}" data-type="{kind}">Remove</button>
    </div>
</div>"#,
                watched_class = if item.watched { " watched" } else { "" },
                id = item.id,
                kind = item.kind,
                href = href,
                poster = html_escape(&images.poster(item.poster_path.as_deref())),
                title = html_escape(&item.title),
                kind_label = match item.kind {
                    MediaKind::Movie => "Movie",
                    MediaKind::Tv => "TV Show",
                },
                year = html_escape(year(&item.release_date)),
                rating = item.vote_average,
                status = status,
                added = item.added_at.format("%Y-%m-%d"),
                toggle_label = if item.watched { "Mark Unwatched" } else { "Mark Watched" },
            );
        }
        rows.push_str("</div>");
    }

    let content = format!("<h1>My Watchlist</h1>\n{}\n{}", filters, rows);
    layout(shell, &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn images() -> ImageUrls {
        ImageUrls::new("https://image.tmdb.org/t/p")
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            html_escape(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn page_window_clamps() {
        assert_eq!(page_window(1, 10, 2), vec![1, 2, 3]);
        assert_eq!(page_window(5, 10, 2), vec![3, 4, 5, 6, 7]);
        assert_eq!(page_window(10, 10, 2), vec![8, 9, 10]);
        assert_eq!(page_window(50, 3, 2), vec![1, 2, 3]);
        assert!(page_window(1, 0, 2).is_empty());
    }

    #[test]
    fn pagination_links_keep_query() {
        let html = pagination("/movies?category=top_rated", 2, 5);
        assert!(html.contains(r#"href="/movies?category=top_rated&amp;page=1""#));
        assert!(html.contains(r#"class="page-link active""#));
        assert!(html.contains("page=3"));
        assert!(pagination("/movies", 1, 1).is_empty());
    }

    #[test]
    fn layout_shows_count_and_error() {
        let mut shell = PageShell::new("Movies", 3);
        shell.fail("Failed to load movies");
        shell.fail("second failure is dropped");

        let html = layout(&shell, "<p>body</p>");
        assert!(html.contains(r#"<span class="badge" id="watchlist-count">3</span>"#));
        assert!(html.contains("Failed to load movies"));
        assert!(!html.contains("second failure"));
        assert!(html.contains("<p>body</p>"));
    }

    #[test]
    fn cards_escape_titles_and_use_placeholder() {
        let movie = Movie {
            id: 1,
            title: "<b>Bold</b>".to_string(),
            release_date: "2020-02-02".to_string(),
            vote_average: 7.0,
            ..Movie::default()
        };
        let html = card_grid(&[Card::movie(&movie)], &images());

        assert!(html.contains("&lt;b&gt;Bold&lt;/b&gt;"));
        assert!(html.contains(r#"href="/movies/1""#));
        assert!(html.contains("/static/images/placeholder.svg"));
        assert!(html.contains("2020"));
    }

    #[test]
    fn watchlist_page_lists_items() {
        let item = WatchlistItem {
            id: 1396,
            kind: MediaKind::Tv,
            title: "Breaking Bad".to_string(),
            poster_path: Some("/bb.jpg".to_string()),
            release_date: "2008-01-20".to_string(),
            vote_average: 8.9,
            watched: true,
            added_at: Utc::now(),
            watched_at: Some(Utc::now()),
        };
        let html = watchlist_page(&PageShell::new("My Watchlist", 1), "watched", &[item], &images());

        assert!(html.contains("Breaking Bad"));
        assert!(html.contains(r#"href="/tv/1396""#));
        assert!(html.contains("Mark Unwatched"));
        assert!(html.contains(r#"class="tab active" href="/watchlist?filter=watched""#));
        assert!(html.contains("https://image.tmdb.org/t/p/w500/bb.jpg"));
    }

    #[test]
    fn empty_watchlist_message() {
        let html = watchlist_page(&PageShell::new("My Watchlist", 0), "all", &[], &images());
        assert!(html.contains("Your watchlist is empty."));
    }
}
