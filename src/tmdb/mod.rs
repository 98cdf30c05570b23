use crate::config::TmdbConfig;
use crate::http::{ApiError, HttpClient};
use crate::models::{
    Credits, DiscoverFilters, GenreList, Movie, MovieDetails, Page, TvShow, TvShowDetails,
    VideoList,
};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

pub const PLACEHOLDER_IMAGE: &str = "/static/images/placeholder.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieCategory {
    Popular,
    TopRated,
    NowPlaying,
}

impl MovieCategory {
    /// Unknown categories fall back to popular.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("top_rated") => Self::TopRated,
            Some("now_playing") => Self::NowPlaying,
            _ => Self::Popular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::TopRated => "top_rated",
            Self::NowPlaying => "now_playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvCategory {
    Popular,
    TopRated,
}

impl TvCategory {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("top_rated") => Self::TopRated,
            _ => Self::Popular,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Popular => "popular",
            Self::TopRated => "top_rated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeWindow {
    Day,
    Week,
}

impl TimeWindow {
    /// Anything other than `day` means the weekly window.
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("day") => Self::Day,
            _ => Self::Week,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
        }
    }
}

/// Builds image URLs on the TMDB CDN.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base_url: String,
}

impl ImageUrls {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn image_url(&self, path: Option<&str>, size: &str) -> String {
        match path {
            Some(p) if !p.is_empty() => format!("{}/{}{}", self.base_url, size, p),
            _ => PLACEHOLDER_IMAGE.to_string(),
        }
    }

    pub fn poster(&self, path: Option<&str>) -> String {
        self.image_url(path, "w500")
    }

    pub fn backdrop(&self, path: Option<&str>) -> String {
        self.image_url(path, "w1280")
    }

    pub fn thumbnail(&self, path: Option<&str>) -> String {
        self.image_url(path, "w185")
    }
}

pub struct TmdbClient {
    http: HttpClient,
    config: TmdbConfig,
}

impl TmdbClient {
    pub fn new(http: HttpClient, config: TmdbConfig) -> Self {
        Self { http, config }
    }

    pub fn images(&self) -> ImageUrls {
        ImageUrls::new(&self.config.image_base_url)
    }

    fn url(&self, path: &str, mut params: Vec<(&str, String)>) -> Result<url::Url, ApiError> {
        params.push(("api_key", self.config.api_key.clone()));
        HttpClient::build_url(&self.config.base_url, path, &params)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: Vec<(&str, String)>,
    ) -> Result<T, ApiError> {
        debug!("TMDB request: {}", path);
        let url = self.url(path, params)?;
        self.http.get_json(url).await
    }

    // Movies

    #[instrument(skip(self))]
    pub async fn movies(&self, category: MovieCategory, page: u32) -> Result<Page<Movie>, ApiError> {
        let path = format!("/movie/{}", category.as_str());
        self.fetch(&path, vec![("page", page.to_string())]).await
    }

    #[instrument(skip(self))]
    pub async fn movie_details(&self, id: i64) -> Result<MovieDetails, ApiError> {
        self.fetch(&format!("/movie/{}", id), Vec::new()).await
    }

    #[instrument(skip(self))]
    pub async fn movie_credits(&self, id: i64) -> Result<Credits, ApiError> {
        self.fetch(&format!("/movie/{}/credits", id), Vec::new()).await
    }

    #[instrument(skip(self))]
    pub async fn movie_videos(&self, id: i64) -> Result<VideoList, ApiError> {
        self.fetch(&format!("/movie/{}/videos", id), Vec::new()).await
    }

    // TV

    #[instrument(skip(self))]
    pub async fn tv_shows(&self, category: TvCategory, page: u32) -> Result<Page<TvShow>, ApiError> {
        let path = format!("/tv/{}", category.as_str());
        self.fetch(&path, vec![("page", page.to_string())]).await
    }

    #[instrument(skip(self))]
    pub async fn tv_details(&self, id: i64) -> Result<TvShowDetails, ApiError> {
        self.fetch(
            &format!("/tv/{}", id),
            vec![("append_to_response", "external_ids".to_string())],
        )
        .await
    }

    #[instrument(skip(self))]
    pub async fn tv_videos(&self, id: i64) -> Result<VideoList, ApiError> {
        self.fetch(&format!("/tv/{}/videos", id), Vec::new()).await
    }

    // Search and trending

    #[instrument(skip(self))]
    pub async fn search_movies(&self, query: &str, page: u32) -> Result<Page<Movie>, ApiError> {
        self.fetch("/search/movie", search_params(query, page)).await
    }

    #[instrument(skip(self))]
    pub async fn search_tv(&self, query: &str, page: u32) -> Result<Page<TvShow>, ApiError> {
        self.fetch("/search/tv", search_params(query, page)).await
    }

    #[instrument(skip(self))]
    pub async fn trending_movies(&self, window: TimeWindow) -> Result<Page<Movie>, ApiError> {
        self.fetch(&format!("/trending/movie/{}", window.as_str()), Vec::new())
            .await
    }

    #[instrument(skip(self))]
    pub async fn trending_tv(&self, window: TimeWindow) -> Result<Page<TvShow>, ApiError> {
        self.fetch(&format!("/trending/tv/{}", window.as_str()), Vec::new())
            .await
    }

    // Genres and discover

    pub async fn movie_genres(&self) -> Result<GenreList, ApiError> {
        self.fetch("/genre/movie/list", Vec::new()).await
    }

    pub async fn tv_genres(&self) -> Result<GenreList, ApiError> {
        self.fetch("/genre/tv/list", Vec::new()).await
    }

    #[instrument(skip(self))]
    pub async fn discover_movies(
        &self,
        filters: &DiscoverFilters,
        page: u32,
    ) -> Result<Page<Movie>, ApiError> {
        self.fetch("/discover/movie", discover_params(filters, page, "year"))
            .await
    }

    #[instrument(skip(self))]
    pub async fn discover_tv(
        &self,
        filters: &DiscoverFilters,
        page: u32,
    ) -> Result<Page<TvShow>, ApiError> {
        self.fetch(
            "/discover/tv",
            discover_params(filters, page, "first_air_date_year"),
        )
        .await
    }
}

fn search_params(query: &str, page: u32) -> Vec<(&'static str, String)> {
    vec![("query", query.to_string()), ("page", page.to_string())]
}

fn discover_params(
    filters: &DiscoverFilters,
    page: u32,
    year_param: &'static str,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("page", page.to_string())];

    if let Some(genre) = filters.genre {
        params.push(("with_genres", genre.to_string()));
    }
    if let Some(year) = filters.year {
        params.push((year_param, year.to_string()));
    }
    if let Some(rating) = filters.min_rating {
        params.push(("vote_average.gte", format!("{:.1}", rating)));
    }
    if let Some(sort_by) = filters.sort_by.as_deref().filter(|s| !s.is_empty()) {
        let direction = match filters.sort_order.as_deref() {
            Some("asc") => "asc",
            _ => "desc",
        };
        params.push(("sort_by", format!("{}.{}", sort_by, direction)));
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn client() -> TmdbClient {
        TmdbClient::new(
            HttpClient::new(Duration::from_secs(1)).unwrap(),
            TmdbConfig {
                api_key: "secret".to_string(),
                ..TmdbConfig::default()
            },
        )
    }

    #[test]
    fn url_carries_api_key() {
        let url = client()
            .url("/movie/popular", vec![("page", "3".to_string())])
            .unwrap();

        assert_eq!(url.host_str(), Some("api.themoviedb.org"));
        assert_eq!(url.path(), "/3/movie/popular");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("page".to_string(), "3".to_string())));
        assert!(query.contains(&("api_key".to_string(), "secret".to_string())));
    }

    #[test]
    fn discover_params_for_movies() {
        let filters = DiscoverFilters {
            genre: Some(28),
            year: Some(1999),
            min_rating: Some(7.26),
            sort_by: Some("popularity".to_string()),
            sort_order: None,
        };
        let params = discover_params(&filters, 2, "year");

        assert_eq!(
            params,
            vec![
                ("page", "2".to_string()),
                ("with_genres", "28".to_string()),
                ("year", "1999".to_string()),
                ("vote_average.gte", "7.3".to_string()),
                ("sort_by", "popularity.desc".to_string()),
            ]
        );
    }

    #[test]
    fn discover_params_for_tv_ascending() {
        let filters = DiscoverFilters {
            year: Some(2008),
            sort_by: Some("vote_average".to_string()),
            sort_order: Some("asc".to_string()),
            ..DiscoverFilters::default()
        };
        let params = discover_params(&filters, 1, "first_air_date_year");

        assert!(params.contains(&("first_air_date_year", "2008".to_string())));
        assert!(params.contains(&("sort_by", "vote_average.asc".to_string())));
        assert!(!params.iter().any(|(k, _)| *k == "with_genres"));
    }

    #[test]
    fn categories_default_to_popular() {
        assert_eq!(MovieCategory::parse(None), MovieCategory::Popular);
        assert_eq!(MovieCategory::parse(Some("bogus")), MovieCategory::Popular);
        assert_eq!(MovieCategory::parse(Some("now_playing")), MovieCategory::NowPlaying);
        assert_eq!(TvCategory::parse(Some("now_playing")), TvCategory::Popular);
        assert_eq!(TvCategory::parse(Some("top_rated")), TvCategory::TopRated);
        assert_eq!(TimeWindow::parse(Some("day")), TimeWindow::Day);
        assert_eq!(TimeWindow::parse(Some("month")), TimeWindow::Week);
    }

    #[test]
    fn image_urls() {
        let images = ImageUrls::new("https://image.tmdb.org/t/p/");

        assert_eq!(
            images.poster(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w500/abc.jpg"
        );
        assert_eq!(
            images.backdrop(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w1280/abc.jpg"
        );
        assert_eq!(
            images.thumbnail(Some("/abc.jpg")),
            "https://image.tmdb.org/t/p/w185/abc.jpg"
        );
        assert_eq!(images.poster(None), PLACEHOLDER_IMAGE);
        assert_eq!(images.poster(Some("")), PLACEHOLDER_IMAGE);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_http_error() {
        let client = TmdbClient::new(
            HttpClient::new(Duration::from_secs(1)).unwrap(),
            TmdbConfig {
                api_key: "tmdb-secret-key".to_string(),
                base_url: "http://127.0.0.1:9".to_string(),
                ..TmdbConfig::default()
            },
        );

        let err = client.movie_details(550).await.unwrap_err();
        assert!(matches!(err, ApiError::Http(_)));
        let message = err.to_string();
        assert!(!message.contains("tmdb-secret-key"), "{}", message);
        assert!(!message.contains("127.0.0.1"), "{}", message);
    }
}
