use crate::config::OmdbConfig;
use crate::http::{ApiError, HttpClient};
use crate::models::{OmdbSearch, OmdbTitle, Rating, RatingsSummary};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

pub const IMDB_SOURCE: &str = "Internet Movie Database";
pub const ROTTEN_TOMATOES_SOURCE: &str = "Rotten Tomatoes";
pub const METACRITIC_SOURCE: &str = "Metacritic";

pub struct OmdbClient {
    http: HttpClient,
    config: OmdbConfig,
}

impl OmdbClient {
    pub fn new(http: HttpClient, config: OmdbConfig) -> Self {
        Self { http, config }
    }

    fn url(&self, mut params: Vec<(&str, String)>) -> Result<url::Url, ApiError> {
        params.push(("apikey", self.config.api_key.clone()));
        HttpClient::build_url(&self.config.base_url, "/", &params)
    }

    async fn fetch<T: DeserializeOwned>(&self, params: Vec<(&str, String)>) -> Result<T, ApiError> {
        let url = self.url(params)?;
        self.http.get_json(url).await
    }

    #[instrument(skip(self))]
    pub async fn title_by_imdb_id(&self, imdb_id: &str) -> Result<OmdbTitle, ApiError> {
        debug!("OMDb lookup by IMDb id");
        let title: OmdbTitle = self
            .fetch(vec![("i", imdb_id.to_string()), ("plot", "full".to_string())])
            .await?;
        found(title.response.as_str(), title.error.as_deref(), imdb_id)?;
        Ok(title)
    }

    #[instrument(skip(self))]
    pub async fn title_by_name(&self, name: &str, year: Option<i32>) -> Result<OmdbTitle, ApiError> {
        let mut params = vec![("t", name.to_string()), ("plot", "full".to_string())];
        if let Some(year) = year {
            params.push(("y", year.to_string()));
        }

        let title: OmdbTitle = self.fetch(params).await?;
        found(title.response.as_str(), title.error.as_deref(), name)?;
        Ok(title)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, page: u32) -> Result<OmdbSearch, ApiError> {
        let results: OmdbSearch = self
            .fetch(vec![
                ("s", query.to_string()),
                ("page", page.to_string()),
                ("type", "movie".to_string()),
            ])
            .await?;
        found(results.response.as_str(), results.error.as_deref(), query)?;
        Ok(results)
    }

    pub async fn ratings(&self, imdb_id: &str) -> Result<RatingsSummary, ApiError> {
        let title = self.title_by_imdb_id(imdb_id).await?;
        Ok(RatingsSummary {
            imdb_rating: title.imdb_rating,
            imdb_votes: title.imdb_votes,
            ratings: title.ratings,
        })
    }
}

// OMDb answers 200 with `"Response": "False"` for misses.
fn found(response: &str, error: Option<&str>, what: &str) -> Result<(), ApiError> {
    if response == "False" {
        return Err(ApiError::NotFound(format!(
            "{}: {}",
            what,
            error.unwrap_or("no results")
        )));
    }
    Ok(())
}

pub fn rating_by_source<'a>(ratings: &'a [Rating], source: &str) -> Option<&'a str> {
    ratings
        .iter()
        .find(|r| r.source == source)
        .map(|r| r.value.as_str())
}

pub fn imdb_rating(ratings: &[Rating]) -> Option<&str> {
    rating_by_source(ratings, IMDB_SOURCE)
}

pub fn rotten_tomatoes_rating(ratings: &[Rating]) -> Option<&str> {
    rating_by_source(ratings, ROTTEN_TOMATOES_SOURCE)
}

pub fn metacritic_rating(ratings: &[Rating]) -> Option<&str> {
    rating_by_source(ratings, METACRITIC_SOURCE)
}
