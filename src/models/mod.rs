use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media type '{}'", other)),
        }
    }
}

/// An entry in the personal watchlist. Display metadata is copied when the
/// item is added and never refreshed from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub vote_average: f64,
    pub watched: bool,
    pub added_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<DateTime<Utc>>,
}

/// Payload accepted when adding to the watchlist. Watched state and
/// timestamps are always assigned server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct NewWatchlistItem {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub vote_average: f64,
}

impl NewWatchlistItem {
    pub fn into_item(self, added_at: DateTime<Utc>) -> WatchlistItem {
        WatchlistItem {
            id: self.id,
            kind: self.kind,
            title: self.title,
            poster_path: self.poster_path,
            release_date: self.release_date,
            vote_average: self.vote_average,
            watched: false,
            added_at,
            watched_at: None,
        }
    }
}

// TMDB catalog

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub genre_ids: Vec<i64>,
    pub adult: bool,
    pub original_language: String,
    pub original_title: String,
    pub popularity: f64,
    pub video: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub budget: i64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub revenue: i64,
    #[serde(default)]
    pub runtime: Option<i64>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tagline: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TvShow {
    pub id: i64,
    pub name: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub first_air_date: String,
    pub vote_average: f64,
    pub vote_count: i64,
    pub genre_ids: Vec<i64>,
    pub adult: bool,
    pub original_language: String,
    pub original_name: String,
    pub popularity: f64,
    pub origin_country: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TvShowDetails {
    #[serde(flatten)]
    pub show: TvShow,
    #[serde(default)]
    pub episode_run_time: Vec<i64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub in_production: bool,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub last_air_date: Option<String>,
    #[serde(default)]
    pub number_of_episodes: i64,
    #[serde(default)]
    pub number_of_seasons: i64,
    #[serde(default)]
    pub production_companies: Vec<ProductionCompany>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
    #[serde(default)]
    pub spoken_languages: Vec<SpokenLanguage>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default, rename = "type")]
    pub show_type: String,
    #[serde(default)]
    pub external_ids: ExternalIds,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExternalIds {
    pub imdb_id: Option<String>,
    pub tvdb_id: Option<i64>,
    pub facebook_id: Option<String>,
    pub instagram_id: Option<String>,
    pub twitter_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductionCompany {
    pub id: i64,
    pub logo_path: Option<String>,
    pub name: String,
    pub origin_country: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SpokenLanguage {
    pub english_name: String,
    pub iso_639_1: String,
    pub name: String,
}

/// Paged result envelope used by every TMDB list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Credits {
    pub id: i64,
    pub cast: Vec<CastMember>,
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    pub character: String,
    pub profile_path: Option<String>,
    pub known_for_department: String,
    pub credit_id: String,
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CrewMember {
    pub id: i64,
    pub name: String,
    pub profile_path: Option<String>,
    pub credit_id: String,
    pub department: String,
    pub job: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Video {
    pub id: String,
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
    pub official: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct VideoList {
    pub id: i64,
    pub results: Vec<Video>,
}

impl VideoList {
    /// First YouTube trailer, falling back to any YouTube video.
    pub fn trailer(&self) -> Option<&Video> {
        let youtube = || self.results.iter().filter(|v| v.site == "YouTube");
        youtube()
            .find(|v| v.video_type == "Trailer")
            .or_else(|| youtube().next())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverFilters {
    pub genre: Option<i64>,
    pub year: Option<i32>,
    pub min_rating: Option<f64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

// OMDb ratings

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Rating {
    #[serde(rename = "Source")]
    pub source: String,
    #[serde(rename = "Value")]
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OmdbTitle {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Rated")]
    pub rated: String,
    #[serde(rename = "Released")]
    pub released: String,
    #[serde(rename = "Runtime")]
    pub runtime: String,
    #[serde(rename = "Genre")]
    pub genre: String,
    #[serde(rename = "Director")]
    pub director: String,
    #[serde(rename = "Writer")]
    pub writer: String,
    #[serde(rename = "Actors")]
    pub actors: String,
    #[serde(rename = "Plot")]
    pub plot: String,
    #[serde(rename = "Awards")]
    pub awards: String,
    #[serde(rename = "Poster")]
    pub poster: String,
    #[serde(rename = "Ratings")]
    pub ratings: Vec<Rating>,
    #[serde(rename = "Metascore")]
    pub metascore: String,
    #[serde(rename = "imdbRating")]
    pub imdb_rating: String,
    #[serde(rename = "imdbVotes")]
    pub imdb_votes: String,
    #[serde(rename = "imdbID")]
    pub imdb_id: String,
    #[serde(rename = "Type")]
    pub title_type: String,
    #[serde(rename = "BoxOffice")]
    pub box_office: String,
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OmdbSearch {
    #[serde(rename = "Search")]
    pub search: Vec<OmdbTitle>,
    #[serde(rename = "totalResults")]
    pub total_results: String,
    #[serde(rename = "Response")]
    pub response: String,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingsSummary {
    pub imdb_rating: String,
    pub imdb_votes: String,
    pub ratings: Vec<Rating>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kind_parses_and_displays() {
        assert_eq!("movie".parse::<MediaKind>(), Ok(MediaKind::Movie));
        assert_eq!("tv".parse::<MediaKind>(), Ok(MediaKind::Tv));
        assert!("show".parse::<MediaKind>().is_err());
        assert_eq!(MediaKind::Tv.to_string(), "tv");
    }

    #[test]
    fn new_item_ignores_client_state() {
        let json = r#"{"id": 550, "type": "movie", "title": "Fight Club",
                       "watched": true, "added_at": "2001-01-01T00:00:00Z"}"#;
        let new: NewWatchlistItem = serde_json::from_str(json).unwrap();
        let now = Utc::now();
        let item = new.into_item(now);

        assert!(!item.watched);
        assert_eq!(item.added_at, now);
        assert_eq!(item.watched_at, None);
        assert_eq!(item.poster_path, None);
        assert_eq!(item.release_date, "");
    }

    #[test]
    fn movie_details_tolerate_nulls_and_missing_fields() {
        let json = r#"{"id": 550, "title": "Fight Club", "poster_path": null,
                       "imdb_id": "tt0137523", "runtime": 139,
                       "genres": [{"id": 18, "name": "Drama"}]}"#;
        let details: MovieDetails = serde_json::from_str(json).unwrap();

        assert_eq!(details.movie.id, 550);
        assert_eq!(details.movie.title, "Fight Club");
        assert_eq!(details.movie.poster_path, None);
        assert_eq!(details.imdb_id.as_deref(), Some("tt0137523"));
        assert_eq!(details.genres, vec![Genre { id: 18, name: "Drama".into() }]);
    }

    #[test]
    fn trailer_prefers_youtube_trailers() {
        let videos = VideoList {
            id: 1,
            results: vec![
                Video { key: "vimeo".into(), site: "Vimeo".into(), video_type: "Trailer".into(), ..Default::default() },
                Video { key: "teaser".into(), site: "YouTube".into(), video_type: "Teaser".into(), ..Default::default() },
                Video { key: "trailer".into(), site: "YouTube".into(), video_type: "Trailer".into(), ..Default::default() },
            ],
        };
        assert_eq!(videos.trailer().map(|v| v.key.as_str()), Some("trailer"));

        let no_trailer = VideoList { id: 1, results: videos.results[..2].to_vec() };
        assert_eq!(no_trailer.trailer().map(|v| v.key.as_str()), Some("teaser"));
    }
}
