//! TheTVDB API v3: https://api.thetvdb.com/swagger

use serde_json::{Value, json};

use super::expect_body;
use crate::MetadataError;
use crate::transport::{HttpRequest, Transport};

const BASE_URL: &str = "https://api.thetvdb.com";

/// Exchanges an API key for a bearer token.
pub async fn tvdb_login(transport: &dyn Transport, api_key: &str) -> Result<String, MetadataError> {
    let req = HttpRequest::post(format!("{BASE_URL}/login"), json!({ "apikey": api_key }));
    let body = expect_body("TVDb", transport.send(req).await?)?;
    body["token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MetadataError::Unauthorized("TVDb login returned no token".into()))
}

/// Series record by TVDb id.
pub async fn tvdb_series_id(
    transport: &dyn Transport,
    token: Option<&str>,
    id_tvdb: &str,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/series/{id_tvdb}"))
        .bearer(token)
        .header("Accept-Language", language)
        .cached(cache);
    expect_body("TVDb", transport.send(req).await?)
}

/// One page of a series' episodes, optionally narrowed by season/episode.
pub async fn tvdb_series_id_episodes_query(
    transport: &dyn Transport,
    token: Option<&str>,
    id_tvdb: &str,
    episode: Option<u32>,
    season: Option<u32>,
    page: u32,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/series/{id_tvdb}/episodes/query"))
        .bearer(token)
        .header("Accept-Language", language)
        .opt_param("airedSeason", season)
        .opt_param("airedEpisode", episode)
        .param("page", page)
        .cached(cache);
    expect_body("TVDb", transport.send(req).await?)
}

/// Searches series by name or by IMDb id; exactly one must be given.
pub async fn tvdb_search_series(
    transport: &dyn Transport,
    token: Option<&str>,
    series: Option<&str>,
    id_imdb: Option<&str>,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/search/series"))
        .bearer(token)
        .header("Accept-Language", language)
        .cached(cache);
    let req = match (series, id_imdb) {
        (Some(name), None) => req.param("name", name),
        (None, Some(id)) => req.param("imdbId", id),
        _ => {
            return Err(MetadataError::Validation(
                "series search takes either a name or an IMDb id".into(),
            ));
        }
    };
    expect_body("TVDb", transport.send(req).await?)
}
