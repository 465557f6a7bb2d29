//! TMDb API v3: https://developer.themoviedb.org/docs

use mediameta_core::MediaKind;
use serde_json::Value;

use super::{expect_body, is_empty};
use crate::MetadataError;
use crate::transport::{HttpRequest, Transport};

const BASE_URL: &str = "https://api.themoviedb.org/3";

const FIND_BUCKETS: [&str; 5] = [
    "movie_results",
    "person_results",
    "tv_episode_results",
    "tv_results",
    "tv_season_results",
];

/// Finds TMDb objects by a foreign key such as an IMDb id.
pub async fn tmdb_find(
    transport: &dyn Transport,
    api_key: &str,
    external_source: &str,
    external_id: &str,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/find/{external_id}"))
        .param("api_key", api_key)
        .param("external_source", external_source)
        .param("language", language)
        .cached(cache);
    let body = expect_body("TMDb", transport.send(req).await?)?;
    if FIND_BUCKETS.iter().all(|k| is_empty(body.get(*k))) {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}

/// Details for one movie or series, with external ids and translations.
pub async fn tmdb_movies_or_series(
    transport: &dyn Transport,
    api_key: &str,
    id_tmdb: &str,
    kind: MediaKind,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    if id_tmdb.is_empty() || !id_tmdb.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MetadataError::NotFound);
    }
    let path = match kind {
        MediaKind::Movie => "movie",
        MediaKind::Series => "tv",
    };
    let req = HttpRequest::get(format!("{BASE_URL}/{path}/{id_tmdb}"))
        .param("api_key", api_key)
        .param("language", language)
        .param("append_to_response", "external_ids,translations")
        .cached(cache);
    expect_body("TMDb", transport.send(req).await?)
}

/// One page of a movie or series title search.
pub async fn tmdb_search(
    transport: &dyn Transport,
    api_key: &str,
    query: &str,
    year: Option<&str>,
    kind: MediaKind,
    page: u32,
    language: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let (path, year_param) = match kind {
        MediaKind::Movie => ("movie", "year"),
        MediaKind::Series => ("tv", "first_air_date_year"),
    };
    let req = HttpRequest::get(format!("{BASE_URL}/search/{path}"))
        .param("api_key", api_key)
        .param("query", query)
        .param("page", page)
        .param("include_adult", false)
        .param("language", language)
        .opt_param(year_param, year)
        .cached(cache);
    let body = expect_body("TMDb", transport.send(req).await?)?;
    if body["total_results"].as_u64() == Some(0) {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}
