//! TheTVDB API v4: https://thetvdb.github.io/v4-api/

use serde_json::{Value, json};

use super::{expect_body, is_empty};
use crate::MetadataError;
use crate::transport::{HttpRequest, Transport};

const BASE_URL: &str = "https://api4.thetvdb.com/v4";

/// Exchanges an API key and subscriber PIN for a bearer token.
pub async fn tvdbv4_login(
    transport: &dyn Transport,
    api_key: &str,
    pin: &str,
) -> Result<String, MetadataError> {
    let req = HttpRequest::post(
        format!("{BASE_URL}/login"),
        json!({ "apikey": api_key, "pin": pin }),
    );
    let body = expect_body("TVDb v4", transport.send(req).await?)?;
    body["data"]["token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MetadataError::Unauthorized("TVDb v4 login returned no token".into()))
}

pub async fn tvdbv4_series(
    transport: &dyn Transport,
    token: Option<&str>,
    id_tvdb: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/series/{id_tvdb}"))
        .bearer(token)
        .cached(cache);
    expect_body("TVDb v4", transport.send(req).await?)
}

/// One page of a series' episodes in aired order. Pages start at 0.
pub async fn tvdbv4_series_episodes(
    transport: &dyn Transport,
    token: Option<&str>,
    id_tvdb: &str,
    season: Option<u32>,
    episode: Option<u32>,
    page: u32,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/series/{id_tvdb}/episodes/default"))
        .bearer(token)
        .param("page", page)
        .opt_param("season", season)
        .opt_param("episodeNumber", episode)
        .cached(cache);
    expect_body("TVDb v4", transport.send(req).await?)
}

/// Free-text search across series, movies and people.
pub async fn tvdbv4_search(
    transport: &dyn Transport,
    token: Option<&str>,
    query: &str,
    kind: Option<&str>,
    year: Option<&str>,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/search"))
        .bearer(token)
        .param("query", query)
        .opt_param("type", kind)
        .opt_param("year", year)
        .cached(cache);
    let body = expect_body("TVDb v4", transport.send(req).await?)?;
    if is_empty(body.get("data")) {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}

/// Resolves a foreign id (IMDb, TMDb, ...) to TVDb records.
pub async fn tvdbv4_search_remote_id(
    transport: &dyn Transport,
    token: Option<&str>,
    remote_id: &str,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(format!("{BASE_URL}/search/remoteid/{remote_id}"))
        .bearer(token)
        .cached(cache);
    let body = expect_body("TVDb v4", transport.send(req).await?)?;
    if is_empty(body.get("data")) {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}
