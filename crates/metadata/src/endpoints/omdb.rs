//! OMDb API: http://www.omdbapi.com/

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::expect_body;
use crate::MetadataError;
use crate::transport::{HttpRequest, Transport};

const OMDB_URL: &str = "http://www.omdbapi.com/";

static RE_IMDB_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^tt\d+$").unwrap());

/// Looks up a single title by IMDb id.
pub async fn omdb_title(
    transport: &dyn Transport,
    api_key: &str,
    id_imdb: &str,
    media_type: Option<&str>,
    cache: bool,
) -> Result<Value, MetadataError> {
    if !RE_IMDB_ID.is_match(id_imdb) {
        return Err(MetadataError::NotFound);
    }
    let req = HttpRequest::get(OMDB_URL)
        .param("apikey", api_key)
        .param("i", id_imdb)
        .opt_param("type", media_type)
        .param("plot", "full")
        .param("r", "json")
        .cached(cache);
    let resp = transport.send(req).await?;
    omdb_body(expect_body("OMDb", resp)?)
}

/// One page (ten entries) of a title search.
pub async fn omdb_search(
    transport: &dyn Transport,
    api_key: &str,
    query: &str,
    year: Option<&str>,
    media_type: Option<&str>,
    page: u32,
    cache: bool,
) -> Result<Value, MetadataError> {
    let req = HttpRequest::get(OMDB_URL)
        .param("apikey", api_key)
        .param("s", query)
        .opt_param("y", year)
        .opt_param("type", media_type)
        .param("page", page)
        .param("r", "json")
        .cached(cache);
    let resp = transport.send(req).await?;
    omdb_body(expect_body("OMDb", resp)?)
}

/// OMDb answers 200 with `"Response": "False"` when nothing matched.
fn omdb_body(body: Value) -> Result<Value, MetadataError> {
    if body["Response"].as_str() == Some("False") {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}
