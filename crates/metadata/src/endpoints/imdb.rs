//! IMDb's public search-suggestion service.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{expect_body, is_empty};
use crate::MetadataError;
use crate::transport::{HttpRequest, Transport};

const SUGGESTION_URL: &str = "https://v2.sg.media-imdb.com/suggestion";

static RE_NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{Alphabetic}\p{N}]+").unwrap());

/// URL-safe form of a query: lowercased, every run of other characters
/// collapsed to `_`, with the year appended when given.
pub fn suggestion_slug(query: &str, year: Option<&str>) -> String {
    let lower = query.to_lowercase();
    let mut slug = RE_NON_ALNUM
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string();
    if let Some(year) = year.map(str::trim).filter(|y| !y.is_empty()) {
        if !slug.is_empty() {
            slug.push('_');
        }
        slug.push_str(year);
    }
    slug
}

pub async fn imdb_suggestion(
    transport: &dyn Transport,
    query: &str,
    year: Option<&str>,
    cache: bool,
) -> Result<Value, MetadataError> {
    let slug = suggestion_slug(query, year);
    let Some(first) = slug.chars().next() else {
        return Err(MetadataError::NotFound);
    };
    let req = HttpRequest::get(format!("{SUGGESTION_URL}/{first}/{slug}.json")).cached(cache);
    let body = expect_body("IMDb", transport.send(req).await?)?;
    if is_empty(body.get("d")) {
        return Err(MetadataError::NotFound);
    }
    Ok(body)
}
