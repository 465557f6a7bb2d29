//! OMDb provider: IMDb-id lookups and paginated title searches.

use std::sync::Arc;

use async_stream::stream;
use chrono::NaiveDate;
use mediameta_core::ProviderKind;
use serde_json::Value;
use tracing::debug;

use crate::endpoints::omdb::{omdb_search, omdb_title};
use crate::provider::{MetadataStream, Provider, ProviderOptions, SearchQuery, YearWindow, not_found};
use crate::record::{NOT_AVAILABLE, leading_year, non_empty};
use crate::transport::Transport;
use crate::{Metadata, MetadataError, MetadataMovie};

/// OMDb never returns more than ten entries per page.
const PAGE_SIZE: u32 = 10;
const PAGE_MAX: u32 = 10;

pub struct OmdbProvider {
    api_key: String,
    cache: bool,
    transport: Arc<dyn Transport>,
}

impl OmdbProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, MetadataError> {
        Ok(Self {
            api_key: options.require_api_key(ProviderKind::Omdb)?,
            cache: options.cache,
            transport: options.transport_or_default(),
        })
    }

    async fn lookup(&self, id_imdb: &str) -> Result<MetadataMovie, MetadataError> {
        lookup_title(
            self.transport.as_ref(),
            &self.api_key,
            id_imdb,
            Some("movie"),
            self.cache,
        )
        .await
    }

    fn search_title<'a>(&'a self, title: &'a str, year: Option<&'a str>) -> MetadataStream<'a> {
        let window = YearWindow::expand(year);
        Box::pin(stream! {
            let mut found = false;
            for page in 1..=PAGE_MAX {
                let response = match omdb_search(
                    self.transport.as_ref(),
                    &self.api_key,
                    title,
                    None,
                    Some("movie"),
                    page,
                    self.cache,
                )
                .await
                {
                    Ok(r) => r,
                    Err(MetadataError::NotFound) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                debug!(title, page, "OMDb search page");

                for entry in response["Search"].as_array().into_iter().flatten() {
                    if !window.admits(entry["Year"].as_str()) {
                        continue;
                    }
                    let Some(id_imdb) = entry["imdbID"].as_str() else {
                        continue;
                    };
                    match self.lookup(id_imdb).await {
                        Ok(meta) => {
                            found = true;
                            yield Ok(Metadata::Movie(meta));
                        }
                        Err(MetadataError::NotFound) => continue,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                let total = response["totalResults"]
                    .as_str()
                    .and_then(|t| t.parse::<u32>().ok());
                if total.is_some_and(|t| page * PAGE_SIZE >= t) {
                    break;
                }
            }
            if !found {
                yield Err(MetadataError::NotFound);
            }
        })
    }
}

impl Provider for OmdbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Omdb
    }

    /// IMDb id (`id_key` or `id_imdb`) first, then title.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        if let Some(id_imdb) = query.id_key.as_deref().or(query.id_imdb.as_deref()) {
            return Box::pin(stream! {
                yield self.lookup(id_imdb).await.map(Metadata::Movie);
            });
        }
        match query.free_text() {
            Some(title) => self.search_title(title, query.year.as_deref()),
            None => not_found(),
        }
    }
}

/// Single-title lookup through OMDb's `i=` endpoint. Also used by the IMDb
/// provider for id lookups.
pub(crate) async fn lookup_title(
    transport: &dyn Transport,
    api_key: &str,
    id_imdb: &str,
    media_type: Option<&str>,
    cache: bool,
) -> Result<MetadataMovie, MetadataError> {
    let response = omdb_title(transport, api_key, id_imdb, media_type, cache).await?;
    parse_title(id_imdb, &response)
}

fn parse_title(id_imdb: &str, data: &Value) -> Result<MetadataMovie, MetadataError> {
    let title = non_empty(data["Title"].as_str())
        .ok_or_else(|| MetadataError::Network("OMDb response has no title".into()))?;
    let year = leading_year(data["Year"].as_str());
    let date = release_date(data["Released"].as_str())
        .or_else(|| year.as_ref().map(|y| format!("{y}-01-01")));

    Ok(MetadataMovie {
        title: Some(title),
        year: year.or_else(|| leading_year(date.as_deref())),
        date,
        synopsis: available(data["Plot"].as_str()),
        id_imdb: Some(id_imdb.to_string()),
        runtime: available(data["Runtime"].as_str()).and_then(|r| {
            r.split_whitespace()
                .next()
                .and_then(|m| m.parse().ok())
        }),
        vote_average: available(data["imdbRating"].as_str()).and_then(|r| r.parse().ok()),
        ..Default::default()
    })
}

/// `"31 Mar 1999"` to `"1999-03-31"`.
fn release_date(raw: Option<&str>) -> Option<String> {
    NaiveDate::parse_from_str(raw?.trim(), "%d %b %Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn available(raw: Option<&str>) -> Option<String> {
    non_empty(raw).filter(|v| v != NOT_AVAILABLE)
}
