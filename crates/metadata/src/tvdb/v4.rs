//! TheTVDB v4 provider (API key + subscriber PIN).

use std::sync::{Arc, LazyLock};

use async_stream::stream;
use mediameta_core::{MediaKind, ProviderKind};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    EpisodePage, SeriesLookup, TokenCell, TvdbBackend, clean_synopsis, episode_search,
    first_episode_name, search_with_reauth,
};
use crate::endpoints::tvdbv4::{
    tvdbv4_login, tvdbv4_search, tvdbv4_search_remote_id, tvdbv4_series, tvdbv4_series_episodes,
};
use crate::provider::{MetadataStream, Provider, ProviderOptions, SearchQuery, failed, not_found};
use crate::record::{MalformedEntry, id_string, iso_date, leading_year, non_empty};
use crate::transport::Transport;
use crate::{Metadata, MetadataError, MetadataMovie, MetadataTelevision};

static RE_PAGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").unwrap());

pub struct TvdbV4Provider {
    api_key: String,
    pin: String,
    cache: bool,
    transport: Arc<dyn Transport>,
    token: TokenCell,
}

impl TvdbV4Provider {
    pub async fn new(options: ProviderOptions) -> Result<Self, MetadataError> {
        let api_key = options.require_api_key(ProviderKind::TvdbV4)?;
        let pin = options.require_pin(ProviderKind::TvdbV4)?;
        let transport = options.transport_or_default();
        let token = if options.cache {
            None
        } else {
            Some(tvdbv4_login(transport.as_ref(), &api_key, &pin).await?)
        };
        Ok(Self {
            api_key,
            pin,
            cache: options.cache,
            transport,
            token: TokenCell::new(token),
        })
    }

    /// Unified search across movies and series. Each hit becomes a record of
    /// the requested `kind`.
    fn search_text<'a>(&'a self, text: &'a str, query: &'a SearchQuery) -> MetadataStream<'a> {
        let kind = match query.kind.as_deref().map(str::parse::<MediaKind>) {
            Some(Ok(kind)) => kind,
            Some(Err(e)) => return failed(MetadataError::Validation(e.to_string())),
            None => {
                return failed(MetadataError::Validation(
                    "TVDb v4 text search needs a kind (movie or series)".into(),
                ));
            }
        };

        Box::pin(stream! {
            let token = self.token.get().await;
            let response = match tvdbv4_search(
                self.transport.as_ref(),
                token.as_deref(),
                text,
                Some(kind.as_str()),
                query.exact_year(),
                self.cache,
            )
            .await
            {
                Ok(r) => r,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            debug!(text, %kind, "TVDb v4 search");

            let mut found = false;
            for entry in response["data"].as_array().into_iter().flatten() {
                match map_search_entry(entry, kind) {
                    Ok(meta) => {
                        found = true;
                        yield Ok(meta);
                    }
                    Err(MalformedEntry(field)) => {
                        warn!(field, "skipping malformed TVDb v4 search entry");
                    }
                }
            }
            if !found {
                yield Err(MetadataError::NotFound);
            }
        })
    }
}

impl Provider for TvdbV4Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::TvdbV4
    }

    /// The legacy TVDb paths, then a free-text search on `title` or `query`.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        search_with_reauth(self, query)
    }
}

#[async_trait::async_trait]
impl TvdbBackend for TvdbV4Provider {
    fn label(&self) -> &'static str {
        "tvdbv4"
    }

    fn tokens(&self) -> &TokenCell {
        &self.token
    }

    async fn login(&self) -> Result<String, MetadataError> {
        tvdbv4_login(self.transport.as_ref(), &self.api_key, &self.pin).await
    }

    async fn series_name(&self, token: Option<&str>, id_tvdb: &str) -> Result<String, MetadataError> {
        let data = tvdbv4_series(self.transport.as_ref(), token, id_tvdb, self.cache).await?;
        non_empty(data["data"]["name"].as_str())
            .ok_or_else(|| MetadataError::Network(format!("TVDb v4 series {id_tvdb} has no name")))
    }

    fn first_page(&self) -> u32 {
        0
    }

    async fn episode_page(
        &self,
        token: Option<&str>,
        id_tvdb: &str,
        season: Option<u32>,
        episode: Option<u32>,
        page: u32,
    ) -> Result<EpisodePage, MetadataError> {
        let data = tvdbv4_series_episodes(
            self.transport.as_ref(),
            token,
            id_tvdb,
            season,
            episode,
            page,
            self.cache,
        )
        .await?;
        Ok(episode_page_from(data, page))
    }

    async fn find_series(
        &self,
        token: Option<&str>,
        lookup: SeriesLookup<'_>,
    ) -> Result<Vec<String>, MetadataError> {
        let transport = self.transport.as_ref();
        let ids = match lookup {
            SeriesLookup::Name(name) => {
                let data =
                    tvdbv4_search(transport, token, name, Some("series"), None, self.cache).await?;
                collect_ids(&data, |entry| id_string(&entry["tvdb_id"]))
            }
            SeriesLookup::Imdb(id_imdb) => {
                let data = tvdbv4_search_remote_id(transport, token, id_imdb, self.cache).await?;
                collect_ids(&data, |entry| id_string(&entry["series"]["id"]))
            }
        };
        Ok(ids)
    }

    fn map_episode(
        &self,
        series: &str,
        id_tvdb: &str,
        entry: &Value,
    ) -> Result<MetadataTelevision, MalformedEntry> {
        map_episode(series, id_tvdb, entry)
    }

    fn dispatch<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        if let Some(results) = episode_search(self, query) {
            return results;
        }
        match query.free_text() {
            Some(text) => self.search_text(text, query),
            None => not_found(),
        }
    }
}

fn collect_ids(data: &Value, id: impl Fn(&Value) -> Option<String>) -> Vec<String> {
    data["data"].as_array().into_iter().flatten().filter_map(id).collect()
}

/// v4 links the following page through `links.next`. The page number is
/// read from that URL when present, otherwise the next one is assumed.
fn episode_page_from(mut data: Value, page: u32) -> EpisodePage {
    let next = match &data["links"]["next"] {
        Value::Null => None,
        Value::String(url) => Some(
            RE_PAGE_PARAM
                .captures(url)
                .and_then(|c| c[1].parse().ok())
                .unwrap_or(page + 1),
        ),
        _ => Some(page + 1),
    };
    let entries = match data.pointer_mut("/data/episodes").map(Value::take) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    EpisodePage { entries, next }
}

fn map_episode(series: &str, id_tvdb: &str, entry: &Value) -> Result<MetadataTelevision, MalformedEntry> {
    let season = id_string(&entry["seasonNumber"]).ok_or(MalformedEntry("seasonNumber"))?;
    let episode = id_string(&entry["number"]).ok_or(MalformedEntry("number"))?;
    let name = entry["name"].as_str().ok_or(MalformedEntry("name"))?;
    let date = iso_date(entry["aired"].as_str(), "aired")?;

    Ok(MetadataTelevision {
        series: Some(series.to_string()),
        title: first_episode_name(name),
        season: Some(season),
        episode: Some(episode),
        year: leading_year(date.as_deref()),
        date,
        synopsis: clean_synopsis(entry["overview"].as_str()),
        id_tvdb: Some(id_tvdb.to_string()),
        runtime: entry["runtime"].as_u64().and_then(|r| u32::try_from(r).ok()),
        ..Default::default()
    })
}

/// Cross-reference id from the embedded `remote_ids` list.
fn remote_id(entry: &Value, source: &str) -> Option<String> {
    entry["remote_ids"]
        .as_array()?
        .iter()
        .find(|r| r["sourceName"].as_str() == Some(source))
        .and_then(|r| non_empty(r["id"].as_str()))
}

fn map_search_entry(entry: &Value, kind: MediaKind) -> Result<Metadata, MalformedEntry> {
    let name = non_empty(entry["name"].as_str()).ok_or(MalformedEntry("name"))?;
    let date = iso_date(entry["first_air_time"].as_str(), "first_air_time")?;
    let year = non_empty(entry["year"].as_str()).or_else(|| leading_year(date.as_deref()));
    let synopsis = non_empty(entry["overview"].as_str());
    let id_imdb = remote_id(entry, "IMDB");
    let id_tmdb = remote_id(entry, "TheMovieDB.com");
    let id_tvdb = id_string(&entry["tvdb_id"]);

    Ok(match kind {
        MediaKind::Movie => Metadata::Movie(MetadataMovie {
            title: Some(name),
            date,
            year,
            synopsis,
            id_imdb,
            id_tmdb,
            id_tvdb,
            ..Default::default()
        }),
        MediaKind::Series => Metadata::Television(MetadataTelevision {
            series: Some(name.clone()),
            title: Some(name),
            date,
            year,
            synopsis,
            id_imdb,
            id_tmdb,
            id_tvdb,
            ..Default::default()
        }),
    })
}
