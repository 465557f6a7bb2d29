//! Search machinery shared by the two TVDb providers.
//!
//! Both API generations resolve a request the same way (by TVDb id, IMDb id,
//! series name, optionally narrowed by air date) and both authenticate with a
//! bearer token. The per-generation differences live behind [`TvdbBackend`];
//! the search paths and the re-login retry are written once here.

pub mod legacy;
pub mod v4;

use std::sync::LazyLock;

use async_stream::stream;
use futures::StreamExt;
use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::provider::{MetadataStream, SearchQuery, failed, not_found};
use crate::record::{MalformedEntry, non_empty};
use crate::{Metadata, MetadataError, MetadataTelevision};

/// Name searches fan out over at most this many candidate series.
const SERIES_CANDIDATES: usize = 5;

/// Episode listings stop after this many pages even if the backend keeps
/// advertising another one.
const EPISODE_PAGES_MAX: u32 = 100;

static RE_DATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(19|20)\d{2}(-(0[1-9]|1[0-2])(-(0[1-9]|[12]\d|3[01]))?)?$").unwrap()
});

/// Bearer token holder. Written only by the re-login step, and always
/// replaced whole.
pub(crate) struct TokenCell(RwLock<Option<String>>);

impl TokenCell {
    pub(crate) fn new(token: Option<String>) -> Self {
        Self(RwLock::new(token))
    }

    pub(crate) async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    pub(crate) async fn replace(&self, token: String) {
        *self.0.write().await = Some(token);
    }
}

/// One page of episodes plus the page to request next, if any.
pub(crate) struct EpisodePage {
    pub entries: Vec<Value>,
    pub next: Option<u32>,
}

pub(crate) enum SeriesLookup<'a> {
    Name(&'a str),
    Imdb(&'a str),
}

#[async_trait::async_trait]
pub(crate) trait TvdbBackend: Send + Sync {
    fn label(&self) -> &'static str;

    fn tokens(&self) -> &TokenCell;

    async fn login(&self) -> Result<String, MetadataError>;

    async fn series_name(&self, token: Option<&str>, id_tvdb: &str) -> Result<String, MetadataError>;

    fn first_page(&self) -> u32;

    async fn episode_page(
        &self,
        token: Option<&str>,
        id_tvdb: &str,
        season: Option<u32>,
        episode: Option<u32>,
        page: u32,
    ) -> Result<EpisodePage, MetadataError>;

    /// TVDb ids of matching series, best match first.
    async fn find_series(
        &self,
        token: Option<&str>,
        lookup: SeriesLookup<'_>,
    ) -> Result<Vec<String>, MetadataError>;

    fn map_episode(
        &self,
        series: &str,
        id_tvdb: &str,
        entry: &Value,
    ) -> Result<MetadataTelevision, MalformedEntry>;

    /// Picks the search path for `query`.
    fn dispatch<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        episode_search(self, query).unwrap_or_else(not_found)
    }
}

/// Runs `backend.dispatch(query)` and, when it is rejected as unauthorized
/// while no token from a fresh login is held, logs in once and runs it
/// again. Results delivered before the rejection are not repeated.
pub(crate) fn search_with_reauth<'a, B>(backend: &'a B, query: &'a SearchQuery) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let mut delivered = 0usize;
        loop {
            let relying_on_cache = backend.tokens().get().await.is_none();
            let mut skip = delivered;
            let mut rejected = None;

            let mut results = backend.dispatch(query);
            while let Some(item) = results.next().await {
                match item {
                    Ok(_) if skip > 0 => skip -= 1,
                    Ok(meta) => {
                        delivered += 1;
                        yield Ok(meta);
                    }
                    Err(MetadataError::Unauthorized(reason)) if relying_on_cache => {
                        rejected = Some(reason);
                        break;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
            drop(results);

            let Some(reason) = rejected else {
                return;
            };
            info!(backend = backend.label(), %reason, "result not cached; logging in and retrying search");
            match backend.login().await {
                Ok(token) => backend.tokens().replace(token).await,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
    })
}

/// The id, IMDb and series-name paths in priority order, or `None` when the
/// query names none of them.
pub(crate) fn episode_search<'a, B>(backend: &'a B, query: &'a SearchQuery) -> Option<MetadataStream<'a>>
where
    B: TvdbBackend + ?Sized,
{
    let date = query.date.as_deref();
    if let Some(id_tvdb) = query.id_key.as_deref().or(query.id_tvdb.as_deref()) {
        return Some(match date {
            Some(date) => search_tvdb_date(backend, id_tvdb, date),
            None => search_id_tvdb(backend, id_tvdb, query.season, query.episode),
        });
    }
    if let Some(id_imdb) = query.id_imdb.as_deref() {
        return Some(search_id_imdb(backend, id_imdb, query.season, query.episode));
    }
    if let Some(series) = query.series.as_deref() {
        return Some(match date {
            Some(date) if !RE_DATE_PREFIX.is_match(date) => failed(MetadataError::Validation(
                format!("date must be formatted as YYYY[-MM[-DD]], got {date:?}"),
            )),
            Some(date) => search_series_date(backend, series, date),
            None => search_series(backend, series, query.season, query.episode),
        });
    }
    None
}

/// Every episode of one series matching the season/episode filter, walking
/// the backend's pages until the last.
pub(crate) fn search_id_tvdb<'a, B>(
    backend: &'a B,
    id_tvdb: &'a str,
    season: Option<u32>,
    episode: Option<u32>,
) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let token = backend.tokens().get().await;
        let series = match backend.series_name(token.as_deref(), id_tvdb).await {
            Ok(name) => name,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut found = false;
        let mut page = backend.first_page();
        let mut fetched = 0;
        loop {
            let token = backend.tokens().get().await;
            let batch = match backend
                .episode_page(token.as_deref(), id_tvdb, season, episode, page)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            debug!(backend = backend.label(), id_tvdb, page, entries = batch.entries.len(), "episode page");

            for entry in &batch.entries {
                match backend.map_episode(&series, id_tvdb, entry) {
                    Ok(meta) => {
                        found = true;
                        yield Ok(Metadata::Television(meta));
                    }
                    Err(MalformedEntry(field)) => {
                        warn!(backend = backend.label(), field, "skipping malformed episode");
                    }
                }
            }

            fetched += 1;
            match batch.next {
                Some(next) if next > page && fetched < EPISODE_PAGES_MAX => page = next,
                Some(_) if fetched >= EPISODE_PAGES_MAX => {
                    warn!(backend = backend.label(), id_tvdb, "episode page limit reached");
                    break;
                }
                _ => break,
            }
        }
        if !found {
            yield Err(MetadataError::NotFound);
        }
    })
}

/// Resolves the IMDb id to the first matching series, then searches by id.
pub(crate) fn search_id_imdb<'a, B>(
    backend: &'a B,
    id_imdb: &'a str,
    season: Option<u32>,
    episode: Option<u32>,
) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let token = backend.tokens().get().await;
        let id_tvdb = match backend.find_series(token.as_deref(), SeriesLookup::Imdb(id_imdb)).await {
            Ok(ids) => match ids.into_iter().next() {
                Some(id) => id,
                None => {
                    yield Err(MetadataError::NotFound);
                    return;
                }
            },
            Err(e) => {
                yield Err(e);
                return;
            }
        };
        let mut results = search_id_tvdb(backend, &id_tvdb, season, episode);
        while let Some(item) = results.next().await {
            yield item;
        }
    })
}

/// Episodes of one series whose air date starts with `date`.
pub(crate) fn search_tvdb_date<'a, B>(backend: &'a B, id_tvdb: &'a str, date: &'a str) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let mut found = false;
        let mut results = search_id_tvdb(backend, id_tvdb, None, None);
        while let Some(item) = results.next().await {
            match item {
                Ok(meta) => {
                    if meta.date().is_some_and(|d| d.starts_with(date)) {
                        found = true;
                        yield Ok(meta);
                    }
                }
                Err(MetadataError::NotFound) => break,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }
        if !found {
            yield Err(MetadataError::NotFound);
        }
    })
}

/// Up to five candidate series by name, each searched by id in turn.
/// A candidate without the requested episode is skipped.
pub(crate) fn search_series<'a, B>(
    backend: &'a B,
    series: &'a str,
    season: Option<u32>,
    episode: Option<u32>,
) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let token = backend.tokens().get().await;
        let ids = match backend.find_series(token.as_deref(), SeriesLookup::Name(series)).await {
            Ok(ids) => ids,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut found = false;
        for id_tvdb in ids.iter().take(SERIES_CANDIDATES) {
            let mut results = search_id_tvdb(backend, id_tvdb, season, episode);
            while let Some(item) = results.next().await {
                match item {
                    Ok(meta) => {
                        found = true;
                        yield Ok(meta);
                    }
                    Err(MetadataError::NotFound) => {
                        debug!(backend = backend.label(), id_tvdb = %id_tvdb, "candidate series has no match");
                        break;
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
        if !found {
            yield Err(MetadataError::NotFound);
        }
    })
}

/// Up to five candidate series by name, keeping episodes aired on `date`.
pub(crate) fn search_series_date<'a, B>(backend: &'a B, series: &'a str, date: &'a str) -> MetadataStream<'a>
where
    B: TvdbBackend + ?Sized,
{
    Box::pin(stream! {
        let token = backend.tokens().get().await;
        let ids = match backend.find_series(token.as_deref(), SeriesLookup::Name(series)).await {
            Ok(ids) => ids,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut found = false;
        for id_tvdb in ids.iter().take(SERIES_CANDIDATES) {
            let mut results = search_tvdb_date(backend, id_tvdb, date);
            while let Some(item) = results.next().await {
                match item {
                    Ok(meta) => {
                        found = true;
                        yield Ok(meta);
                    }
                    Err(MetadataError::NotFound) => break,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }
        if !found {
            yield Err(MetadataError::NotFound);
        }
    })
}

/// Episode overviews arrive with stray CR/LF pairs and double spaces.
pub(crate) fn clean_synopsis(raw: Option<&str>) -> Option<String> {
    let cleaned = raw?.replace("\r\n", "").replace("  ", "");
    non_empty(Some(&cleaned))
}

/// Multi-part episode names are `;`-separated; keep the first part.
pub(crate) fn first_episode_name(raw: &str) -> Option<String> {
    non_empty(raw.split(';').next())
}
