//! TheTVDB v3 provider (API key + bearer token).

use std::sync::Arc;

use mediameta_core::ProviderKind;
use serde_json::Value;

use super::{
    EpisodePage, SeriesLookup, TokenCell, TvdbBackend, clean_synopsis, first_episode_name,
    search_with_reauth,
};
use crate::endpoints::tvdb::{
    tvdb_login, tvdb_search_series, tvdb_series_id, tvdb_series_id_episodes_query,
};
use crate::provider::{MetadataStream, Provider, ProviderOptions, SearchQuery};
use crate::record::{MalformedEntry, id_string, iso_date, leading_year, non_empty};
use crate::transport::Transport;
use crate::{MetadataError, MetadataTelevision};

pub struct TvdbProvider {
    api_key: String,
    cache: bool,
    language: String,
    transport: Arc<dyn Transport>,
    token: TokenCell,
}

impl TvdbProvider {
    /// Logs in straight away only when caching is off; with caching on, a
    /// cached response needs no token and the login waits for the first
    /// rejection.
    pub async fn new(options: ProviderOptions) -> Result<Self, MetadataError> {
        let api_key = options.require_api_key(ProviderKind::Tvdb)?;
        let transport = options.transport_or_default();
        let token = if options.cache {
            None
        } else {
            Some(tvdb_login(transport.as_ref(), &api_key).await?)
        };
        Ok(Self {
            api_key,
            cache: options.cache,
            language: options.language_or("en"),
            transport,
            token: TokenCell::new(token),
        })
    }
}

impl Provider for TvdbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tvdb
    }

    /// In priority order: TVDb id (`id_key` or `id_tvdb`) with date, TVDb id,
    /// IMDb id, series name with date, series name.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        search_with_reauth(self, query)
    }
}

#[async_trait::async_trait]
impl TvdbBackend for TvdbProvider {
    fn label(&self) -> &'static str {
        "tvdb"
    }

    fn tokens(&self) -> &TokenCell {
        &self.token
    }

    async fn login(&self) -> Result<String, MetadataError> {
        tvdb_login(self.transport.as_ref(), &self.api_key).await
    }

    async fn series_name(&self, token: Option<&str>, id_tvdb: &str) -> Result<String, MetadataError> {
        let data = tvdb_series_id(
            self.transport.as_ref(),
            token,
            id_tvdb,
            &self.language,
            self.cache,
        )
        .await?;
        non_empty(data["data"]["seriesName"].as_str())
            .ok_or_else(|| MetadataError::Network(format!("TVDb series {id_tvdb} has no name")))
    }

    fn first_page(&self) -> u32 {
        1
    }

    async fn episode_page(
        &self,
        token: Option<&str>,
        id_tvdb: &str,
        season: Option<u32>,
        episode: Option<u32>,
        page: u32,
    ) -> Result<EpisodePage, MetadataError> {
        let data = tvdb_series_id_episodes_query(
            self.transport.as_ref(),
            token,
            id_tvdb,
            episode,
            season,
            page,
            &self.language,
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
        let (name, id_imdb) = match lookup {
            SeriesLookup::Name(name) => (Some(name), None),
            SeriesLookup::Imdb(id) => (None, Some(id)),
        };
        let data = tvdb_search_series(
            self.transport.as_ref(),
            token,
            name,
            id_imdb,
            &self.language,
            self.cache,
        )
        .await?;
        Ok(data["data"]
            .as_array()
            .into_iter()
            .flatten()
            .filter_map(|s| id_string(&s["id"]))
            .collect())
    }

    fn map_episode(
        &self,
        series: &str,
        id_tvdb: &str,
        entry: &Value,
    ) -> Result<MetadataTelevision, MalformedEntry> {
        map_episode(series, id_tvdb, entry)
    }
}

/// v3 reports the last page number in `links.last`.
fn episode_page_from(mut data: Value, page: u32) -> EpisodePage {
    let last = data["links"]["last"].as_u64();
    let entries = match data.get_mut("data").map(Value::take) {
        Some(Value::Array(entries)) => entries,
        _ => Vec::new(),
    };
    let next = match last {
        Some(last) if u64::from(page) < last => Some(page + 1),
        _ => None,
    };
    EpisodePage { entries, next }
}

fn map_episode(series: &str, id_tvdb: &str, entry: &Value) -> Result<MetadataTelevision, MalformedEntry> {
    let season = id_string(&entry["airedSeason"]).ok_or(MalformedEntry("airedSeason"))?;
    let episode =
        id_string(&entry["airedEpisodeNumber"]).ok_or(MalformedEntry("airedEpisodeNumber"))?;
    let name = entry["episodeName"]
        .as_str()
        .ok_or(MalformedEntry("episodeName"))?;
    let date = iso_date(entry["firstAired"].as_str(), "firstAired")?;

    Ok(MetadataTelevision {
        series: Some(series.to_string()),
        title: first_episode_name(name),
        season: Some(season),
        episode: Some(episode),
        year: leading_year(date.as_deref()),
        date,
        synopsis: clean_synopsis(entry["overview"].as_str()),
        id_tvdb: Some(id_tvdb.to_string()),
        id_imdb: non_empty(entry["imdbId"].as_str()),
        ..Default::default()
    })
}
