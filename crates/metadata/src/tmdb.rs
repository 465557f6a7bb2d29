//! TMDb (The Movie Database) provider.
//!
//! Uses TMDB API v3: https://developer.themoviedb.org/docs

use std::sync::Arc;

use async_stream::stream;
use mediameta_core::{MediaKind, ProviderKind};
use serde_json::Value;
use tracing::{debug, warn};

use crate::endpoints::tmdb::{tmdb_find, tmdb_movies_or_series, tmdb_search};
use crate::provider::{
    MetadataStream, Provider, ProviderOptions, SearchQuery, YearWindow, failed, not_found,
};
use crate::record::{MalformedEntry, id_string, iso_date, leading_year, non_empty};
use crate::transport::Transport;
use crate::{Metadata, MetadataError, MetadataMovie, MetadataTelevision};

/// Title searches stop after this many pages regardless of `total_pages`.
const PAGE_MAX: u32 = 5;

pub struct TmdbProvider {
    api_key: String,
    cache: bool,
    language: String,
    transport: Arc<dyn Transport>,
}

impl TmdbProvider {
    pub fn new(options: ProviderOptions) -> Result<Self, MetadataError> {
        Ok(Self {
            api_key: options.require_api_key(ProviderKind::Tmdb)?,
            cache: options.cache,
            language: options.language_or("en-US"),
            transport: options.transport_or_default(),
        })
    }

    async fn search_id_tmdb(&self, id_tmdb: &str, kind: MediaKind) -> Result<Metadata, MetadataError> {
        let data = tmdb_movies_or_series(
            self.transport.as_ref(),
            &self.api_key,
            id_tmdb,
            kind,
            &self.language,
            self.cache,
        )
        .await?;
        parse_entry(&data, kind).map_err(unexpected)
    }

    async fn search_id_imdb(&self, id_imdb: &str, kind: MediaKind) -> Result<Metadata, MetadataError> {
        let data = tmdb_find(
            self.transport.as_ref(),
            &self.api_key,
            "imdb_id",
            id_imdb,
            &self.language,
            self.cache,
        )
        .await?;
        let bucket = match kind {
            MediaKind::Movie => "movie_results",
            MediaKind::Series => "tv_results",
        };
        let entry = data[bucket]
            .as_array()
            .and_then(|r| r.first())
            .ok_or(MetadataError::NotFound)?;

        let mut meta = parse_entry(entry, kind).map_err(unexpected)?;
        match &mut meta {
            Metadata::Movie(m) => {
                m.id_imdb.get_or_insert_with(|| id_imdb.to_string());
            }
            Metadata::Television(t) => {
                t.id_imdb.get_or_insert_with(|| id_imdb.to_string());
            }
        }
        Ok(meta)
    }

    fn search_title<'a>(
        &'a self,
        title: &'a str,
        query: &'a SearchQuery,
        kind: MediaKind,
    ) -> MetadataStream<'a> {
        let window = YearWindow::expand(query.year.as_deref());
        Box::pin(stream! {
            let mut found = false;
            for page in 1..=PAGE_MAX {
                let response = match tmdb_search(
                    self.transport.as_ref(),
                    &self.api_key,
                    title,
                    query.exact_year(),
                    kind,
                    page,
                    &self.language,
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
                debug!(title, page, "TMDb search page");

                for entry in response["results"].as_array().into_iter().flatten() {
                    let meta = match parse_entry(entry, kind) {
                        Ok(meta) => meta,
                        Err(MalformedEntry(field)) => {
                            warn!(field, "skipping malformed TMDb entry");
                            continue;
                        }
                    };
                    if window.admits(meta.year()) {
                        found = true;
                        yield Ok(meta);
                    }
                }

                let total_pages = response["total_pages"].as_u64().unwrap_or(0);
                if u64::from(page) >= total_pages {
                    break;
                }
            }
            if !found {
                yield Err(MetadataError::NotFound);
            }
        })
    }
}

impl Provider for TmdbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Tmdb
    }

    /// TMDb id (`id_key` or `id_tmdb`), then IMDb id, then title. `kind`
    /// defaults to `movie`.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        let kind = match query.kind.as_deref().unwrap_or("movie").parse::<MediaKind>() {
            Ok(kind) => kind,
            Err(e) => return failed(MetadataError::Validation(e.to_string())),
        };

        if let Some(id_tmdb) = query.id_key.as_deref().or(query.id_tmdb.as_deref()) {
            return Box::pin(stream! {
                yield self.search_id_tmdb(id_tmdb, kind).await;
            });
        }
        if let Some(id_imdb) = query.id_imdb.as_deref() {
            return Box::pin(stream! {
                yield self.search_id_imdb(id_imdb, kind).await;
            });
        }
        match query.free_text() {
            Some(title) => self.search_title(title, query, kind),
            None => not_found(),
        }
    }
}

fn unexpected(MalformedEntry(field): MalformedEntry) -> MetadataError {
    MetadataError::Network(format!("TMDb record is missing or has a bad `{field}`"))
}

fn parse_entry(data: &Value, kind: MediaKind) -> Result<Metadata, MalformedEntry> {
    Ok(match kind {
        MediaKind::Movie => Metadata::Movie(parse_movie(data)?),
        MediaKind::Series => Metadata::Television(parse_series(data)?),
    })
}

fn parse_movie(data: &Value) -> Result<MetadataMovie, MalformedEntry> {
    let title = non_empty(data["title"].as_str()).ok_or(MalformedEntry("title"))?;
    let date = iso_date(data["release_date"].as_str(), "release_date")?;

    Ok(MetadataMovie {
        title: Some(title),
        year: leading_year(date.as_deref()),
        date,
        synopsis: non_empty(data["overview"].as_str()),
        id_tmdb: id_string(&data["id"]),
        // Detail responses carry `imdb_id` directly; appended external ids
        // are the fallback.
        id_imdb: non_empty(data["imdb_id"].as_str())
            .or_else(|| non_empty(data["external_ids"]["imdb_id"].as_str())),
        runtime: data["runtime"].as_u64().and_then(|r| u32::try_from(r).ok()),
        vote_average: data["vote_average"].as_f64(),
        original_language: non_empty(data["original_language"].as_str()),
        original_title: non_empty(data["original_title"].as_str()),
        ..Default::default()
    })
}

fn parse_series(data: &Value) -> Result<MetadataTelevision, MalformedEntry> {
    let name = non_empty(data["name"].as_str()).ok_or(MalformedEntry("name"))?;
    let date = iso_date(data["first_air_date"].as_str(), "first_air_date")?;

    Ok(MetadataTelevision {
        series: Some(name.clone()),
        title: Some(name),
        year: leading_year(date.as_deref()),
        date,
        synopsis: non_empty(data["overview"].as_str()),
        id_tmdb: id_string(&data["id"]),
        // Series only ever carry the IMDb id inside `external_ids`.
        id_imdb: non_empty(data["external_ids"]["imdb_id"].as_str()),
        runtime: data["episode_run_time"]
            .as_array()
            .and_then(|a| a.first())
            .and_then(|v| v.as_u64())
            .and_then(|r| u32::try_from(r).ok()),
        vote_average: data["vote_average"].as_f64(),
        original_language: non_empty(data["original_language"].as_str()),
        original_title: non_empty(data["original_name"].as_str()),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_movie_from_json() {
        let json = serde_json::json!({
            "id": 27205,
            "title": "Inception",
            "original_title": "Inception",
            "original_language": "en",
            "overview": "A thief who steals corporate secrets...",
            "release_date": "2010-07-15",
            "runtime": 148,
            "vote_average": 8.4,
            "imdb_id": "tt1375666"
        });

        let meta = parse_movie(&json).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Inception"));
        assert_eq!(meta.year.as_deref(), Some("2010"));
        assert_eq!(meta.date.as_deref(), Some("2010-07-15"));
        assert_eq!(meta.id_tmdb.as_deref(), Some("27205"));
        assert_eq!(meta.id_imdb.as_deref(), Some("tt1375666"));
        assert_eq!(meta.runtime, Some(148));
        assert!((meta.vote_average.unwrap() - 8.4).abs() < 0.01);
        assert_eq!(meta.original_language.as_deref(), Some("en"));
    }

    #[test]
    fn movie_imdb_id_falls_back_to_external_ids() {
        let json = serde_json::json!({
            "id": 603,
            "title": "The Matrix",
            "release_date": "1999-03-30",
            "external_ids": { "imdb_id": "tt0133093" }
        });
        let meta = parse_movie(&json).unwrap();
        assert_eq!(meta.id_imdb.as_deref(), Some("tt0133093"));
    }

    #[test]
    fn series_reads_imdb_id_only_from_external_ids() {
        let json = serde_json::json!({
            "id": 1396,
            "name": "Breaking Bad",
            "original_name": "Breaking Bad",
            "first_air_date": "2008-01-20",
            "episode_run_time": [45, 47],
            "imdb_id": "tt-ignored",
            "external_ids": { "imdb_id": "tt0903747" }
        });
        let meta = parse_series(&json).unwrap();
        assert_eq!(meta.series.as_deref(), Some("Breaking Bad"));
        assert_eq!(meta.year.as_deref(), Some("2008"));
        assert_eq!(meta.runtime, Some(45));
        assert_eq!(meta.id_imdb.as_deref(), Some("tt0903747"));

        let bare = serde_json::json!({ "id": 1396, "name": "Breaking Bad", "imdb_id": "tt0903747" });
        assert_eq!(parse_series(&bare).unwrap().id_imdb, None);
    }

    #[test]
    fn bad_dates_make_an_entry_malformed() {
        let json = serde_json::json!({ "id": 1, "title": "Broken", "release_date": "2010-13-45" });
        assert_eq!(parse_movie(&json), Err(MalformedEntry("release_date")));

        let json = serde_json::json!({ "id": 1, "release_date": "2010-01-01" });
        assert_eq!(parse_movie(&json), Err(MalformedEntry("title")));
    }

    #[test]
    fn empty_release_date_is_absent() {
        let json = serde_json::json!({ "id": 2, "title": "Upcoming", "release_date": "" });
        let meta = parse_movie(&json).unwrap();
        assert_eq!(meta.date, None);
        assert_eq!(meta.year, None);
    }
}
