//! IMDb provider: title searches through the public suggestion service, id
//! lookups through OMDb.

use std::sync::Arc;

use async_stream::stream;
use mediameta_core::{MediaKind, ProviderKind};
use serde_json::Value;
use tracing::debug;

use crate::endpoints::imdb::imdb_suggestion;
use crate::omdb::lookup_title;
use crate::provider::{MetadataStream, Provider, ProviderOptions, SearchQuery, failed, not_found};
use crate::record::{id_string, non_empty};
use crate::transport::Transport;
use crate::{Metadata, MetadataError, MetadataMovie, MetadataTelevision};

const MOVIE_QIDS: &[&str] = &["movie", "short", "tvmovie", "tv_movie", "video", "video_movie"];
const SERIES_QIDS: &[&str] = &["tvseries", "tvminiseries", "tvshort", "tvspecial"];

pub struct ImdbProvider {
    /// OMDb key, needed only for id lookups.
    api_key: Option<String>,
    cache: bool,
    transport: Arc<dyn Transport>,
}

impl ImdbProvider {
    pub fn new(options: ProviderOptions) -> Self {
        Self {
            transport: options.transport_or_default(),
            api_key: options.api_key,
            cache: options.cache,
        }
    }

    async fn lookup(&self, id_imdb: &str) -> Result<Metadata, MetadataError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            MetadataError::Configuration("IMDb id lookups need an OMDb API key".into())
        })?;
        lookup_title(self.transport.as_ref(), api_key, id_imdb, None, self.cache)
            .await
            .map(Metadata::Movie)
    }

    fn search_title<'a>(&'a self, title: &'a str, query: &'a SearchQuery) -> MetadataStream<'a> {
        let kind = match query.kind.as_deref().unwrap_or("movie").parse::<MediaKind>() {
            Ok(kind) => kind,
            Err(e) => return failed(MetadataError::Validation(e.to_string())),
        };

        Box::pin(stream! {
            let response = match imdb_suggestion(
                self.transport.as_ref(),
                title,
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

            let entries = response["d"].as_array().map(Vec::as_slice).unwrap_or_default();
            debug!(title, suggestions = entries.len(), "IMDb suggestions");

            let mut found = false;
            for entry in entries {
                if let Some(meta) = map_suggestion(entry, kind) {
                    found = true;
                    yield Ok(meta);
                }
            }
            if !found {
                yield Err(MetadataError::NotFound);
            }
        })
    }
}

impl Provider for ImdbProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Imdb
    }

    /// IMDb id (`id_key` or `id_imdb`) first, then title or query.
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a> {
        if let Some(id_imdb) = query.id_key.as_deref().or(query.id_imdb.as_deref()) {
            return Box::pin(stream! {
                yield self.lookup(id_imdb).await;
            });
        }
        match query.free_text() {
            Some(title) => self.search_title(title, query),
            None => not_found(),
        }
    }
}

/// `None` when the suggestion's `qid` does not belong to `kind`.
fn map_suggestion(entry: &Value, kind: MediaKind) -> Option<Metadata> {
    let qid = entry["qid"].as_str()?.to_lowercase();
    let title = non_empty(entry["l"].as_str())?;
    let id_imdb = non_empty(entry["id"].as_str());
    let year = id_string(&entry["y"]);

    match kind {
        MediaKind::Movie if MOVIE_QIDS.contains(&qid.as_str()) => {
            Some(Metadata::Movie(MetadataMovie {
                title: Some(title),
                id_imdb,
                year,
                ..Default::default()
            }))
        }
        MediaKind::Series if SERIES_QIDS.contains(&qid.as_str()) => {
            Some(Metadata::Television(MetadataTelevision {
                series: Some(title.clone()),
                title: Some(title),
                id_imdb,
                year,
                ..Default::default()
            }))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn suggestions_are_bucketed_by_qid() {
        let movie = json!({ "id": "tt0133093", "l": "The Matrix", "qid": "movie", "y": 1999 });
        let series = json!({ "id": "tt0903747", "l": "Breaking Bad", "qid": "tvSeries", "y": 2008 });

        let meta = map_suggestion(&movie, MediaKind::Movie).unwrap();
        assert_eq!(meta.title(), Some("The Matrix"));
        assert_eq!(meta.year(), Some("1999"));
        assert!(map_suggestion(&movie, MediaKind::Series).is_none());

        let meta = map_suggestion(&series, MediaKind::Series).unwrap();
        assert_eq!(meta.as_television().unwrap().series.as_deref(), Some("Breaking Bad"));
        assert!(map_suggestion(&series, MediaKind::Movie).is_none());
    }

    #[test]
    fn entries_without_qid_are_ignored() {
        let person = json!({ "id": "nm0000206", "l": "Keanu Reeves", "s": "Actor" });
        assert!(map_suggestion(&person, MediaKind::Movie).is_none());
    }
}
