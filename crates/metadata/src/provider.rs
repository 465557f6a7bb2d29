use std::sync::{Arc, LazyLock};

use futures::stream::{self, BoxStream};
use mediameta_core::ProviderKind;
use regex::Regex;

use crate::imdb::ImdbProvider;
use crate::omdb::OmdbProvider;
use crate::tmdb::TmdbProvider;
use crate::transport::{ReqwestTransport, Transport};
use crate::tvdb::legacy::TvdbProvider;
use crate::tvdb::v4::TvdbV4Provider;
use crate::{Metadata, MetadataError};

/// Lazily produced search results. Nothing is fetched until the caller
/// polls; the sequence ends after the first error item.
pub type MetadataStream<'a> = BoxStream<'a, Result<Metadata, MetadataError>>;

/// A metadata backend that can be searched.
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Search by identifier or criteria.
    ///
    /// Which path runs depends on which fields of `query` are set; each
    /// provider documents its own priority. When no field resolves to a path
    /// the stream yields [`MetadataError::NotFound`].
    fn search<'a>(&'a self, query: &'a SearchQuery) -> MetadataStream<'a>;
}

/// Named search criteria. Unset fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// The provider's native identifier (IMDb id for OMDb/IMDb, TMDb id for
    /// TMDb, TVDb id for TVDb).
    pub id_key: Option<String>,
    pub id_imdb: Option<String>,
    pub id_tmdb: Option<String>,
    pub id_tvdb: Option<String>,
    pub title: Option<String>,
    pub query: Option<String>,
    pub series: Option<String>,
    /// A year (`"2010"`) or dash-delimited range (`"2000-2005"`).
    pub year: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Air date prefix, `YYYY[-MM[-DD]]`.
    pub date: Option<String>,
    /// `movie` or `series`; providers reject anything else.
    pub kind: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_key(mut self, id: impl Into<String>) -> Self {
        self.id_key = Some(id.into());
        self
    }

    pub fn with_id_imdb(mut self, id: impl Into<String>) -> Self {
        self.id_imdb = Some(id.into());
        self
    }

    pub fn with_id_tmdb(mut self, id: impl Into<String>) -> Self {
        self.id_tmdb = Some(id.into());
        self
    }

    pub fn with_id_tvdb(mut self, id: impl Into<String>) -> Self {
        self.id_tvdb = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.series = Some(series.into());
        self
    }

    pub fn with_year(mut self, year: impl ToString) -> Self {
        self.year = Some(year.to_string());
        self
    }

    pub fn with_season(mut self, season: u32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_episode(mut self, episode: u32) -> Self {
        self.episode = Some(episode);
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    /// `title`, falling back to `query`.
    pub fn free_text(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.query.as_deref())
            .filter(|t| !t.trim().is_empty())
    }

    /// The year criterion when it is a single four-digit year, suitable for
    /// passing to a backend's own year filter.
    pub fn exact_year(&self) -> Option<&str> {
        self.year
            .as_deref()
            .map(str::trim)
            .filter(|y| y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()))
    }
}

static RE_YEAR_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d{4})?\s*(-)?\s*(\d{4})?\s*$").unwrap());

/// Inclusive range of acceptable release years.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearWindow {
    pub from: i32,
    pub to: i32,
}

impl YearWindow {
    pub const UNBOUNDED: YearWindow = YearWindow {
        from: i32::MIN,
        to: i32::MAX,
    };

    /// A single year widens to one year either side; `a-b`, `a-` and `-b`
    /// are taken as given; anything else disables filtering.
    pub fn expand(year: Option<&str>) -> Self {
        let Some(caps) = year.and_then(|y| RE_YEAR_RANGE.captures(y)) else {
            return Self::UNBOUNDED;
        };
        let start = caps.get(1).and_then(|m| m.as_str().parse::<i32>().ok());
        let end = caps.get(3).and_then(|m| m.as_str().parse::<i32>().ok());
        let dash = caps.get(2).is_some();
        match (start, dash, end) {
            (Some(y), false, None) => Self {
                from: y - 1,
                to: y + 1,
            },
            (start, true, end) => Self {
                from: start.unwrap_or(i32::MIN),
                to: end.unwrap_or(i32::MAX),
            },
            _ => Self::UNBOUNDED,
        }
    }

    pub fn is_bounded(&self) -> bool {
        *self != Self::UNBOUNDED
    }

    pub fn contains(&self, year: i32) -> bool {
        self.from <= year && year <= self.to
    }

    /// Whether an entry's year string passes. An unbounded window passes
    /// everything, including entries without a year.
    pub fn admits(&self, year: Option<&str>) -> bool {
        if !self.is_bounded() {
            return true;
        }
        crate::record::leading_year(year)
            .and_then(|y| y.parse::<i32>().ok())
            .is_some_and(|y| self.contains(y))
    }
}

/// Construction options shared by every provider.
#[derive(Clone)]
pub struct ProviderOptions {
    pub api_key: Option<String>,
    /// Subscriber PIN, only used by TVDb v4.
    pub pin: Option<String>,
    /// Forwarded to every endpoint call.
    pub cache: bool,
    pub language: Option<String>,
    pub transport: Option<Arc<dyn Transport>>,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            pin: None,
            cache: true,
            language: None,
            transport: None,
        }
    }
}

impl std::fmt::Debug for ProviderOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderOptions")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("pin", &self.pin.as_ref().map(|_| "<redacted>"))
            .field("cache", &self.cache)
            .field("language", &self.language)
            .field("transport", &self.transport.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl ProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Fills missing credentials from `API_KEY_<PROVIDER>` and
    /// `PIN_<PROVIDER>`.
    pub fn with_env_fallback(self, provider: ProviderKind) -> Self {
        self.with_fallback_from(provider, |name| std::env::var(name).ok())
    }

    pub fn with_fallback_from(
        mut self,
        provider: ProviderKind,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let suffix = provider.env_suffix();
        if self.api_key.is_none() {
            self.api_key = lookup(&format!("API_KEY_{suffix}")).filter(|v| !v.is_empty());
        }
        if self.pin.is_none() {
            self.pin = lookup(&format!("PIN_{suffix}")).filter(|v| !v.is_empty());
        }
        self
    }

    pub(crate) fn require_api_key(&self, provider: ProviderKind) -> Result<String, MetadataError> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MetadataError::Configuration(format!("{provider} requires an API key")))
    }

    pub(crate) fn require_pin(&self, provider: ProviderKind) -> Result<String, MetadataError> {
        self.pin
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| MetadataError::Configuration(format!("{provider} requires a PIN")))
    }

    pub(crate) fn transport_or_default(&self) -> Arc<dyn Transport> {
        self.transport
            .clone()
            .unwrap_or_else(|| Arc::new(ReqwestTransport::new()))
    }

    pub(crate) fn language_or(&self, default: &str) -> String {
        self.language.clone().unwrap_or_else(|| default.to_string())
    }
}

/// Builds the provider registered under `name`, filling missing credentials
/// from the environment. Token-based providers log in here when caching is
/// disabled.
pub async fn create_provider(
    name: &str,
    options: ProviderOptions,
) -> Result<Box<dyn Provider>, MetadataError> {
    let kind: ProviderKind = name
        .parse()
        .map_err(|e: mediameta_core::ParseKindError| MetadataError::Configuration(e.to_string()))?;
    let options = options.with_env_fallback(kind);
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::Omdb => Box::new(OmdbProvider::new(options)?),
        ProviderKind::Tmdb => Box::new(TmdbProvider::new(options)?),
        ProviderKind::Tvdb => Box::new(TvdbProvider::new(options).await?),
        ProviderKind::TvdbV4 => Box::new(TvdbV4Provider::new(options).await?),
        ProviderKind::Imdb => Box::new(ImdbProvider::new(options)),
    };
    Ok(provider)
}

/// A stream holding exactly one error.
pub(crate) fn failed<'a>(err: MetadataError) -> MetadataStream<'a> {
    Box::pin(stream::once(async move { Err(err) }))
}

pub(crate) fn not_found<'a>() -> MetadataStream<'a> {
    failed(MetadataError::NotFound)
}
