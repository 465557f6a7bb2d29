use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Returned when a string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported {what}: {value}")]
pub struct ParseKindError {
    pub what: &'static str,
    pub value: String,
}

/// Kind of media a search is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Series,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ParseKindError;

    /// Accepts the spellings callers of the keyword interface use:
    /// `movie`, `series`, `tv` and `television`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "series" | "tv" | "television" => Ok(Self::Series),
            _ => Err(ParseKindError {
                what: "media kind",
                value: s.to_string(),
            }),
        }
    }
}

/// The metadata backends this workspace can talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Omdb,
    Tmdb,
    Tvdb,
    TvdbV4,
    Imdb,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        Self::Omdb,
        Self::Tmdb,
        Self::Tvdb,
        Self::TvdbV4,
        Self::Imdb,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Omdb => "omdb",
            Self::Tmdb => "tmdb",
            Self::Tvdb => "tvdb",
            Self::TvdbV4 => "tvdbv4",
            Self::Imdb => "imdb",
        }
    }

    /// Suffix of the `API_KEY_*` / `PIN_*` environment variables.
    pub fn env_suffix(self) -> String {
        self.as_str().to_uppercase()
    }

    /// Whether this backend can answer queries for `kind`.
    pub fn supports(self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Series => true,
            MediaKind::Movie => !matches!(self, Self::Tvdb),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| ParseKindError {
                what: "provider",
                value: s.to_string(),
            })
    }
}

/// True when `name` is a provider this workspace implements.
pub fn has_provider(name: &str) -> bool {
    name.parse::<ProviderKind>().is_ok()
}

/// True when `name` is a known provider and it serves `kind`.
pub fn has_provider_support(name: &str, kind: MediaKind) -> bool {
    name.parse::<ProviderKind>()
        .map(|p| p.supports(kind))
        .unwrap_or(false)
}
