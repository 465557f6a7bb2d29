//! Normalized metadata records handed back to callers.
//!
//! Every provider maps its own response shape into one of two variants,
//! [`MetadataMovie`] or [`MetadataTelevision`]. The variant is picked by the
//! search path that produced the record and never changes afterwards.

use chrono::NaiveDate;
use mediameta_core::MediaKind;
use serde::{Deserialize, Serialize};

/// Sentinel some backends use for "no value".
pub(crate) const NOT_AVAILABLE: &str = "N/A";

/// One movie result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataMovie {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Release date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_imdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tmdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tvdb: Option<String>,
    /// Minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
}

/// One television result: an episode, or a whole series when the backend
/// only resolves to series level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataTelevision {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Episode title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<String>,
    /// Air date, `YYYY-MM-DD`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synopsis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_imdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tmdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_tvdb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
}

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "media", rename_all = "snake_case")]
pub enum Metadata {
    Movie(MetadataMovie),
    Television(MetadataTelevision),
}

impl Metadata {
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Movie(_) => MediaKind::Movie,
            Self::Television(_) => MediaKind::Series,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.title.as_deref(),
            Self::Television(t) => t.title.as_deref(),
        }
    }

    pub fn date(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.date.as_deref(),
            Self::Television(t) => t.date.as_deref(),
        }
    }

    pub fn year(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.year.as_deref(),
            Self::Television(t) => t.year.as_deref(),
        }
    }

    pub fn synopsis(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.synopsis.as_deref(),
            Self::Television(t) => t.synopsis.as_deref(),
        }
    }

    pub fn id_imdb(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.id_imdb.as_deref(),
            Self::Television(t) => t.id_imdb.as_deref(),
        }
    }

    pub fn id_tmdb(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.id_tmdb.as_deref(),
            Self::Television(t) => t.id_tmdb.as_deref(),
        }
    }

    pub fn id_tvdb(&self) -> Option<&str> {
        match self {
            Self::Movie(m) => m.id_tvdb.as_deref(),
            Self::Television(t) => t.id_tvdb.as_deref(),
        }
    }

    pub fn as_movie(&self) -> Option<&MetadataMovie> {
        match self {
            Self::Movie(m) => Some(m),
            Self::Television(_) => None,
        }
    }

    pub fn as_television(&self) -> Option<&MetadataTelevision> {
        match self {
            Self::Television(t) => Some(t),
            Self::Movie(_) => None,
        }
    }
}

impl From<MetadataMovie> for Metadata {
    fn from(m: MetadataMovie) -> Self {
        Self::Movie(m)
    }
}

impl From<MetadataTelevision> for Metadata {
    fn from(t: MetadataTelevision) -> Self {
        Self::Television(t)
    }
}

impl std::fmt::Display for MetadataMovie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title = self.title.as_deref().unwrap_or_default();
        match &self.year {
            Some(year) if !title.is_empty() => write!(f, "{title} ({year})"),
            Some(year) => write!(f, "({year})"),
            None => f.write_str(title),
        }
    }
}

impl std::fmt::Display for MetadataTelevision {
    /// `Series - 05x03 - Title`; missing parts drop out with their separator.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        if let Some(series) = &self.series {
            parts.push(series.clone());
        }
        match (&self.season, &self.episode) {
            (Some(s), Some(e)) => parts.push(format!("{}x{}", pad2(s), pad2(e))),
            (Some(s), None) => parts.push(format!("S{}", pad2(s))),
            (None, Some(e)) => parts.push(format!("E{}", pad2(e))),
            (None, None) => {}
        }
        if let Some(title) = &self.title {
            if self.series.as_ref() != Some(title) {
                parts.push(title.clone());
            }
        }
        f.write_str(&parts.join(" - "))
    }
}

impl std::fmt::Display for Metadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Movie(m) => m.fmt(f),
            Self::Television(t) => t.fmt(f),
        }
    }
}

fn pad2(n: &str) -> String {
    match n.parse::<u32>() {
        Ok(v) => format!("{v:02}"),
        Err(_) => n.to_string(),
    }
}

/// A page entry that could not be mapped; names the offending field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MalformedEntry(pub &'static str);

/// Empty strings count as absent.
pub(crate) fn non_empty(s: Option<&str>) -> Option<String> {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts only a real `YYYY-MM-DD` calendar date; empty means absent.
pub(crate) fn iso_date(
    raw: Option<&str>,
    field: &'static str,
) -> Result<Option<String>, MalformedEntry> {
    match non_empty(raw) {
        None => Ok(None),
        Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
            .map(|_| Some(d))
            .map_err(|_| MalformedEntry(field)),
    }
}

/// The four leading digits of a date or year-ish string (`"2008–2013"`).
pub(crate) fn leading_year(raw: Option<&str>) -> Option<String> {
    let raw = raw?.trim();
    let year = raw.get(..4)?;
    year.bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| year.to_string())
}

/// String form of a JSON id, which backends send either as number or string.
pub(crate) fn id_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) => non_empty(Some(s)),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_date_rejects_bad_calendar_dates() {
        assert_eq!(iso_date(Some("1999-03-31"), "date"), Ok(Some("1999-03-31".into())));
        assert_eq!(iso_date(Some(""), "date"), Ok(None));
        assert_eq!(iso_date(None, "date"), Ok(None));
        assert_eq!(iso_date(Some("1999-02-30"), "date"), Err(MalformedEntry("date")));
        assert_eq!(iso_date(Some("31 Mar 1999"), "date"), Err(MalformedEntry("date")));
    }

    #[test]
    fn leading_year_truncates() {
        assert_eq!(leading_year(Some("2010-07-16")).as_deref(), Some("2010"));
        assert_eq!(leading_year(Some("2008–2013")).as_deref(), Some("2008"));
        assert_eq!(leading_year(Some("N/A")), None);
        assert_eq!(leading_year(Some("")), None);
        assert_eq!(leading_year(None), None);
    }

    #[test]
    fn id_string_accepts_numbers_and_strings() {
        assert_eq!(id_string(&serde_json::json!(27205)).as_deref(), Some("27205"));
        assert_eq!(id_string(&serde_json::json!("81189")).as_deref(), Some("81189"));
        assert_eq!(id_string(&serde_json::json!(null)), None);
    }

    #[test]
    fn movie_display() {
        let movie = MetadataMovie {
            title: Some("Saw III".into()),
            year: Some("2006".into()),
            ..Default::default()
        };
        assert_eq!(movie.to_string(), "Saw III (2006)");

        let undated = MetadataMovie {
            title: Some("Saw III".into()),
            ..Default::default()
        };
        assert_eq!(undated.to_string(), "Saw III");
    }

    #[test]
    fn television_display() {
        let ep = MetadataTelevision {
            series: Some("Adventure Time".into()),
            season: Some("5".into()),
            episode: Some("3".into()),
            title: Some("Five More Short Graybles".into()),
            ..Default::default()
        };
        assert_eq!(
            ep.to_string(),
            "Adventure Time - 05x03 - Five More Short Graybles"
        );

        let series_only = MetadataTelevision {
            series: Some("Breaking Bad".into()),
            title: Some("Breaking Bad".into()),
            ..Default::default()
        };
        assert_eq!(series_only.to_string(), "Breaking Bad");
    }

    #[test]
    fn serializes_with_media_tag_and_skips_absent_fields() {
        let meta = Metadata::Movie(MetadataMovie {
            title: Some("The Matrix".into()),
            year: Some("1999".into()),
            ..Default::default()
        });
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["media"], "movie");
        assert_eq!(json["title"], "The Matrix");
        assert!(json.get("synopsis").is_none());

        let back: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
        assert_eq!(back.kind(), MediaKind::Movie);
    }
}
