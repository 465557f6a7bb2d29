use clap::Parser;
use mediameta_metadata::SearchQuery;

#[derive(Parser)]
#[command(name = "mediameta")]
#[command(author, version, about = "Look up movie and television metadata")]
pub struct Cli {
    /// Backend to query: omdb, tmdb, tvdb, tvdbv4 or imdb
    pub provider: String,

    /// Provider-native identifier
    #[arg(long)]
    pub id_key: Option<String>,

    #[arg(long)]
    pub id_imdb: Option<String>,

    #[arg(long)]
    pub id_tmdb: Option<String>,

    #[arg(long)]
    pub id_tvdb: Option<String>,

    /// Movie title
    #[arg(short, long)]
    pub title: Option<String>,

    /// Free-text query (same as --title)
    #[arg(short, long)]
    pub query: Option<String>,

    /// Series name
    #[arg(short, long)]
    pub series: Option<String>,

    /// Year or year range, e.g. 2010 or 2000-2005
    #[arg(short, long)]
    pub year: Option<String>,

    #[arg(long)]
    pub season: Option<u32>,

    #[arg(long)]
    pub episode: Option<u32>,

    /// Air date prefix, YYYY[-MM[-DD]]
    #[arg(long)]
    pub date: Option<String>,

    /// movie or series
    #[arg(short, long)]
    pub kind: Option<String>,

    /// API key (defaults to API_KEY_<PROVIDER>)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Subscriber PIN for tvdbv4 (defaults to PIN_TVDBV4)
    #[arg(long)]
    pub pin: Option<String>,

    /// Response language, e.g. en-US
    #[arg(long)]
    pub language: Option<String>,

    /// Always hit the network
    #[arg(long)]
    pub no_cache: bool,

    /// Stop after this many results
    #[arg(short, long, default_value = "10")]
    pub limit: usize,

    /// Print one JSON object per line
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn search_query(&self) -> SearchQuery {
        SearchQuery {
            id_key: self.id_key.clone(),
            id_imdb: self.id_imdb.clone(),
            id_tmdb: self.id_tmdb.clone(),
            id_tvdb: self.id_tvdb.clone(),
            title: self.title.clone(),
            query: self.query.clone(),
            series: self.series.clone(),
            year: self.year.clone(),
            season: self.season,
            episode: self.episode,
            date: self.date.clone(),
            kind: self.kind.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_episode_lookup() {
        let cli = Cli::parse_from([
            "mediameta", "tvdb", "--series", "Breaking Bad", "--season", "1", "--episode", "1",
        ]);
        assert_eq!(cli.provider, "tvdb");
        assert_eq!(cli.limit, 10);
        assert!(!cli.no_cache);

        let query = cli.search_query();
        assert_eq!(query.series.as_deref(), Some("Breaking Bad"));
        assert_eq!(query.season, Some(1));
        assert_eq!(query.episode, Some(1));
        assert_eq!(query.title, None);
    }

    #[test]
    fn parses_movie_search_flags() {
        let cli = Cli::parse_from([
            "mediameta", "tmdb", "-t", "Inception", "-y", "2010", "--kind", "movie", "--json",
            "--no-cache", "--limit", "3",
        ]);
        assert!(cli.json);
        assert!(cli.no_cache);
        assert_eq!(cli.limit, 3);
        assert_eq!(cli.search_query().year.as_deref(), Some("2010"));
    }
}
