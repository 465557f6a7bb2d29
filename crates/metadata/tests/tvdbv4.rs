mod common;

use common::{MockTransport, collect, missing, options, unauthorized};
use mediameta_metadata::transport::{HttpRequest, HttpResponse, Method};
use mediameta_metadata::tvdb::v4::TvdbV4Provider;
use mediameta_metadata::{MetadataError, Provider, ProviderOptions, SearchQuery, create_provider};
use serde_json::json;

const BASE: &str = "https://api4.thetvdb.com/v4";

fn catalogue(r: &HttpRequest) -> HttpResponse {
    if r.method == Method::Post {
        return HttpResponse::ok(json!({ "status": "success", "data": { "token": "v4-token" } }));
    }
    let path = r.url.strip_prefix(BASE).unwrap_or_default();
    match path {
        "/search" => match r.query_value("type") {
            Some("series") => HttpResponse::ok(json!({
                "data": [{
                    "name": "Breaking Bad",
                    "tvdb_id": "81189",
                    "year": "2008",
                    "first_air_time": "2008-01-20",
                    "remote_ids": [
                        { "id": "tt0903747", "sourceName": "IMDB" },
                        { "id": "1396", "sourceName": "TheMovieDB.com" }
                    ]
                }]
            })),
            Some("movie") => HttpResponse::ok(json!({
                "data": [
                    { "name": "El Camino", "tvdb_id": "138201", "first_air_time": "2019-10-11" },
                    { "tvdb_id": "1" }
                ]
            })),
            _ => missing(),
        },
        "/search/remoteid/tt0903747" => {
            HttpResponse::ok(json!({ "data": [{ "series": { "id": 81189 } }] }))
        }
        "/series/81189" => HttpResponse::ok(json!({ "data": { "id": 81189, "name": "Breaking Bad" } })),
        "/series/81189/episodes/default" => {
            let page = r.query_value("page").unwrap_or("0");
            let (episodes, next) = match page {
                "0" => (
                    json!([{ "seasonNumber": 1, "number": 1, "name": "Pilot", "aired": "2008-01-20" }]),
                    json!("https://api4.thetvdb.com/v4/series/81189/episodes/default?page=1"),
                ),
                _ => (
                    json!([{ "seasonNumber": 1, "number": 2, "name": "Cat's in the Bag...", "aired": "2008-01-27" }]),
                    json!(null),
                ),
            };
            HttpResponse::ok(json!({
                "data": { "series": { "id": 81189 }, "episodes": episodes },
                "links": { "next": next }
            }))
        }
        _ => missing(),
    }
}

#[tokio::test]
async fn free_text_series_search() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_query("Breaking Bad").with_kind("series");
    let (records, err) = collect(provider.search(&query)).await;

    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    let tv = records[0].as_television().unwrap();
    assert_eq!(tv.series.as_deref(), Some("Breaking Bad"));
    assert_eq!(tv.id_imdb.as_deref(), Some("tt0903747"));
    assert_eq!(tv.id_tmdb.as_deref(), Some("1396"));
    assert_eq!(tv.id_tvdb.as_deref(), Some("81189"));
}

#[tokio::test]
async fn free_text_movie_search_skips_malformed_entries() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_title("El Camino").with_kind("movie");
    let (records, err) = collect(provider.search(&query)).await;

    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    let movie = records[0].as_movie().unwrap();
    assert_eq!(movie.title.as_deref(), Some("El Camino"));
    assert_eq!(movie.year.as_deref(), Some("2019"));
}

#[tokio::test]
async fn free_text_search_needs_a_supported_kind() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_query("Breaking Bad").with_kind("person");
    let (_, err) = collect(provider.search(&query)).await;
    assert!(matches!(err, Some(MetadataError::Validation(_))));

    let query = SearchQuery::new().with_query("Breaking Bad");
    let (_, err) = collect(provider.search(&query)).await;
    assert!(matches!(err, Some(MetadataError::Validation(_))));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn episodes_follow_next_links() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let (records, err) = collect(provider.search(&SearchQuery::new().with_id_tvdb("81189"))).await;

    assert!(err.is_none());
    let titles: Vec<_> = records.iter().filter_map(|m| m.title()).collect();
    assert_eq!(titles, ["Pilot", "Cat's in the Bag..."]);
    let pages: Vec<_> = transport
        .calls()
        .iter()
        .filter_map(|r| r.query_value("page").map(str::to_string))
        .collect();
    assert_eq!(pages, ["0", "1"]);
}

#[tokio::test]
async fn endless_next_links_stop_at_the_page_limit() {
    let transport = MockTransport::new(|r| {
        if r.url == format!("{BASE}/series/81189") {
            return HttpResponse::ok(json!({ "data": { "name": "Breaking Bad" } }));
        }
        let page: u32 = r.query_value("page").and_then(|p| p.parse().ok()).unwrap_or(0);
        HttpResponse::ok(json!({
            "data": { "episodes": [{ "seasonNumber": 1, "number": page + 1, "name": "Again", "aired": null }] },
            "links": { "next": format!("{BASE}/series/81189/episodes/default?page={}", page + 1) }
        }))
    });
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let (records, err) = collect(provider.search(&SearchQuery::new().with_id_tvdb("81189"))).await;

    assert!(err.is_none());
    assert_eq!(records.len(), 100);
    assert_eq!(transport.count(|r| r.query_value("page").is_some()), 100);
}

#[tokio::test]
async fn imdb_id_resolves_through_remote_ids() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_id_imdb("tt0903747");
    let (records, err) = collect(provider.search(&query)).await;
    assert!(err.is_none());
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|m| m.id_tvdb() == Some("81189")));
}

#[tokio::test]
async fn series_name_search() {
    let transport = MockTransport::new(catalogue);
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_series("Breaking Bad").with_date("2008-01-27");
    let (records, err) = collect(provider.search(&query)).await;
    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title(), Some("Cat's in the Bag..."));
}

#[tokio::test]
async fn rejected_search_logs_in_with_pin() {
    let transport = MockTransport::new(|r| {
        if r.method == Method::Post {
            let body = r.body.clone().unwrap_or_default();
            assert_eq!(body["apikey"], "test-key");
            assert_eq!(body["pin"], "test-pin");
        } else if r.header_value("Authorization") != Some("Bearer v4-token") {
            return unauthorized();
        }
        catalogue(r)
    });
    let provider = TvdbV4Provider::new(options(&transport)).await.unwrap();

    let query = SearchQuery::new().with_query("Breaking Bad").with_kind("series");
    let (records, err) = collect(provider.search(&query)).await;
    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(transport.logins(), 1);
}

#[tokio::test]
async fn pin_is_required() {
    let transport = MockTransport::new(catalogue);
    let options = ProviderOptions::new().api_key("test-key").transport(transport);
    let result = TvdbV4Provider::new(options).await;
    assert!(matches!(result, Err(MetadataError::Configuration(_))));
}

#[tokio::test]
async fn factory_builds_v4_provider() {
    let transport = MockTransport::new(catalogue);
    let provider = create_provider("TVDBv4", options(&transport)).await.unwrap();
    assert_eq!(provider.kind().as_str(), "tvdbv4");
}
