mod common;

use common::{MockTransport, collect, missing, options};
use mediameta_metadata::imdb::ImdbProvider;
use mediameta_metadata::transport::{HttpRequest, HttpResponse};
use mediameta_metadata::{MetadataError, Provider, ProviderOptions, SearchQuery};
use serde_json::json;

fn suggestions(r: &HttpRequest) -> HttpResponse {
    if r.url.starts_with("http://www.omdbapi.com/") {
        return HttpResponse::ok(json!({
            "Title": "The Matrix",
            "Year": "1999",
            "Released": "31 Mar 1999",
            "Response": "True"
        }));
    }
    if r.url != "https://v2.sg.media-imdb.com/suggestion/t/the_matrix_1999.json" {
        return missing();
    }
    HttpResponse::ok(json!({
        "d": [
            { "id": "tt0133093", "l": "The Matrix", "qid": "movie", "y": 1999 },
            { "id": "tt0274085", "l": "The Matrix Revisited", "qid": "video", "y": 2001 },
            { "id": "tt0106062", "l": "Matrix", "qid": "tvSeries", "y": 1993 },
            { "id": "nm0000206", "l": "Keanu Reeves", "s": "Actor" }
        ],
        "q": "the_matrix_1999",
        "v": 1
    }))
}

#[tokio::test]
async fn title_search_keeps_movie_like_suggestions() {
    let transport = MockTransport::new(suggestions);
    let provider = ImdbProvider::new(options(&transport));

    let query = SearchQuery::new().with_title("The Matrix").with_year(1999);
    let (records, err) = collect(provider.search(&query)).await;

    assert!(err.is_none());
    let ids: Vec<_> = records.iter().filter_map(|m| m.id_imdb()).collect();
    assert_eq!(ids, ["tt0133093", "tt0274085"]);
    assert_eq!(records[0].year(), Some("1999"));
}

#[tokio::test]
async fn title_search_for_series() {
    let transport = MockTransport::new(suggestions);
    let provider = ImdbProvider::new(options(&transport));

    let query = SearchQuery::new()
        .with_query("The Matrix!")
        .with_year("1999")
        .with_kind("series");
    let (records, err) = collect(provider.search(&query)).await;

    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    let tv = records[0].as_television().unwrap();
    assert_eq!(tv.series.as_deref(), Some("Matrix"));
    assert_eq!(tv.id_imdb.as_deref(), Some("tt0106062"));
}

#[tokio::test]
async fn no_suggestions_is_not_found() {
    let transport = MockTransport::new(|_| HttpResponse::ok(json!({ "d": [], "q": "zzzz" })));
    let provider = ImdbProvider::new(options(&transport));

    let (records, err) = collect(provider.search(&SearchQuery::new().with_title("zzzz"))).await;
    assert!(records.is_empty());
    assert!(matches!(err, Some(MetadataError::NotFound)));
}

#[tokio::test]
async fn non_latin_title_is_searched_as_written() {
    let transport = MockTransport::new(|r| {
        if r.url != "https://v2.sg.media-imdb.com/suggestion/千/千と千尋の神隠し.json" {
            return missing();
        }
        HttpResponse::ok(json!({
            "d": [{ "id": "tt0245429", "l": "Spirited Away", "qid": "movie", "y": 2001 }]
        }))
    });
    let provider = ImdbProvider::new(options(&transport));

    let (records, err) = collect(provider.search(&SearchQuery::new().with_title("千と千尋の神隠し"))).await;
    assert!(err.is_none());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id_imdb(), Some("tt0245429"));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn unsupported_kind_is_rejected() {
    let transport = MockTransport::new(suggestions);
    let provider = ImdbProvider::new(options(&transport));

    let query = SearchQuery::new().with_title("The Matrix").with_kind("podcast");
    let (_, err) = collect(provider.search(&query)).await;
    assert!(matches!(err, Some(MetadataError::Validation(_))));
}

#[tokio::test]
async fn id_lookup_goes_through_omdb_without_type_filter() {
    let transport = MockTransport::new(suggestions);
    let provider = ImdbProvider::new(options(&transport));

    let (records, err) = collect(provider.search(&SearchQuery::new().with_id_imdb("tt0133093"))).await;
    assert!(err.is_none());
    assert_eq!(records[0].date(), Some("1999-03-31"));

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].query_value("type"), None);
}

#[tokio::test]
async fn id_lookup_without_key_is_a_configuration_error() {
    let transport = MockTransport::new(suggestions);
    let provider = ImdbProvider::new(ProviderOptions::new().transport(transport.clone()));

    let (_, err) = collect(provider.search(&SearchQuery::new().with_id_key("tt0133093"))).await;
    assert!(matches!(err, Some(MetadataError::Configuration(_))));
    assert!(transport.calls().is_empty());
}
