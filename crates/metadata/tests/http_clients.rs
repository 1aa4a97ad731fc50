use seriesguide_core::error::ErrorKind;
use seriesguide_metadata::hexagon::HexagonClient;
use seriesguide_metadata::provider::{CloudStore, CrossRefSource, ShowSource};
use seriesguide_metadata::resolve::{resolve_trakt_id, TraktLink};
use seriesguide_metadata::trakt::TraktClient;
use seriesguide_metadata::tvdb::TvdbClient;
use seriesguide_metadata::MetadataError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A mock TVDB server that accepts the login.
async fn tvdb_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({ "apikey": "key" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "jwt" })))
        .expect(1)
        .mount(&server)
        .await;
    server
}

fn tvdb_client(server: &MockServer) -> TvdbClient {
    TvdbClient::new("key".into()).with_base_urls(server.uri(), format!("{}/api", server.uri()))
}

#[tokio::test]
async fn series_is_requested_in_language_with_token() {
    let server = tvdb_server().await;
    Mock::given(method("GET"))
        .and(path("/series/280619"))
        .and(header("authorization", "Bearer jwt"))
        .and(header("accept-language", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 280619, "seriesName": "", "overview": null, "runtime": "45" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/280619"))
        .and(header("accept-language", "en"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "id": 280619, "seriesName": "The Expanse", "runtime": "45" }
        })))
        .mount(&server)
        .await;

    let client = tvdb_client(&server);
    let german = client.get_series(280619, "de").await.unwrap();
    assert_eq!(german.series_name.as_deref(), Some(""));
    // The token is reused; the login mock expects a single call.
    let english = client.get_series(280619, "en").await.unwrap();
    assert_eq!(english.series_name.as_deref(), Some("The Expanse"));
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let server = tvdb_server().await;
    Mock::given(method("GET"))
        .and(path("/series/1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/2"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/3"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = tvdb_client(&server);
    let not_found = client.get_series(1, "en").await.unwrap_err();
    assert_eq!(not_found.kind(), ErrorKind::NotFound);

    let unavailable = client.get_series(2, "en").await.unwrap_err();
    assert_eq!(unavailable.kind(), ErrorKind::TransientNetwork);
    assert!(unavailable.kind().is_retryable());
    assert!(matches!(unavailable, MetadataError::Status { status: 503, .. }));

    let garbage = client.get_series(3, "en").await.unwrap_err();
    assert_eq!(garbage.kind(), ErrorKind::DataCorruption);
}

#[tokio::test]
async fn posters_query_poster_key_type() {
    let server = tvdb_server().await;
    Mock::given(method("GET"))
        .and(path("/series/280619/images/query"))
        .and(query_param("keyType", "poster"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "fileName": "posters/1.jpg", "ratingsInfo": { "average": 7.1, "count": 4 } },
                { "fileName": "posters/2.jpg", "ratingsInfo": { "average": null, "count": 0 } }
            ]
        })))
        .mount(&server)
        .await;

    let posters = tvdb_client(&server).get_posters(280619, "en").await.unwrap();
    assert_eq!(posters.len(), 2);
    assert_eq!(posters[0].average_rating(), Some(7.1));
    assert_eq!(posters[1].average_rating(), None);
}

#[tokio::test]
async fn episodes_follow_pages() {
    let server = tvdb_server().await;
    Mock::given(method("GET"))
        .and(path("/series/280619/episodes"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "links": { "first": 1, "last": 2, "next": 2, "prev": null },
            "data": [
                { "id": 1, "airedSeason": 1, "airedEpisodeNumber": 1, "episodeName": "Dulcinea", "firstAired": "2015-12-14" }
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/series/280619/episodes"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "links": { "first": 1, "last": 2, "next": null, "prev": 1 },
            "data": [
                { "id": 2, "airedSeason": 1, "airedEpisodeNumber": 2, "episodeName": "", "overview": "" }
            ]
        })))
        .mount(&server)
        .await;

    let episodes = tvdb_client(&server).get_episodes(280619, "en").await.unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0].title.as_deref(), Some("Dulcinea"));
    assert_eq!(episodes[1].number, 2);
    assert_eq!(episodes[1].title, None);
}

#[tokio::test]
async fn search_without_results_is_empty() {
    let server = tvdb_server().await;
    Mock::given(method("GET"))
        .and(path("/search/series"))
        .and(query_param("name", "nothing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/series"))
        .and(query_param("name", "expanse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [ { "id": 280619, "seriesName": "The Expanse", "overview": "Future" } ]
        })))
        .mount(&server)
        .await;

    let client = tvdb_client(&server);
    assert!(client.search_series("nothing", "en").await.unwrap().is_empty());
    let results = client.search_series("expanse", "nl").await.unwrap();
    assert_eq!(results[0].tvdb_id, 280619);
    assert_eq!(results[0].language, "nl");
}

#[tokio::test]
async fn xml_search_sends_language_filter() {
    // The legacy API needs no login.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/GetSeries.php"))
        .and(query_param("seriesname", "the expanse"))
        .and(query_param("language", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<Data><Series><id>280619</id><language>en</language>\
             <SeriesName>The Expanse</SeriesName></Series></Data>",
        ))
        .mount(&server)
        .await;

    let results = tvdb_client(&server)
        .search_show("the expanse", None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "The Expanse");
}

#[tokio::test]
async fn trakt_lookup_and_summary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/tvdb/121361"))
        .and(query_param("type", "show"))
        .and(header("trakt-api-key", "client"))
        .and(header("trakt-api-version", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "show", "score": null, "show": { "title": "Game of Thrones", "ids": { "trakt": 1390 } } }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/tvdb/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/1390"))
        .and(query_param("extended", "full"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "title": "Game of Thrones",
            "ids": { "trakt": 1390 },
            "airs": { "day": "Sunday", "time": "21:00", "timezone": "America/New_York" },
            "rating": 9.0
        })))
        .mount(&server)
        .await;

    let client = TraktClient::new("client".into()).with_base_url(server.uri());

    let matches = client.lookup_tvdb(121361).await.unwrap();
    assert_eq!(resolve_trakt_id(&matches).unwrap(), TraktLink::Linked(1390));
    let none = client.lookup_tvdb(1).await.unwrap();
    assert_eq!(resolve_trakt_id(&none).unwrap(), TraktLink::NotLinked);

    let summary = client.summary(1390).await.unwrap();
    assert_eq!(summary.rating, Some(9.0));
}

#[tokio::test]
async fn hexagon_show_and_flags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/shows/v1/show"))
        .and(query_param("showTvdbId", "280619"))
        .and(header("authorization", "Bearer user-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tvdbId": 280619, "isFavorite": true, "language": "de"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/v1/show"))
        .and(query_param("showTvdbId", "1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/shows/v1/show"))
        .and(query_param("showTvdbId", "2"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episodes/v1/episodes"))
        .and(query_param("cursor", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "episodes": [ { "seasonNumber": 1, "episodeNumber": 2, "isInCollection": true } ],
            "cursor": "page3"
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episodes/v1/episodes"))
        .and(query_param("cursor", "page3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "episodes": [] })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/episodes/v1/episodes"))
        .and(query_param("showTvdbId", "280619"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "episodes": [ { "seasonNumber": 1, "episodeNumber": 1, "watchedFlag": 1 } ],
            "cursor": "page2"
        })))
        .with_priority(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/shows/v1/shows/save"))
        .and(body_json(json!({
            "shows": [ { "tvdbId": 280619, "isRemoved": false, "language": "de" } ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = HexagonClient::new(server.uri(), "user-token".into());

    let show = client.get_show(280619).await.unwrap().unwrap();
    assert_eq!(show.is_favorite, Some(true));
    assert_eq!(show.notify, None);
    assert!(client.get_show(1).await.unwrap().is_none());
    assert_eq!(
        client.get_show(2).await.unwrap_err().kind(),
        ErrorKind::CloudFailure
    );

    let flags = client.download_episode_flags(280619).await.unwrap();
    assert_eq!(flags.len(), 2);
    assert!(flags[0].is_watched());
    assert_eq!(flags[1].is_in_collection, Some(true));
    assert!(!flags[1].is_watched());

    client.send_is_added(280619, "de").await.unwrap();
}
