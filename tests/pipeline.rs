//! End-to-end assembly against the mock provider.

mod helpers;

use chrono::NaiveDate;
use guidebuilder::cache::CacheStore;
use guidebuilder::guide::{GuideGraph, ImageCandidate};
use guidebuilder::provider::{GuideApi, RateLimitedClient};
use guidebuilder::scraper::{AssemblyPipeline, PipelineSettings, Stage};
use helpers::{LINEUP, MockData, MockProvider, image, today};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn image_uri(graph: &GuideGraph, id: Option<u32>) -> Option<String> {
    let id = id?;
    graph.images().find(|image| image.id == id).map(|image| image.uri.clone())
}

fn cached_images(uri: &str) -> String {
    serde_json::to_string(&vec![ImageCandidate {
        uri: Some(uri.to_string()),
        aspect: Some("4x3".to_string()),
        size: Some("Md".to_string()),
        category: Some("Banner".to_string()),
        ..Default::default()
    }])
    .unwrap()
}

fn full_fixture() -> MockData {
    let mut data = MockData {
        lineup: Some(json!({
            "map": [
                {"stationID": "10001", "channel": "2.1"},
                {"stationID": "10002", "channel": "4.1"}
            ],
            "stations": [
                {"stationID": "10001", "name": "WAAA", "callsign": "WAAA", "logo": {"URL": "http://cdn/waaa.png"}},
                {"stationID": "10002", "name": "WBBB", "callsign": "WBBB", "affiliate": "NBC"}
            ],
            "metadata": {"lineup": LINEUP, "modified": "2024-03-30T12:00:00Z"}
        })),
        tmdb_configuration: Some(json!({
            "images": {
                "base_url": "http://img.tmdb/",
                "secure_base_url": "https://img.tmdb/",
                "poster_sizes": ["w92", "w342", "original"],
                "backdrop_sizes": ["w300", "w780"]
            }
        })),
        ..Default::default()
    };

    data.schedules = HashMap::from([
        (
            "10001".to_string(),
            json!({"stationID": "10001", "programs": [
                {"programID": "EP000010010001", "airDateTime": "2024-04-01T00:00:00Z", "duration": 1800, "md5": "m1", "new": true},
                {"programID": "MV000020010000", "airDateTime": "2024-04-01T01:00:00Z", "duration": 7200, "md5": "m2"}
            ]}),
        ),
        (
            "10002".to_string(),
            json!({"stationID": "10002", "programs": [
                {"programID": "SP000030020001", "airDateTime": "2024-04-01T02:00:00Z", "duration": 10800, "md5": "m4"},
                {"programID": "SH000010020000", "airDateTime": "2024-04-01T00:00:00Z", "duration": 3600, "md5": "m3"}
            ]}),
        ),
    ]);

    data.programs = HashMap::from([
        (
            "EP000010010001".to_string(),
            json!({"programID": "EP000010010001", "titles": [{"title120": "Alpha"}], "episodeTitle150": "Pilot",
                   "showType": "Series", "genres": ["Drama"], "md5": "m1"}),
        ),
        (
            "MV000020010000".to_string(),
            json!({"programID": "MV000020010000", "titles": [{"title120": "Film"}], "showType": "Feature Film",
                   "entityType": "Movie", "movie": {"year": "1999"}, "md5": "m2"}),
        ),
        (
            "SH000010020000".to_string(),
            json!({"programID": "SH000010020000", "titles": [{"title120": "Beta"}], "showType": "Series", "md5": "m3"}),
        ),
        (
            "SP000030020001".to_string(),
            json!({"programID": "SP000030020001", "titles": [{"title120": "NBA Basketball"}],
                   "showType": "Sports event", "entityType": "Sports", "md5": "m4"}),
        ),
        (
            "SH000010010000".to_string(),
            json!({"programID": "SH000010010000", "titles": [{"title120": "Alpha"}], "originalAirDate": "1999-01-01"}),
        ),
    ]);

    data.descriptions = HashMap::from([
        (
            "EP000010010000".to_string(),
            json!({"code": 0, "description100": "Short A", "description1000": "Long A"}),
        ),
        (
            "EP000010020000".to_string(),
            json!({"code": 0, "description100": "Short B", "description1000": "Long B", "startAirdate": "2001-02-03"}),
        ),
    ]);

    data.artwork = HashMap::from([
        (
            "SH000010010000".to_string(),
            json!([
                image("assets/Alpha_Logo.jpg", "4x3", "Logo"),
                image("assets/Alpha_4x3.jpg", "4x3", "Banner-L1"),
                image("assets/Alpha_2x3.jpg", "2x3", "Iconic")
            ]),
        ),
        (
            "SP000030020000".to_string(),
            json!([{"uri": "http://cdn/nba.jpg", "aspect": "4x3", "size": "Md", "category": "Logo", "tier": "Sport"}]),
        ),
    ]);

    data.tmdb_search = HashMap::from([(
        "Film".to_string(),
        json!({"results": [{"id": 7, "title": "Film", "poster_path": "/film.jpg", "backdrop_path": "/film_b.jpg"}]}),
    )]);

    data
}

#[tokio::test]
async fn test_only_uncached_series_are_fetched() {
    let mock = MockProvider::start(MockData {
        artwork: HashMap::from([(
            "SH000010030000".to_string(),
            json!([image("assets/gamma.jpg", "4x3", "Banner")]),
        )]),
        ..Default::default()
    })
    .await;

    let cache = Arc::new(CacheStore::in_memory());
    cache.update_asset_images("SH000010010000", &cached_images("http://cdn/alpha.jpg"));
    cache.update_asset_images("SH000010020000", &cached_images("http://cdn/beta.jpg"));

    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    for (id, title) in [("00001001", "Alpha"), ("00001002", "Beta"), ("00001003", "Gamma")] {
        pipeline.graph_mut().series_or_insert(id, title);
    }
    pipeline.series_images().await;

    assert_eq!(mock.state.bodies("artwork"), vec![json!(["SH000010030000"])]);

    let graph = pipeline.graph();
    assert_eq!(graph.series_count(), 3);
    assert!(graph.series().all(|series| series.guide_image.is_some()));
    assert_eq!(
        image_uri(graph, graph.series_by_id("00001003").unwrap().guide_image).as_deref(),
        Some(format!("{}image/assets/gamma.jpg", mock.base_url).as_str())
    );
    assert!(cache.get_images("SH000010030000").unwrap().contains("gamma.jpg"));

    let progress = pipeline.progress().current();
    assert_eq!(progress.stage, Stage::SeriesImages);
    assert_eq!((progress.processed, progress.total), (3, 3));
}

#[tokio::test]
async fn test_due_refresh_refetches_cached_series() {
    let mock = MockProvider::start(MockData {
        artwork: HashMap::from([(
            "SH000010010000".to_string(),
            json!([image("assets/alpha_new.jpg", "4x3", "Banner")]),
        )]),
        ..Default::default()
    })
    .await;
    let cache = Arc::new(CacheStore::in_memory());
    cache.update_asset_images("SH000010010000", &cached_images("http://cdn/alpha_old.jpg"));
    cache.update_asset_images("SH000010020000", &cached_images("http://cdn/beta.jpg"));

    // 1001 % 30 = 11, due on day 10; 1002 % 30 = 12, not due
    let settings = PipelineSettings {
        expected_service_count: 1,
        max_parallel: 1,
        ..PipelineSettings::default()
    };
    let mut pipeline = AssemblyPipeline::new(mock.api(), Arc::clone(&cache), settings)
        .with_today(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap());
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");
    pipeline.graph_mut().series_or_insert("00001002", "Beta");
    pipeline.series_images().await;

    assert_eq!(mock.state.bodies("artwork"), vec![json!(["SH000010010000"])]);
    assert!(cache.get_images("SH000010010000").unwrap().contains("alpha_new.jpg"));
}

#[tokio::test]
async fn test_sports_series_skip_refresh_cycle() {
    let mock = MockProvider::start(full_fixture()).await;
    let cache = Arc::new(CacheStore::in_memory());
    cache.update_asset_images("SP000030020000", &cached_images("http://cdn/nba_cached.jpg"));

    // 3002 % 30 = 2: the event head's body would be due on day 1
    let settings = PipelineSettings {
        lineups: vec![LINEUP.to_string()],
        expected_service_count: 1,
        ..PipelineSettings::default()
    };
    let mut pipeline =
        AssemblyPipeline::new(mock.api(), Arc::clone(&cache), settings).with_today(today());
    pipeline.stations().await;
    pipeline.programs().await;
    pipeline.series_images().await;

    let requested = mock.state.bodies("artwork");
    assert!(requested.iter().all(|ids| !ids.as_array().unwrap().contains(&json!("SP000030020000"))));
    let graph = pipeline.graph();
    let sports = graph.series().find(|series| series.is_sports()).unwrap();
    assert_eq!(image_uri(graph, sports.guide_image).as_deref(), Some("http://cdn/nba_cached.jpg"));
}

#[tokio::test]
async fn test_response_without_images_caches_sentinel() {
    let mock = MockProvider::start(MockData {
        artwork: HashMap::from([(
            "SH000010010000".to_string(),
            // wrong size class: nothing eligible
            json!([{"uri": "assets/big.jpg", "aspect": "4x3", "size": "Lg", "category": "Banner"}]),
        )]),
        ..Default::default()
    })
    .await;
    let cache = Arc::new(CacheStore::in_memory());
    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");
    pipeline.graph_mut().series_or_insert("00001002", "Beta");

    pipeline.series_images().await;
    assert_eq!(cache.get_images("SH000010010000").as_deref(), Some(""));
    assert_eq!(cache.get_images("SH000010020000").as_deref(), Some(""));
    assert!(pipeline.graph().series().all(|s| s.guide_image.is_none()));

    // the sentinel suppresses a second request within the refresh window
    mock.state.reset();
    let mut again = mock.pipeline(Arc::clone(&cache));
    again.graph_mut().series_or_insert("00001001", "Alpha");
    again.series_images().await;
    assert_eq!(mock.state.count("artwork"), 0);
}

#[tokio::test]
async fn test_failed_fetch_leaves_no_sentinel() {
    let mock = MockProvider::start(MockData::default()).await;
    let client = RateLimitedClient::new(
        mock.base_url.join("missing/").unwrap(),
        None,
        Duration::from_secs(5),
        None,
    )
    .unwrap();
    let cache = Arc::new(CacheStore::in_memory());
    let mut pipeline = AssemblyPipeline::new(
        GuideApi::new(Arc::new(client)),
        Arc::clone(&cache),
        PipelineSettings::default(),
    )
    .with_today(today());
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");

    pipeline.series_images().await;
    assert_eq!(cache.get_images("SH000010010000"), None);
    let progress = pipeline.progress().current();
    assert_eq!((progress.processed, progress.total), (0, 1));
}

#[tokio::test]
async fn test_malformed_artwork_leaves_no_sentinel() {
    let mock = MockProvider::start(MockData {
        artwork: HashMap::from([
            (
                "SH000010010000".to_string(),
                json!([{"uri": ["assets/a.jpg"], "aspect": "4x3", "size": "Md", "category": "Banner"}]),
            ),
            (
                "SH000010020000".to_string(),
                json!([{"uri": "assets/b.jpg", "aspect": "4x3", "size": "Md", "category": "Banner", "width": 240}]),
            ),
        ]),
        ..Default::default()
    })
    .await;
    let cache = Arc::new(CacheStore::in_memory());
    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");
    pipeline.graph_mut().series_or_insert("00001002", "Beta");

    pipeline.series_images().await;

    assert_eq!(cache.get_images("SH000010010000"), None);
    let graph = pipeline.graph();
    assert_eq!(graph.series_by_id("00001001").unwrap().guide_image, None);
    // numeric dimensions are a readable payload
    assert!(cache.get_images("SH000010020000").unwrap().contains("b.jpg"));
    assert!(graph.series_by_id("00001002").unwrap().guide_image.is_some());
    let progress = pipeline.progress().current();
    assert_eq!((progress.processed, progress.total), (1, 2));
}

#[tokio::test]
async fn test_unreadable_cached_images_are_refetched() {
    let mock = MockProvider::start(MockData {
        artwork: HashMap::from([(
            "SH000010010000".to_string(),
            json!([image("assets/alpha.jpg", "4x3", "Banner")]),
        )]),
        ..Default::default()
    })
    .await;
    let cache = Arc::new(CacheStore::in_memory());
    cache.update_asset_images("SH000010010000", "{bad");
    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");

    pipeline.series_images().await;

    assert_eq!(mock.state.bodies("artwork"), vec![json!(["SH000010010000"])]);
    let repaired: Vec<ImageCandidate> =
        serde_json::from_str(&cache.get_images("SH000010010000").unwrap()).unwrap();
    assert!(repaired[0].uri.as_deref().unwrap().ends_with("alpha.jpg"));
    assert!(pipeline.graph().series_by_id("00001001").unwrap().guide_image.is_some());
}

#[tokio::test]
async fn test_unreadable_cached_program_is_refetched() {
    let mock = MockProvider::start(full_fixture()).await;
    let cache = Arc::new(CacheStore::in_memory());
    cache.add_asset("m1", "{bad");
    let mut pipeline = mock.pipeline(Arc::clone(&cache));

    pipeline.stations().await;
    pipeline.programs().await;

    let requested = mock.state.bodies("programs");
    assert!(requested.iter().any(|ids| ids.as_array().unwrap().contains(&json!("EP000010010001"))));
    let episode = pipeline.graph().program("EP000010010001").unwrap();
    assert_eq!(episode.title, "Alpha");
    let repaired: serde_json::Value = serde_json::from_str(&cache.get_asset("m1").unwrap()).unwrap();
    assert_eq!(repaired["programID"], "EP000010010001");
}

#[tokio::test]
async fn test_program_without_md5_keeps_series_record_intact() {
    let mut data = full_fixture();
    data.lineup = Some(json!({
        "map": [{"stationID": "10001", "channel": "2.1"}],
        "stations": [{"stationID": "10001", "name": "WAAA", "callsign": "WAAA"}],
        "metadata": {"lineup": LINEUP, "modified": "2024-03-30T12:00:00Z"}
    }));
    data.schedules = HashMap::from([(
        "10001".to_string(),
        json!({"stationID": "10001", "programs": [
            {"programID": "SH000010010000", "airDateTime": "2024-04-01T00:00:00Z", "duration": 1800}
        ]}),
    )]);
    let mock = MockProvider::start(data).await;
    let cache = Arc::new(CacheStore::in_memory());

    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    pipeline.run().await;

    assert_eq!(mock.state.bodies("descriptions"), vec![json!(["EP000010010000"])]);
    let series = pipeline.graph().series_by_id("00001001").unwrap();
    assert_eq!(series.short_description.as_deref(), Some("Short A"));

    let program: serde_json::Value =
        serde_json::from_str(&cache.get_asset("program:SH000010010000").unwrap()).unwrap();
    assert_eq!(program["programID"], "SH000010010000");
    let description: serde_json::Value =
        serde_json::from_str(&cache.get_asset("SH000010010000").unwrap()).unwrap();
    assert_eq!(description["code"], 0);
    assert_eq!(description["description100"], "Short A");

    // a warm run reads the description back from the cache
    mock.state.reset();
    let mut again = mock.pipeline(Arc::clone(&cache));
    again.run().await;
    assert_eq!(mock.state.count("descriptions"), 0);
    let series = again.graph().series_by_id("00001001").unwrap();
    assert_eq!(series.short_description.as_deref(), Some("Short A"));
}

#[tokio::test]
async fn test_unreadable_cached_description_is_refetched() {
    let mut data = full_fixture();
    data.descriptions.remove("EP000010020000");
    let mock = MockProvider::start(data).await;

    let cache = Arc::new(CacheStore::in_memory());
    cache.add_asset("SH000010010000", "{not json");
    let mut pipeline = mock.pipeline(Arc::clone(&cache));
    pipeline.graph_mut().series_or_insert("00001001", "Alpha");

    pipeline.series_descriptions().await;

    assert_eq!(mock.state.bodies("descriptions"), vec![json!(["EP000010010000"])]);
    let series = pipeline.graph().series_by_id("00001001").unwrap();
    assert_eq!(series.short_description.as_deref(), Some("Short A"));
    assert_eq!(series.description.as_deref(), Some("Long A"));
    let cached: serde_json::Value =
        serde_json::from_str(&cache.get_asset("SH000010010000").unwrap()).unwrap();
    assert_eq!(cached["code"], 0);
}

#[tokio::test]
async fn test_full_run_assembles_guide() {
    let mock = MockProvider::start(full_fixture()).await;
    let cache = Arc::new(CacheStore::in_memory());
    let mut pipeline = mock
        .pipeline(Arc::clone(&cache))
        .with_tmdb(Arc::new(mock.tmdb()));
    pipeline.run().await;
    let graph = pipeline.into_graph();

    assert_eq!(graph.lineups().count(), 1);
    let lineup = graph.lineups().next().unwrap();
    assert_eq!(lineup.channels[1], ("10002".to_string(), "4.1".to_string()));

    let stations: Vec<_> = graph.stations().collect();
    assert_eq!(stations.len(), 2);
    assert_eq!(image_uri(&graph, stations[0].logo_image).as_deref(), Some("http://cdn/waaa.png"));
    assert_eq!(stations[1].affiliate.as_deref(), Some("NBC"));
    // airings are ordered by start time
    assert_eq!(stations[1].schedule[0].program_id, "SH000010020000");

    assert_eq!(graph.program_count(), 4);
    let episode = graph.program("EP000010010001").unwrap();
    assert_eq!(episode.series.as_deref(), Some("00001001"));
    assert_eq!(episode.uid, "!Program!EP00001001_0001");
    let movie = graph.program("MV000020010000").unwrap();
    assert!(movie.is_movie());
    assert_eq!(movie.series, None);
    assert_eq!(
        image_uri(&graph, movie.guide_image).as_deref(),
        Some("https://img.tmdb/w342/film.jpg")
    );

    let series: Vec<_> = graph.series().collect();
    assert_eq!(series.len(), 3);
    let (alpha, beta, sports) = (series[0], series[1], series[2]);
    assert_eq!(alpha.series_id, "00001001");
    assert_eq!(alpha.short_description.as_deref(), Some("Short A"));
    assert_eq!(alpha.start_air_date, NaiveDate::from_ymd_opt(1999, 1, 1));
    assert_eq!(
        image_uri(&graph, alpha.guide_image),
        Some(format!("{}image/assets/alpha_4x3.jpg", mock.base_url))
    );
    assert_eq!(beta.start_air_date, NaiveDate::from_ymd_opt(2001, 2, 3));
    assert_eq!(beta.guide_image, None);
    assert!(sports.is_sports());
    assert_eq!(sports.title, "NBA Basketball");
    assert_eq!(image_uri(&graph, sports.guide_image).as_deref(), Some("http://cdn/nba.jpg"));

    let artwork = mock.state.bodies("artwork");
    assert_eq!(artwork, vec![json!(["SH000010010000", "SH000010020000", "SP000030020000"])]);
    assert_eq!(cache.get_images("SH000010020000").as_deref(), Some(""));

    // the extended lookup wrote the air date back into the cached description
    let cached: serde_json::Value =
        serde_json::from_str(&cache.get_asset("SH000010010000").unwrap()).unwrap();
    assert_eq!(cached["startAirdate"], "1999-01-01");
    assert_eq!(cached["description100"], "Short A");
}

#[tokio::test]
async fn test_warm_run_is_identical_and_offline() {
    let mock = MockProvider::start(full_fixture()).await;
    let cache = Arc::new(CacheStore::in_memory());

    let mut first = mock
        .pipeline(Arc::clone(&cache))
        .with_tmdb(Arc::new(mock.tmdb()));
    first.run().await;
    let first = serde_json::to_string(&first.into_graph()).unwrap();

    mock.state.reset();
    let mut second = mock
        .pipeline(Arc::clone(&cache))
        .with_tmdb(Arc::new(mock.tmdb()));
    second.run().await;
    let second = serde_json::to_string(&second.into_graph()).unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.state.count("lineups"), 1);
    assert_eq!(mock.state.count("schedules"), 1);
    for endpoint in ["programs", "descriptions", "artwork", "tmdb_search"] {
        assert_eq!(mock.state.count(endpoint), 0, "{endpoint} was requested on a warm run");
    }
}
