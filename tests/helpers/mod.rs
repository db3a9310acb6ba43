//! A local mock of the guide and TMDb providers, served by axum.
#![allow(dead_code)]

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header::RETRY_AFTER};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use guidebuilder::cache::CacheStore;
use guidebuilder::provider::tmdb::TmdbApi;
use guidebuilder::provider::{GuideApi, RateLimitedClient};
use guidebuilder::config::TmdbConfig;
use guidebuilder::scraper::{AssemblyPipeline, PipelineSettings};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const LINEUP: &str = "USA-TEST-X";

/// Canned responses, keyed by the id the pipeline requests.
#[derive(Default)]
pub struct MockData {
    pub lineup: Option<Value>,
    pub schedules: HashMap<String, Value>,
    pub programs: HashMap<String, Value>,
    pub descriptions: HashMap<String, Value>,
    /// `data` payload per artwork id; missing ids answer with an error object.
    pub artwork: HashMap<String, Value>,
    pub tmdb_configuration: Option<Value>,
    pub tmdb_search: HashMap<String, Value>,
    /// Number of `429` answers `/limited` gives before succeeding.
    pub rate_limited: usize,
    pub retry_after_secs: u64,
}

pub struct MockState {
    data: MockData,
    rate_limited_remaining: AtomicUsize,
    requests: Mutex<Vec<(String, Value)>>,
}

impl MockState {
    fn record(&self, endpoint: &str, body: Value) {
        self.requests
            .lock()
            .unwrap()
            .push((endpoint.to_string(), body));
    }

    /// Request bodies received by `endpoint`, in arrival order.
    pub fn bodies(&self, endpoint: &str) -> Vec<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(e, _)| e == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn count(&self, endpoint: &str) -> usize {
        self.bodies(endpoint).len()
    }

    pub fn reset(&self) {
        self.requests.lock().unwrap().clear();
    }
}

pub struct MockProvider {
    pub base_url: Url,
    pub state: Arc<MockState>,
}

impl MockProvider {
    pub async fn start(data: MockData) -> Self {
        let state = Arc::new(MockState {
            rate_limited_remaining: AtomicUsize::new(data.rate_limited),
            data,
            requests: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/lineups/{id}", get(lineup))
            .route("/schedules", post(schedules))
            .route("/programs", post(programs))
            .route("/metadata/description", post(descriptions))
            .route("/metadata/programs", post(artwork))
            .route("/tmdb/configuration", get(tmdb_configuration))
            .route("/tmdb/search/movie", get(tmdb_search))
            .route("/limited", get(limited))
            .route("/broken", get(broken))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: Url::parse(&format!("http://{addr}/")).unwrap(),
            state,
        }
    }

    pub fn client(&self) -> RateLimitedClient {
        RateLimitedClient::new(self.base_url.clone(), Some("test-token".into()), Duration::from_secs(5), None)
            .unwrap()
    }

    pub fn api(&self) -> GuideApi {
        GuideApi::new(Arc::new(self.client()))
    }

    pub fn tmdb(&self) -> TmdbApi {
        let client = RateLimitedClient::new(
            self.base_url.join("tmdb/").unwrap(),
            None,
            Duration::from_secs(5),
            None,
        )
        .unwrap();
        TmdbApi::new(
            Arc::new(client),
            TmdbConfig {
                api_key: "tmdb-key".into(),
                language: "en-US".into(),
                include_adult: false,
            },
        )
    }

    pub fn pipeline(&self, cache: Arc<CacheStore>) -> AssemblyPipeline {
        let settings = PipelineSettings {
            lineups: vec![LINEUP.to_string()],
            schedule_days: 2,
            expected_service_count: 0,
            series_poster_art: false,
            extended_series_data: true,
            max_parallel: 2,
        };
        AssemblyPipeline::new(self.api(), cache, settings).with_today(today())
    }
}

/// A day on which none of the fixture series is due for refresh.
pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
}

pub fn image(uri: &str, aspect: &str, category: &str) -> Value {
    json!({"uri": uri, "aspect": aspect, "size": "Md", "category": category, "width": "240", "height": "180"})
}

async fn lineup(State(state): State<Arc<MockState>>, Path(id): Path<String>) -> Response {
    state.record("lineups", Value::String(id));
    match &state.data.lineup {
        Some(lineup) => Json(lineup.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn schedules(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Json<Value> {
    state.record("schedules", body.clone());
    let found = body
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|request| request["stationID"].as_str())
        .filter_map(|id| state.data.schedules.get(id).cloned())
        .collect();
    Json(Value::Array(found))
}

async fn programs(State(state): State<Arc<MockState>>, Json(ids): Json<Vec<String>>) -> Json<Value> {
    state.record("programs", json!(ids));
    let found = ids
        .iter()
        .map(|id| state.data.programs.get(id).cloned().unwrap_or(Value::Null))
        .collect();
    Json(Value::Array(found))
}

async fn descriptions(
    State(state): State<Arc<MockState>>,
    Json(ids): Json<Vec<String>>,
) -> Json<Value> {
    state.record("descriptions", json!(ids));
    let found: Map<String, Value> = ids
        .iter()
        .filter_map(|id| state.data.descriptions.get(id).map(|d| (id.clone(), d.clone())))
        .collect();
    Json(Value::Object(found))
}

async fn artwork(State(state): State<Arc<MockState>>, Json(ids): Json<Vec<String>>) -> Json<Value> {
    state.record("artwork", json!(ids));
    let found = ids
        .iter()
        .map(|id| {
            let data = state.data.artwork.get(id).cloned().unwrap_or_else(
                || json!({"errorCode": 5000, "errorMessage": "No images found"}),
            );
            json!({"programID": id, "data": data})
        })
        .collect();
    Json(Value::Array(found))
}

async fn tmdb_configuration(State(state): State<Arc<MockState>>) -> Response {
    state.record("tmdb_configuration", Value::Null);
    match &state.data.tmdb_configuration {
        Some(config) => Json(config.clone()).into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn tmdb_search(
    State(state): State<Arc<MockState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let query = params.get("query").cloned().unwrap_or_default();
    state.record("tmdb_search", json!(params));
    Json(
        state
            .data
            .tmdb_search
            .get(&query)
            .cloned()
            .unwrap_or_else(|| json!({"results": []})),
    )
}

async fn limited(State(state): State<Arc<MockState>>) -> Response {
    state.record("limited", Value::Null);
    let remaining = state.rate_limited_remaining.load(Ordering::SeqCst);
    if remaining > 0 {
        state.rate_limited_remaining.fetch_sub(1, Ordering::SeqCst);
        let mut response = StatusCode::TOO_MANY_REQUESTS.into_response();
        response.headers_mut().insert(
            RETRY_AFTER,
            HeaderValue::from_str(&state.data.retry_after_secs.to_string()).unwrap(),
        );
        return response;
    }
    "ok".into_response()
}

async fn broken(State(state): State<Arc<MockState>>) -> Response {
    state.record("broken", Value::Null);
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}
