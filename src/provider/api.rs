//! Typed calls against the guide provider.
//!
//! Every method returns `None` when the request failed or the payload did not
//! parse; the failure is already logged by the time the caller sees it.

use crate::provider::client::RateLimitedClient;
use crate::provider::json::parse_json_with_context;
use crate::provider::models::{
    ArtworkResponse, GenericDescription, LineupResponse, ProgramRecord, ScheduleRequest,
    StationSchedule,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct GuideApi {
    client: Arc<RateLimitedClient>,
}

impl GuideApi {
    pub fn new(client: Arc<RateLimitedClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RateLimitedClient {
        &self.client
    }

    /// Absolute prefix for relative image URIs (`{base}image/`).
    pub fn image_base(&self) -> String {
        format!("{}image/", self.client.base_url())
    }

    fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> Option<T> {
        match parse_json_with_context(body) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                error!(endpoint, error = %e, "Failed to parse provider response");
                None
            }
        }
    }

    pub async fn lineup(&self, lineup_id: &str) -> Option<LineupResponse> {
        let path = format!("lineups/{}", urlencoding::encode(lineup_id));
        let body = self.client.get(&path).await?;
        Self::decode("lineups", &body)
    }

    pub async fn schedules(&self, requests: &[ScheduleRequest]) -> Option<Vec<StationSchedule>> {
        let body = self.client.post_json("schedules", requests).await?;
        Self::decode("schedules", &body)
    }

    /// Program records in request order; ids the provider could not resolve come back as `None`.
    pub async fn programs(&self, program_ids: &[String]) -> Option<Vec<Option<ProgramRecord>>> {
        let body = self.client.post_json("programs", program_ids).await?;
        Self::decode("programs", &body)
    }

    /// Generic series descriptions keyed by the `EP########0000` request id.
    pub async fn descriptions(
        &self,
        request_ids: &[String],
    ) -> Option<HashMap<String, GenericDescription>> {
        let body = self
            .client
            .post_json("metadata/description", request_ids)
            .await?;
        Self::decode("metadata/description", &body)
    }

    pub async fn artwork(&self, program_ids: &[String]) -> Option<Vec<ArtworkResponse>> {
        let body = self
            .client
            .post_json("metadata/programs", program_ids)
            .await?;
        Self::decode("metadata/programs", &body)
    }
}
