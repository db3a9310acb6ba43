//! Network access to the guide provider and the secondary movie-metadata provider.

pub mod api;
pub mod client;
pub mod errors;
pub mod json;
pub mod models;
pub mod tmdb;

pub use api::GuideApi;
pub use client::RateLimitedClient;
pub use errors::ProviderError;
pub use tmdb::TmdbApi;
