pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod guide;
pub mod logging;
pub mod provider;
pub mod scraper;
pub mod utils;
