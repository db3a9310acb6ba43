//! Guide acquisition: batched fetching, refresh cycling and the staged assembly pipeline.

pub mod batch;
pub mod pipeline;
pub mod progress;
pub mod refresh;

pub use batch::{BatchFetcher, MAX_IMAGE_QUERIES, MAX_QUERIES};
pub use pipeline::{AssemblyPipeline, PipelineSettings};
pub use progress::{Progress, ProgressTracker, Stage};
