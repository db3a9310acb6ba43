//! Per-stage progress reporting.
//!
//! The pipeline publishes `(stage, processed, total)` on a [`watch`] channel
//! after each unit of work. Nothing depends on a receiver being attached.

use std::fmt;
use tokio::sync::watch;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Stations,
    Programs,
    SeriesDescriptions,
    SeriesImages,
    ExtendedMetadata,
    MoviePosters,
}

impl Stage {
    pub const ALL: [Stage; 6] = [
        Stage::Stations,
        Stage::Programs,
        Stage::SeriesDescriptions,
        Stage::SeriesImages,
        Stage::ExtendedMetadata,
        Stage::MoviePosters,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Stations => "stations",
            Stage::Programs => "programs",
            Stage::SeriesDescriptions => "series_descriptions",
            Stage::SeriesImages => "series_images",
            Stage::ExtendedMetadata => "extended_metadata",
            Stage::MoviePosters => "movie_posters",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub stage: Stage,
    pub processed: usize,
    pub total: usize,
}

/// Publishing side of the progress channel, owned by the pipeline.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<Progress>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Progress::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Progress> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Progress {
        *self.tx.borrow()
    }

    pub fn begin(&self, stage: Stage, total: usize) {
        self.tx.send_replace(Progress {
            stage,
            processed: 0,
            total,
        });
    }

    /// Counts `n` more entities as processed.
    pub fn advance(&self, n: usize) {
        self.tx.send_modify(|p| p.processed += n);
    }

    /// Logs a discrepancy when fewer or more entities were processed than expected.
    pub fn finish(&self) -> Progress {
        let progress = self.current();
        if progress.processed != progress.total {
            warn!(
                stage = %progress.stage,
                processed = progress.processed,
                total = progress.total,
                "Stage processed count does not match expected total"
            );
        }
        progress
    }
}
