//! Guide data model: the graph, its nodes, and the logic that links them.

pub mod graph;
pub mod ids;
pub mod images;
pub mod program;
pub mod resolver;

pub use graph::{GuideGraph, GuideImage, Lineup, ScheduleEntry, SeriesInfo, Station};
pub use images::{ImageCandidate, ImageSelector};
pub use program::{Advisories, ContentRating, Program, ProgramFlags};
pub use resolver::ReferenceResolver;
