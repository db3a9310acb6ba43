//! Maps provider identifiers onto [`GuideGraph`] series nodes.
//!
//! Episode and show ids resolve directly through their numeric body. Sports
//! events have no shared body, so they are grouped under a logical key and a
//! multi-valued index records which `SP########` heads belong to each key.

use crate::guide::graph::{GuideGraph, SeriesInfo};
use crate::guide::ids::{self, IdPrefix};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{trace, warn};

#[derive(Debug, Default)]
pub struct ReferenceResolver {
    /// sports key -> 10-character `SP` heads, in first-seen order
    sports_series: IndexMap<String, IndexSet<String>>,
    /// 10-character `SP` head -> owning sports key (first registration wins)
    sports_heads: HashMap<String, String>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the owning series of a program, creating the series node on first reference.
    ///
    /// Returns the series key, or `None` for programs that never belong to a series (movies,
    /// malformed ids).
    pub fn resolve_program(
        &mut self,
        graph: &mut GuideGraph,
        program_id: &str,
        title: &str,
    ) -> Option<String> {
        match IdPrefix::from_id(program_id)? {
            IdPrefix::Episode | IdPrefix::Show => {
                let body = ids::series_body(program_id)?;
                graph.series_or_insert(body, title);
                Some(body.to_string())
            }
            IdPrefix::Sports => {
                let head = ids::id_head(program_id)?;
                let key = ids::sports_series_key(title);
                self.register_sports_head(&key, head);
                graph.series_or_insert(&key, title);
                Some(key)
            }
            IdPrefix::Movie => None,
        }
    }

    fn register_sports_head(&mut self, key: &str, head: &str) {
        let heads = self.sports_series.entry(key.to_string()).or_default();
        if heads.insert(head.to_string()) {
            trace!(sports_key = key, head, "Registered sports event");
        }
        self.sports_heads
            .entry(head.to_string())
            .or_insert_with(|| key.to_string());
    }

    /// Provider heads sharing the given sports key (`SP########`, no suffix).
    pub fn sports_heads(&self, key: &str) -> Vec<String> {
        self.sports_series
            .get(key)
            .map(|heads| heads.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Series key owning a response record's id, without creating anything.
    pub fn owner_key(&self, graph: &GuideGraph, record_id: &str) -> Option<String> {
        let key = match IdPrefix::from_id(record_id)? {
            IdPrefix::Sports => self.sports_heads.get(ids::id_head(record_id)?)?.clone(),
            IdPrefix::Movie => return None,
            IdPrefix::Episode | IdPrefix::Show => ids::series_body(record_id)?.to_string(),
        };
        graph.series_by_id(&key).map(|_| key)
    }

    /// Looks up the series owning `record_id`; logs and returns `None` when it cannot be located.
    pub fn resolve_existing<'g>(
        &self,
        graph: &'g mut GuideGraph,
        record_id: &str,
    ) -> Option<&'g mut SeriesInfo> {
        match self.owner_key(graph, record_id) {
            Some(key) => graph.series_mut(&key),
            None => {
                warn!(record_id, "No series owns response record, skipping");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_and_show_share_series() {
        let mut graph = GuideGraph::new();
        let mut resolver = ReferenceResolver::new();
        let a = resolver.resolve_program(&mut graph, "EP012345670001", "Show");
        let b = resolver.resolve_program(&mut graph, "SH012345670000", "Show");
        assert_eq!(a.as_deref(), Some("01234567"));
        assert_eq!(a, b);
        assert_eq!(graph.series_count(), 1);
    }

    #[test]
    fn test_movies_have_no_series() {
        let mut graph = GuideGraph::new();
        let mut resolver = ReferenceResolver::new();
        assert_eq!(
            resolver.resolve_program(&mut graph, "MV001122330000", "Film"),
            None
        );
        assert_eq!(graph.series_count(), 0);
    }

    #[test]
    fn test_sports_events_group_by_title() {
        let mut graph = GuideGraph::new();
        let mut resolver = ReferenceResolver::new();
        let first = resolver.resolve_program(&mut graph, "SP003015700123", "NBA Basketball");
        let second = resolver.resolve_program(&mut graph, "SP009999990001", "NBA Basketball ");
        assert_eq!(first, second);
        assert_eq!(graph.series_count(), 1);

        let key = first.unwrap();
        assert_eq!(
            resolver.sports_heads(&key),
            vec!["SP00301570".to_string(), "SP00999999".to_string()]
        );
        assert_eq!(
            resolver.owner_key(&graph, "SP009999990000").as_deref(),
            Some(key.as_str())
        );
    }

    #[test]
    fn test_unknown_owner_is_skipped() {
        let mut graph = GuideGraph::new();
        let resolver = ReferenceResolver::new();
        assert!(resolver.resolve_existing(&mut graph, "SH000000010000").is_none());
        assert!(resolver.resolve_existing(&mut graph, "SP000000010000").is_none());
        assert_eq!(graph.series_count(), 0);
    }
}
