//! Graph filters: omission, reachability pruning and fan-in summarization.
//!
//! [`apply`] runs them in a fixed order; each is also usable on its own.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;

use petgraph::visit::{Dfs, IntoNeighbors, Reversed, Visitable};
use tracing::{debug, warn};

use crate::config::SelectionOptions;
use crate::graph_builder::CallGraph;
use crate::types::{FunctionNode, RefKind};

/// Which way reachability follows edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From a function to what it references.
    Callees,
    /// From a function to what references it.
    Callers,
}

/// State the serializer needs from the filtering stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub omitted: BTreeSet<String>,
}

/// Run the configured filters: resolve names, omit, prune to callees, prune to callers,
/// then summarize high fan-in callees.
pub fn apply(graph: &mut CallGraph, options: &SelectionOptions) -> Selection {
    let omit = resolve_names(graph, &options.omit);
    let callees = resolve_names(graph, &options.callees);
    let callers = resolve_names(graph, &options.callers);

    let omitted: BTreeSet<String> = omit.into_iter().collect();
    if !omitted.is_empty() {
        omit_functions(graph, &omitted);
    }

    if !options.callees.is_empty() {
        prune_to_reachable(graph, &callees, Direction::Callees);
    }

    if !options.callers.is_empty() {
        prune_to_reachable(graph, &callers, Direction::Callers);
    }

    if let Some(threshold) = options.summarize_callers {
        let created = summarize_callers(graph, threshold);
        debug!(threshold = threshold.get(), summaries = created.len(), "summarized callers");
    }

    Selection { omitted }
}

/// Resolve user-supplied names to graph keys, dropping (and reporting) unknown ones.
pub fn resolve_names(graph: &CallGraph, names: &[String]) -> Vec<String> {
    names.iter().filter_map(|name| graph.resolve(name)).collect()
}

pub fn omit_functions(graph: &mut CallGraph, names: &BTreeSet<String>) {
    let before = graph.node_count();
    graph.remove_nodes(names);
    debug!(removed = before - graph.node_count(), "omitted functions");
}

/// Everything reachable from `seeds`, seeds included.
pub fn reachable(graph: &CallGraph, seeds: &[String], direction: Direction) -> BTreeSet<String> {
    let map = graph.as_graph_map();
    let mut keep = BTreeSet::new();
    for seed in seeds {
        let start = seed.as_str();
        if !map.contains_node(start) {
            continue;
        }
        match direction {
            Direction::Callees => visit_from(&map, start, &mut keep),
            Direction::Callers => visit_from(Reversed(&map), start, &mut keep),
        }
    }
    keep
}

// Iterative depth-first walk; `Dfs` keeps its own stack and visited set.
fn visit_from<'a, G>(graph: G, start: &'a str, keep: &mut BTreeSet<String>)
where
    G: IntoNeighbors<NodeId = &'a str> + Visitable,
{
    let mut dfs = Dfs::new(graph, start);
    while let Some(name) = dfs.next(graph) {
        keep.insert(name.to_string());
    }
}

/// Drop every node not reachable from `seeds` in the given direction, along with edges
/// into dropped nodes.
pub fn prune_to_reachable(graph: &mut CallGraph, seeds: &[String], direction: Direction) {
    if seeds.is_empty() {
        warn!(?direction, "no seed function resolved, skipping pruning");
        return;
    }
    let keep = reachable(graph, seeds, direction);
    let before = graph.node_count();
    graph.retain_nodes(&keep);
    debug!(
        ?direction,
        kept = graph.node_count(),
        removed = before - graph.node_count(),
        "pruned to reachable"
    );
}

/// Replace the direct-call edges into every callee with at least `threshold` distinct callers
/// by a single summary node calling that callee. Returns the summary node names.
///
/// A recursive call counts as one of the callee's callers. Summary edges are always calls.
pub fn summarize_callers(graph: &mut CallGraph, threshold: NonZeroUsize) -> Vec<String> {
    let index = graph.reverse_index();
    let mut created = Vec::new();
    let mut next_id = 1usize;

    for (callee, callers) in &index {
        let direct: Vec<&str> = callers
            .iter()
            .filter(|(_, kind)| **kind == RefKind::Call)
            .map(|(caller, _)| caller.as_str())
            .collect();
        if direct.len() < threshold.get() {
            continue;
        }

        for caller in &direct {
            graph.remove_edge(caller, callee);
        }

        let name = loop {
            let candidate = format!("summary#{}", next_id);
            next_id += 1;
            if !graph.contains(&candidate) && !index.contains_key(&candidate) {
                break candidate;
            }
        };
        graph.insert_node(name.clone(), FunctionNode::summary(callee, direct.len()));
        created.push(name);
    }

    created
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeKind;

    fn graph_of(edges: &[(&str, &str, RefKind)]) -> CallGraph {
        let mut graph = CallGraph::new();
        for (caller, callee, kind) in edges {
            graph.enter_function(caller, "x.c");
            graph.record_reference(caller, callee, *kind);
        }
        graph
    }

    fn names(graph: &CallGraph) -> Vec<&str> {
        graph.nodes().map(|(name, _)| name).collect()
    }

    fn chain() -> CallGraph {
        // main -> a -> b -> c, main -> d, e -> c, a ~> table
        graph_of(&[
            ("main", "a", RefKind::Call),
            ("a", "b", RefKind::Call),
            ("b", "c", RefKind::Call),
            ("main", "d", RefKind::Call),
            ("e", "c", RefKind::Call),
            ("a", "table", RefKind::Reference),
        ])
    }

    #[test]
    fn callee_reachability() {
        let graph = chain();
        let keep = reachable(&graph, &["a".to_string()], Direction::Callees);
        let keep: Vec<_> = keep.iter().map(String::as_str).collect();
        assert_eq!(keep, vec!["a", "b", "c", "table"]);
    }

    #[test]
    fn caller_reachability() {
        let graph = chain();
        let keep = reachable(&graph, &["c".to_string()], Direction::Callers);
        let keep: Vec<_> = keep.iter().map(String::as_str).collect();
        assert_eq!(keep, vec!["a", "b", "c", "e", "main"]);
    }

    #[test]
    fn reachability_survives_cycles() {
        let graph = graph_of(&[
            ("a", "b", RefKind::Call),
            ("b", "a", RefKind::Call),
            ("b", "b", RefKind::Call),
        ]);
        assert_eq!(reachable(&graph, &["a".to_string()], Direction::Callees).len(), 2);
    }

    #[test]
    fn caller_pruning_drops_edges_leaving_the_set() {
        let mut graph = chain();
        prune_to_reachable(&mut graph, &["b".to_string()], Direction::Callers);
        assert_eq!(names(&graph), vec!["a", "b", "main"]);
        let edges: Vec<_> = graph.edges().map(|(a, b, _)| (a, b)).collect();
        assert_eq!(edges, vec![("a", "b"), ("main", "a")]);
    }

    #[test]
    fn empty_seed_list_keeps_graph() {
        let mut graph = chain();
        let before = graph.clone();
        prune_to_reachable(&mut graph, &[], Direction::Callees);
        assert_eq!(graph, before);
    }

    #[test]
    fn omission_removes_incident_edges_and_is_idempotent() {
        let mut graph = chain();
        let omit = BTreeSet::from(["b".to_string()]);
        omit_functions(&mut graph, &omit);
        let once = graph.clone();
        omit_functions(&mut graph, &omit);
        assert_eq!(graph, once);
        assert!(graph.edges().all(|(a, b, _)| a != "b" && b != "b"));
    }

    #[test]
    fn summary_at_threshold() {
        let mut graph = graph_of(&[
            ("A", "log", RefKind::Call),
            ("B", "log", RefKind::Call),
            ("C", "log", RefKind::Call),
        ]);
        let created = summarize_callers(&mut graph, NonZeroUsize::new(3).unwrap());
        assert_eq!(created, vec!["summary#1"]);

        let summary = graph.node("summary#1").unwrap();
        assert_eq!(summary.kind, NodeKind::Summary { callers: 3 });
        assert_eq!(summary.label("summary#1"), "3 callers");
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![("summary#1", "log", RefKind::Call)]);
    }

    #[test]
    fn no_summary_below_threshold() {
        let mut graph = graph_of(&[("A", "log", RefKind::Call), ("B", "log", RefKind::Call)]);
        let created = summarize_callers(&mut graph, NonZeroUsize::new(3).unwrap());
        assert!(created.is_empty());
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn references_do_not_count_as_callers() {
        let mut graph = graph_of(&[
            ("A", "log", RefKind::Call),
            ("B", "log", RefKind::Reference),
            ("log", "log", RefKind::Call),
        ]);
        assert!(summarize_callers(&mut graph, NonZeroUsize::new(3).unwrap()).is_empty());
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn recursive_call_counts_as_caller() {
        let mut graph = graph_of(&[
            ("A", "log", RefKind::Call),
            ("B", "log", RefKind::Call),
            ("log", "log", RefKind::Call),
        ]);
        let created = summarize_callers(&mut graph, NonZeroUsize::new(3).unwrap());
        assert_eq!(created, vec!["summary#1"]);
        assert_eq!(
            graph.node("summary#1").unwrap().kind,
            NodeKind::Summary { callers: 3 }
        );
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![("summary#1", "log", RefKind::Call)]);
    }

    #[test]
    fn pipeline_drops_unknown_names() {
        let mut graph = chain();
        let options = SelectionOptions {
            omit: vec!["d".to_string(), "nonexistent".to_string()],
            callees: vec!["main".to_string()],
            ..Default::default()
        };
        let selection = apply(&mut graph, &options);
        assert_eq!(selection.omitted, BTreeSet::from(["d".to_string()]));
        assert_eq!(names(&graph), vec!["a", "b", "c", "main"]);
    }
}
