use std::collections::{BTreeMap, BTreeSet};

use serde_json::{json, Value};

use crate::config::{OutputFormat, SelectionOptions};
use crate::error::{Error, Result};
use crate::graph_builder::CallGraph;
use crate::selection::Selection;
use crate::types::{FunctionNode, NodeKind, RefKind};

/// Decides which nodes and edges make it into the output.
pub struct Visibility<'a> {
    graph: &'a CallGraph,
    include_external: bool,
    omitted: &'a BTreeSet<String>,
}

impl<'a> Visibility<'a> {
    pub fn new(graph: &'a CallGraph, include_external: bool, omitted: &'a BTreeSet<String>) -> Self {
        Self {
            graph,
            include_external,
            omitted,
        }
    }

    /// A reference target is shown when it is defined, or when it is a called external
    /// function, externals are enabled, and it was not omitted.
    pub fn target_visible(&self, name: &str, kind: RefKind) -> bool {
        let defined = self.graph.node(name).is_some_and(FunctionNode::is_defined);
        defined || (self.include_external && kind == RefKind::Call && !self.omitted.contains(name))
    }

    pub fn node_visible(&self, name: &str, node: &FunctionNode) -> Result<bool> {
        Ok(match &node.kind {
            NodeKind::Defined { .. } => true,
            NodeKind::External => self.include_external && !self.omitted.contains(name),
            NodeKind::Summary { .. } => self.target_visible(summary_target(name, node)?, RefKind::Call),
        })
    }

    fn edge_visible(&self, caller: &str, callee: &str, kind: RefKind) -> Result<bool> {
        if caller == callee || !self.target_visible(callee, kind) {
            return Ok(false);
        }
        match self.graph.node(caller) {
            Some(node) => self.node_visible(caller, node),
            None => Ok(false),
        }
    }
}

fn summary_target<'n>(name: &str, node: &'n FunctionNode) -> Result<&'n str> {
    let mut targets = node.outgoing.keys();
    match (targets.next(), targets.next()) {
        (Some(target), None) => Ok(target),
        _ => Err(Error::MalformedSummary {
            name: name.to_string(),
            edges: node.outgoing.len(),
        }),
    }
}

/// Render the filtered graph in the requested format.
pub fn render(
    graph: &CallGraph,
    selection: &Selection,
    options: &SelectionOptions,
    format: OutputFormat,
) -> Result<String> {
    let visibility = Visibility::new(graph, options.include_external, &selection.omitted);
    match format {
        OutputFormat::Dot => format_graph_as_dot(graph, &visibility, options.cluster_by_file),
        OutputFormat::Json => format_graph_as_json(graph, &visibility, options.cluster_by_file),
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Defined functions grouped by source file, both levels in name order.
fn clusters(graph: &CallGraph) -> BTreeMap<&str, Vec<&str>> {
    let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, node) in graph.nodes() {
        if let Some(file) = node.source_file() {
            groups.entry(file).or_default().push(name);
        }
    }
    groups
}

pub fn format_graph_as_dot(
    graph: &CallGraph,
    visibility: &Visibility<'_>,
    cluster_by_file: bool,
) -> Result<String> {
    let mut output = String::from("digraph callgraph {\n");

    // Fixed styling
    output.push_str("    graph [rankdir=LR];\n");
    output.push_str("    node [shape=box];\n");
    output.push_str("    edge [penwidth=1.5];\n\n");

    for (name, node) in graph.nodes() {
        if !visibility.node_visible(name, node)? {
            continue;
        }
        output.push_str(&format!(
            "    \"{}\" [label=\"{}\"];\n",
            escape(name),
            escape(&node.label(name))
        ));
    }

    for (caller, callee, kind) in graph.edges() {
        if !visibility.edge_visible(caller, callee, kind)? {
            continue;
        }
        let style = match kind {
            RefKind::Call => "solid",
            RefKind::Reference => "dotted",
        };
        output.push_str(&format!(
            "    \"{}\" -> \"{}\" [style={}];\n",
            escape(caller),
            escape(callee),
            style
        ));
    }

    if cluster_by_file {
        for (file, members) in clusters(graph) {
            let file = escape(file);
            output.push_str(&format!("\n    subgraph \"cluster_{}\" {{\n", file));
            output.push_str(&format!("        label=\"{}\";\n", file));
            for member in members {
                output.push_str(&format!("        \"{}\";\n", escape(member)));
            }
            output.push_str("    }\n");
        }
    }

    output.push_str("}\n");
    Ok(output)
}

pub fn format_graph_as_json(
    graph: &CallGraph,
    visibility: &Visibility<'_>,
    cluster_by_file: bool,
) -> Result<String> {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();

    for (name, node) in graph.nodes() {
        if !visibility.node_visible(name, node)? {
            continue;
        }
        let kind = match node.kind {
            NodeKind::Defined { .. } => "defined",
            NodeKind::External => "external",
            NodeKind::Summary { .. } => "summary",
        };
        let mut entry = json!({
            "id": name,
            "label": node.label(name),
            "kind": kind,
        });
        if let Some(file) = node.source_file() {
            entry["file"] = json!(file);
        }
        nodes.push(entry);
    }

    for (caller, callee, kind) in graph.edges() {
        if visibility.edge_visible(caller, callee, kind)? {
            edges.push(json!({ "from": caller, "to": callee, "kind": kind }));
        }
    }

    let mut result = json!({
        "nodes": nodes,
        "edges": edges,
    });

    if cluster_by_file {
        let groups: Vec<Value> = clusters(graph)
            .into_iter()
            .map(|(file, members)| json!({ "file": file, "functions": members }))
            .collect();
        result["clusters"] = Value::Array(groups);
    }

    Ok(format!("{:#}\n", result))
}
