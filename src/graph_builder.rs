use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::names::NameAliases;
use crate::processors::{parse_dump, source_name, DumpEvent};
use crate::types::{FunctionNode, NodeKind, RefKind};

/// For each node, the callers referencing it and how.
pub type ReverseIndex = BTreeMap<String, BTreeMap<String, RefKind>>;

/// Functions keyed by (mangled) name, each owning its outgoing references.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallGraph {
    nodes: BTreeMap<String, FunctionNode>,
    aliases: NameAliases,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and ingest every dump in order. Fails on the first unreadable file.
    pub fn from_dumps<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut graph = Self::new();
        for path in paths {
            let path = path.as_ref();
            let text = fs::read_to_string(path).map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?;
            graph.ingest(&source_name(path), &text)?;
        }
        Ok(graph)
    }

    /// Parse one dump's text and fold its events into the graph.
    pub fn ingest(&mut self, source_file: &str, text: &str) -> Result<()> {
        let events = parse_dump(source_file, text)?;
        debug!(source_file, events = events.len(), "parsed dump");
        for event in events {
            self.apply(event);
        }
        Ok(())
    }

    pub fn apply(&mut self, event: DumpEvent) {
        match event {
            DumpEvent::EnterFunction { name, source_file } => {
                self.enter_function(&name, &source_file)
            }
            DumpEvent::SetDisplayLabel { name, label } => {
                if let Some(node) = self.nodes.get_mut(&name) {
                    node.display_label = Some(label);
                }
            }
            DumpEvent::RegisterNameAlias { demangled, mangled } => {
                self.aliases.register(demangled, mangled)
            }
            DumpEvent::RecordReference {
                caller,
                callee,
                kind,
            } => self.record_reference(&caller, &callee, kind),
        }
    }

    /// Mark `name` as defined in `source_file`, promoting an existing stub.
    pub fn enter_function(&mut self, name: &str, source_file: &str) {
        let node = self
            .nodes
            .entry(name.to_string())
            .or_insert_with(FunctionNode::external);
        node.kind = NodeKind::Defined {
            source_file: source_file.to_string(),
        };
    }

    /// Add or merge the `caller -> callee` edge; a call never degrades to a reference.
    pub fn record_reference(&mut self, caller: &str, callee: &str, kind: RefKind) {
        let node = self
            .nodes
            .entry(caller.to_string())
            .or_insert_with(FunctionNode::external);
        node.outgoing
            .entry(callee.to_string())
            .and_modify(|existing| *existing = existing.merge(kind))
            .or_insert(kind);

        if kind == RefKind::Call && !self.nodes.contains_key(callee) {
            self.nodes
                .insert(callee.to_string(), FunctionNode::external());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node(&self, name: &str) -> Option<&FunctionNode> {
        self.nodes.get(name)
    }

    /// Nodes in name order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &FunctionNode)> {
        self.nodes.iter().map(|(name, node)| (name.as_str(), node))
    }

    /// Edges in (caller, callee) order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, RefKind)> {
        self.nodes.iter().flat_map(|(caller, node)| {
            node.outgoing
                .iter()
                .map(move |(callee, kind)| (caller.as_str(), callee.as_str(), *kind))
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(|n| n.outgoing.len()).sum()
    }

    pub fn aliases(&self) -> &NameAliases {
        &self.aliases
    }

    /// Map a user-supplied name (demangled or key) onto a node key.
    pub fn resolve(&self, name: &str) -> Option<String> {
        self.aliases.resolve(name, |key| self.contains(key))
    }

    /// Build the caller index from the current edges. Not kept in sync with later mutation.
    pub fn reverse_index(&self) -> ReverseIndex {
        let mut index: ReverseIndex = self
            .nodes
            .keys()
            .map(|name| (name.clone(), BTreeMap::new()))
            .collect();
        for (caller, callee, kind) in self.edges() {
            index
                .entry(callee.to_string())
                .or_default()
                .insert(caller.to_string(), kind);
        }
        index
    }

    /// Borrowing petgraph view of the graph, used for traversals. Edge targets without a
    /// node still appear as vertices.
    pub fn as_graph_map(&self) -> DiGraphMap<&str, RefKind> {
        let mut map = DiGraphMap::with_capacity(self.nodes.len(), self.edge_count());
        for name in self.nodes.keys() {
            map.add_node(name.as_str());
        }
        for (caller, callee, kind) in self.edges() {
            map.add_edge(caller, callee, kind);
        }
        map
    }

    /// Remove the named nodes with every edge into or out of them.
    pub fn remove_nodes(&mut self, names: &BTreeSet<String>) {
        self.nodes.retain(|name, _| !names.contains(name));
        for node in self.nodes.values_mut() {
            node.outgoing.retain(|callee, _| !names.contains(callee));
        }
    }

    /// Keep only the named nodes, and only edges landing inside the set.
    pub fn retain_nodes(&mut self, keep: &BTreeSet<String>) {
        self.nodes.retain(|name, _| keep.contains(name));
        for node in self.nodes.values_mut() {
            node.outgoing.retain(|callee, _| keep.contains(callee));
        }
    }

    pub fn remove_edge(&mut self, caller: &str, callee: &str) -> Option<RefKind> {
        self.nodes
            .get_mut(caller)
            .and_then(|node| node.outgoing.remove(callee))
    }

    pub fn insert_node(&mut self, name: impl Into<String>, node: FunctionNode) {
        self.nodes.insert(name.into(), node);
    }
}
