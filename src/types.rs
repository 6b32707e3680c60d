use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

// Reference kinds, ordered so that merging two kinds with `max` keeps the stronger one
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Reference, // Address taken (symbol_ref)
    Call,      // Direct call
}

impl RefKind {
    pub fn merge(self, other: RefKind) -> RefKind {
        self.max(other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Reference => "reference",
            RefKind::Call => "call",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// What a node stands for in the graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Defined { source_file: String }, // Function body seen in one of the dumps
    External,                        // Only referenced, never defined
    Summary { callers: usize },      // Synthetic fan-in counter
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionNode {
    pub kind: NodeKind,
    pub display_label: Option<String>,
    pub outgoing: BTreeMap<String, RefKind>,
}

impl FunctionNode {
    pub fn defined(source_file: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Defined {
            source_file: source_file.into(),
        })
    }

    pub fn external() -> Self {
        Self::with_kind(NodeKind::External)
    }

    pub fn summary(callee: &str, callers: usize) -> Self {
        let mut node = Self::with_kind(NodeKind::Summary { callers });
        node.outgoing.insert(callee.to_string(), RefKind::Call);
        node
    }

    fn with_kind(kind: NodeKind) -> Self {
        Self {
            kind,
            display_label: None,
            outgoing: BTreeMap::new(),
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self.kind, NodeKind::Defined { .. })
    }

    pub fn is_summary(&self) -> bool {
        matches!(self.kind, NodeKind::Summary { .. })
    }

    pub fn source_file(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Defined { source_file } => Some(source_file),
            _ => None,
        }
    }

    /// Text shown for the node: the summary count, the demangled label, or the key itself.
    pub fn label<'a>(&'a self, name: &'a str) -> std::borrow::Cow<'a, str> {
        match (&self.kind, &self.display_label) {
            (NodeKind::Summary { callers }, _) => format!("{} callers", callers).into(),
            (_, Some(label)) => label.as_str().into(),
            (_, None) => name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_outranks_reference() {
        assert_eq!(RefKind::Reference.merge(RefKind::Call), RefKind::Call);
        assert_eq!(RefKind::Call.merge(RefKind::Reference), RefKind::Call);
        assert_eq!(RefKind::Reference.merge(RefKind::Reference), RefKind::Reference);
    }

    #[test]
    fn labels() {
        let mut node = FunctionNode::defined("foo.c");
        assert_eq!(node.label("_Z3foov"), "_Z3foov");
        node.display_label = Some("foo()".to_string());
        assert_eq!(node.label("_Z3foov"), "foo()");
        assert_eq!(FunctionNode::summary("log", 3).label("summary#1"), "3 callers");
    }

    #[test]
    fn source_file_only_on_defined() {
        assert_eq!(FunctionNode::defined("a.c").source_file(), Some("a.c"));
        assert_eq!(FunctionNode::external().source_file(), None);
        assert!(!FunctionNode::summary("x", 2).is_defined());
    }
}
