use std::num::NonZeroUsize;
use std::str::FromStr;

/// Filters and display switches applied after the graph is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    /// Functions removed from the graph together with their edges.
    pub omit: Vec<String>,
    /// Keep only what these functions reach.
    pub callees: Vec<String>,
    /// Keep only what reaches these functions.
    pub callers: Vec<String>,
    /// Show functions that are called but not defined in any dump.
    pub include_external: bool,
    /// Group defined functions into one subgraph per source file.
    pub cluster_by_file: bool,
    /// Collapse callees with at least this many direct callers into a counter node.
    pub summarize_callers: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Dot,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dot" => Ok(OutputFormat::Dot),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format `{}` (expected dot or json)", other)),
        }
    }
}

/// Split a function-list argument on commas.
///
/// An entry containing `(` is a demangled signature whose argument list may itself contain
/// commas, so it is taken whole.
pub fn split_name_list(entry: &str) -> Vec<String> {
    if entry.contains('(') {
        let name = entry.trim();
        return if name.is_empty() { vec![] } else { vec![name.to_string()] };
    }
    entry
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Flatten repeated list arguments.
pub fn collect_name_lists<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    entries
        .iter()
        .flat_map(|entry| split_name_list(entry.as_ref()))
        .collect()
}
