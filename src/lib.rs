//! Build call graphs from GCC RTL dumps (`-fdump-rtl-expand`) and render them as
//! Graphviz DOT.
//!
//! ```no_run
//! use rtl_callgraph::{render, selection, CallGraph, OutputFormat, SelectionOptions};
//!
//! let mut graph = CallGraph::from_dumps(&["main.c.192r.expand"])?;
//! let options = SelectionOptions::default();
//! let selected = selection::apply(&mut graph, &options);
//! print!("{}", render(&graph, &selected, &options, OutputFormat::Dot)?);
//! # Ok::<(), rtl_callgraph::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod formatters;
pub mod graph_builder;
pub mod logging;
pub mod names;
pub mod processors;
pub mod selection;
pub mod types;

pub use config::{OutputFormat, SelectionOptions};
pub use error::{Error, Result};
pub use formatters::render;
pub use graph_builder::CallGraph;
pub use types::{FunctionNode, NodeKind, RefKind};
