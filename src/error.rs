use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read dump file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A call or symbol reference appeared before any `;; Function` marker.
    #[error("{file}:{line}: reference outside of any function: {text}")]
    OrphanReference {
        file: String,
        line: usize,
        text: String,
    },

    #[error("summary node {name} has {edges} outgoing edges, expected exactly one")]
    MalformedSummary { name: String, edges: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
