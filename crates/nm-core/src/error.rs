use core::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::node::NodeId;

/// Where a parse failure happened: a file and, when known, a 1-based line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub path: PathBuf,
    pub line: Option<usize>,
}

impl Location {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            line: None,
        }
    }

    pub fn line(path: impl AsRef<Path>, line: usize) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            line: Some(line),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.path.display()),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("parse error at {at}: {message}")]
    Parse { at: Location, message: String },

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("node {node} references missing parent {parent}")]
    DanglingReference { node: NodeId, parent: NodeId },

    #[error("parent chain of node {node} contains a cycle")]
    Cycle { node: NodeId },

    #[error("duplicate node id {0}")]
    DuplicateId(NodeId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub fn parse(at: Location, message: impl Into<String>) -> Self {
        Self::Parse {
            at,
            message: message.into(),
        }
    }

    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Location};

    #[test]
    fn location_display_includes_line_when_known() {
        assert_eq!(Location::line("a.swc", 7).to_string(), "a.swc:7");
        assert_eq!(Location::file("a.ugx").to_string(), "a.ugx");
    }

    #[test]
    fn parse_error_names_file_and_line() {
        let err = Error::parse(Location::line("cell.swc", 3), "expected 7 fields, got 6");
        assert_eq!(
            err.to_string(),
            "parse error at cell.swc:3: expected 7 fields, got 6"
        );
    }
}
