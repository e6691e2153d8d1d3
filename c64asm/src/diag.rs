//! Assembly diagnostics and their stable textual rendering.

use crate::source::{Loc, SourceSet};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub loc: Loc,
}

impl Diagnostic {
    pub fn error<M: Into<String>>(loc: Loc, message: M) -> Diagnostic {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            loc,
        }
    }

    pub fn warning<M: Into<String>>(loc: Loc, message: M) -> Diagnostic {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            loc,
        }
    }

    /// The rendering golden tests compare against:
    /// `<file>:<line>:<col> - <severity>: <message>`, path separators
    /// normalized to forward slashes.
    pub fn formatted(&self, sources: &SourceSet) -> String {
        format!(
            "{}:{}:{} - {}: {}",
            sources.name(self.loc.file),
            self.loc.line,
            self.loc.col,
            self.severity,
            self.message
        )
    }
}

/// Orders diagnostics by (file, line, column) as the output contract asks.
pub fn sort(diagnostics: &mut Vec<Diagnostic>, sources: &SourceSet) {
    diagnostics.sort_by(|a, b| {
        (sources.name(a.loc.file), a.loc.line, a.loc.col).cmp(&(
            sources.name(b.loc.file),
            b.loc.line,
            b.loc.col,
        ))
    });
}
