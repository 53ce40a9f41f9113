/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::error
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Syn-Cat error types so catalog failures are
    classified once and surfaced with consistent diagnostics.

  Security / Safety Notes:
    Error contexts carry catalog URLs and update identifiers
    only; no request bodies or postback tokens are echoed.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across parsers and the session controller to separate
    retryable catalog hiccups from terminal failures, and by
    the binary entry point for exit semantics.

  Revision History:
    2025-11-12 COD  Established catalog error taxonomy.
    2025-12-02 COD  Split markup causes out of PageStructure.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::num::ParseIntError;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Syn-Cat operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Enumerates high-level error domains surfaced by Syn-Cat.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The query legitimately matched nothing, or paging ran past the final page.
    #[error("No results: {0}")]
    NoResults(String),
    /// The catalog answered but the page is unusable right now (empty results
    /// table, "try again later" error page). Retried by the session controller.
    #[error("Catalog failed to load {url}: {reason}")]
    TransientPage { url: String, reason: String },
    #[error("Request to {url} timed out")]
    Timeout { url: String },
    /// Caller cancelled the operation. Never retried.
    #[error("Request to {url} was canceled")]
    Canceled { url: String },
    #[error("Update `{update_id}` does not exist or was removed from the catalog")]
    UpdateNotFound { update_id: String },
    #[error("Catalog: {0}")]
    Catalog(String),
    #[error("Page structure changed while parsing {context}")]
    PageStructure {
        context: String,
        #[source]
        source: MarkupError,
    },
    #[error("Classification `{0}` is not supported")]
    UnsupportedClassification(String),
    #[error("Network: {0}")]
    Network(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Describes which piece of catalog markup could not be read.
#[derive(Debug, Error)]
pub enum MarkupError {
    #[error("element `{id}` is missing")]
    MissingElement { id: String },
    #[error("element `{id}` has no `{attribute}` attribute")]
    MissingAttribute { id: String, attribute: &'static str },
    #[error("element `{id}` has {found} child nodes, expected at least {expected}")]
    MissingChild {
        id: String,
        expected: usize,
        found: usize,
    },
    #[error("results row {row} has {found} cells, expected {expected}")]
    RowShape {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("{field} `{value}` is not a valid number")]
    InvalidNumber {
        field: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },
    #[error("{field} `{value}` is not a valid date")]
    InvalidDate {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("{0}")]
    Unexpected(String),
}

impl CatalogError {
    /// Wrap a markup failure with the page it was found on.
    pub fn page_structure(context: impl Into<String>, source: MarkupError) -> Self {
        CatalogError::PageStructure {
            context: context.into(),
            source,
        }
    }

    /// Terminal error raised once a page never recovered within the reload budget.
    pub fn attempts_exhausted(operation: &str, attempts: u8) -> Self {
        CatalogError::Catalog(format!(
            "{operation} was not successfully loaded after {attempts} attempts to refresh it"
        ))
    }

    /// Whether the session controller may re-issue the same request.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CatalogError::TransientPage { .. } | CatalogError::Timeout { .. }
        )
    }

    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CatalogError::NoResults(_) => ExitCode::from(2),
            CatalogError::TransientPage { .. } => ExitCode::from(30),
            CatalogError::Timeout { .. } => ExitCode::from(31),
            CatalogError::Canceled { .. } => ExitCode::from(32),
            CatalogError::Network(_) => ExitCode::from(33),
            CatalogError::UpdateNotFound { .. } => ExitCode::from(34),
            CatalogError::Catalog(_) => ExitCode::from(35),
            CatalogError::PageStructure { .. } => ExitCode::from(36),
            CatalogError::UnsupportedClassification(_) => ExitCode::from(37),
            CatalogError::Config(_) => ExitCode::from(20),
            CatalogError::Serialization(_) => ExitCode::from(21),
            CatalogError::Filesystem(_) => ExitCode::from(40),
            CatalogError::Io(_) => ExitCode::from(41),
            CatalogError::Runtime(_) => ExitCode::from(50),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn only_timeouts_and_transient_pages_are_retryable() {
        let transient = CatalogError::TransientPage {
            url: "https://catalog.invalid/Search.aspx".into(),
            reason: "empty results table".into(),
        };
        let timeout = CatalogError::Timeout {
            url: "https://catalog.invalid/Search.aspx".into(),
        };
        let canceled = CatalogError::Canceled {
            url: "https://catalog.invalid/Search.aspx".into(),
        };

        assert!(transient.is_transient());
        assert!(timeout.is_transient());
        assert!(!canceled.is_transient());
        assert!(!CatalogError::attempts_exhausted("Search results page", 3).is_transient());
        assert!(!CatalogError::UnsupportedClassification("Tools".into()).is_transient());
    }

    #[test]
    fn page_structure_keeps_markup_cause() {
        let err = CatalogError::page_structure(
            "update details page",
            MarkupError::MissingElement {
                id: "archDiv".into(),
            },
        );
        let cause = err.source().map(|source| source.to_string());
        assert_eq!(cause.as_deref(), Some("element `archDiv` is missing"));
    }

    #[test]
    fn exhausted_budget_names_attempt_count() {
        let err = CatalogError::attempts_exhausted("Search results page", 4);
        assert!(err.to_string().contains("after 4 attempts"));
    }
}
