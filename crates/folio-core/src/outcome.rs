//! Fetch outcomes and the text shown for each of them.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const NO_DESCRIPTION: &str = "No description available";
pub const DESCRIPTION_NOT_FOUND: &str = "No description found";
pub const NO_THEMES: &str = "No themes available";
pub const FETCH_FAILED: &str = "Error: Failed after multiple retries";

/// Description and themes scraped for one book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDetails {
    pub description: String,
    pub themes: String,
}

impl BookDetails {
    pub fn new(description: impl Into<String>, themes: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            themes: themes.into(),
        }
    }

    /// Placeholder for rows that never received an outcome.
    pub fn unavailable() -> Self {
        Self::new(NO_DESCRIPTION, NO_THEMES)
    }
}

/// Result of fetching one identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Success {
        description: String,
        themes: String,
    },
    /// The remote confirmed the book does not exist.
    NotFound,
    /// Retries exhausted.
    Failed,
}

/// Discriminant of [`FetchOutcome`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    NotFound,
    Failed,
}

impl FetchOutcome {
    pub fn success(details: BookDetails) -> Self {
        FetchOutcome::Success {
            description: details.description,
            themes: details.themes,
        }
    }

    /// The pair exported for this outcome, with sentinels for the terminal states.
    pub fn details(&self) -> BookDetails {
        match self {
            FetchOutcome::Success {
                description,
                themes,
            } => BookDetails::new(description.clone(), themes.clone()),
            FetchOutcome::NotFound => BookDetails::unavailable(),
            FetchOutcome::Failed => BookDetails::new(FETCH_FAILED, NO_THEMES),
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        match self {
            FetchOutcome::Success { .. } => OutcomeKind::Success,
            FetchOutcome::NotFound => OutcomeKind::NotFound,
            FetchOutcome::Failed => OutcomeKind::Failed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind() == OutcomeKind::Success
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OutcomeKind::Success => "success",
            OutcomeKind::NotFound => "not found",
            OutcomeKind::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Running tally of outcomes for the final summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub succeeded: usize,
    pub not_found: usize,
    pub failed: usize,
}

impl OutcomeSummary {
    pub fn record(&mut self, outcome: &FetchOutcome) {
        match outcome.kind() {
            OutcomeKind::Success => self.succeeded += 1,
            OutcomeKind::NotFound => self.not_found += 1,
            OutcomeKind::Failed => self.failed += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.not_found + self.failed
    }
}

impl fmt::Display for OutcomeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} not found, {} failed",
            self.succeeded, self.not_found, self.failed
        )
    }
}
