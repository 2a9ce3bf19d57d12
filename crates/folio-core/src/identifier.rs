//! Book identifiers and de-duplicated batches of them.

use crate::{FolioError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// An ISBN as it appears in the dataset.
///
/// The value is opaque: it is trimmed and must be non-empty, nothing more.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

impl Isbn {
    /// Trim `raw` and reject it if nothing is left.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(FolioError::Validation {
                field: "isbn".into(),
                message: "identifier is empty after trimming".into(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Isbn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Isbn {
    type Error = FolioError;

    fn try_from(value: String) -> Result<Self> {
        Isbn::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(isbn: Isbn) -> Self {
        isbn.0
    }
}

/// Ordered list of unique identifiers, ready to hand to the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IsbnBatch {
    isbns: Vec<Isbn>,
}

impl IsbnBatch {
    /// Build a batch, keeping the first occurrence of every identifier.
    pub fn new(isbns: impl IntoIterator<Item = Isbn>) -> Self {
        let mut seen = HashSet::new();
        let isbns = isbns
            .into_iter()
            .filter(|isbn| seen.insert(isbn.clone()))
            .collect();
        Self { isbns }
    }

    /// Parse and de-duplicate raw strings; any blank entry is an error.
    pub fn parse<'a>(raw: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let isbns = raw
            .into_iter()
            .map(Isbn::parse)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(isbns))
    }

    pub fn len(&self) -> usize {
        self.isbns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isbns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Isbn> {
        self.isbns.iter()
    }

    pub fn into_vec(self) -> Vec<Isbn> {
        self.isbns
    }
}

impl FromIterator<Isbn> for IsbnBatch {
    fn from_iter<T: IntoIterator<Item = Isbn>>(iter: T) -> Self {
        Self::new(iter)
    }
}
