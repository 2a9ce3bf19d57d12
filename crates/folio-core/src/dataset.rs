//! CSV book dataset: identifier extraction and the enriched export.

use crate::config::ScrapeConfig;
use crate::identifier::{Isbn, IsbnBatch};
use crate::outcome::{BookDetails, FetchOutcome};
use crate::{FolioError, Result};
use csv::StringRecord;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// A tabular dataset with one identifier column.
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: StringRecord,
    rows: Vec<StringRecord>,
    id_index: usize,
}

impl Dataset {
    /// Load `path` and locate `id_column` in its header row.
    pub fn load(path: impl AsRef<Path>, id_column: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(FolioError::DatasetNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| csv_error(path, "Failed to open CSV", e))?;

        let headers = reader
            .headers()
            .map_err(|e| csv_error(path, "Failed to read headers", e))?
            .clone();

        let id_index = headers
            .iter()
            .position(|h| h.trim() == id_column)
            .ok_or_else(|| FolioError::MissingColumn {
                column: id_column.to_string(),
                available: headers.iter().map(str::to_string).collect(),
            })?;

        let rows = reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_error(path, "Failed to read record", e))?;

        info!("Loaded {} rows from {}", rows.len(), path.display());
        Ok(Self {
            headers,
            rows,
            id_index,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unique, non-blank identifiers in first-seen order.
    pub fn identifiers(&self) -> IsbnBatch {
        let batch: IsbnBatch = self.rows.iter().filter_map(|row| self.isbn_of(row)).collect();
        debug!(
            "{} unique ISBNs among {} rows",
            batch.len(),
            self.rows.len()
        );
        batch
    }

    /// Write the dataset with description and themes columns joined in.
    ///
    /// Left join on the identifier: rows with no outcome (or no identifier)
    /// get the "not available" placeholders. Existing description/themes
    /// columns are overwritten. Rows longer than the header keep their extra
    /// fields under blank headers, and the new columns go after the widest row.
    pub fn write_enriched(
        &self,
        path: impl AsRef<Path>,
        outcomes: &HashMap<Isbn, FetchOutcome>,
    ) -> Result<()> {
        let path = path.as_ref();
        let width = self
            .rows
            .iter()
            .map(StringRecord::len)
            .fold(self.headers.len(), usize::max);
        let mut headers = self.headers.iter().map(str::to_string).collect::<Vec<_>>();
        headers.resize(width, String::new());
        let description_index = column_index(&mut headers, ScrapeConfig::DESCRIPTION_COLUMN);
        let themes_index = column_index(&mut headers, ScrapeConfig::THEMES_COLUMN);

        let mut writer =
            csv::Writer::from_path(path).map_err(|e| csv_error(path, "Failed to create CSV", e))?;
        writer
            .write_record(&headers)
            .map_err(|e| csv_error(path, "Failed to write headers", e))?;

        for row in &self.rows {
            let details = self
                .isbn_of(row)
                .and_then(|isbn| outcomes.get(&isbn))
                .map(FetchOutcome::details)
                .unwrap_or_else(BookDetails::unavailable);

            let mut fields = row.iter().map(str::to_string).collect::<Vec<_>>();
            fields.resize(headers.len(), String::new());
            fields[description_index] = details.description;
            fields[themes_index] = details.themes;

            writer
                .write_record(&fields)
                .map_err(|e| csv_error(path, "Failed to write record", e))?;
        }

        writer
            .flush()
            .map_err(|e| FolioError::io_with_path(e, path))?;
        info!("Wrote {} rows to {}", self.rows.len(), path.display());
        Ok(())
    }

    fn isbn_of(&self, row: &StringRecord) -> Option<Isbn> {
        row.get(self.id_index).and_then(|raw| Isbn::parse(raw).ok())
    }
}

/// Index of `name` in `headers`, appending it if absent.
fn column_index(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(index) => index,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

fn csv_error(path: &Path, context: &str, err: csv::Error) -> FolioError {
    FolioError::Csv {
        message: format!("{}: {}", context, err),
        path: path.to_path_buf(),
        source: Some(err),
    }
}
