use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::utils::error::{AppError, Result};

/// Required columns for any catalog handed to the pipeline.
pub const REQUIRED_COLUMNS: [&str; 4] = ["product_id", "store_id", "original_url", "price"];

/// An in-memory catalog CSV. The whole file is read and rewritten wholesale;
/// unknown columns ride along untouched so downstream consumers keep
/// whatever metadata the matching process put there.
#[derive(Debug, Clone)]
pub struct Catalog {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Catalog {
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().map(|f| f.to_string()).collect();
            // Ragged rows are padded so column lookups stay positional.
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self { headers, rows })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Fail fast when a file is missing one of the given columns.
    pub fn require_columns(&self, columns: &[&str], file: &str) -> Result<()> {
        for column in columns {
            if !self.has_column(column) {
                return Err(AppError::MissingColumn {
                    column: column.to_string(),
                    file: file.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn set(&mut self, row: usize, column: &str, value: impl Into<String>) -> Result<()> {
        let idx = self.column(column).ok_or_else(|| AppError::MissingColumn {
            column: column.to_string(),
            file: "<in-memory catalog>".to_string(),
        })?;
        let row = self
            .rows
            .get_mut(row)
            .ok_or_else(|| AppError::Catalog(format!("row index {row} out of bounds")))?;
        row[idx] = value.into();
        Ok(())
    }

    /// Numeric view of a cell; empty or unparseable cells are `None`.
    pub fn get_f64(&self, row: usize, column: &str) -> Option<f64> {
        self.get(row, column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .and_then(|v| v.parse::<f64>().ok())
    }

    /// Indices of every row whose `product_id` equals the given id.
    pub fn find_product(&self, product_id: &str) -> Vec<usize> {
        match self.column("product_id") {
            Some(idx) => self
                .rows
                .iter()
                .enumerate()
                .filter(|(_, row)| row[idx] == product_id)
                .map(|(i, _)| i)
                .collect(),
            None => Vec::new(),
        }
    }

    /// New catalog with the same headers and only the rows passing the
    /// predicate on the given column.
    pub fn filter_by<F>(&self, column: &str, mut predicate: F) -> Self
    where
        F: FnMut(&str) -> bool,
    {
        let rows = match self.column(column) {
            Some(idx) => self
                .rows
                .iter()
                .filter(|row| predicate(&row[idx]))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Self {
            headers: self.headers.clone(),
            rows,
        }
    }

    /// Rows whose `product_id` is in the given set, in catalog order.
    pub fn retain_products(&self, ids: &HashSet<String>) -> Self {
        self.filter_by("product_id", |id| ids.contains(id))
    }

    /// Append another catalog's rows, remapped by header name. Columns the
    /// other catalog lacks come through empty.
    pub fn append(&mut self, other: &Catalog) {
        let mapping: Vec<Option<usize>> = self
            .headers
            .iter()
            .map(|h| other.column(h))
            .collect();
        for row in &other.rows {
            let mapped = mapping
                .iter()
                .map(|idx| idx.map(|i| row[i].clone()).unwrap_or_default())
                .collect();
            self.rows.push(mapped);
        }
    }

    /// Iterate row indices; cells are reached through `get`/`set`.
    pub fn row_indices(&self) -> std::ops::Range<usize> {
        0..self.rows.len()
    }
}

/// Copy `path` to a timestamped sibling before an in-place overwrite.
/// The backup is the only recovery artifact; there is no atomic rename.
pub fn backup_file(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup = PathBuf::from(format!("{}.backup_{stamp}", path.display()));
    fs::copy(path, &backup)?;
    info!("created backup of original file: {}", backup.display());
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "product_id,store_id,original_url,price,price_history,color").unwrap();
        writeln!(file, "P1,Metro,https://example.com/p1,100,[],red").unwrap();
        writeln!(file, "P2,Imtiaz,https://example.com/p2,55.5,,blue").unwrap();
        writeln!(file, "P3,Metro,https://example.com/p3,7,,").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_preserves_unknown_columns() {
        let file = sample_file();
        let catalog = Catalog::read(file.path()).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get(0, "color"), Some("red"));
        assert_eq!(catalog.get_f64(1, "price"), Some(55.5));
    }

    #[test]
    fn test_require_columns() {
        let file = sample_file();
        let catalog = Catalog::read(file.path()).unwrap();
        assert!(catalog.require_columns(&REQUIRED_COLUMNS, "sample.csv").is_ok());
        let err = catalog
            .require_columns(&["missing_column"], "sample.csv")
            .unwrap_err();
        assert!(matches!(err, AppError::MissingColumn { .. }));
    }

    #[test]
    fn test_filter_by_store() {
        let file = sample_file();
        let catalog = Catalog::read(file.path()).unwrap();
        let metro = catalog.filter_by("store_id", |s| s == "Metro");
        assert_eq!(metro.len(), 2);
        assert_eq!(metro.get(1, "product_id"), Some("P3"));
    }

    #[test]
    fn test_find_product_duplicates() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "product_id,price").unwrap();
        writeln!(file, "DUP,10").unwrap();
        writeln!(file, "DUP,20").unwrap();
        file.flush().unwrap();

        let catalog = Catalog::read(file.path()).unwrap();
        assert_eq!(catalog.find_product("DUP"), vec![0, 1]);
        assert!(catalog.find_product("MISSING").is_empty());
    }

    #[test]
    fn test_write_read_round_trip_is_stable() {
        let file = sample_file();
        let catalog = Catalog::read(file.path()).unwrap();

        let out1 = NamedTempFile::new().unwrap();
        catalog.write(out1.path()).unwrap();
        let reread = Catalog::read(out1.path()).unwrap();
        let out2 = NamedTempFile::new().unwrap();
        reread.write(out2.path()).unwrap();

        let bytes1 = fs::read(out1.path()).unwrap();
        let bytes2 = fs::read(out2.path()).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn test_append_remaps_columns() {
        let file = sample_file();
        let mut catalog = Catalog::read(file.path()).unwrap();

        let mut other_file = NamedTempFile::new().unwrap();
        writeln!(other_file, "price,product_id,store_id,original_url").unwrap();
        writeln!(other_file, "9,P9,Rainbow,https://example.com/p9").unwrap();
        other_file.flush().unwrap();
        let other = Catalog::read(other_file.path()).unwrap();

        catalog.append(&other);
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get(3, "product_id"), Some("P9"));
        assert_eq!(catalog.get(3, "price"), Some("9"));
        assert_eq!(catalog.get(3, "color"), Some(""));
    }

    #[test]
    fn test_backup_file_copies_content() {
        let file = sample_file();
        let backup = backup_file(file.path()).unwrap();
        assert_eq!(fs::read(file.path()).unwrap(), fs::read(&backup).unwrap());
        fs::remove_file(backup).unwrap();
    }
}
