//! Listing file loading and saving

use crate::error::{PricerError, Result};
use crate::preprocessing::MISSING_TOKENS;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Loads raw listing files.
///
/// Every column is read as text: the cleaner's declared coercions are the
/// only place values get typed. Empty cells and the usual "no value" markers
/// (`N/A`, `NA`, `NaN`, ...) load as null.
#[derive(Debug, Clone)]
pub struct DataLoader {
    delimiter: u8,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self { delimiter: b',' }
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| PricerError::DataError(format!("{}: {}", path.display(), e)))?;

        let null_values = MISSING_TOKENS
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| PlSmallStr::from(*t))
            .collect();
        let parse_opts = CsvParseOptions::default()
            .with_separator(self.delimiter)
            .with_null_values(Some(NullValues::AllColumns(null_values)));

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PricerError::DataError(format!("{}: {}", path.display(), e)))
    }
}

/// Writes cleaned datasets
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .finish(df)
            .map_err(|e| PricerError::DataError(e.to_string()))
    }
}

/// Display name for a dataset file: "montreal.csv" -> "Montreal"
pub fn city_display_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.split('.').next()?;
    let mut chars = stem.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
}

/// Lookup key for a city name: lowercase, as used in file names
pub fn city_key(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Map display names to the CSV datasets found in `dir`
pub fn discover_cities(dir: impl AsRef<Path>) -> Result<BTreeMap<String, PathBuf>> {
    let mut cities = BTreeMap::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if !is_csv {
            continue;
        }
        if let Some(name) = city_display_name(&path) {
            cities.insert(name, path);
        }
    }
    Ok(cities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_reads_text() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "price,minimum_nights").unwrap();
        writeln!(file, "\"$1,200.00\",2").unwrap();
        writeln!(file, "$80.00,30").unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("minimum_nights").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("price").unwrap().str().unwrap().get(0), Some("$1,200.00"));
    }

    #[test]
    fn test_missing_markers_load_as_null() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "host_response_time,host_response_rate").unwrap();
        writeln!(file, "N/A,N/A").unwrap();
        writeln!(file, "within an hour,100%").unwrap();
        writeln!(file, "NA,").unwrap();

        let df = DataLoader::new().load_csv(file.path()).unwrap();
        let times = df.column("host_response_time").unwrap().str().unwrap();
        assert_eq!(times.get(0), None);
        assert_eq!(times.get(1), Some("within an hour"));
        assert_eq!(times.get(2), None);
        assert_eq!(df.column("host_response_rate").unwrap().null_count(), 2);
    }

    #[test]
    fn test_save_csv() {
        let mut df = DataFrame::new(vec![
            Column::new("a".into(), &[1, 2, 3]),
            Column::new("b".into(), &[4, 5, 6]),
        ])
        .unwrap();

        let file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        DataSaver::save_csv(&mut df, file.path()).unwrap();

        let loaded = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }

    #[test]
    fn test_discover_cities() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("montreal.csv"), "a\n1\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let cities = discover_cities(dir.path()).unwrap();
        assert_eq!(cities.len(), 1);
        assert!(cities.contains_key("Montreal"));
        assert_eq!(city_key("Montreal"), "montreal");
    }
}
