//! Company records backed by a CSV file
//!
//! Tables are parsed once and kept in a [`TableCache`] for a short time, so
//! concurrent runs share one read-only copy while edits to the file still
//! show up within the cache lifespan.

use cached::{Cached, TimedCache};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

/// Column holding the numeric company id
pub const ID_COLUMN: &str = "id_empresa";

const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Failures while reading the backing file
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file does not exist
    #[error("Database file not found at {}", .0.display())]
    Missing(PathBuf),

    /// The header has no id column
    #[error("column 'id_empresa' is missing")]
    MissingIdColumn,

    /// The file is not valid CSV
    #[error("{0}")]
    Csv(#[from] csv::Error),

    /// The background read was cancelled or panicked
    #[error("background read failed: {0}")]
    Join(String),
}

/// One company row with its column names
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRecord {
    fields: Vec<(String, Option<String>)>,
}

impl CompanyRecord {
    /// Build a record from column/value pairs; blank values count as missing
    pub fn new<I, K, V>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| {
                    let v = v.as_ref().trim();
                    (k.into(), (!v.is_empty()).then(|| v.to_string()))
                })
                .collect(),
        }
    }

    /// Raw value of a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_deref())
    }

    /// Column parsed as a float
    pub fn number(&self, column: &str) -> Result<f64, String> {
        let raw = self
            .get(column)
            .ok_or_else(|| format!("missing value for '{column}'"))?;
        raw.parse::<f64>()
            .map_err(|_| format!("value '{raw}' for '{column}' is not a number"))
    }

    /// Column parsed as an integer; integral floats such as `12.0` are accepted
    pub fn integer(&self, column: &str) -> Result<i64, String> {
        let value = self.number(column)?;
        if value.fract() != 0.0 || !value.is_finite() {
            return Err(format!("value '{value}' for '{column}' is not an integer"));
        }
        Ok(value as i64)
    }

    /// Company id, if the id column holds an integer
    pub fn id(&self) -> Option<i64> {
        self.integer(ID_COLUMN).ok()
    }

    /// Render the record as a mapping in column order
    ///
    /// Numbers are unquoted, text is quoted and missing values are `null`.
    pub fn render(&self) -> String {
        let body = self
            .fields
            .iter()
            .map(|(name, value)| format!("{}: {}", Value::from(name.as_str()), render_value(value.as_deref())))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{{{body}}}")
    }
}

fn render_value(value: Option<&str>) -> Value {
    let Some(raw) = value else {
        return Value::Null;
    };
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map_or_else(|| Value::from(raw), Value::Number)
}

/// Parsed contents of one CSV file
#[derive(Debug, Default)]
pub struct CompanyTable {
    records: Vec<CompanyRecord>,
}

impl CompanyTable {
    /// Parse CSV data with a header row
    pub fn from_reader<R: std::io::Read>(reader: R) -> Result<Self, StoreError> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        if !headers.iter().any(|h| h == ID_COLUMN) {
            return Err(StoreError::MissingIdColumn);
        }

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            records.push(CompanyRecord::new(headers.iter().zip(row.iter())));
        }
        Ok(Self { records })
    }

    /// Read and parse a CSV file
    pub fn read(path: &Path) -> Result<Self, StoreError> {
        if !path.is_file() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    /// First record with the given id
    pub fn find(&self, company_id: i64) -> Option<&CompanyRecord> {
        self.records.iter().find(|r| r.id() == Some(company_id))
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Shared cache of parsed tables keyed by path
#[derive(Clone)]
pub struct TableCache {
    cache: Arc<Mutex<TimedCache<PathBuf, Arc<CompanyTable>>>>,
}

impl TableCache {
    /// Create a cache whose entries expire after `ttl`
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Arc::new(Mutex::new(TimedCache::with_lifespan(ttl))),
        }
    }

    /// Cached table for `path`, reading the file on a miss
    pub async fn get_or_load(&self, path: &Path) -> Result<Arc<CompanyTable>, StoreError> {
        let key = path.to_path_buf();
        if let Some(table) = self.cache.lock().await.cache_get(&key).cloned() {
            debug!(path = %path.display(), "Company table cache hit");
            return Ok(table);
        }

        debug!(path = %path.display(), "Company table cache miss");
        let table = tokio::task::spawn_blocking({
            let key = key.clone();
            move || CompanyTable::read(&key)
        })
        .await
        .map_err(|e| StoreError::Join(e.to_string()))??;

        let table = Arc::new(table);
        self.cache.lock().await.cache_set(key, Arc::clone(&table));
        Ok(table)
    }

    /// Drop every cached table
    pub async fn clear(&self) {
        self.cache.lock().await.cache_clear();
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Read-only access to the company records at one path
#[derive(Clone)]
pub struct CompanyStore {
    path: PathBuf,
    cache: TableCache,
}

impl CompanyStore {
    /// Create a store with its own cache
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_cache(path, TableCache::default())
    }

    /// Create a store sharing an existing cache
    pub fn with_cache(path: impl Into<PathBuf>, cache: TableCache) -> Self {
        Self {
            path: path.into(),
            cache,
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a company by id
    pub async fn find(&self, company_id: i64) -> Result<Option<CompanyRecord>, StoreError> {
        let table = self.cache.get_or_load(&self.path).await?;
        Ok(table.find(company_id).cloned())
    }
}

impl std::fmt::Debug for CompanyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompanyStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CSV: &str = "id_empresa,sector,ingresos,caja,score_buro\n7,Retail,5000000.0,,710\n8,Energy,120.5,3,650.0\n";

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parse_and_find() {
        let table = CompanyTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);

        let record = table.find(7).unwrap();
        assert_eq!(record.get("sector"), Some("Retail"));
        assert_eq!(record.get("caja"), None);
        assert_eq!(record.number("ingresos").unwrap(), 5_000_000.0);
        assert!(record.number("caja").unwrap_err().contains("missing value"));
        assert_eq!(table.find(8).unwrap().integer("score_buro").unwrap(), 650);
        assert!(table.find(99).is_none());
    }

    #[test]
    fn test_render_keeps_column_order() {
        let table = CompanyTable::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(
            table.find(7).unwrap().render(),
            r#"{"id_empresa": 7, "sector": "Retail", "ingresos": 5000000.0, "caja": null, "score_buro": 710}"#
        );
    }

    #[test]
    fn test_missing_id_column() {
        let err = CompanyTable::from_reader("name,value\na,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, StoreError::MissingIdColumn));
    }

    #[test]
    fn test_missing_file() {
        let err = CompanyTable::read(Path::new("/nonexistent/val.csv")).unwrap_err();
        assert_eq!(err.to_string(), "Database file not found at /nonexistent/val.csv");
    }

    #[tokio::test]
    async fn test_store_uses_cache() {
        let file = csv_file(CSV);
        let cache = TableCache::default();
        let store = CompanyStore::with_cache(file.path(), cache.clone());

        assert!(store.find(8).await.unwrap().is_some());

        // served from cache even after the file disappears
        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
        assert!(store.find(7).await.unwrap().is_some());

        cache.clear().await;
        assert!(matches!(store.find(7).await, Err(StoreError::Missing(_))));
    }
}
