//! SQLite-backed metadata store.
//!
//! Schema (all tables created on open):
//!
//! - `file_index(path PRIMARY KEY, name, extension, size, modified,
//!   is_dir, last_checked)` with secondary indexes on `extension` and
//!   `modified`
//! - `preferences(key PRIMARY KEY, value)` holding opaque JSON values
//! - `selected_extensions(extension PRIMARY KEY, selected)`

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rusqlite::{params, Connection};

use super::{CachedMetadata, IndexStats};
use crate::index::{mtime_secs, FileRecord};

/// Exclusive connection to the metadata database.
///
/// One instance per task; never shared across threads.
pub struct MetadataStore {
    conn: Connection,
}

impl MetadataStore {
    /// Open (or create) the store at the given path and ensure the schema
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns the underlying SQLite error if the database cannot be
    /// opened or the schema cannot be created.
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store. Used by tests.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self { conn })
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS file_index (
                path TEXT PRIMARY KEY,
                name TEXT,
                extension TEXT,
                size INTEGER,
                modified REAL,
                is_dir INTEGER,
                last_checked REAL
            );
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT
            );
            CREATE TABLE IF NOT EXISTS selected_extensions (
                extension TEXT PRIMARY KEY,
                selected INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_extension ON file_index(extension);
            CREATE INDEX IF NOT EXISTS idx_modified ON file_index(modified);",
        )
    }

    /// Load the full cached index.
    pub fn load_all(&self) -> Result<Vec<FileRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT path, name, extension, size, modified, is_dir FROM file_index",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FileRecord {
                path: PathBuf::from(row.get::<_, String>(0)?),
                name: row.get(1)?,
                extension: row.get(2)?,
                size: row.get::<_, i64>(3)?.max(0) as u64,
                modified: row.get(4)?,
                is_dir: row.get::<_, i64>(5)? != 0,
            })
        })?;
        rows.collect()
    }

    /// Insert-or-replace a batch of records in one transaction.
    ///
    /// `last_checked` is stamped with the current time for every record.
    pub fn save_batch(&mut self, records: &[FileRecord]) -> Result<(), rusqlite::Error> {
        if records.is_empty() {
            return Ok(());
        }
        let now = mtime_secs(SystemTime::now());
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO file_index
                 (path, name, extension, size, modified, is_dir, last_checked)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for rec in records {
                stmt.execute(params![
                    rec.path.to_string_lossy(),
                    rec.name,
                    rec.extension,
                    rec.size as i64,
                    rec.modified,
                    i64::from(rec.is_dir),
                    now,
                ])?;
            }
        }
        tx.commit()
    }

    /// All indexed path keys.
    pub fn all_paths(&self) -> Result<HashSet<PathBuf>, rusqlite::Error> {
        let mut stmt = self.conn.prepare("SELECT path FROM file_index")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.map(|r| r.map(PathBuf::from)).collect()
    }

    /// Cached stat data for one path, if indexed.
    pub fn metadata_for(&self, path: &Path) -> Result<Option<CachedMetadata>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT size, modified FROM file_index WHERE path = ?1")?;
        let mut rows = stmt.query(params![path.to_string_lossy()])?;
        match rows.next()? {
            Some(row) => Ok(Some(CachedMetadata {
                size: row.get::<_, i64>(0)?.max(0) as u64,
                modified: row.get(1)?,
            })),
            None => Ok(None),
        }
    }

    /// Remove every indexed path not present in `existing`.
    ///
    /// Called after a completed incremental walk; paths not observed by
    /// the walk are treated as deleted.
    pub fn prune_except(&mut self, existing: &HashSet<PathBuf>) -> Result<usize, rusqlite::Error> {
        let indexed = self.all_paths()?;
        let stale: Vec<&PathBuf> = indexed.iter().filter(|p| !existing.contains(*p)).collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM file_index WHERE path = ?1")?;
            for path in &stale {
                stmt.execute(params![path.to_string_lossy()])?;
            }
        }
        tx.commit()?;
        Ok(stale.len())
    }

    /// Store an opaque preference value, serialized as JSON.
    pub fn set_preference(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences (key, value) VALUES (?1, ?2)",
            params![key, value.to_string()],
        )?;
        Ok(())
    }

    /// Read back a preference value. Unparseable stored values read as
    /// absent.
    pub fn get_preference(&self, key: &str) -> Result<Option<serde_json::Value>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT value FROM preferences WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        match rows.next()? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(serde_json::from_str(&raw).ok())
            }
            None => Ok(None),
        }
    }

    /// Replace the selected-extension set.
    pub fn save_selected_extensions(
        &mut self,
        extensions: &HashSet<String>,
    ) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM selected_extensions", [])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO selected_extensions (extension, selected) VALUES (?1, 1)",
            )?;
            for ext in extensions {
                stmt.execute(params![ext])?;
            }
        }
        tx.commit()
    }

    /// Load the selected-extension set.
    pub fn load_selected_extensions(&self) -> Result<HashSet<String>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT extension FROM selected_extensions WHERE selected = 1")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect()
    }

    /// Aggregate statistics over the persisted index.
    pub fn stats(&self) -> Result<IndexStats, rusqlite::Error> {
        let total_files: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM file_index", [], |r| r.get(0))?;
        let total_extensions: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT extension) FROM file_index",
            [],
            |r| r.get(0),
        )?;
        let total_size: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(size), 0) FROM file_index",
            [],
            |r| r.get(0),
        )?;
        Ok(IndexStats {
            total_files: total_files.max(0) as u64,
            total_extensions: total_extensions.max(0) as u64,
            total_size: total_size.max(0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, size: u64, modified: f64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, modified, false)
    }

    #[test]
    fn save_and_load_roundtrip() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        let records = vec![
            record("/a/one.txt", 10, 100.0),
            record("/a/two.JPG", 20, 200.5),
        ];
        store.save_batch(&records).unwrap();

        let mut loaded = store.load_all().unwrap();
        loaded.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].name, "one.txt");
        assert_eq!(loaded[1].extension, ".jpg");
        assert_eq!(loaded[1].modified, 200.5);
    }

    #[test]
    fn save_batch_replaces_by_path_key() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        store.save_batch(&[record("/a/one.txt", 10, 100.0)]).unwrap();
        store.save_batch(&[record("/a/one.txt", 99, 300.0)]).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].size, 99);
        assert_eq!(loaded[0].modified, 300.0);
    }

    #[test]
    fn metadata_for_known_and_unknown_paths() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        store.save_batch(&[record("/a/one.txt", 10, 100.0)]).unwrap();

        let meta = store.metadata_for(Path::new("/a/one.txt")).unwrap().unwrap();
        assert_eq!(
            meta,
            CachedMetadata {
                size: 10,
                modified: 100.0
            }
        );
        assert!(store.metadata_for(Path::new("/missing")).unwrap().is_none());
    }

    #[test]
    fn prune_except_removes_only_stale_paths() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        store
            .save_batch(&[
                record("/keep.txt", 1, 1.0),
                record("/gone.txt", 2, 2.0),
            ])
            .unwrap();

        let existing: HashSet<PathBuf> = [PathBuf::from("/keep.txt")].into_iter().collect();
        let pruned = store.prune_except(&existing).unwrap();
        assert_eq!(pruned, 1);

        let paths = store.all_paths().unwrap();
        assert!(paths.contains(Path::new("/keep.txt")));
        assert!(!paths.contains(Path::new("/gone.txt")));
    }

    #[test]
    fn prune_with_nothing_stale_is_a_noop() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        store.save_batch(&[record("/keep.txt", 1, 1.0)]).unwrap();
        let existing = store.all_paths().unwrap();
        assert_eq!(store.prune_except(&existing).unwrap(), 0);
    }

    #[test]
    fn preferences_store_opaque_json() {
        let store = MetadataStore::open_in_memory().unwrap();
        store
            .set_preference("language", &serde_json::json!("en"))
            .unwrap();
        store
            .set_preference("batch", &serde_json::json!({"size": 500}))
            .unwrap();

        assert_eq!(
            store.get_preference("language").unwrap(),
            Some(serde_json::json!("en"))
        );
        assert_eq!(
            store.get_preference("batch").unwrap(),
            Some(serde_json::json!({"size": 500}))
        );
        assert!(store.get_preference("missing").unwrap().is_none());
    }

    #[test]
    fn selected_extensions_replace_all() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        let first: HashSet<String> = [".txt".to_string(), ".jpg".to_string()]
            .into_iter()
            .collect();
        store.save_selected_extensions(&first).unwrap();
        assert_eq!(store.load_selected_extensions().unwrap(), first);

        let second: HashSet<String> = [".png".to_string()].into_iter().collect();
        store.save_selected_extensions(&second).unwrap();
        assert_eq!(store.load_selected_extensions().unwrap(), second);
    }

    #[test]
    fn stats_aggregate_the_index() {
        let mut store = MetadataStore::open_in_memory().unwrap();
        store
            .save_batch(&[
                record("/a.txt", 10, 1.0),
                record("/b.txt", 20, 2.0),
                record("/c.jpg", 30, 3.0),
            ])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_extensions, 2);
        assert_eq!(stats.total_size, 60);
    }

    #[test]
    fn stats_on_empty_store() {
        let store = MetadataStore::open_in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), IndexStats::default());
    }
}
