//! SQLite contact store implementation.

use crate::{Error, HcpFilter, HcpRecord, Result};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// SQLite-backed store of HCP contact records.
///
/// All access goes through an internal mutex so concurrent agent runs can
/// share one store without racing on read-modify-write updates.
pub struct ContactStore {
    conn: Mutex<Connection>,
}

impl ContactStore {
    /// Open or create a contact store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory contact store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS hcps (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                specialty TEXT NOT NULL,
                city TEXT NOT NULL,
                preferred_channel TEXT NOT NULL,
                contacted INTEGER NOT NULL DEFAULT 0,
                seq INTEGER
            );
            CREATE INDEX IF NOT EXISTS idx_hcps_specialty_city
                ON hcps(specialty, city);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        // A poisoned lock means a panic mid-query; the connection itself
        // is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a record unless its id is already present.
    ///
    /// Returns `true` if the record was inserted. Duplicate ids keep the
    /// first record seen, matching the original kartei dedup behavior.
    pub fn insert_new(&self, record: &HcpRecord) -> Result<bool> {
        let conn = self.lock();
        let changed = conn.execute(
            "INSERT INTO hcps (id, name, specialty, city, preferred_channel, contacted, seq)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     (SELECT COALESCE(MAX(seq), 0) + 1 FROM hcps))
             ON CONFLICT(id) DO NOTHING",
            params![
                record.id,
                record.name,
                record.specialty,
                record.city,
                record.preferred_channel,
                record.contacted,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Query records matching the filter, in insertion order.
    pub fn find(&self, filter: &HcpFilter) -> Result<Vec<HcpRecord>> {
        let conn = self.lock();
        let mut sql = String::from(
            "SELECT id, name, specialty, city, preferred_channel, contacted
             FROM hcps WHERE 1=1",
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(specialty) = &filter.specialty {
            sql.push_str(" AND specialty = ?");
            args.push(Box::new(specialty.clone()));
        }
        if let Some(city) = &filter.city {
            sql.push_str(" AND city = ?");
            args.push(Box::new(city.clone()));
        }
        if let Some(contacted) = filter.contacted {
            sql.push_str(" AND contacted = ?");
            args.push(Box::new(contacted));
        }
        sql.push_str(" ORDER BY seq");

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), row_to_record)?;
        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Get a single record by id.
    pub fn get(&self, id: i64) -> Result<Option<HcpRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, name, specialty, city, preferred_channel, contacted
             FROM hcps WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map([id], row_to_record)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Mark a record as contacted.
    ///
    /// Returns `false` if the id is unknown. Idempotent: marking an already
    /// contacted record succeeds and leaves the flag set.
    pub fn mark_contacted(&self, id: i64) -> Result<bool> {
        let conn = self.lock();
        let changed = conn.execute("UPDATE hcps SET contacted = 1 WHERE id = ?1", [id])?;
        if changed > 0 {
            debug!(hcp_id = id, "marked contacted");
            return Ok(true);
        }
        // UPDATE reports zero changes both for missing rows and for rows
        // already in the target state; distinguish them.
        let mut stmt = conn.prepare("SELECT 1 FROM hcps WHERE id = ?1")?;
        Ok(stmt.exists([id])?)
    }

    /// List records that have not been contacted yet, in insertion order.
    pub fn list_uncontacted(&self) -> Result<Vec<HcpRecord>> {
        self.find(&HcpFilter::default().contacted(false))
    }

    /// Total number of records.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM hcps", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// Import records from a CSV file with the columns
    /// `hcp_id,name,specialty,city,preferred_channel,contacted`.
    ///
    /// Returns the number of newly inserted records. Duplicate ids are
    /// skipped. Field values must not contain embedded commas; the seed
    /// files this reads are plain machine-generated exports.
    pub fn import_csv(&self, path: impl AsRef<Path>) -> Result<usize> {
        let content = std::fs::read_to_string(path)?;
        let mut lines = content.lines().enumerate();

        // Header row is required and names the column order.
        let Some((_, header)) = lines.next() else {
            return Ok(0);
        };
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let col = |name: &str| columns.iter().position(|c| *c == name);
        let (Some(id_col), Some(name_col), Some(spec_col), Some(city_col)) = (
            col("hcp_id").or_else(|| col("id")),
            col("name"),
            col("specialty"),
            col("city"),
        ) else {
            return Err(Error::MalformedRecord {
                line: 1,
                reason: "missing required columns (hcp_id, name, specialty, city)".into(),
            });
        };
        let channel_col = col("preferred_channel");
        let contacted_col = col("contacted");

        let mut inserted = 0;
        for (idx, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |i: usize| fields.get(i).copied().unwrap_or_default();

            let id = field(id_col)
                .parse::<i64>()
                .map_err(|_| Error::MalformedRecord {
                    line: idx + 1,
                    reason: format!("invalid id {:?}", field(id_col)),
                })?;
            let contacted = contacted_col
                .map(|i| matches!(field(i).to_ascii_lowercase().as_str(), "true" | "1"))
                .unwrap_or(false);

            let record = HcpRecord {
                id,
                name: field(name_col).to_string(),
                specialty: field(spec_col).to_string(),
                city: field(city_col).to_string(),
                preferred_channel: channel_col.map(|i| field(i).to_string()).unwrap_or_default(),
                contacted,
            };
            if self.insert_new(&record)? {
                inserted += 1;
            }
        }

        debug!(inserted, "csv import complete");
        Ok(inserted)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<HcpRecord> {
    Ok(HcpRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        specialty: row.get(2)?,
        city: row.get(3)?,
        preferred_channel: row.get(4)?,
        contacted: row.get(5)?,
    })
}
