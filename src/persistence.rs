//! # Snapshot Persistence
//!
//! The live collections are written as JSON under two fixed keys of a flat
//! key-value store:
//!
//! - `workouts`: array of flattened workout field sets
//! - `routes`: array of vertex arrays, each vertex a `[lat, lng]` pair
//!
//! There is no schema version. A missing `workouts` key means "no data" and
//! yields an empty snapshot.

use std::collections::{HashMap, HashSet};

use log::{debug, warn};

#[cfg(feature = "persistence")]
use rusqlite::{params, Connection, OptionalExtension};

use crate::annotations::{RouteAnnotation, RouteId};
use crate::error::Result;
use crate::workout::{Workout, WorkoutFields};
use crate::GpsPoint;

pub const WORKOUTS_KEY: &str = "workouts";
pub const ROUTES_KEY: &str = "routes";

/// Flat string key-value store holding the snapshot.
pub trait SnapshotStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Store kept in a `HashMap`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry.
    pub fn with_entry(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single SQLite table.
#[cfg(feature = "persistence")]
pub struct SqliteStore {
    db: Connection,
}

#[cfg(feature = "persistence")]
impl SqliteStore {
    /// Open (or create) the database at `db_path`.
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::new(":memory:")
    }

    fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshot (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER DEFAULT (strftime('%s', 'now'))
            );
        "#,
        )
    }
}

#[cfg(feature = "persistence")]
impl SnapshotStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .db
            .query_row(
                "SELECT value FROM snapshot WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.db.execute(
            "INSERT OR REPLACE INTO snapshot (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.db
            .execute("DELETE FROM snapshot WHERE key = ?", params![key])?;
        Ok(())
    }
}

/// Decoded snapshot. Workouts are still flat field sets; the engine rebuilds
/// them into [`Workout`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub workouts: Vec<WorkoutFields>,
    pub routes: Vec<Vec<GpsPoint>>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty() && self.routes.is_empty()
    }
}

/// Encodes and decodes the snapshot keys.
pub struct SnapshotCodec;

impl SnapshotCodec {
    /// Write the workouts and routes under their keys.
    pub fn save<S: SnapshotStore + ?Sized>(
        store: &mut S,
        workouts: &[Workout],
        routes: &[RouteAnnotation],
    ) -> Result<()> {
        let fields: Vec<WorkoutFields> = workouts.iter().map(Workout::to_fields).collect();
        let workouts_json = serde_json::to_string(&fields)?;
        let routes_json = serde_json::to_string(&Self::encode_routes(routes))?;

        store.set(WORKOUTS_KEY, &workouts_json)?;
        store.set(ROUTES_KEY, &routes_json)?;
        debug!(
            "[Snapshot] Saved {} workouts, {} routes",
            fields.len(),
            routes.len()
        );
        Ok(())
    }

    /// Vertex arrays for each route. A route id seen twice is written once.
    pub fn encode_routes(routes: &[RouteAnnotation]) -> Vec<Vec<[f64; 2]>> {
        let mut seen: HashSet<RouteId> = HashSet::new();
        routes
            .iter()
            .filter(|route| seen.insert(route.id))
            .map(|route| route.vertices.iter().map(|v| v.to_pair()).collect())
            .collect()
    }

    /// Read the snapshot. Absent keys are treated as empty collections.
    ///
    /// Workout or route entries that do not decode are skipped; a value that
    /// is not a JSON array at all is an error.
    pub fn load<S: SnapshotStore + ?Sized>(store: &S) -> Result<Snapshot> {
        let Some(workouts_json) = store.get(WORKOUTS_KEY)? else {
            return Ok(Snapshot::default());
        };

        let raw: Vec<serde_json::Value> = serde_json::from_str(&workouts_json)?;
        let mut workouts = Vec::with_capacity(raw.len());
        for value in raw {
            match serde_json::from_value::<WorkoutFields>(value) {
                Ok(fields) => workouts.push(fields),
                Err(e) => warn!("[Snapshot] Skipping unreadable workout: {}", e),
            }
        }

        let mut routes = Vec::new();
        if let Some(routes_json) = store.get(ROUTES_KEY)? {
            let raw: Vec<serde_json::Value> = serde_json::from_str(&routes_json)?;
            for value in raw {
                match serde_json::from_value::<Vec<[f64; 2]>>(value) {
                    Ok(pairs) => routes.push(pairs.into_iter().map(GpsPoint::from_pair).collect()),
                    Err(e) => warn!("[Snapshot] Skipping unreadable route: {}", e),
                }
            }
        }

        debug!(
            "[Snapshot] Loaded {} workouts, {} routes",
            workouts.len(),
            routes.len()
        );
        Ok(Snapshot { workouts, routes })
    }
}


#[cfg(all(test, feature = "persistence"))]
mod sqlite_tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_get_set_remove() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.get("workouts").unwrap(), None);

        store.set("workouts", "[]").unwrap();
        store.set("workouts", "[1]").unwrap();
        assert_eq!(store.get("workouts").unwrap().as_deref(), Some("[1]"));

        store.remove("workouts").unwrap();
        assert_eq!(store.get("workouts").unwrap(), None);
    }

    #[test]
    fn test_sqlite_survives_reopen() {
        let tmp_dir = TempDir::new().unwrap();
        let db_path = tmp_dir.path().join("snapshot.db");
        let db_path = db_path.to_str().unwrap();

        {
            let mut store = SqliteStore::new(db_path).unwrap();
            SnapshotCodec::save(&mut store, &[], &[]).unwrap();
            store.set(ROUTES_KEY, "[[[1.0,2.0],[3.0,4.0]]]").unwrap();
        }

        let store = SqliteStore::new(db_path).unwrap();
        let snapshot = SnapshotCodec::load(&store).unwrap();
        assert!(snapshot.workouts.is_empty());
        assert_eq!(
            snapshot.routes,
            vec![vec![GpsPoint::new(1.0, 2.0), GpsPoint::new(3.0, 4.0)]]
        );
    }
}
