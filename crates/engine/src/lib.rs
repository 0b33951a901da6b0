use anyhow::Context;
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use serde::{Deserialize, Serialize};
use shardhaven_protocol::{HavenId, HavenSummary};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

mod catalog;
mod error;
mod layout;

pub use catalog::ObstacleClass;
pub use error::{EngineError, EngineResult};
pub use layout::Layout;

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[derive(Debug, Clone)]
pub struct Engine {
    db_path: PathBuf,
}

impl Engine {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> anyhow::Result<Connection> {
        let path = self.db_path.clone();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("create db dir: {}", dir.display()))?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("open sqlite db: {}", path.display()))?;

        // Durable + fast defaults.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrate(&conn)?;
        Ok(conn)
    }

    pub fn create_haven(&self, name: &str, haven_type: &str) -> EngineResult<HavenId> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO havens (name, haven_type) VALUES (?1, ?2)",
            (name, haven_type),
        )?;
        let id = tx.last_insert_rowid();
        append_event_tx(
            &tx,
            "haven.created",
            Some(id),
            serde_json::json!({ "id": id, "name": name, "haven_type": haven_type }),
        )?;
        tx.commit()?;
        tracing::info!(haven_id = id, name, "haven created");
        Ok(id)
    }

    pub fn list_havens(&self) -> EngineResult<Vec<HavenSummary>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare("SELECT id, name FROM havens ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(HavenSummary {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    pub fn haven(&self, haven_id: HavenId) -> EngineResult<Haven> {
        let conn = self.open()?;
        load_haven(&conn, haven_id)
    }

    /// Revision counter; bumps on every mutation.
    pub fn get_rev(&self) -> anyhow::Result<i64> {
        let conn = self.open()?;
        let rev: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM event_log", [], |row| row.get(0))?;
        Ok(rev.unwrap_or(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Haven {
    pub id: HavenId,
    pub name: String,
    pub haven_type: String,
}

fn load_haven(conn: &Connection, haven_id: HavenId) -> EngineResult<Haven> {
    conn.query_row(
        "SELECT id, name, haven_type FROM havens WHERE id = ?1",
        [haven_id],
        |row| {
            Ok(Haven {
                id: row.get(0)?,
                name: row.get(1)?,
                haven_type: row.get(2)?,
            })
        },
    )
    .optional()?
    .ok_or(EngineError::HavenNotFound(haven_id))
}

fn migrate(conn: &Connection) -> anyhow::Result<()> {
    let v: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if v < 1 {
        conn.execute_batch(
            r#"
-- Monotonic revision source.
CREATE TABLE IF NOT EXISTS event_log (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  ts TEXT NOT NULL,
  kind TEXT NOT NULL,
  haven_id INTEGER,
  payload_json TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_event_log_kind ON event_log(kind);

CREATE TABLE IF NOT EXISTS havens (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  haven_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS obstacles (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  haven_type TEXT NOT NULL,
  obstacle_class INTEGER NOT NULL DEFAULT 0,
  description TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS monsters (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  habitat TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS puzzles (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  haven_type TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_obstacles_type ON obstacles(haven_type);
CREATE INDEX IF NOT EXISTS idx_monsters_habitat ON monsters(habitat);
CREATE INDEX IF NOT EXISTS idx_puzzles_type ON puzzles(haven_type);

CREATE TABLE IF NOT EXISTS layouts (
  haven_id INTEGER PRIMARY KEY REFERENCES havens(id) ON DELETE CASCADE,
  width INTEGER NOT NULL,
  height INTEGER NOT NULL,
  entrance_x INTEGER NOT NULL DEFAULT 0,
  entrance_y INTEGER NOT NULL DEFAULT 0,
  instanced INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS rooms (
  haven_id INTEGER NOT NULL REFERENCES layouts(haven_id) ON DELETE CASCADE,
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  name TEXT,
  description TEXT,
  monster_id INTEGER REFERENCES monsters(id) ON DELETE SET NULL,
  monster_defeated INTEGER NOT NULL DEFAULT 0,
  puzzle_id INTEGER REFERENCES puzzles(id) ON DELETE SET NULL,
  puzzle_solved INTEGER NOT NULL DEFAULT 0,
  PRIMARY KEY (haven_id, x, y)
);

-- One row per link between orthogonal neighbours, keyed on the west/north room.
CREATE TABLE IF NOT EXISTS exits (
  haven_id INTEGER NOT NULL REFERENCES layouts(haven_id) ON DELETE CASCADE,
  x INTEGER NOT NULL,
  y INTEGER NOT NULL,
  dir TEXT NOT NULL CHECK (dir IN ('east', 'south')),
  obstacle_id INTEGER REFERENCES obstacles(id) ON DELETE SET NULL,
  PRIMARY KEY (haven_id, x, y, dir)
);
"#,
        )?;

        conn.pragma_update(None, "user_version", 1_i64)?;
    }

    Ok(())
}

fn append_event_tx(
    tx: &rusqlite::Transaction<'_>,
    kind: &str,
    haven_id: Option<HavenId>,
    payload: serde_json::Value,
) -> anyhow::Result<i64> {
    let payload_json = payload.to_string();
    tx.execute(
        "INSERT INTO event_log (ts, kind, haven_id, payload_json) VALUES (?1, ?2, ?3, ?4)",
        (now_rfc3339(), kind, haven_id, payload_json),
    )?;
    Ok(tx.last_insert_rowid())
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_engine;
    use super::*;

    #[test]
    fn havens_list_in_creation_order() {
        let engine = temp_engine();
        let a = engine.create_haven("Ashen Hollow", "cave").unwrap();
        let b = engine.create_haven("Glass Mire", "swamp").unwrap();

        let havens = engine.list_havens().unwrap();
        assert_eq!(
            havens,
            vec![
                HavenSummary {
                    id: a,
                    name: "Ashen Hollow".to_string()
                },
                HavenSummary {
                    id: b,
                    name: "Glass Mire".to_string()
                },
            ]
        );
        assert_eq!(engine.haven(b).unwrap().haven_type, "swamp");
    }

    #[test]
    fn unknown_haven_is_not_found() {
        let engine = temp_engine();
        assert!(matches!(
            engine.haven(42),
            Err(EngineError::HavenNotFound(42))
        ));
    }

    #[test]
    fn mutations_bump_revision() {
        let engine = temp_engine();
        assert_eq!(engine.get_rev().unwrap(), 0);
        engine.create_haven("Ashen Hollow", "cave").unwrap();
        assert_eq!(engine.get_rev().unwrap(), 1);
    }
}
