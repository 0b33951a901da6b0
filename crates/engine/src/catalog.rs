//! Reference catalogs: obstacles, monsters and puzzles, filtered by haven type.

use crate::{load_haven, Engine, EngineResult};
use rusqlite::{Connection, OptionalExtension};
use shardhaven_protocol::{Choice, HavenId, RefId};

const OBSTACLE_NAME_MAX: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObstacleClass {
    /// Blocks passage through an exit; the only class offered to the editor.
    Exit = 0,
    /// Guards a treasure.
    Puzzle = 1,
}

impl Engine {
    pub fn add_obstacle(
        &self,
        haven_type: &str,
        class: ObstacleClass,
        description: &str,
    ) -> EngineResult<i64> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO obstacles (haven_type, obstacle_class, description) VALUES (?1, ?2, ?3)",
            (haven_type, class as i64, description),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_monster(&self, name: &str, habitat: &str) -> EngineResult<i64> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO monsters (name, habitat) VALUES (?1, ?2)",
            (name, habitat),
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn add_puzzle(&self, name: &str, haven_type: &str) -> EngineResult<i64> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO puzzles (name, haven_type) VALUES (?1, ?2)",
            (name, haven_type),
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Exit obstacles usable in this haven, with long descriptions shortened.
    pub fn obstacles_for(&self, haven_id: HavenId) -> EngineResult<Vec<Choice>> {
        let conn = self.open()?;
        let haven = load_haven(&conn, haven_id)?;
        let mut stmt = conn.prepare(
            "SELECT id, description FROM obstacles WHERE haven_type = ?1 AND obstacle_class = ?2 ORDER BY id",
        )?;
        let rows = stmt.query_map((&haven.haven_type, ObstacleClass::Exit as i64), |row| {
            let id: i64 = row.get(0)?;
            let description: String = row.get(1)?;
            Ok(Choice {
                id: RefId::from(id),
                name: shorten(&description),
            })
        })?;
        Ok(rows.filter_map(Result::ok).collect())
    }

    pub fn monsters_for(&self, haven_id: HavenId) -> EngineResult<Vec<Choice>> {
        let conn = self.open()?;
        let haven = load_haven(&conn, haven_id)?;
        list_choices(
            &conn,
            "SELECT id, name FROM monsters WHERE habitat = ?1 ORDER BY name, id",
            &haven.haven_type,
        )
    }

    pub fn puzzles_for(&self, haven_id: HavenId) -> EngineResult<Vec<Choice>> {
        let conn = self.open()?;
        let haven = load_haven(&conn, haven_id)?;
        list_choices(
            &conn,
            "SELECT id, name FROM puzzles WHERE haven_type = ?1 ORDER BY id",
            &haven.haven_type,
        )
    }
}

fn list_choices(conn: &Connection, sql: &str, haven_type: &str) -> EngineResult<Vec<Choice>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([haven_type], |row| {
        let id: i64 = row.get(0)?;
        Ok(Choice {
            id: RefId::from(id),
            name: row.get(1)?,
        })
    })?;
    Ok(rows.filter_map(Result::ok).collect())
}

fn shorten(description: &str) -> String {
    if description.chars().count() > OBSTACLE_NAME_MAX {
        let head: String = description.chars().take(OBSTACLE_NAME_MAX).collect();
        format!("{head}...")
    } else {
        description.to_string()
    }
}

/// Catalog tables a room field can point at.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Catalog {
    Obstacles,
    Monsters,
    Puzzles,
}

impl Catalog {
    fn table(self) -> &'static str {
        match self {
            Catalog::Obstacles => "obstacles",
            Catalog::Monsters => "monsters",
            Catalog::Puzzles => "puzzles",
        }
    }
}

/// Resolves a form value to a catalog id; `None` when unparsable or unknown.
pub(crate) fn resolve(conn: &Connection, catalog: Catalog, raw: &str) -> EngineResult<Option<i64>> {
    let Ok(id) = raw.trim().parse::<i64>() else {
        return Ok(None);
    };
    let sql = format!("SELECT id FROM {} WHERE id = ?1", catalog.table());
    Ok(conn
        .query_row(&sql, [id], |row| row.get::<_, i64>(0))
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_engine;

    #[test]
    fn obstacles_filter_by_type_and_class() {
        let engine = temp_engine();
        let haven = engine.create_haven("Ashen Hollow", "cave").unwrap();
        let door = engine
            .add_obstacle("cave", ObstacleClass::Exit, "A rusted iron door")
            .unwrap();
        engine
            .add_obstacle("cave", ObstacleClass::Puzzle, "A sealed chest")
            .unwrap();
        engine
            .add_obstacle("swamp", ObstacleClass::Exit, "Sucking mud")
            .unwrap();

        let obstacles = engine.obstacles_for(haven).unwrap();
        assert_eq!(
            obstacles,
            vec![Choice {
                id: RefId::from(door),
                name: "A rusted iron door".to_string()
            }]
        );
    }

    #[test]
    fn long_obstacle_descriptions_are_shortened() {
        let engine = temp_engine();
        let haven = engine.create_haven("Ashen Hollow", "cave").unwrap();
        let long = "A wall of shifting glass shards that hums when anyone draws near";
        engine.add_obstacle("cave", ObstacleClass::Exit, long).unwrap();

        let name = &engine.obstacles_for(haven).unwrap()[0].name;
        assert_eq!(name, "A wall of shifting glass shards that hum...");
    }

    #[test]
    fn monsters_are_sorted_by_name() {
        let engine = temp_engine();
        let haven = engine.create_haven("Ashen Hollow", "cave").unwrap();
        engine.add_monster("Shardling", "cave").unwrap();
        engine.add_monster("Bone Crawler", "cave").unwrap();
        engine.add_monster("Mire Hag", "swamp").unwrap();

        let names: Vec<String> = engine
            .monsters_for(haven)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Bone Crawler", "Shardling"]);
    }

    #[test]
    fn catalogs_require_a_known_haven() {
        let engine = temp_engine();
        assert!(matches!(
            engine.puzzles_for(9),
            Err(crate::EngineError::HavenNotFound(9))
        ));
    }

    #[test]
    fn resolve_rejects_garbage_and_unknown_ids() {
        let engine = temp_engine();
        let puzzle = engine.add_puzzle("Riddle of Ash", "cave").unwrap();
        let conn = engine.open().unwrap();

        assert_eq!(
            resolve(&conn, Catalog::Puzzles, &puzzle.to_string()).unwrap(),
            Some(puzzle)
        );
        assert_eq!(resolve(&conn, Catalog::Puzzles, "abc").unwrap(), None);
        assert_eq!(resolve(&conn, Catalog::Puzzles, "999").unwrap(), None);
    }
}
