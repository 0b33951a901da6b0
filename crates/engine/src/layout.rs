//! Haven layouts: the room grid, the exits between rooms, and the edit rules.

use crate::catalog::{resolve, Catalog};
use crate::{append_event_tx, load_haven, Engine, EngineError, EngineResult};
use rusqlite::{Connection, OptionalExtension};
use shardhaven_protocol::{Cell, Direction, HavenId, HavenLayout, RefId, RoomEdit};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub haven_id: HavenId,
    pub width: i64,
    pub height: i64,
    pub entrance_x: i64,
    pub entrance_y: i64,
    /// Live in the game; rooms can be edited but not added or removed.
    pub instanced: bool,
}

impl Layout {
    pub fn contains(&self, x: i64, y: i64) -> bool {
        (0..self.width).contains(&x) && (0..self.height).contains(&y)
    }

    pub fn is_entrance(&self, x: i64, y: i64) -> bool {
        x == self.entrance_x && y == self.entrance_y
    }
}

/// Exit row holding the obstacle on `dir` of room `(x, y)`.
fn exit_key(x: i64, y: i64, dir: Direction) -> (i64, i64, &'static str) {
    match dir {
        Direction::North => (x, y - 1, "south"),
        Direction::South => (x, y, "south"),
        Direction::West => (x - 1, y, "east"),
        Direction::East => (x, y, "east"),
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

fn load_layout(conn: &Connection, haven_id: HavenId) -> EngineResult<Layout> {
    load_haven(conn, haven_id)?;
    find_layout(conn, haven_id)?.ok_or(EngineError::NoLayout(haven_id))
}

fn find_layout(conn: &Connection, haven_id: HavenId) -> EngineResult<Option<Layout>> {
    Ok(conn
        .query_row(
            "SELECT width, height, entrance_x, entrance_y, instanced FROM layouts WHERE haven_id = ?1",
            [haven_id],
            |row| {
                Ok(Layout {
                    haven_id,
                    width: row.get(0)?,
                    height: row.get(1)?,
                    entrance_x: row.get(2)?,
                    entrance_y: row.get(3)?,
                    instanced: row.get::<_, i64>(4)? != 0,
                })
            },
        )
        .optional()?)
}

fn room_exists(conn: &Connection, haven_id: HavenId, x: i64, y: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM rooms WHERE haven_id = ?1 AND x = ?2 AND y = ?3)",
        (haven_id, x, y),
        |row| row.get(0),
    )
}

/// Reads the layout into `matrix[x][y]`.
fn load_cells(conn: &Connection, layout: &Layout) -> EngineResult<Vec<Vec<Cell>>> {
    let width = usize::try_from(layout.width).unwrap_or(0);
    let height = usize::try_from(layout.height).unwrap_or(0);
    let mut matrix = vec![vec![Cell::default(); height]; width];

    let mut stmt = conn.prepare(
        "SELECT x, y, name, description, monster_id, monster_defeated, puzzle_id, puzzle_solved
         FROM rooms WHERE haven_id = ?1",
    )?;
    let mut rows = stmt.query([layout.haven_id])?;
    while let Some(row) = rows.next()? {
        let x: i64 = row.get(0)?;
        let y: i64 = row.get(1)?;
        if !layout.contains(x, y) {
            continue;
        }
        let monster: Option<i64> = row.get(4)?;
        let puzzle: Option<i64> = row.get(6)?;
        let cell = &mut matrix[x as usize][y as usize];
        cell.is_room = true;
        cell.name = row.get::<_, Option<String>>(2)?.unwrap_or_default();
        cell.description = row.get::<_, Option<String>>(3)?.unwrap_or_default();
        cell.monster = monster.map(RefId::from);
        cell.monster_defeated = monster.is_some() && row.get::<_, i64>(5)? != 0;
        cell.puzzle = puzzle.map(RefId::from);
        cell.puzzle_solved = puzzle.is_some() && row.get::<_, i64>(7)? != 0;
        cell.entrance = layout.is_entrance(x, y);
    }

    let mut stmt = conn.prepare(
        "SELECT x, y, dir, obstacle_id FROM exits WHERE haven_id = ?1 AND obstacle_id IS NOT NULL",
    )?;
    let mut rows = stmt.query([layout.haven_id])?;
    while let Some(row) = rows.next()? {
        let x: i64 = row.get(0)?;
        let y: i64 = row.get(1)?;
        let dir: String = row.get(2)?;
        let obstacle = RefId::from(row.get::<_, i64>(3)?);
        let (near, far, nx, ny) = if dir == "east" {
            (Direction::East, Direction::West, x + 1, y)
        } else {
            (Direction::South, Direction::North, x, y + 1)
        };
        if layout.contains(x, y) && layout.contains(nx, ny) {
            matrix[x as usize][y as usize].set_obstacle(near, Some(obstacle.clone()));
            matrix[nx as usize][ny as usize].set_obstacle(far, Some(obstacle));
        }
    }

    Ok(matrix)
}

fn check_target(layout: &Layout, x: i64, y: i64) -> EngineResult<()> {
    if !layout.contains(x, y) {
        return Err(EngineError::rejected("Invalid parameter."));
    }
    Ok(())
}

fn check_structure_editable(layout: &Layout) -> EngineResult<()> {
    if layout.instanced {
        return Err(EngineError::rejected(
            "You cannot add or remove rooms while a haven is instanced.",
        ));
    }
    Ok(())
}

impl Engine {
    /// Gives a haven an empty grid holding only its entrance room.
    pub fn create_layout(
        &self,
        haven_id: HavenId,
        width: u32,
        height: u32,
        entrance: (u32, u32),
    ) -> EngineResult<Layout> {
        let layout = Layout {
            haven_id,
            width: i64::from(width),
            height: i64::from(height),
            entrance_x: i64::from(entrance.0),
            entrance_y: i64::from(entrance.1),
            instanced: false,
        };
        if !layout.contains(layout.entrance_x, layout.entrance_y) {
            return Err(EngineError::rejected("Entrance must lie inside the layout."));
        }

        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        load_haven(&tx, haven_id)?;
        if find_layout(&tx, haven_id)?.is_some() {
            return Err(EngineError::rejected("That haven already has a layout."));
        }
        tx.execute(
            "INSERT INTO layouts (haven_id, width, height, entrance_x, entrance_y) VALUES (?1, ?2, ?3, ?4, ?5)",
            (haven_id, layout.width, layout.height, layout.entrance_x, layout.entrance_y),
        )?;
        tx.execute(
            "INSERT INTO rooms (haven_id, x, y) VALUES (?1, ?2, ?3)",
            (haven_id, layout.entrance_x, layout.entrance_y),
        )?;
        append_event_tx(
            &tx,
            "layout.created",
            Some(haven_id),
            serde_json::json!({ "width": width, "height": height, "entrance": [entrance.0, entrance.1] }),
        )?;
        tx.commit()?;
        tracing::info!(haven_id, width, height, "layout created");
        Ok(layout)
    }

    pub fn set_instanced(&self, haven_id: HavenId, instanced: bool) -> EngineResult<()> {
        let conn = self.open()?;
        load_layout(&conn, haven_id)?;
        conn.execute(
            "UPDATE layouts SET instanced = ?2 WHERE haven_id = ?1",
            (haven_id, instanced as i64),
        )?;
        Ok(())
    }

    /// The haven's layout, `None` when it has none yet.
    pub fn layout(&self, haven_id: HavenId) -> EngineResult<Option<Layout>> {
        let conn = self.open()?;
        load_haven(&conn, haven_id)?;
        find_layout(&conn, haven_id)
    }

    /// Full grid as served to the editor.
    pub fn haven_layout(&self, haven_id: HavenId) -> EngineResult<HavenLayout> {
        let conn = self.open()?;
        load_haven(&conn, haven_id)?;
        let Some(layout) = find_layout(&conn, haven_id)? else {
            return Ok(HavenLayout::without_layout());
        };
        let matrix = load_cells(&conn, &layout)?;
        Ok(HavenLayout::new(
            layout.width as u32,
            layout.height as u32,
            matrix,
        ))
    }

    /// Places a room and links it to every neighbouring room.
    pub fn create_room(&self, haven_id: HavenId, x: i64, y: i64) -> EngineResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let layout = load_layout(&tx, haven_id)?;
        check_structure_editable(&layout)?;
        check_target(&layout, x, y)?;
        if layout.is_entrance(x, y) {
            return Err(EngineError::rejected("You cannot replace the entrance."));
        }
        if room_exists(&tx, haven_id, x, y)? {
            return Err(EngineError::rejected("There is already a room there."));
        }

        tx.execute(
            "INSERT INTO rooms (haven_id, x, y) VALUES (?1, ?2, ?3)",
            (haven_id, x, y),
        )?;
        for dir in Direction::ALL {
            let (dx, dy) = dir.delta();
            let (nx, ny) = (x + dx, y + dy);
            if !layout.contains(nx, ny) || !room_exists(&tx, haven_id, nx, ny)? {
                continue;
            }
            let (ex, ey, edir) = exit_key(x, y, dir);
            tx.execute(
                "INSERT OR IGNORE INTO exits (haven_id, x, y, dir) VALUES (?1, ?2, ?3, ?4)",
                (haven_id, ex, ey, edir),
            )?;
        }
        append_event_tx(
            &tx,
            "room.created",
            Some(haven_id),
            serde_json::json!({ "x": x, "y": y }),
        )?;
        tx.commit()?;
        tracing::info!(haven_id, x, y, "room created");
        Ok(())
    }

    /// Removes a room together with every exit touching it.
    pub fn delete_room(&self, haven_id: HavenId, x: i64, y: i64) -> EngineResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let layout = load_layout(&tx, haven_id)?;
        check_structure_editable(&layout)?;
        check_target(&layout, x, y)?;
        if layout.is_entrance(x, y) {
            return Err(EngineError::rejected("You cannot delete the entrance."));
        }
        if !room_exists(&tx, haven_id, x, y)? {
            return Err(EngineError::rejected(
                "Unable to delete a room that doesn't exist.",
            ));
        }

        for dir in Direction::ALL {
            let (ex, ey, edir) = exit_key(x, y, dir);
            tx.execute(
                "DELETE FROM exits WHERE haven_id = ?1 AND x = ?2 AND y = ?3 AND dir = ?4",
                (haven_id, ex, ey, edir),
            )?;
        }
        tx.execute(
            "DELETE FROM rooms WHERE haven_id = ?1 AND x = ?2 AND y = ?3",
            (haven_id, x, y),
        )?;
        append_event_tx(
            &tx,
            "room.deleted",
            Some(haven_id),
            serde_json::json!({ "x": x, "y": y }),
        )?;
        tx.commit()?;
        tracing::info!(haven_id, x, y, "room deleted");
        Ok(())
    }

    /// Applies an edit form. Fields absent from the form are reset.
    pub fn edit_room(&self, haven_id: HavenId, x: i64, y: i64, edit: &RoomEdit) -> EngineResult<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let layout = load_layout(&tx, haven_id)?;
        check_target(&layout, x, y)?;
        if !room_exists(&tx, haven_id, x, y)? {
            return Err(EngineError::rejected("There is no room at that position."));
        }

        let mut obstacles = Vec::with_capacity(Direction::ALL.len());
        for dir in Direction::ALL {
            let obstacle = match non_empty(edit.obstacle(dir)) {
                Some(raw) => Some(
                    resolve(&tx, Catalog::Obstacles, raw)?
                        .ok_or_else(|| EngineError::rejected("Unable to set obstacle"))?,
                ),
                None => None,
            };
            obstacles.push((dir, obstacle));
        }

        let mut monster_defeated = false;
        let monster = match non_empty(edit.monster.as_deref()) {
            Some(raw) => {
                let id = resolve(&tx, Catalog::Monsters, raw)?
                    .ok_or_else(|| EngineError::rejected("Unable to set monster"))?;
                monster_defeated = edit.monster_defeated.as_deref() == Some("true");
                Some(id)
            }
            None => None,
        };

        let mut puzzle_solved = false;
        let puzzle = match non_empty(edit.puzzle.as_deref()) {
            Some(raw) => {
                let id = resolve(&tx, Catalog::Puzzles, raw)?
                    .ok_or_else(|| EngineError::rejected("Unable to set puzzle"))?;
                puzzle_solved = edit.puzzle_solved.as_deref() == Some("true");
                Some(id)
            }
            None => None,
        };

        tx.execute(
            "UPDATE rooms SET name = ?4, description = ?5, monster_id = ?6, monster_defeated = ?7,
               puzzle_id = ?8, puzzle_solved = ?9
             WHERE haven_id = ?1 AND x = ?2 AND y = ?3",
            (
                haven_id,
                x,
                y,
                non_empty(edit.name.as_deref()),
                non_empty(edit.description.as_deref()),
                monster,
                monster_defeated as i64,
                puzzle,
                puzzle_solved as i64,
            ),
        )?;

        if non_empty(edit.entrance.as_deref()).is_some() {
            tx.execute(
                "UPDATE layouts SET entrance_x = ?2, entrance_y = ?3 WHERE haven_id = ?1",
                (haven_id, x, y),
            )?;
        }

        // Edges without a neighbouring room have no exit row to carry an obstacle.
        for (dir, obstacle) in obstacles {
            let (ex, ey, edir) = exit_key(x, y, dir);
            tx.execute(
                "UPDATE exits SET obstacle_id = ?5 WHERE haven_id = ?1 AND x = ?2 AND y = ?3 AND dir = ?4",
                (haven_id, ex, ey, edir, obstacle),
            )?;
        }

        append_event_tx(
            &tx,
            "room.edited",
            Some(haven_id),
            serde_json::json!({ "x": x, "y": y }),
        )?;
        tx.commit()?;
        tracing::info!(haven_id, x, y, "room edited");
        Ok(())
    }

    /// Text map, one line per row: `$` entrance, `#` solid, space for a room.
    pub fn ascii_map(&self, haven_id: HavenId) -> EngineResult<String> {
        let conn = self.open()?;
        let layout = load_layout(&conn, haven_id)?;
        let matrix = load_cells(&conn, &layout)?;

        let mut out = String::new();
        for y in 0..layout.height {
            for x in 0..layout.width {
                let ch = if layout.is_entrance(x, y) {
                    '$'
                } else if matrix[x as usize][y as usize].is_room {
                    ' '
                } else {
                    '#'
                };
                out.push(ch);
            }
            out.push('\n');
        }
        Ok(out)
    }
}
