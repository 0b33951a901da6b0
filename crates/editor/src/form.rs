//! Room edit form and the reference selectors feeding it.

use shardhaven_protocol::{Cell, Choice, Direction, HavenId, RefId, RoomEdit, NONE_ID, NONE_LABEL};

/// Options of one selector widget. The first entry is always the
/// `("0", "----")` "none" sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceList {
    options: Vec<Choice>,
}

impl Default for ChoiceList {
    fn default() -> Self {
        Self {
            options: vec![sentinel()],
        }
    }
}

fn sentinel() -> Choice {
    Choice {
        id: RefId::new(NONE_ID),
        name: NONE_LABEL.to_string(),
    }
}

impl ChoiceList {
    pub fn new(choices: impl IntoIterator<Item = Choice>) -> Self {
        let mut list = Self::default();
        list.replace(choices);
        list
    }

    pub fn replace(&mut self, choices: impl IntoIterator<Item = Choice>) {
        self.options.truncate(1);
        self.options
            .extend(choices.into_iter().filter(|c| !c.id.is_none_sentinel()));
    }

    pub fn reset(&mut self) {
        self.options.truncate(1);
    }

    pub fn options(&self) -> &[Choice] {
        &self.options
    }

    /// Real entries, without the sentinel.
    pub fn choices(&self) -> &[Choice] {
        &self.options[1..]
    }

    pub fn label(&self, id: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|c| c.id.as_str() == id)
            .map(|c| c.name.as_str())
    }
}

/// Field values of the room form. Selectors hold the chosen id as a string,
/// `"0"` meaning none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomForm {
    pub name: String,
    pub description: String,
    pub obstacle_north: String,
    pub obstacle_south: String,
    pub obstacle_east: String,
    pub obstacle_west: String,
    pub monster: String,
    pub monster_defeated: bool,
    pub puzzle: String,
    pub puzzle_solved: bool,
    pub entrance: bool,
    pub enabled: bool,
}

impl Default for RoomForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: String::new(),
            obstacle_north: NONE_ID.to_string(),
            obstacle_south: NONE_ID.to_string(),
            obstacle_east: NONE_ID.to_string(),
            obstacle_west: NONE_ID.to_string(),
            monster: NONE_ID.to_string(),
            monster_defeated: false,
            puzzle: NONE_ID.to_string(),
            puzzle_solved: false,
            entrance: false,
            enabled: false,
        }
    }
}

fn selector_value(id: Option<&RefId>) -> String {
    id.map_or_else(|| NONE_ID.to_string(), |r| r.as_str().to_string())
}

fn set_text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn set_selector(value: &str) -> Option<String> {
    (!value.is_empty() && value != NONE_ID).then(|| value.to_string())
}

fn set_checkbox(checked: bool) -> Option<String> {
    checked.then(|| "true".to_string())
}

impl RoomForm {
    /// Blank and disabled.
    pub fn cleared() -> Self {
        Self::default()
    }

    /// Filled from a room and enabled.
    pub fn load(cell: &Cell) -> Self {
        Self {
            name: cell.name.clone(),
            description: cell.description.clone(),
            obstacle_north: selector_value(cell.obstacle_north.as_ref()),
            obstacle_south: selector_value(cell.obstacle_south.as_ref()),
            obstacle_east: selector_value(cell.obstacle_east.as_ref()),
            obstacle_west: selector_value(cell.obstacle_west.as_ref()),
            monster: selector_value(cell.monster.as_ref()),
            monster_defeated: cell.monster_defeated,
            puzzle: selector_value(cell.puzzle.as_ref()),
            puzzle_solved: cell.puzzle_solved,
            entrance: cell.entrance,
            enabled: true,
        }
    }

    pub fn obstacle(&self, dir: Direction) -> &str {
        match dir {
            Direction::North => &self.obstacle_north,
            Direction::South => &self.obstacle_south,
            Direction::East => &self.obstacle_east,
            Direction::West => &self.obstacle_west,
        }
    }

    pub fn set_obstacle(&mut self, dir: Direction, value: impl Into<String>) {
        let value = value.into();
        match dir {
            Direction::North => self.obstacle_north = value,
            Direction::South => self.obstacle_south = value,
            Direction::East => self.obstacle_east = value,
            Direction::West => self.obstacle_west = value,
        }
    }

    /// Edit payload carrying only fields that differ from their unset value.
    pub fn to_edit(&self, haven_id: HavenId, x: u32, y: u32) -> RoomEdit {
        let mut edit = RoomEdit::new(haven_id, x, y);
        edit.name = set_text(&self.name);
        edit.description = set_text(&self.description);
        for dir in Direction::ALL {
            edit.set_obstacle(dir, set_selector(self.obstacle(dir)));
        }
        edit.monster = set_selector(&self.monster);
        edit.monster_defeated = set_checkbox(self.monster_defeated);
        edit.puzzle = set_selector(&self.puzzle);
        edit.puzzle_solved = set_checkbox(self.puzzle_solved);
        edit.entrance = set_checkbox(self.entrance);
        edit
    }
}
