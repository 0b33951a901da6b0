use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type HavenId = i64;

/// Selector value meaning "nothing selected".
pub const NONE_ID: &str = "0";
/// Label shown next to [`NONE_ID`] in selectors.
pub const NONE_LABEL: &str = "----";
/// Cookie carrying the session token the framework hands out.
pub const SESSION_COOKIE: &str = "sessionid";

/// Foreign identifier for an obstacle, monster or puzzle.
///
/// The store emits integer ids; fixtures and older clients may send names.
/// Either way the value travels through forms as a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefId(String);

impl RefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_int(&self) -> Option<i64> {
        self.0.trim().parse().ok()
    }

    pub fn is_none_sentinel(&self) -> bool {
        self.0 == NONE_ID
    }
}

impl From<i64> for RefId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for RefId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for RefId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.as_int() {
            Some(n) if n.to_string() == self.0 => serializer.serialize_i64(n),
            _ => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for RefId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self::from(n),
            Raw::Str(s) => Self(s),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Form/JSON key of the obstacle on this edge.
    pub fn obstacle_key(self) -> &'static str {
        match self {
            Direction::North => "obstacle_north",
            Direction::South => "obstacle_south",
            Direction::East => "obstacle_east",
            Direction::West => "obstacle_west",
        }
    }

    /// Grid step; north is towards smaller `y`.
    pub fn delta(self) -> (i64, i64) {
        match self {
            Direction::North => (0, -1),
            Direction::South => (0, 1),
            Direction::East => (1, 0),
            Direction::West => (-1, 0),
        }
    }
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One grid position of a haven. Absent JSON fields decode to defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(default)]
    pub is_room: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_north: Option<RefId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_south: Option<RefId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_east: Option<RefId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_west: Option<RefId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster: Option<RefId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub monster_defeated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<RefId>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub puzzle_solved: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub entrance: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl Cell {
    pub fn room() -> Self {
        Self {
            is_room: true,
            ..Self::default()
        }
    }

    pub fn obstacle(&self, dir: Direction) -> Option<&RefId> {
        match dir {
            Direction::North => self.obstacle_north.as_ref(),
            Direction::South => self.obstacle_south.as_ref(),
            Direction::East => self.obstacle_east.as_ref(),
            Direction::West => self.obstacle_west.as_ref(),
        }
    }

    pub fn set_obstacle(&mut self, dir: Direction, obstacle: Option<RefId>) {
        match dir {
            Direction::North => self.obstacle_north = obstacle,
            Direction::South => self.obstacle_south = obstacle,
            Direction::East => self.obstacle_east = obstacle,
            Direction::West => self.obstacle_west = obstacle,
        }
    }
}

/// `{id, name}` entry of a reference list (obstacles, monsters, puzzles).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub id: RefId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HavenSummary {
    pub id: HavenId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HavenList {
    pub havens: Vec<HavenSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObstacleList {
    pub obstacles: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsterList {
    pub monsters: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleList {
    pub puzzles: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsciiMap {
    pub ascii: String,
}

/// Body of `/haven`. Dimensions and matrix are only present with a layout;
/// the matrix is indexed `matrix[x][y]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HavenLayout {
    pub has_layout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_dim: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_dim: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Vec<Cell>>>,
}

impl HavenLayout {
    pub fn without_layout() -> Self {
        Self::default()
    }

    pub fn new(x_dim: u32, y_dim: u32, matrix: Vec<Vec<Cell>>) -> Self {
        Self {
            has_layout: true,
            x_dim: Some(x_dim),
            y_dim: Some(y_dim),
            matrix: Some(matrix),
        }
    }
}

/// Body of every non-200 response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<i64>,
}

/// Form for the endpoints that only take a haven id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HavenForm {
    #[serde(default)]
    pub haven_id: String,
}

impl HavenForm {
    pub fn new(haven_id: HavenId) -> Self {
        Self {
            haven_id: haven_id.to_string(),
        }
    }
}

/// Form for room create/delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTarget {
    #[serde(default)]
    pub haven_id: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub y: String,
}

impl RoomTarget {
    pub fn new(haven_id: HavenId, x: u32, y: u32) -> Self {
        Self {
            haven_id: haven_id.to_string(),
            x: x.to_string(),
            y: y.to_string(),
        }
    }
}

/// Form for room edit. Unset fields are omitted from the body; the store
/// resets whatever is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEdit {
    #[serde(default)]
    pub haven_id: String,
    #[serde(default)]
    pub x: String,
    #[serde(default)]
    pub y: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_north: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_south: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_east: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obstacle_west: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monster_defeated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub puzzle_solved: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrance: Option<String>,
}

impl RoomEdit {
    pub fn new(haven_id: HavenId, x: u32, y: u32) -> Self {
        Self {
            haven_id: haven_id.to_string(),
            x: x.to_string(),
            y: y.to_string(),
            ..Self::default()
        }
    }

    pub fn obstacle(&self, dir: Direction) -> Option<&str> {
        match dir {
            Direction::North => self.obstacle_north.as_deref(),
            Direction::South => self.obstacle_south.as_deref(),
            Direction::East => self.obstacle_east.as_deref(),
            Direction::West => self.obstacle_west.as_deref(),
        }
    }

    pub fn set_obstacle(&mut self, dir: Direction, value: Option<String>) {
        match dir {
            Direction::North => self.obstacle_north = value,
            Direction::South => self.obstacle_south = value,
            Direction::East => self.obstacle_east = value,
            Direction::West => self.obstacle_west = value,
        }
    }

    /// Every field that will be sent, in form order.
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        let mut out = vec![
            ("haven_id", self.haven_id.as_str()),
            ("x", self.x.as_str()),
            ("y", self.y.as_str()),
        ];
        let optional = [
            ("name", &self.name),
            ("description", &self.description),
            ("obstacle_north", &self.obstacle_north),
            ("obstacle_south", &self.obstacle_south),
            ("obstacle_east", &self.obstacle_east),
            ("obstacle_west", &self.obstacle_west),
            ("monster", &self.monster),
            ("monster_defeated", &self.monster_defeated),
            ("puzzle", &self.puzzle),
            ("puzzle_solved", &self.puzzle_solved),
            ("entrance", &self.entrance),
        ];
        for (key, value) in optional {
            if let Some(v) = value {
                out.push((key, v.as_str()));
            }
        }
        out
    }
}

/// Endpoint paths, relative to the API base path.
pub mod paths {
    pub const DEFAULT_BASE: &str = "/api/shardhaven";

    pub const LIST: &str = "/list";
    pub const HAVEN: &str = "/haven";
    pub const OBSTACLES: &str = "/haven/obstacles";
    pub const MONSTERS: &str = "/haven/monsters";
    pub const PUZZLES: &str = "/haven/puzzles";
    pub const ROOM_CREATE: &str = "/haven/room/create";
    pub const ROOM_EDIT: &str = "/haven/room/edit";
    pub const ROOM_DELETE: &str = "/haven/room/delete";
    pub const ASCII: &str = "/haven/ascii";
}

/// Values of [`ErrorBody::code`](crate::ErrorBody).
pub mod codes {
    pub const AUTHORIZATION: i64 = -1;
    pub const BAD_PARAM: i64 = -2;
}
