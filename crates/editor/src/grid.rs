//! In-memory grid of the active haven plus the selected room.

use crate::render::CELL_PITCH;
use shardhaven_protocol::Cell;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("grid {width}x{height} has no drawable area")]
    Dimensions { width: u32, height: u32 },
    #[error("matrix has {got} columns, expected {expected}")]
    Columns { expected: u32, got: usize },
    #[error("column {x} has {got} rows, expected {expected}")]
    Rows { x: usize, expected: u32, got: usize },
}

/// Cells are stored column-major (`cells[x][y]`), matching the wire shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GridModel {
    width: u32,
    height: u32,
    cells: Vec<Vec<Cell>>,
    selected: Option<(u32, u32)>,
}

impl GridModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height
    }

    pub fn cell_at(&self, x: u32, y: u32) -> Option<&Cell> {
        self.cells.get(x as usize)?.get(y as usize)
    }

    pub fn is_room(&self, x: u32, y: u32) -> bool {
        self.cell_at(x, y).is_some_and(|c| c.is_room)
    }

    /// Replaces the whole grid. The selection survives only if it still
    /// points at a room.
    pub fn set_matrix(
        &mut self,
        width: u32,
        height: u32,
        matrix: Vec<Vec<Cell>>,
    ) -> Result<(), GridError> {
        check_shape(width, height, &matrix)?;
        self.width = width;
        self.height = height;
        self.cells = matrix;
        if let Some((x, y)) = self.selected {
            if !self.is_room(x, y) {
                self.selected = None;
            }
        }
        Ok(())
    }

    /// Empties the grid to 0x0.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn select(&mut self, x: u32, y: u32) -> bool {
        if !self.is_room(x, y) {
            return false;
        }
        self.selected = Some((x, y));
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<(u32, u32)> {
        self.selected
    }

    pub fn selected_cell(&self) -> Option<&Cell> {
        let (x, y) = self.selected?;
        self.cell_at(x, y)
    }

    pub fn is_selected(&self, x: u32, y: u32) -> bool {
        self.selected == Some((x, y))
    }

    /// Room cells with their coordinates, column by column.
    pub fn rooms(&self) -> impl Iterator<Item = (u32, u32, &Cell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(x, column)| {
            column
                .iter()
                .enumerate()
                .filter(|(_, cell)| cell.is_room)
                .map(move |(y, cell)| (x as u32, y as u32, cell))
        })
    }
}

/// A grid is either 0x0 or non-empty on both axes, and fits a `u32` canvas.
pub fn check_shape(width: u32, height: u32, matrix: &[Vec<Cell>]) -> Result<(), GridError> {
    let drawable = (width == 0) == (height == 0)
        && width.checked_mul(CELL_PITCH).is_some()
        && height.checked_mul(CELL_PITCH).is_some();
    if !drawable {
        return Err(GridError::Dimensions { width, height });
    }
    if matrix.len() != width as usize {
        return Err(GridError::Columns {
            expected: width,
            got: matrix.len(),
        });
    }
    for (x, column) in matrix.iter().enumerate() {
        if column.len() != height as usize {
            return Err(GridError::Rows {
                x,
                expected: height,
                got: column.len(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn matrix_with_rooms(width: u32, height: u32, rooms: &[(u32, u32)]) -> Vec<Vec<Cell>> {
    let mut matrix = vec![vec![Cell::default(); height as usize]; width as usize];
    for &(x, y) in rooms {
        matrix[x as usize][y as usize] = Cell::room();
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32, rooms: &[(u32, u32)]) -> GridModel {
        let mut g = GridModel::new();
        g.set_matrix(width, height, matrix_with_rooms(width, height, rooms))
            .unwrap();
        g
    }

    #[test]
    fn cell_at_is_column_major_and_bounded() {
        let g = grid(3, 2, &[(2, 1)]);
        assert!(g.cell_at(2, 1).unwrap().is_room);
        assert!(!g.cell_at(1, 2).is_some_and(|c| c.is_room));
        assert!(g.cell_at(3, 0).is_none());
        assert!(g.cell_at(0, 2).is_none());
    }

    #[test]
    fn select_only_accepts_rooms_in_bounds() {
        let mut g = grid(3, 3, &[(1, 1)]);
        assert!(!g.select(2, 2));
        assert!(!g.select(5, 1));
        assert_eq!(g.selected(), None);

        assert!(g.select(1, 1));
        assert!(!g.select(2, 1));
        assert_eq!(g.selected(), Some((1, 1)));
    }

    #[test]
    fn replacing_matrix_drops_selection_of_removed_room() {
        let mut g = grid(3, 3, &[(1, 1), (2, 2)]);
        assert!(g.select(1, 1));

        g.set_matrix(3, 3, matrix_with_rooms(3, 3, &[(1, 1)])).unwrap();
        assert_eq!(g.selected(), Some((1, 1)));

        g.set_matrix(3, 3, matrix_with_rooms(3, 3, &[(2, 2)])).unwrap();
        assert_eq!(g.selected(), None);
    }

    #[test]
    fn shrinking_grid_drops_out_of_range_selection() {
        let mut g = grid(4, 4, &[(3, 3)]);
        assert!(g.select(3, 3));
        g.set_matrix(2, 2, matrix_with_rooms(2, 2, &[(1, 1)])).unwrap();
        assert_eq!(g.selected(), None);
    }

    #[test]
    fn bad_shape_leaves_grid_untouched() {
        let mut g = grid(2, 2, &[(1, 1)]);
        let err = g
            .set_matrix(3, 2, matrix_with_rooms(2, 2, &[]))
            .unwrap_err();
        assert_eq!(
            err,
            GridError::Columns {
                expected: 3,
                got: 2
            }
        );

        let mut ragged = matrix_with_rooms(2, 2, &[]);
        ragged[1].pop();
        assert!(matches!(
            g.set_matrix(2, 2, ragged),
            Err(GridError::Rows { x: 1, .. })
        ));
        assert_eq!(g.width(), 2);
        assert!(g.is_room(1, 1));
    }

    #[test]
    fn dimensions_must_be_both_zero_or_both_drawable() {
        let mut g = grid(2, 2, &[(1, 1)]);
        assert_eq!(
            g.set_matrix(0, 300_000_000, Vec::new()),
            Err(GridError::Dimensions {
                width: 0,
                height: 300_000_000
            })
        );
        assert!(matches!(
            g.set_matrix(u32::MAX, 1, Vec::new()),
            Err(GridError::Dimensions { .. })
        ));
        assert_eq!(g.width(), 2);

        g.set_matrix(0, 0, Vec::new()).unwrap();
        assert_eq!((g.width(), g.height()), (0, 0));
    }

    #[test]
    fn rooms_iterates_only_placed_cells() {
        let g = grid(3, 3, &[(0, 2), (2, 0)]);
        let coords: Vec<(u32, u32)> = g.rooms().map(|(x, y, _)| (x, y)).collect();
        assert_eq!(coords, vec![(0, 2), (2, 0)]);
    }
}
