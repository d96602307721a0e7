//! The world grid: a dense row-major array of [`GridCell`]s.
//!
//! [`GridWorld`] owns terrain and the single charging station. All lookups
//! are bounds-checked and return `Option`; coordinates handed out by the
//! grid (move targets, valid moves) are always in bounds.

use knotworld_types::{Coord, Direction, GridCell, ResourceType};

use crate::error::WorldError;

/// Terrain of one simulation.
///
/// # Invariants
///
/// - `cells.len() == rows * cols`, both dimensions at least 1.
/// - Exactly one cell holds [`ResourceType::ChargingStation`], at
///   `charging_station`. Public mutators refuse to break this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridWorld {
    rows: usize,
    cols: usize,
    cells: Vec<GridCell>,
    charging_station: Coord,
}

impl GridWorld {
    /// Create an all-empty grid with the charging station in place.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::InvalidDimensions`] if either dimension is 0,
    /// or [`WorldError::OutOfBounds`] if the station lies outside the grid.
    pub fn new(rows: usize, cols: usize, charging_station: Coord) -> Result<Self, WorldError> {
        let mut world = Self::blank(rows, cols, charging_station)?;
        world.force_charging_station();
        Ok(world)
    }

    /// An all-empty grid without the station cell set. Generation scatters
    /// terrain first and forces the station last.
    pub(crate) fn blank(
        rows: usize,
        cols: usize,
        charging_station: Coord,
    ) -> Result<Self, WorldError> {
        if rows == 0 || cols == 0 {
            return Err(WorldError::InvalidDimensions { rows, cols });
        }
        let area = rows
            .checked_mul(cols)
            .ok_or(WorldError::InvalidDimensions { rows, cols })?;
        if charging_station.row >= rows || charging_station.col >= cols {
            return Err(WorldError::OutOfBounds(charging_station));
        }
        Ok(Self {
            rows,
            cols,
            cells: vec![GridCell::empty(); area],
            charging_station,
        })
    }

    /// Overwrite the station cell with a fresh, unboosted station.
    pub(crate) fn force_charging_station(&mut self) {
        let station = self.charging_station;
        if let Some(cell) = self.cell_mut(station) {
            *cell = GridCell::new(ResourceType::ChargingStation);
        }
    }

    /// Number of rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Number of cells.
    pub const fn area(&self) -> usize {
        self.cells.len()
    }

    /// Location of the charging station.
    pub const fn charging_station(&self) -> Coord {
        self.charging_station
    }

    /// Whether `coord` lies inside the grid.
    pub const fn in_bounds(&self, coord: Coord) -> bool {
        coord.row < self.rows && coord.col < self.cols
    }

    fn index(&self, coord: Coord) -> Option<usize> {
        if !self.in_bounds(coord) {
            return None;
        }
        coord
            .row
            .checked_mul(self.cols)
            .and_then(|base| base.checked_add(coord.col))
    }

    /// The cell at `coord`.
    pub fn cell(&self, coord: Coord) -> Option<&GridCell> {
        self.index(coord).and_then(|i| self.cells.get(i))
    }

    pub(crate) fn cell_mut(&mut self, coord: Coord) -> Option<&mut GridCell> {
        self.index(coord).and_then(|i| self.cells.get_mut(i))
    }

    /// The resource at `coord`.
    pub fn resource_at(&self, coord: Coord) -> Option<ResourceType> {
        self.cell(coord).map(|c| c.resource)
    }

    /// Whether an agent cannot stand on `coord` (out of bounds or obstacle).
    pub fn is_blocked(&self, coord: Coord) -> bool {
        self.resource_at(coord).is_none_or(|r| !r.is_passable())
    }

    /// Replace the resource at `coord`, clearing any boost.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] for coordinates outside the grid
    /// and [`WorldError::StationOverwrite`] when the write would remove the
    /// charging station or add a second one.
    pub fn set_resource(&mut self, coord: Coord, resource: ResourceType) -> Result<(), WorldError> {
        if coord == self.charging_station || resource == ResourceType::ChargingStation {
            return Err(WorldError::StationOverwrite(coord));
        }
        let cell = self.cell_mut(coord).ok_or(WorldError::OutOfBounds(coord))?;
        *cell = GridCell::new(resource);
        Ok(())
    }

    /// Take the collectible resource at `coord`.
    ///
    /// The cell becomes empty and unboosted. Returns the resource taken and
    /// whether the cell was boosted, or `None` if nothing collectible is
    /// there.
    pub fn consume(&mut self, coord: Coord) -> Option<(ResourceType, bool)> {
        let cell = self.cell_mut(coord)?;
        if !cell.resource.is_collectible() {
            return None;
        }
        let taken = (cell.resource, cell.is_boosted);
        *cell = GridCell::empty();
        Some(taken)
    }

    /// Set the boost flag on a cell. Returns `false` if out of bounds.
    pub fn set_boosted(&mut self, coord: Coord, boosted: bool) -> bool {
        self.cell_mut(coord).is_some_and(|cell| {
            cell.is_boosted = boosted;
            true
        })
    }

    /// Clear the boost flag on every listed cell.
    pub fn clear_boosts(&mut self, cells: &[Coord]) {
        for &coord in cells {
            self.set_boosted(coord, false);
        }
    }

    /// Number of cells currently boosted.
    pub fn boosted_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_boosted).count()
    }

    /// Number of cells holding `resource`.
    pub fn count(&self, resource: ResourceType) -> usize {
        self.cells.iter().filter(|c| c.resource == resource).count()
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| Coord::new(row, col)))
    }

    /// The cell reached by moving `distance` cells in `direction`, clamped
    /// to the grid edges. Obstacles are not considered.
    pub fn step_target(&self, from: Coord, direction: Direction, distance: usize) -> Coord {
        let last_row = self.rows.saturating_sub(1);
        let last_col = self.cols.saturating_sub(1);
        match direction {
            Direction::North => Coord::new(from.row.saturating_sub(distance), from.col),
            Direction::South => Coord::new(from.row.saturating_add(distance).min(last_row), from.col),
            Direction::West => Coord::new(from.row, from.col.saturating_sub(distance)),
            Direction::East => Coord::new(from.row, from.col.saturating_add(distance).min(last_col)),
        }
    }

    /// The neighbor one step away in `direction`, if it is inside the grid.
    pub fn neighbor(&self, from: Coord, direction: Direction) -> Option<Coord> {
        let (dr, dc) = direction.delta();
        let row = i64::try_from(from.row).ok()?.checked_add(dr)?;
        let col = i64::try_from(from.col).ok()?.checked_add(dc)?;
        let coord = Coord::new(usize::try_from(row).ok()?, usize::try_from(col).ok()?);
        self.in_bounds(coord).then_some(coord)
    }

    /// Directions whose single-step neighbor is in bounds and not an
    /// obstacle, in [`Direction::ALL`] order.
    pub fn valid_moves(&self, from: Coord) -> Vec<Direction> {
        Direction::ALL
            .into_iter()
            .filter(|&d| self.neighbor(from, d).is_some_and(|n| !self.is_blocked(n)))
            .collect()
    }

    /// Clamp an arbitrary coordinate onto the grid.
    pub fn clamp(&self, coord: Coord) -> Coord {
        Coord::new(
            coord.row.min(self.rows.saturating_sub(1)),
            coord.col.min(self.cols.saturating_sub(1)),
        )
    }

    /// Copy the grid out as nested rows for snapshots.
    pub fn to_rows(&self) -> Vec<Vec<GridCell>> {
        self.cells.chunks(self.cols).map(<[GridCell]>::to_vec).collect()
    }
}
