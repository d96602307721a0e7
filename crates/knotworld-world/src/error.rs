//! Error types for the `knotworld-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`] through the
//! standard [`Result`] type alias.

use knotworld_types::Coord;

/// Errors that can occur during grid construction and mutation.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// The grid must have at least one row and one column.
    #[error("invalid grid dimensions {rows}x{cols}")]
    InvalidDimensions {
        /// Requested rows.
        rows: usize,
        /// Requested columns.
        cols: usize,
    },

    /// A coordinate lies outside the grid.
    #[error("coordinate {0} is out of bounds")]
    OutOfBounds(Coord),

    /// The charging station cell may not be overwritten, and no second
    /// station may be placed.
    #[error("cell {0} would break the single charging station invariant")]
    StationOverwrite(Coord),

    /// Not enough eligible cells to place every agent.
    #[error(
        "agent placement exhausted: requested {requested}, placed {placed}, eligible cells {eligible}"
    )]
    PlacementExhausted {
        /// Number of agents requested.
        requested: usize,
        /// Number of agents placed before giving up.
        placed: usize,
        /// Number of cells that were eligible at the start.
        eligible: usize,
    },
}
