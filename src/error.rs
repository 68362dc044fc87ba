//! Error types and pre-mutation validation.
//!
//! Every fallible operation validates its arguments with one of the `check_*`
//! helpers before touching any lineage state, so a rejected call never
//! changes what another handle observes.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Caller contract violations reported by versioned containers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A list index was past the end.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// Length of the list at the time of the call.
        len: usize,
    },

    /// A grid coordinate was outside the grid.
    #[error("cell ({x}, {y}) out of bounds for {width}x{height} grid")]
    CellOutOfBounds {
        /// Column of the offending cell.
        x: usize,
        /// Row of the offending cell.
        y: usize,
        /// Grid width.
        width: usize,
        /// Grid height.
        height: usize,
    },

    /// A grid was created with an empty or unaddressable area.
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// A handle from one lineage was passed to an operation on another.
    #[error("handle belongs to a different lineage")]
    ForeignHandle,

    /// Options could not be parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Check that `index` addresses an existing element of a list of `len`.
pub fn check_index(index: usize, len: usize) -> Result<()> {
    if index >= len {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    return Ok(());
}

/// Check that `index` is a valid insertion point (`0..=len`).
pub fn check_insert_index(index: usize, len: usize) -> Result<()> {
    if index > len {
        return Err(Error::IndexOutOfBounds { index, len });
    }
    return Ok(());
}

/// Check that a grid can be addressed with `u32` cell indices.
pub fn check_dimensions(width: usize, height: usize) -> Result<()> {
    let area = width.checked_mul(height);
    match area {
        Some(area) if area > 0 && area <= u32::MAX as usize => return Ok(()),
        _ => return Err(Error::InvalidDimensions { width, height }),
    }
}

/// Check that `(x, y)` lies inside a `width` x `height` grid and return its
/// row-major cell index.
pub fn check_cell(x: usize, y: usize, width: usize, height: usize) -> Result<usize> {
    if x >= width || y >= height {
        return Err(Error::CellOutOfBounds { x, y, width, height });
    }
    return Ok(y * width + x);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_checks() {
        assert_eq!(check_index(0, 1), Ok(()));
        assert_eq!(
            check_index(1, 1),
            Err(Error::IndexOutOfBounds { index: 1, len: 1 })
        );
        assert_eq!(check_insert_index(1, 1), Ok(()));
        assert!(check_insert_index(2, 1).is_err());
    }

    #[test]
    fn cell_index_is_row_major() {
        assert_eq!(check_cell(1, 2, 4, 3), Ok(9));
        assert_eq!(
            check_cell(4, 0, 4, 3),
            Err(Error::CellOutOfBounds { x: 4, y: 0, width: 4, height: 3 })
        );
    }

    #[test]
    fn dimensions_must_be_nonzero_and_addressable() {
        assert!(check_dimensions(4, 4).is_ok());
        assert!(check_dimensions(0, 4).is_err());
        assert!(check_dimensions(4, 0).is_err());
        assert!(check_dimensions(usize::MAX, 2).is_err());
    }

    #[test]
    fn messages_name_the_problem() {
        let err = Error::CellOutOfBounds { x: 5, y: 1, width: 4, height: 4 };
        assert_eq!(err.to_string(), "cell (5, 1) out of bounds for 4x4 grid");
    }
}
