//! The prefix-tree contract and the shape → cell decomposition algorithm.
//!
//! A [`SpatialPrefixTree`] owns a coordinate context and a fixed depth. Given a
//! shape it walks down from the world cell, asking each cell for the children
//! that touch the shape, and stops at leaves: cells at the requested detail
//! level, or cells lying entirely within the shape.
//!
//! ## Query Flow
//! ```text
//! 1. cells(shape, detail_level, incl_parents, simplify)
//! 2. For each child of the world cell touching the shape:
//!    - at detail_level, or within the shape → emit as leaf
//!    - otherwise optionally emit as parent, then recurse into its children
//!    - with simplify, a cell whose every child became a leaf replaces them
//! 3. Result is in ascending token order, no duplicates
//! ```

use crate::cell::Cell;
use crate::error::{PrefixTreeError, Result};
use crate::grid::GridKind;
use bytes::Bytes;
use geo::Point;
use spatio_shapes::{Shape, SpatialContext};
use std::fmt;

/// A hierarchical grid decomposing a coordinate space into token-addressed cells.
///
/// Trees are immutable after construction and meant to be shared across
/// threads; every query allocates its own cells.
///
/// # Examples
///
/// ```rust
/// use spatio_prefix_tree::{QuadPrefixTree, Shape, SpatialContext, SpatialPrefixTree};
///
/// let tree = QuadPrefixTree::new(SpatialContext::geo(), 8)?;
/// let manhattan = Shape::rect(-74.0479, 40.6829, -73.9067, 40.8820);
///
/// let cells = tree.cells(&manhattan, 6, false, true)?;
/// assert!(!cells.is_empty());
/// assert!(cells.windows(2).all(|w| w[0] < w[1]));
/// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
/// ```
pub trait SpatialPrefixTree: fmt::Debug + Send + Sync {
    fn context(&self) -> &SpatialContext;

    /// Deepest level this tree produces.
    fn max_levels(&self) -> usize;

    fn kind(&self) -> GridKind;

    /// Coarsest level in `[1, max_levels]` whose cells are no larger than
    /// `dist`. A distance of zero maps to `max_levels`.
    fn level_for_distance(&self, dist: f64) -> usize;

    /// The level-0 cell covering the whole world, built once per tree.
    fn world_cell(&self) -> &Cell;

    /// Decode a cell from its external token. The empty token is the world cell.
    fn cell(&self, token: &str) -> Result<Cell>;

    /// Decode a cell from `len` bytes of `buf` starting at `offset`.
    fn cell_from_bytes(&self, buf: &Bytes, offset: usize, len: usize) -> Result<Cell>;

    /// The `level`-deep cell holding `point`.
    ///
    /// This default walks down from the world cell one child at a time;
    /// grids override it with a direct encoding.
    fn cell_for_point(&self, point: &Point, level: usize) -> Result<Cell> {
        if level > self.max_levels() {
            return Err(PrefixTreeError::level_out_of_range(
                level,
                self.max_levels(),
            ));
        }
        let mut cell = self.world_cell().clone();
        while cell.level() < level {
            cell = cell.sub_cell(point)?;
        }
        Ok(cell)
    }

    /// Like [`cell_from_bytes`](Self::cell_from_bytes), but rebinds `target`
    /// in place when one is given.
    fn cell_reusing(
        &self,
        buf: &Bytes,
        offset: usize,
        len: usize,
        target: Option<Cell>,
    ) -> Result<Cell> {
        match target {
            Some(mut cell) => {
                cell.reset(buf.clone(), offset, len)?;
                Ok(cell)
            }
            None => self.cell_from_bytes(buf, offset, len),
        }
    }

    /// Diagonal of a cell at `level`, measured on the cell at the world center.
    ///
    /// The planar hypotenuse over-estimates geographic diagonals, which is the
    /// safe direction for callers sizing a search.
    fn distance_for_level(&self, level: usize) -> Result<f64> {
        check_detail_level(level, self.max_levels())?;
        let center = self.context().world_center();
        let rect = self.cell_for_point(&center, level)?.shape()?;
        Ok(rect.width().hypot(rect.height()))
    }

    /// Decompose `shape` into cells down to `detail_level`.
    ///
    /// With `incl_parents`, every non-leaf cell visited is emitted ahead of its
    /// descendants. With `simplify`, a cell all of whose possible children
    /// became leaves is emitted as a single leaf instead. The world cell is
    /// never emitted.
    fn cells(
        &self,
        shape: &Shape,
        detail_level: usize,
        incl_parents: bool,
        simplify: bool,
    ) -> Result<Vec<Cell>> {
        check_detail_level(detail_level, self.max_levels())?;

        if let Shape::Point(point) = shape {
            return self.point_cells(point, detail_level, incl_parents);
        }

        let mut cells = Vec::new();
        for child in self.world_cell().sub_cells_filtered(Some(shape))? {
            collect_cells(
                child,
                shape,
                detail_level,
                incl_parents,
                simplify,
                &mut cells,
            )?;
        }

        log::trace!(
            "Decomposed shape into {} {} cells at detail level {}",
            cells.len(),
            self.kind(),
            detail_level
        );
        Ok(cells)
    }

    /// Cells for a point: the `detail_level` cell, preceded by each of its
    /// ancestors from level 1 down when `incl_parents` is set.
    fn point_cells(
        &self,
        point: &Point,
        detail_level: usize,
        incl_parents: bool,
    ) -> Result<Vec<Cell>> {
        check_detail_level(detail_level, self.max_levels())?;
        let cell = self.cell_for_point(point, detail_level)?;
        if !incl_parents {
            return Ok(vec![cell]);
        }

        let end = cell.token().to_owned();
        let mut cells = Vec::with_capacity(detail_level);
        for len in 1..detail_level {
            cells.push(self.cell(&end[..len])?);
        }
        cells.push(cell);
        Ok(cells)
    }
}

/// Recursive step of [`SpatialPrefixTree::cells`]. Returns true when `cell`
/// contributed a leaf to `result`, either itself or after simplification.
///
/// Only called below the world cell, so `cell` is never level 0.
fn collect_cells(
    mut cell: Cell,
    shape: &Shape,
    detail_level: usize,
    incl_parents: bool,
    simplify: bool,
    result: &mut Vec<Cell>,
) -> Result<bool> {
    if cell.level() == detail_level {
        cell.set_leaf()?;
    }
    if cell.is_leaf() {
        result.push(cell);
        return Ok(true);
    }
    if incl_parents {
        result.push(cell.clone());
    }

    let mut leaves = 0;
    for child in cell.sub_cells_filtered(Some(shape))? {
        if collect_cells(child, shape, detail_level, incl_parents, simplify, result)? {
            leaves += 1;
        }
    }

    // Each leaf-contributing child left exactly one entry at the tail
    if simplify && leaves == cell.sub_cells_size() {
        result.truncate(result.len() - leaves);
        if incl_parents {
            if let Some(parent) = result.last_mut() {
                parent.set_leaf()?;
            }
        } else {
            cell.set_leaf()?;
            result.push(cell);
        }
        return Ok(true);
    }
    Ok(false)
}

fn check_detail_level(level: usize, max: usize) -> Result<()> {
    if (1..=max).contains(&level) {
        Ok(())
    } else {
        Err(PrefixTreeError::level_out_of_range(level, max))
    }
}

/// External token strings for `cells`, with the leaf marker on leaves.
///
/// ```rust
/// use spatio_prefix_tree::{QuadPrefixTree, SpatialContext, SpatialPrefixTree, cells_to_token_strings};
///
/// let tree = QuadPrefixTree::new(SpatialContext::geo(), 4)?;
/// let cells = vec![tree.cell("A")?, tree.cell("AB+")?];
/// assert_eq!(cells_to_token_strings(&cells), vec!["A", "AB+"]);
/// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
/// ```
pub fn cells_to_token_strings(cells: &[Cell]) -> Vec<String> {
    cells.iter().map(Cell::to_string).collect()
}
