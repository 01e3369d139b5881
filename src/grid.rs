//! Grid families and the per-grid behaviour cells delegate to.

use crate::error::Result;
use crate::geohash_tree::GeohashGrid;
use crate::quad_tree::QuadGrid;
use geo::{Point, Rect};
use spatio_shapes::SpatialRelation;
use std::fmt;
use std::sync::Arc;

/// Which grid family a tree or cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridKind {
    /// Base-32 geohash grid, 32 children per cell.
    Geohash,
    /// Z-order quad grid, 4 children per cell.
    Quad,
}

impl GridKind {
    /// Name used for the `prefixTree` configuration option.
    pub fn name(self) -> &'static str {
        match self {
            GridKind::Geohash => "geohash",
            GridKind::Quad => "quad",
        }
    }
}

impl fmt::Display for GridKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Geometry and child generation for one grid family.
///
/// Children of a cell are always formed by appending one label byte to the
/// parent token, so a grid only has to name its labels.
pub(crate) trait CellGrid: fmt::Debug + Send + Sync {
    fn kind(&self) -> GridKind;

    fn max_levels(&self) -> usize;

    /// Child labels, in ascending byte order.
    fn child_labels(&self) -> &'static [u8];

    fn sub_cells_size(&self) -> usize {
        self.child_labels().len()
    }

    /// Rectangle covered by the level-0 cell.
    fn world_rect(&self) -> Rect;

    /// Rectangle a token decodes to. The empty token is the world.
    fn decode_rect(&self, token: &str) -> Result<Rect>;

    fn decode_center(&self, token: &str) -> Result<Point> {
        Ok(self.decode_rect(token)?.center().into())
    }

    /// Token of the `level`-deep cell holding `point`, plus the relation of
    /// that cell to the point when the encoder computes one.
    fn encode_point(
        &self,
        point: &Point,
        level: usize,
    ) -> Result<(String, Option<SpatialRelation>)>;
}

/// Shared handle to a concrete grid, held by every cell of that grid.
#[derive(Debug, Clone)]
pub(crate) enum Grid {
    Geohash(Arc<GeohashGrid>),
    Quad(Arc<QuadGrid>),
}

impl Grid {
    pub(crate) fn get(&self) -> &dyn CellGrid {
        match self {
            Grid::Geohash(grid) => grid.as_ref(),
            Grid::Quad(grid) => grid.as_ref(),
        }
    }
}
