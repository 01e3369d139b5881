//! Quad prefix tree: each cell splits into four quadrants labelled in Z-order.
//!
//! ```text
//!   +---+---+
//!   | A | B |
//!   +---+---+
//!   | C | D |
//!   +---+---+
//! ```
//!
//! Works over any rectangular world, geographic or planar. Per-level cell
//! dimensions are computed once when the tree is built.

use crate::cell::Cell;
use crate::error::{PrefixTreeError, Result};
use crate::grid::{CellGrid, Grid, GridKind};
use crate::tree::SpatialPrefixTree;
use bytes::Bytes;
use geo::{Point, Rect};
use once_cell::sync::OnceCell;
use spatio_shapes::{Shape, SpatialContext, SpatialRelation};
use std::sync::Arc;

pub const MAX_LEVELS_POSSIBLE: usize = 50;

pub const DEFAULT_MAX_LEVELS: usize = 12;

/// Quadrant labels in Z-order: top-left, top-right, bottom-left, bottom-right.
const QUADRANTS: &[u8; 4] = b"ABCD";

/// Cell edges during a descent. Children keep their parent's outer edges and
/// share its split lines, so the four quadrants tile the parent exactly.
#[derive(Debug, Clone, Copy)]
struct Edges {
    xmin: f64,
    ymin: f64,
    xmax: f64,
    ymax: f64,
}

impl Edges {
    fn of(rect: &Rect) -> Self {
        Self {
            xmin: rect.min().x,
            ymin: rect.min().y,
            xmax: rect.max().x,
            ymax: rect.max().y,
        }
    }

    fn quadrant(self, label: u8, dims: &LevelDims) -> Option<Self> {
        let (xs, ys) = (self.xmin + dims.width, self.ymin + dims.height);
        let Self { xmin, ymin, xmax, ymax } = self;
        let (xmin, ymin, xmax, ymax) = match label {
            b'A' => (xmin, ys, xs, ymax),
            b'B' => (xs, ys, xmax, ymax),
            b'C' => (xmin, ymin, xs, ys),
            b'D' => (xs, ymin, xmax, ys),
            _ => return None,
        };
        Some(Self { xmin, ymin, xmax, ymax })
    }

    fn to_rect(self) -> Rect {
        Rect::new(
            geo::coord! { x: self.xmin, y: self.ymin },
            geo::coord! { x: self.xmax, y: self.ymax },
        )
    }
}

/// Size of the cells at one level of a quad grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelDims {
    /// Cell width.
    pub width: f64,
    /// Cell height.
    pub height: f64,
    /// Cells along each side of the world.
    pub side: u64,
    /// Cells covering the world.
    pub count: u128,
}

#[derive(Debug)]
pub(crate) struct QuadGrid {
    bounds: Rect,
    /// `dims[i]` describes level `i + 1`.
    dims: Vec<LevelDims>,
    max_levels: usize,
}

impl QuadGrid {
    fn new(bounds: Rect, max_levels: usize) -> Self {
        let mut dims = Vec::with_capacity(max_levels);
        let mut level = LevelDims {
            width: bounds.width() / 2.0,
            height: bounds.height() / 2.0,
            side: 2,
            count: 4,
        };
        for _ in 0..max_levels {
            dims.push(level);
            // 2^50 sides and 4^50 cells still fit
            level = LevelDims {
                width: level.width / 2.0,
                height: level.height / 2.0,
                side: level.side * 2,
                count: level.count * 4,
            };
        }
        Self {
            bounds,
            dims,
            max_levels,
        }
    }
}

impl CellGrid for QuadGrid {
    fn kind(&self) -> GridKind {
        GridKind::Quad
    }

    fn max_levels(&self) -> usize {
        self.max_levels
    }

    fn child_labels(&self) -> &'static [u8] {
        QUADRANTS
    }

    fn world_rect(&self) -> Rect {
        self.bounds
    }

    fn decode_rect(&self, token: &str) -> Result<Rect> {
        if token.len() > self.dims.len() {
            return Err(PrefixTreeError::invalid_token(
                token,
                format!("deeper than the grid's {} levels", self.max_levels),
            ));
        }

        let mut edges = Edges::of(&self.bounds);
        for (label, dims) in token.bytes().zip(&self.dims) {
            edges = edges.quadrant(label.to_ascii_uppercase(), dims).ok_or_else(|| {
                PrefixTreeError::invalid_token(
                    token,
                    format!("unexpected quad label {:?}", char::from(label)),
                )
            })?;
        }
        Ok(edges.to_rect())
    }

    /// Descend from the world, testing the four quadrants of the current cell
    /// against the point and entering the first one, in label order, that the
    /// point touches. Quadrants are split exactly as `decode_rect` splits them.
    fn encode_point(
        &self,
        point: &Point,
        level: usize,
    ) -> Result<(String, Option<SpatialRelation>)> {
        if level > self.dims.len() {
            return Err(PrefixTreeError::level_out_of_range(level, self.max_levels));
        }
        let (x, y) = (point.x(), point.y());
        if !(x.is_finite() && y.is_finite()) {
            return Err(PrefixTreeError::PointOutOfBounds { x, y });
        }
        let target = Shape::Point(*point);
        if !target.relate(&Shape::Rect(self.bounds)).intersects() {
            return Err(PrefixTreeError::PointOutOfBounds { x, y });
        }

        let mut edges = Edges::of(&self.bounds);
        let mut token = String::with_capacity(level);
        let mut rel = None;

        for dims in &self.dims[..level] {
            let found = QUADRANTS.iter().find_map(|&label| {
                let quadrant = edges.quadrant(label, dims)?;
                let r = target.relate(&Shape::Rect(quadrant.to_rect()));
                r.intersects().then_some((label, quadrant, r))
            });
            let Some((label, quadrant, r)) = found else {
                return Err(PrefixTreeError::PointOutOfBounds { x, y });
            };

            token.push(char::from(label));
            edges = quadrant;
            // Evaluated point-to-cell; cells record cell-to-point
            rel = Some(r.transpose());
        }

        Ok((token, rel))
    }
}

/// Prefix tree of recursive quadrants over an arbitrary rectangular world.
///
/// # Examples
///
/// ```rust
/// use spatio_prefix_tree::{QuadPrefixTree, SpatialContext, SpatialPrefixTree};
///
/// let tree = QuadPrefixTree::new(SpatialContext::geo(), 2)?;
/// let a = tree.cell("A")?.shape()?;
/// assert_eq!((a.min().x, a.min().y, a.max().x, a.max().y), (-180.0, 0.0, 0.0, 90.0));
/// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
/// ```
#[derive(Debug)]
pub struct QuadPrefixTree {
    ctx: SpatialContext,
    grid: Arc<QuadGrid>,
    world: OnceCell<Cell>,
}

impl QuadPrefixTree {
    pub const MAX_LEVELS_POSSIBLE: usize = MAX_LEVELS_POSSIBLE;
    pub const DEFAULT_MAX_LEVELS: usize = DEFAULT_MAX_LEVELS;

    /// Quad tree over the context's world bounds.
    pub fn new(ctx: SpatialContext, max_levels: usize) -> Result<Self> {
        let bounds = ctx.world_bounds();
        Self::with_bounds(ctx, bounds, max_levels)
    }

    /// Quad tree with [`DEFAULT_MAX_LEVELS`] levels.
    pub fn with_default_levels(ctx: SpatialContext) -> Result<Self> {
        Self::new(ctx, DEFAULT_MAX_LEVELS)
    }

    /// Quad tree over explicit bounds, which need not match the context's.
    ///
    /// # Errors
    ///
    /// Fails when `max_levels` is outside `[1, MAX_LEVELS_POSSIBLE]` or the
    /// bounds have no finite, positive area.
    pub fn with_bounds(ctx: SpatialContext, bounds: Rect, max_levels: usize) -> Result<Self> {
        if !(1..=MAX_LEVELS_POSSIBLE).contains(&max_levels) {
            return Err(PrefixTreeError::Config(format!(
                "quad maxLevels must be in [1, {}], got {}",
                MAX_LEVELS_POSSIBLE, max_levels
            )));
        }
        let (width, height) = (bounds.width(), bounds.height());
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PrefixTreeError::Config(format!(
                "quad bounds must have a finite, positive area, got {:?}",
                bounds
            )));
        }

        let grid = QuadGrid::new(bounds, max_levels);
        log::debug!(
            "Created quad prefix tree with {} levels over {}x{}",
            max_levels,
            width,
            height
        );
        if log::log_enabled!(log::Level::Trace) {
            for (i, dims) in grid.dims.iter().enumerate() {
                log::trace!(
                    "[{}] {}x{} ({} cells per side, {} total)",
                    i + 1,
                    dims.width,
                    dims.height,
                    dims.side,
                    dims.count
                );
            }
        }

        Ok(Self {
            ctx,
            grid: Arc::new(grid),
            world: OnceCell::new(),
        })
    }

    /// World rectangle the grid divides.
    pub fn bounds(&self) -> Rect {
        self.grid.bounds
    }

    /// Cell dimensions at `level`, for levels `1..=max_levels`.
    pub fn level_dims(&self, level: usize) -> Option<LevelDims> {
        level
            .checked_sub(1)
            .and_then(|i| self.grid.dims.get(i))
            .copied()
    }

    fn grid(&self) -> Grid {
        Grid::Quad(Arc::clone(&self.grid))
    }
}

impl SpatialPrefixTree for QuadPrefixTree {
    fn context(&self) -> &SpatialContext {
        &self.ctx
    }

    fn max_levels(&self) -> usize {
        self.grid.max_levels
    }

    fn kind(&self) -> GridKind {
        GridKind::Quad
    }

    /// First level whose cells are smaller than `dist` in both directions.
    fn level_for_distance(&self, dist: f64) -> usize {
        let max = self.max_levels();
        if dist == 0.0 {
            return max;
        }
        self.grid.dims[..max - 1]
            .iter()
            .position(|dims| dist > dims.width && dist > dims.height)
            .map_or(max, |i| i + 1)
    }

    fn world_cell(&self) -> &Cell {
        self.world.get_or_init(|| Cell::world(self.grid()))
    }

    fn cell(&self, token: &str) -> Result<Cell> {
        if token.is_empty() {
            return Ok(self.world_cell().clone());
        }
        Cell::from_token(self.grid(), token)
    }

    fn cell_from_bytes(&self, buf: &Bytes, offset: usize, len: usize) -> Result<Cell> {
        if len == 0 && offset <= buf.len() {
            return Ok(self.world_cell().clone());
        }
        Cell::from_bytes(self.grid(), buf.clone(), offset, len)
    }

    fn cell_for_point(&self, point: &Point, level: usize) -> Result<Cell> {
        Cell::from_point(self.grid(), point, level)
    }
}
