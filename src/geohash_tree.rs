//! Geohash prefix tree: 32 children per cell, five interleaved lon/lat bits per level.
//!
//! Cell tokens are standard geohashes, so a level-`n` cell is exactly the
//! geohash of length `n` and its bounding box is the geohash's bounding box.
//! Encoding and decoding go through the `geohash` crate.
//!
//! ## Precision Guidelines
//!
//! | Level | Cell Size (approx) |
//! |-------|--------------------|
//! | 1     | 45° × 45°          |
//! | 4     | ~20km × 20km       |
//! | 6     | ~1.2km × 0.6km     |
//! | 8     | ~38m × 19m         |
//! | 12    | ~3.7cm × 1.9cm     |

use crate::cell::Cell;
use crate::error::{PrefixTreeError, Result};
use crate::grid::{CellGrid, Grid, GridKind};
use crate::tree::SpatialPrefixTree;
use bytes::Bytes;
use geo::{Point, Rect};
use once_cell::sync::{Lazy, OnceCell};
use spatio_shapes::{SpatialContext, SpatialRelation};
use std::sync::Arc;

/// Geohash base-32 alphabet. Ascending byte order, so children come out sorted.
const BASE32: &[u8; 32] = b"0123456789bcdefghjkmnpqrstuvwxyz";

/// Longest geohash the codec encodes. Past this, f64 lon/lat pairs no longer
/// tell neighbouring cells apart reliably.
pub const MAX_LEVELS_POSSIBLE: usize = 12;

/// Largest lon/lat handed to the codec. It wraps 180 and 90 (and values one
/// ulp below them) around to the opposite edge; these sit inside the finest
/// 32-bit bucket along each max edge instead.
const MAX_ENCODED_LON: f64 = 180.0 - 1e-9;
const MAX_ENCODED_LAT: f64 = 90.0 - 1e-9;

/// (lat height, lon width) in degrees of a cell, indexed by hash length.
static HASH_LEN_DIMS: Lazy<[(f64, f64); MAX_LEVELS_POSSIBLE + 1]> = Lazy::new(|| {
    let mut dims = [(180.0, 360.0); MAX_LEVELS_POSSIBLE + 1];
    // Characters alternate between 3 lon + 2 lat bits and 2 lon + 3 lat bits.
    let mut even = false;
    for len in 1..=MAX_LEVELS_POSSIBLE {
        let (lat, lon) = dims[len - 1];
        dims[len] = if even {
            (lat / 8.0, lon / 4.0)
        } else {
            (lat / 4.0, lon / 8.0)
        };
        even = !even;
    }
    dims
});

/// Shortest hash length whose cells are narrower than `lon_err` and shorter
/// than `lat_err`, both in degrees. Falls back to [`MAX_LEVELS_POSSIBLE`].
///
/// ```
/// use spatio_prefix_tree::geohash_tree::hash_len_for_width_height;
///
/// assert_eq!(hash_len_for_width_height(50.0, 50.0), 1);
/// assert_eq!(hash_len_for_width_height(10.0, 10.0), 3);
/// assert_eq!(hash_len_for_width_height(1e-12, 1e-12), 12);
/// ```
pub fn hash_len_for_width_height(lon_err: f64, lat_err: f64) -> usize {
    (1..MAX_LEVELS_POSSIBLE)
        .find(|&len| {
            let (height, width) = HASH_LEN_DIMS[len];
            height < lat_err && width < lon_err
        })
        .unwrap_or(MAX_LEVELS_POSSIBLE)
}

#[derive(Debug)]
pub(crate) struct GeohashGrid {
    max_levels: usize,
}

impl CellGrid for GeohashGrid {
    fn kind(&self) -> GridKind {
        GridKind::Geohash
    }

    fn max_levels(&self) -> usize {
        self.max_levels
    }

    fn child_labels(&self) -> &'static [u8] {
        BASE32
    }

    fn world_rect(&self) -> Rect {
        Rect::new(
            geo::coord! { x: -180.0, y: -90.0 },
            geo::coord! { x: 180.0, y: 90.0 },
        )
    }

    fn decode_rect(&self, token: &str) -> Result<Rect> {
        if token.is_empty() {
            return Ok(self.world_rect());
        }
        geohash::decode_bbox(token)
            .map_err(|e| PrefixTreeError::invalid_token(token, e.to_string()))
    }

    fn decode_center(&self, token: &str) -> Result<Point> {
        if token.is_empty() {
            return Ok(Point::new(0.0, 0.0));
        }
        let (center, _, _) = geohash::decode(token)
            .map_err(|e| PrefixTreeError::invalid_token(token, e.to_string()))?;
        Ok(center.into())
    }

    fn encode_point(
        &self,
        point: &Point,
        level: usize,
    ) -> Result<(String, Option<SpatialRelation>)> {
        let (x, y) = (point.x(), point.y());
        if !((-180.0..=180.0).contains(&x) && (-90.0..=90.0).contains(&y)) {
            return Err(PrefixTreeError::PointOutOfBounds { x, y });
        }
        if level == 0 {
            return Ok((String::new(), None));
        }
        let coord = geohash::Coord {
            x: x.min(MAX_ENCODED_LON),
            y: y.min(MAX_ENCODED_LAT),
        };
        let hash = geohash::encode(coord, level).map_err(|e| {
            PrefixTreeError::InvalidShape(format!("cannot geohash ({}, {}): {}", x, y, e))
        })?;
        Ok((hash, None))
    }
}

/// Prefix tree over the lon/lat world using geohash cells.
///
/// # Examples
///
/// ```rust
/// use spatio_prefix_tree::{GeohashPrefixTree, SpatialContext, SpatialPrefixTree};
/// use geo::Point;
///
/// let tree = GeohashPrefixTree::new(SpatialContext::geo(), 11)?;
/// let cell = tree.cell_for_point(&Point::new(10.40744, 57.64911), 11)?;
/// assert_eq!(cell.token(), "u4pruydqqvj");
/// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
/// ```
#[derive(Debug)]
pub struct GeohashPrefixTree {
    ctx: SpatialContext,
    grid: Arc<GeohashGrid>,
    world: OnceCell<Cell>,
}

impl GeohashPrefixTree {
    pub const MAX_LEVELS_POSSIBLE: usize = MAX_LEVELS_POSSIBLE;

    /// Create a geohash tree of `max_levels` levels.
    ///
    /// # Errors
    ///
    /// Fails when the context's world bounds are not the lon/lat world
    /// (minimum x of -180), or when `max_levels` is outside
    /// `[1, MAX_LEVELS_POSSIBLE]`.
    pub fn new(ctx: SpatialContext, max_levels: usize) -> Result<Self> {
        let bounds = ctx.world_bounds();
        if bounds.min().x != -180.0 {
            return Err(PrefixTreeError::Config(format!(
                "geohash only supports lon/lat world bounds, got {:?}",
                bounds
            )));
        }
        if !(1..=MAX_LEVELS_POSSIBLE).contains(&max_levels) {
            return Err(PrefixTreeError::Config(format!(
                "geohash maxLevels must be in [1, {}], got {}",
                MAX_LEVELS_POSSIBLE, max_levels
            )));
        }

        log::debug!("Created geohash prefix tree with {} levels", max_levels);

        Ok(Self {
            ctx,
            grid: Arc::new(GeohashGrid { max_levels }),
            world: OnceCell::new(),
        })
    }

    pub fn max_levels_possible() -> usize {
        MAX_LEVELS_POSSIBLE
    }

    fn grid(&self) -> Grid {
        Grid::Geohash(Arc::clone(&self.grid))
    }
}

impl SpatialPrefixTree for GeohashPrefixTree {
    fn context(&self) -> &SpatialContext {
        &self.ctx
    }

    fn max_levels(&self) -> usize {
        self.grid.max_levels
    }

    fn kind(&self) -> GridKind {
        GridKind::Geohash
    }

    fn level_for_distance(&self, dist: f64) -> usize {
        if dist == 0.0 {
            return self.max_levels();
        }
        hash_len_for_width_height(dist, dist).clamp(1, self.max_levels())
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
