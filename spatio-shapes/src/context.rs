use geo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Coordinate system a grid decomposes: the world bounds plus whether the
/// coordinates are geographic longitude/latitude.
///
/// # Examples
///
/// ```
/// use spatio_shapes::SpatialContext;
///
/// let geo = SpatialContext::geo();
/// assert!(geo.is_geo());
/// assert_eq!(geo.world_bounds().min().x, -180.0);
///
/// let plane = SpatialContext::planar(geo::Rect::new(
///     geo::coord! { x: 0.0, y: 0.0 },
///     geo::coord! { x: 1024.0, y: 1024.0 },
/// ));
/// assert!(!plane.is_geo());
/// assert_eq!(plane.world_center(), geo::Point::new(512.0, 512.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialContext {
    world_bounds: Rect,
    geo: bool,
}

impl SpatialContext {
    /// The lon/lat world: [-180, 180] x [-90, 90].
    pub fn geo() -> Self {
        Self {
            world_bounds: Rect::new(
                geo::coord! { x: -180.0, y: -90.0 },
                geo::coord! { x: 180.0, y: 90.0 },
            ),
            geo: true,
        }
    }

    /// A flat, non-geographic world with the given bounds.
    pub fn planar(world_bounds: Rect) -> Self {
        Self {
            world_bounds,
            geo: false,
        }
    }

    pub fn world_bounds(&self) -> Rect {
        self.world_bounds
    }

    pub fn world_center(&self) -> Point {
        self.world_bounds.center().into()
    }

    pub fn is_geo(&self) -> bool {
        self.geo
    }

    pub fn make_point(&self, x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    /// Create a rectangle from minimum and maximum coordinates.
    pub fn make_rect(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Rect {
        Rect::new(
            geo::coord! { x: min_x, y: min_y },
            geo::coord! { x: max_x, y: max_y },
        )
    }

    /// Check if a point lies within the (closed) world bounds.
    pub fn contains_point(&self, point: &Point) -> bool {
        let (min, max) = (self.world_bounds.min(), self.world_bounds.max());
        point.x() >= min.x && point.x() <= max.x && point.y() >= min.y && point.y() <= max.y
    }
}

impl Default for SpatialContext {
    fn default() -> Self {
        Self::geo()
    }
}
