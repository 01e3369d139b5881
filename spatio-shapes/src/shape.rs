use crate::relation::SpatialRelation;
use geo::relate::IntersectionMatrix;
use geo::{BoundingRect, Point, Polygon, Rect, Relate};
use serde::{Deserialize, Serialize};

/// A query or cell shape.
///
/// Points and rectangles are related with closed-interval arithmetic, so a
/// shape touching a rectangle's edge intersects it. Polygon relations go
/// through the DE-9IM matrix computed by `geo::Relate`.
///
/// # Examples
///
/// ```
/// use spatio_shapes::{Shape, SpatialRelation};
/// use geo::polygon;
///
/// let square = Shape::Polygon(polygon![
///     (x: 0.0, y: 0.0),
///     (x: 10.0, y: 0.0),
///     (x: 10.0, y: 10.0),
///     (x: 0.0, y: 10.0),
///     (x: 0.0, y: 0.0),
/// ]);
///
/// let inner = Shape::rect(2.0, 2.0, 4.0, 4.0);
/// assert_eq!(inner.relate(&square), SpatialRelation::Within);
/// assert_eq!(Shape::point(20.0, 20.0).relate(&square), SpatialRelation::Disjoint);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(Point),
    Rect(Rect),
    Polygon(Polygon),
}

impl Shape {
    /// Create a point shape from x (longitude) and y (latitude).
    pub fn point(x: f64, y: f64) -> Self {
        Shape::Point(Point::new(x, y))
    }

    /// Create a rectangle shape from minimum and maximum coordinates.
    pub fn rect(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Shape::Rect(Rect::new(
            geo::coord! { x: min_x, y: min_y },
            geo::coord! { x: max_x, y: max_y },
        ))
    }

    /// The point, when this shape is one.
    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Shape::Point(point) => Some(point),
            _ => None,
        }
    }

    pub fn is_point(&self) -> bool {
        matches!(self, Shape::Point(_))
    }

    /// Axis-aligned bounding box. `None` only for an empty polygon.
    pub fn bounding_box(&self) -> Option<Rect> {
        match self {
            Shape::Point(point) => Some(Rect::new(point.0, point.0)),
            Shape::Rect(rect) => Some(*rect),
            Shape::Polygon(polygon) => polygon.bounding_rect(),
        }
    }

    /// Center of the bounding box.
    pub fn center(&self) -> Option<Point> {
        match self {
            Shape::Point(point) => Some(*point),
            _ => self.bounding_box().map(|rect| rect.center().into()),
        }
    }

    /// Width of the bounding box; zero for points and empty polygons.
    pub fn width(&self) -> f64 {
        self.bounding_box().map_or(0.0, |rect| rect.width())
    }

    /// Height of the bounding box; zero for points and empty polygons.
    pub fn height(&self) -> f64 {
        self.bounding_box().map_or(0.0, |rect| rect.height())
    }

    /// How `self` relates to `other`.
    pub fn relate(&self, other: &Shape) -> SpatialRelation {
        match (self, other) {
            (Shape::Point(a), Shape::Point(b)) => {
                if a == b {
                    SpatialRelation::Intersects
                } else {
                    SpatialRelation::Disjoint
                }
            }
            (Shape::Rect(rect), Shape::Point(point)) => relate_rect_point(rect, point),
            (Shape::Point(point), Shape::Rect(rect)) => relate_rect_point(rect, point).transpose(),
            (Shape::Rect(a), Shape::Rect(b)) => relate_rects(a, b),
            (Shape::Polygon(a), Shape::Polygon(b)) => from_matrix(&a.relate(b)),
            (Shape::Polygon(a), Shape::Rect(b)) => from_matrix(&a.relate(b)),
            (Shape::Polygon(a), Shape::Point(b)) => from_matrix(&a.relate(b)),
            (Shape::Rect(a), Shape::Polygon(b)) => from_matrix(&a.relate(b)),
            (Shape::Point(a), Shape::Polygon(b)) => from_matrix(&a.relate(b)),
        }
    }
}

impl From<Point> for Shape {
    fn from(point: Point) -> Self {
        Shape::Point(point)
    }
}

impl From<Rect> for Shape {
    fn from(rect: Rect) -> Self {
        Shape::Rect(rect)
    }
}

impl From<Polygon> for Shape {
    fn from(polygon: Polygon) -> Self {
        Shape::Polygon(polygon)
    }
}

fn relate_rect_point(rect: &Rect, point: &Point) -> SpatialRelation {
    let (min, max) = (rect.min(), rect.max());
    // Comparisons with NaN are false, so a NaN point is disjoint
    let inside = (min.x..=max.x).contains(&point.x()) && (min.y..=max.y).contains(&point.y());
    if inside {
        SpatialRelation::Contains
    } else {
        SpatialRelation::Disjoint
    }
}

fn relate_rects(a: &Rect, b: &Rect) -> SpatialRelation {
    let y = SpatialRelation::of_ranges(a.min().y, a.max().y, b.min().y, b.max().y);
    if y == SpatialRelation::Disjoint {
        return SpatialRelation::Disjoint;
    }
    let x = SpatialRelation::of_ranges(a.min().x, a.max().x, b.min().x, b.max().x);
    if x == SpatialRelation::Disjoint {
        return SpatialRelation::Disjoint;
    }
    if x == y {
        return x;
    }
    // An axis with identical extents defers to the other axis
    if a.min().x == b.min().x && a.max().x == b.max().x {
        return y;
    }
    if a.min().y == b.min().y && a.max().y == b.max().y {
        return x;
    }
    SpatialRelation::Intersects
}

fn from_matrix(matrix: &IntersectionMatrix) -> SpatialRelation {
    if matrix.is_disjoint() {
        SpatialRelation::Disjoint
    } else if matrix.is_contains() {
        SpatialRelation::Contains
    } else if matrix.is_within() {
        SpatialRelation::Within
    } else {
        SpatialRelation::Intersects
    }
}
