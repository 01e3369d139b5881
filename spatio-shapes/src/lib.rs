//! # spatio-shapes
//!
//! Geometry capability consumed by the Spatio prefix-tree grids.
//!
//! This crate provides the small surface a grid needs from a geometry library:
//!
//! - **Relations**: `SpatialRelation` between two shapes, with `transpose()`
//! - **Shapes**: `Shape` over `geo` points, rectangles and polygons, with `relate()`,
//!   bounding box and center queries
//! - **Context**: `SpatialContext` carrying the world bounds and the geo/planar flag
//!
//! All types are serializable with Serde and built on top of the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use spatio_shapes::{Shape, SpatialContext, SpatialRelation};
//!
//! let ctx = SpatialContext::geo();
//! let manhattan = Shape::Rect(ctx.make_rect(-74.0479, 40.6829, -73.9067, 40.8820));
//! let nyc = Shape::point(-74.0060, 40.7128);
//!
//! assert_eq!(manhattan.relate(&nyc), SpatialRelation::Contains);
//! assert_eq!(nyc.relate(&manhattan), SpatialRelation::Within);
//! ```

pub mod context;
pub mod relation;
pub mod shape;

pub use context::SpatialContext;
pub use relation::SpatialRelation;
pub use shape::Shape;
