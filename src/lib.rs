//! Hierarchical spatial grids that decompose shapes into indexable cell tokens.
//!
//! A prefix tree splits the world into nested cells. Every cell has a token
//! whose prefixes are the tokens of its ancestors, so a shape turned into cells
//! can be indexed as plain terms and matched by prefix.
//!
//! Two grids are provided: [`GeohashPrefixTree`] (32 children per cell) and
//! [`QuadPrefixTree`] (4 children per cell). Both can be built directly or by
//! name through [`make_spt`].
//!
//! ```rust
//! use spatio_prefix_tree::{GeohashPrefixTree, Shape, SpatialContext, SpatialPrefixTree};
//!
//! let tree = GeohashPrefixTree::new(SpatialContext::geo(), 6)?;
//! let area = Shape::rect(-74.02, 40.70, -73.93, 40.80);
//! let cells = tree.cells(&area, 5, false, true)?;
//!
//! assert!(cells.iter().all(|c| c.is_leaf() && c.token().starts_with("dr")));
//! # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
//! ```

pub mod cell;
pub mod config;
pub mod error;
pub mod factory;
pub mod geohash_tree;
mod grid;
pub mod quad_tree;
pub mod tree;

pub use cell::{Cell, LEAF_BYTE};
pub use config::PrefixTreeConfig;
pub use error::{PrefixTreeError, Result};
pub use factory::{
    FactoryConstructor, FactoryRegistry, FactoryState, GeohashPrefixTreeFactory,
    QuadPrefixTreeFactory, SpatialPrefixTreeFactory, make_spt, make_spt_with_config,
    register_factory,
};
pub use geohash_tree::GeohashPrefixTree;
pub use grid::GridKind;
pub use quad_tree::{LevelDims, QuadPrefixTree};
pub use tree::{SpatialPrefixTree, cells_to_token_strings};

pub use spatio_shapes::{Shape, SpatialContext, SpatialRelation};

pub use geo::{Point, Polygon, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Cell, PrefixTreeError, Result, SpatialPrefixTree};

    pub use crate::{GeohashPrefixTree, QuadPrefixTree};

    pub use crate::{PrefixTreeConfig, make_spt};

    pub use crate::{Shape, SpatialContext, SpatialRelation};

    pub use geo::{Point, Polygon, Rect};
}
