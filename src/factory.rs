//! Building configured prefix trees by name.
//!
//! A factory turns a [`PrefixTreeConfig`] and a [`SpatialContext`] into a tree,
//! resolving the depth from the options. Factories are looked up by the
//! `prefixTree` option in a [`FactoryRegistry`]; `geohash` and `quad` are
//! built in, and hosts may register their own.
//!
//! Depth resolution:
//! 1. `maxLevels`, when given
//! 2. else the grid level for `maxDistErr` degrees
//! 3. else, for geo contexts, the level for one metre
//! 4. else a configuration error

use crate::config::PrefixTreeConfig;
use crate::error::{PrefixTreeError, Result};
use crate::geohash_tree::GeohashPrefixTree;
use crate::quad_tree::QuadPrefixTree;
use crate::tree::SpatialPrefixTree;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use spatio_shapes::SpatialContext;
use std::fmt;
use std::sync::Arc;

/// Mean earth radius in kilometres.
pub const EARTH_MEAN_RADIUS_KM: f64 = 6371.0087714;

/// Precision used for geo contexts when neither depth option is given: 1 m.
pub const DEFAULT_GEO_MAX_DETAIL_KM: f64 = 0.001;

/// Creates a fresh, uninitialised factory.
pub type FactoryConstructor = fn() -> Box<dyn SpatialPrefixTreeFactory>;

/// Convert a surface distance in kilometres to degrees of arc.
///
/// ```
/// use spatio_prefix_tree::factory::{km_to_degrees, EARTH_MEAN_RADIUS_KM};
///
/// let quarter = std::f64::consts::FRAC_PI_2 * EARTH_MEAN_RADIUS_KM;
/// assert!((km_to_degrees(quarter) - 90.0).abs() < 1e-9);
/// ```
pub fn km_to_degrees(km: f64) -> f64 {
    (km / EARTH_MEAN_RADIUS_KM).to_degrees()
}

/// Options and resolved depth a factory carries between `init` and `new_spt`.
#[derive(Debug, Clone, Default)]
pub struct FactoryState {
    context: Option<SpatialContext>,
    config: PrefixTreeConfig,
    max_levels: Option<usize>,
}

impl FactoryState {
    pub fn context(&self) -> Option<&SpatialContext> {
        self.context.as_ref()
    }

    pub fn config(&self) -> &PrefixTreeConfig {
        &self.config
    }

    pub fn max_levels(&self) -> Option<usize> {
        self.max_levels
    }

    /// Context and depth, once `init` has run.
    pub fn resolved(&self) -> Result<(&SpatialContext, usize)> {
        match (&self.context, self.max_levels) {
            (Some(ctx), Some(levels)) => Ok((ctx, levels)),
            _ => Err(PrefixTreeError::Config(
                "factory used before init".to_string(),
            )),
        }
    }
}

/// Builds one kind of prefix tree from configuration.
///
/// Implementors supply the grid-specific pieces; [`init`](Self::init) handles
/// option resolution for every grid the same way.
pub trait SpatialPrefixTreeFactory: Send + Sync {
    fn state(&self) -> &FactoryState;

    fn state_mut(&mut self) -> &mut FactoryState;

    /// Level this grid would use for cells of `degrees` size, computed on a
    /// grid of the greatest possible depth.
    fn level_for_distance(&self, ctx: &SpatialContext, degrees: f64) -> Result<usize>;

    /// Build the tree. Requires a prior successful [`init`](Self::init).
    fn new_spt(&self) -> Result<Arc<dyn SpatialPrefixTree>>;

    /// Store the options and context and resolve the tree depth.
    fn init(&mut self, config: PrefixTreeConfig, ctx: SpatialContext) -> Result<()> {
        config.validate().map_err(PrefixTreeError::Config)?;
        let max_levels = resolve_max_levels(&*self, &config, &ctx)?;

        let state = self.state_mut();
        state.config = config;
        state.context = Some(ctx);
        state.max_levels = Some(max_levels);
        Ok(())
    }
}

fn resolve_max_levels<F>(factory: &F, config: &PrefixTreeConfig, ctx: &SpatialContext) -> Result<usize>
where
    F: SpatialPrefixTreeFactory + ?Sized,
{
    if let Some(levels) = config.max_levels {
        if config.max_dist_err.is_some() {
            log::debug!("maxLevels {} overrides maxDistErr", levels);
        }
        return Ok(levels);
    }

    let degrees = match config.max_dist_err {
        Some(degrees) => degrees,
        None if ctx.is_geo() => km_to_degrees(DEFAULT_GEO_MAX_DETAIL_KM),
        None => {
            return Err(PrefixTreeError::Config(format!(
                "non-geographic contexts need {} or {}",
                crate::config::MAX_LEVELS,
                crate::config::MAX_DIST_ERR
            )));
        }
    };

    let levels = factory.level_for_distance(ctx, degrees)?;
    log::debug!("Resolved {} degrees to {} levels", degrees, levels);
    Ok(levels)
}

/// Factory for [`GeohashPrefixTree`].
#[derive(Debug, Default)]
pub struct GeohashPrefixTreeFactory {
    state: FactoryState,
}

impl SpatialPrefixTreeFactory for GeohashPrefixTreeFactory {
    fn state(&self) -> &FactoryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactoryState {
        &mut self.state
    }

    fn level_for_distance(&self, ctx: &SpatialContext, degrees: f64) -> Result<usize> {
        let grid = GeohashPrefixTree::new(ctx.clone(), GeohashPrefixTree::MAX_LEVELS_POSSIBLE)?;
        Ok(grid.level_for_distance(degrees))
    }

    fn new_spt(&self) -> Result<Arc<dyn SpatialPrefixTree>> {
        let (ctx, levels) = self.state.resolved()?;
        Ok(Arc::new(GeohashPrefixTree::new(ctx.clone(), levels)?))
    }
}

/// Factory for [`QuadPrefixTree`] over the context's world bounds.
#[derive(Debug, Default)]
pub struct QuadPrefixTreeFactory {
    state: FactoryState,
}

impl SpatialPrefixTreeFactory for QuadPrefixTreeFactory {
    fn state(&self) -> &FactoryState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FactoryState {
        &mut self.state
    }

    fn level_for_distance(&self, ctx: &SpatialContext, degrees: f64) -> Result<usize> {
        let grid = QuadPrefixTree::new(ctx.clone(), QuadPrefixTree::MAX_LEVELS_POSSIBLE)?;
        Ok(grid.level_for_distance(degrees))
    }

    fn new_spt(&self) -> Result<Arc<dyn SpatialPrefixTree>> {
        let (ctx, levels) = self.state.resolved()?;
        Ok(Arc::new(QuadPrefixTree::new(ctx.clone(), levels)?))
    }
}

fn geohash_factory() -> Box<dyn SpatialPrefixTreeFactory> {
    Box::new(GeohashPrefixTreeFactory::default())
}

fn quad_factory() -> Box<dyn SpatialPrefixTreeFactory> {
    Box::new(QuadPrefixTreeFactory::default())
}

/// Name → factory lookup. Names are case-insensitive.
#[derive(Clone)]
pub struct FactoryRegistry {
    factories: FxHashMap<String, FactoryConstructor>,
}

impl FactoryRegistry {
    /// An empty registry, without even the built-in grids.
    pub fn new() -> Self {
        Self {
            factories: FxHashMap::default(),
        }
    }

    /// A registry holding `geohash` and `quad`.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("geohash", geohash_factory);
        registry.register("quad", quad_factory);
        registry
    }

    /// Add or replace the factory for `name`.
    pub fn register(&mut self, name: &str, ctor: FactoryConstructor) {
        let key = name.to_ascii_lowercase();
        if self.factories.insert(key.clone(), ctor).is_some() {
            log::debug!("Replaced prefix tree factory {:?}", key);
        } else {
            log::debug!("Registered prefix tree factory {:?}", key);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// A fresh, uninitialised factory for `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn SpatialPrefixTreeFactory>> {
        self.factories
            .get(&name.to_ascii_lowercase())
            .map(|ctor| ctor())
            .ok_or_else(|| PrefixTreeError::UnknownPrefixTree(name.to_string()))
    }

    /// Build a tree from parsed options.
    ///
    /// Without a `prefixTree` option, geo contexts get a geohash tree and
    /// other contexts a quad tree.
    pub fn make_spt(
        &self,
        config: PrefixTreeConfig,
        ctx: SpatialContext,
    ) -> Result<Arc<dyn SpatialPrefixTree>> {
        let mut factory = self.create(tree_name(&config, &ctx))?;
        build(factory.as_mut(), config, ctx)
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for FactoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryRegistry")
            .field("factories", &self.names())
            .finish()
    }
}

fn tree_name<'a>(config: &'a PrefixTreeConfig, ctx: &SpatialContext) -> &'a str {
    match config.prefix_tree.as_deref() {
        Some(name) => name,
        None if ctx.is_geo() => "geohash",
        None => "quad",
    }
}

fn build(
    factory: &mut dyn SpatialPrefixTreeFactory,
    config: PrefixTreeConfig,
    ctx: SpatialContext,
) -> Result<Arc<dyn SpatialPrefixTree>> {
    factory.init(config, ctx)?;
    let tree = factory.new_spt()?;
    log::debug!(
        "Built {} prefix tree with {} levels",
        tree.kind(),
        tree.max_levels()
    );
    Ok(tree)
}

static REGISTRY: Lazy<RwLock<FactoryRegistry>> =
    Lazy::new(|| RwLock::new(FactoryRegistry::with_builtin()));

/// Register a factory in the process-wide registry used by [`make_spt`].
pub fn register_factory(name: &str, ctor: FactoryConstructor) {
    REGISTRY.write().register(name, ctor);
}

/// Build a tree from a flat option map using the process-wide registry.
///
/// # Examples
///
/// ```rust
/// use spatio_prefix_tree::{make_spt, GridKind, SpatialContext};
///
/// let tree = make_spt([("prefixTree", "quad"), ("maxLevels", "6")], SpatialContext::geo())?;
/// assert_eq!(tree.kind(), GridKind::Quad);
/// assert_eq!(tree.max_levels(), 6);
/// # Ok::<(), spatio_prefix_tree::PrefixTreeError>(())
/// ```
pub fn make_spt<I, K, V>(args: I, ctx: SpatialContext) -> Result<Arc<dyn SpatialPrefixTree>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    make_spt_with_config(PrefixTreeConfig::from_args(args)?, ctx)
}

/// Like [`make_spt`], from already parsed options.
pub fn make_spt_with_config(
    config: PrefixTreeConfig,
    ctx: SpatialContext,
) -> Result<Arc<dyn SpatialPrefixTree>> {
    // Guard is released before the factory runs
    let mut factory = REGISTRY.read().create(tree_name(&config, &ctx))?;
    build(factory.as_mut(), config, ctx)
}
