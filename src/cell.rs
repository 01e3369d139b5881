//! Grid cells.
//!
//! A cell is a token path from the world cell down to one grid node. The
//! token's length is the cell's level; every descendant's token starts with
//! its ancestors' tokens. Besides the token a cell carries per-query state
//! (leaf flag, last relation to a query shape) and a compute-once geometry
//! cache.
//!
//! Cells order, compare and hash by token alone.

use crate::error::{PrefixTreeError, Result};
use crate::grid::{Grid, GridKind};
use bytes::Bytes;
use geo::{Point, Rect};
use once_cell::sync::OnceCell;
use spatio_shapes::{Shape, SpatialRelation};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Byte appended to a token in its external form to flag a leaf cell.
pub const LEAF_BYTE: u8 = b'+';

/// Byte range a cell was decoded from, kept so the original bytes can be
/// handed back without copying.
#[derive(Debug, Clone)]
struct TokenRange {
    buf: Bytes,
    offset: usize,
    /// Token length, excluding any leaf marker.
    len: usize,
}

/// One node of a prefix-tree grid.
///
/// # Thread Safety
///
/// The world cell owned by a tree is fully resolved when built and is safe to
/// share. Other cells carry per-query state; give each thread its own.
#[derive(Clone)]
pub struct Cell {
    grid: Grid,
    token: String,
    range: Option<TokenRange>,
    leaf: bool,
    shape_rel: Option<SpatialRelation>,
    shape: OnceCell<Rect>,
}

impl Cell {
    /// The level-0 cell, with its geometry already resolved.
    pub(crate) fn world(grid: Grid) -> Self {
        let shape = OnceCell::with_value(grid.get().world_rect());
        Self {
            grid,
            token: String::new(),
            range: None,
            leaf: false,
            shape_rel: None,
            shape,
        }
    }

    /// Decode a cell from its external token, honouring a trailing leaf marker.
    pub(crate) fn from_token(grid: Grid, raw: &str) -> Result<Self> {
        let (token, leaf) = parse_token(raw.as_bytes())?;
        Self::build(grid, token, None, leaf)
    }

    /// Decode a cell from `len` bytes of `buf` starting at `offset`.
    pub(crate) fn from_bytes(grid: Grid, buf: Bytes, offset: usize, len: usize) -> Result<Self> {
        let (token, leaf) = parse_token(byte_range(&buf, offset, len)?)?;
        let range = TokenRange {
            buf,
            offset,
            len: token.len(),
        };
        Self::build(grid, token, Some(range), leaf)
    }

    /// The `level`-deep cell holding `point`.
    pub(crate) fn from_point(grid: Grid, point: &Point, level: usize) -> Result<Self> {
        let max = grid.get().max_levels();
        if level > max {
            return Err(PrefixTreeError::level_out_of_range(level, max));
        }
        let (token, rel) = grid.get().encode_point(point, level)?;
        let mut cell = Self::build(grid, token, None, false)?;
        cell.shape_rel = rel;
        Ok(cell)
    }

    fn build(grid: Grid, token: String, range: Option<TokenRange>, leaf: bool) -> Result<Self> {
        check_depth(&grid, &token)?;
        let cell = Self {
            grid,
            token,
            range,
            leaf,
            shape_rel: None,
            shape: OnceCell::new(),
        };
        // A level-0 cell may be shared, so nothing about it stays lazy
        if cell.level() == 0 {
            cell.shape()?;
        }
        Ok(cell)
    }

    /// A child built straight from a parent token; no geometry is computed.
    fn child(&self, label: u8) -> Self {
        let mut token = String::with_capacity(self.token.len() + 1);
        token.push_str(&self.token);
        token.push(char::from(label));
        Self {
            grid: self.grid.clone(),
            token,
            range: None,
            leaf: false,
            shape_rel: None,
            shape: OnceCell::new(),
        }
    }

    /// Rebind this cell to a new byte range, clearing all per-query state.
    ///
    /// Used to pool cells while scanning many tokens. The world cell cannot be
    /// reset, and no cell can be reset onto the empty (world) token.
    pub fn reset(&mut self, buf: Bytes, offset: usize, len: usize) -> Result<()> {
        if self.level() == 0 {
            return Err(PrefixTreeError::WorldCell("reset"));
        }
        let (token, leaf) = parse_token(byte_range(&buf, offset, len)?)?;
        if token.is_empty() {
            return Err(PrefixTreeError::WorldCell("reset onto the world token"));
        }
        check_depth(&self.grid, &token)?;

        self.range = Some(TokenRange {
            buf,
            offset,
            len: token.len(),
        });
        self.token = token;
        self.leaf = leaf;
        self.shape_rel = None;
        self.shape = OnceCell::new();
        Ok(())
    }

    pub fn kind(&self) -> GridKind {
        self.grid.get().kind()
    }

    /// Depth of this cell; 0 is the whole world.
    pub fn level(&self) -> usize {
        self.token.len()
    }

    /// Token path from the root, without any leaf marker.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Token bytes, without any leaf marker.
    ///
    /// A cell decoded from a byte range hands back its original buffer, which
    /// is only possible when the range spans that whole buffer.
    pub fn token_bytes(&self) -> Result<Bytes> {
        match &self.range {
            None => Ok(Bytes::copy_from_slice(self.token.as_bytes())),
            Some(range) if range.offset == 0 && range.len == range.buf.len() => {
                Ok(range.buf.clone())
            }
            Some(range) => Err(PrefixTreeError::TokenRange {
                offset: range.offset,
                end: range.offset + range.len,
                buffer_len: range.buf.len(),
            }),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    /// Mark this cell as a leaf. Not allowed on the world cell.
    pub fn set_leaf(&mut self) -> Result<()> {
        if self.level() == 0 {
            return Err(PrefixTreeError::WorldCell("set_leaf"));
        }
        self.leaf = true;
        Ok(())
    }

    /// Relation of this cell to the last shape it was filtered against.
    pub fn shape_rel(&self) -> Option<SpatialRelation> {
        self.shape_rel
    }

    /// True when this cell is an ancestor of (or the same cell as) `other`.
    pub fn is_prefix_of(&self, other: &Cell) -> bool {
        other.token.starts_with(&self.token)
    }

    /// Number of children every cell of this grid has.
    pub fn sub_cells_size(&self) -> usize {
        self.grid.get().sub_cells_size()
    }

    /// Every child of this cell, in ascending token order.
    pub fn sub_cells(&self) -> Vec<Cell> {
        self.grid
            .get()
            .child_labels()
            .iter()
            .map(|&label| self.child(label))
            .collect()
    }

    /// The child holding `point`.
    pub fn sub_cell(&self, point: &Point) -> Result<Cell> {
        Cell::from_point(self.grid.clone(), point, self.level() + 1)
    }

    /// Children of this cell that are not disjoint from `filter`, in ascending
    /// token order.
    ///
    /// - `None` returns every child.
    /// - A point returns the single child holding it, with relation `Contains`.
    /// - Any other shape keeps the children touching it, recording each one's
    ///   relation and marking children that lie within the shape as leaves.
    pub fn sub_cells_filtered(&self, filter: Option<&Shape>) -> Result<Vec<Cell>> {
        let max = self.grid.get().max_levels();
        if self.level() >= max {
            return Err(PrefixTreeError::level_out_of_range(self.level() + 1, max));
        }

        let Some(filter) = filter else {
            return Ok(self.sub_cells());
        };

        if let Shape::Point(point) = filter {
            let mut cell = self.sub_cell(point)?;
            cell.shape_rel = Some(SpatialRelation::Contains);
            return Ok(vec![cell]);
        }

        let children = self.sub_cells();
        let mut matched = Vec::with_capacity(children.len());
        for mut cell in children {
            let rel = Shape::Rect(cell.shape()?).relate(filter);
            if rel == SpatialRelation::Disjoint {
                continue;
            }
            cell.shape_rel = Some(rel);
            if rel == SpatialRelation::Within {
                cell.leaf = true;
            }
            matched.push(cell);
        }
        Ok(matched)
    }

    /// Rectangle this cell covers, decoded once and cached.
    pub fn shape(&self) -> Result<Rect> {
        self.shape
            .get_or_try_init(|| self.grid.get().decode_rect(&self.token))
            .copied()
    }

    /// Center of this cell.
    pub fn center(&self) -> Result<Point> {
        match self.shape.get() {
            Some(rect) => Ok(rect.center().into()),
            None => self.grid.get().decode_center(&self.token),
        }
    }
}

/// Split an external token into its path and leaf flag.
fn parse_token(raw: &[u8]) -> Result<(String, bool)> {
    let (path, leaf) = match raw.split_last() {
        Some((&LEAF_BYTE, rest)) => (rest, true),
        _ => (raw, false),
    };

    if !path.is_ascii() {
        return Err(PrefixTreeError::invalid_token(
            String::from_utf8_lossy(raw),
            "tokens must be ASCII",
        ));
    }
    if path.contains(&LEAF_BYTE) {
        return Err(PrefixTreeError::invalid_token(
            String::from_utf8_lossy(raw),
            "leaf marker inside the token",
        ));
    }
    if leaf && path.is_empty() {
        return Err(PrefixTreeError::WorldCell("leaf marker on the world token"));
    }

    Ok((path.iter().copied().map(char::from).collect(), leaf))
}

fn byte_range(buf: &Bytes, offset: usize, len: usize) -> Result<&[u8]> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or_else(|| {
            PrefixTreeError::invalid_token(
                String::from_utf8_lossy(buf),
                format!(
                    "range {}+{} exceeds the {}-byte buffer",
                    offset,
                    len,
                    buf.len()
                ),
            )
        })
}

fn check_depth(grid: &Grid, token: &str) -> Result<()> {
    let max = grid.get().max_levels();
    if token.len() > max {
        return Err(PrefixTreeError::invalid_token(
            token,
            format!("deeper than the grid's {} levels", max),
        ));
    }
    Ok(())
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Cell {}

impl Hash for Cell {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token.as_bytes().cmp(other.token.as_bytes())
    }
}

/// External form: the token, followed by the leaf marker on leaves.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)?;
        if self.leaf {
            write!(f, "{}", char::from(LEAF_BYTE))?;
        }
        Ok(())
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("kind", &self.kind())
            .field("token", &self.token)
            .field("leaf", &self.leaf)
            .field("shape_rel", &self.shape_rel)
            .finish()
    }
}
