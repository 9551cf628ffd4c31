use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::content::{read_level_file, LevelError};

use super::{Rect, Vec2};

pub const DEFAULT_TILE_SIZE: u32 = 16;

const NEIGHBOR_OFFSETS: [(i32, i32); 9] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (0, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const NEIGHBOR_RIGHT: u8 = 1;
const NEIGHBOR_LEFT: u8 = 1 << 1;
const NEIGHBOR_DOWN: u8 = 1 << 2;
const NEIGHBOR_UP: u8 = 1 << 3;

/// Tile-index coordinates: `floor(world / tile_size)` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn from_world(world: Vec2, tile_size: u32) -> Self {
        let size = f64::from(tile_size.max(1));
        Self::new(
            (world.x / size).floor() as i32,
            (world.y / size).floor() as i32,
        )
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// World position of this cell's top-left corner.
    pub fn world_origin(self, tile_size: u32) -> Vec2 {
        let size = f64::from(tile_size);
        Vec2::new(f64::from(self.x) * size, f64::from(self.y) * size)
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("grid key '{0}' is not of the form 'x;y'")]
pub struct GridKeyError(pub String);

impl FromStr for GridPos {
    type Err = GridKeyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || GridKeyError(raw.to_string());
        let (x, y) = raw.split_once(';').ok_or_else(invalid)?;
        let x = x.trim().parse::<i32>().map_err(|_| invalid())?;
        let y = y.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self::new(x, y))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub kind: String,
    pub variant: u32,
    pub pos: GridPos,
}

impl Tile {
    pub fn new(kind: impl Into<String>, variant: u32, pos: GridPos) -> Self {
        Self {
            kind: kind.into(),
            variant,
            pos,
        }
    }
}

/// Decorative tile placed at an arbitrary world position. Never collides.
#[derive(Debug, Clone, PartialEq)]
pub struct OffgridTile {
    pub kind: String,
    pub variant: u32,
    pub pos: Vec2,
}

impl OffgridTile {
    pub fn new(kind: impl Into<String>, variant: u32, pos: Vec2) -> Self {
        Self {
            kind: kind.into(),
            variant,
            pos,
        }
    }
}

/// Which tile types collide and which pick their variant from neighbors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileRules {
    physics: HashSet<String>,
    autotile: HashSet<String>,
}

impl TileRules {
    pub fn new<P, A>(physics: P, autotile: A) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        Self {
            physics: physics.into_iter().map(Into::into).collect(),
            autotile: autotile.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_physics(&self, kind: &str) -> bool {
        self.physics.contains(kind)
    }

    pub fn is_autotile(&self, kind: &str) -> bool {
        self.autotile.contains(kind)
    }
}

/// A tile pulled out of the map to seed an entity. `part` is the variant.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnMarker {
    pub kind: String,
    pub part: u32,
    pub pos: Vec2,
}

#[derive(Debug, Clone)]
pub struct Tilemap {
    tile_size: u32,
    rules: TileRules,
    grid: HashMap<GridPos, Tile>,
    offgrid: Vec<OffgridTile>,
}

impl Tilemap {
    pub fn new(tile_size: u32, rules: TileRules) -> Self {
        Self {
            tile_size: tile_size.max(1),
            rules,
            grid: HashMap::new(),
            offgrid: Vec::new(),
        }
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn rules(&self) -> &TileRules {
        &self.rules
    }

    pub fn tile_count(&self) -> usize {
        self.grid.len()
    }

    pub fn offgrid(&self) -> &[OffgridTile] {
        &self.offgrid
    }

    pub fn tile_at(&self, pos: GridPos) -> Option<&Tile> {
        self.grid.get(&pos)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.grid.values()
    }

    /// Places `tile` under its own grid position, returning any tile it replaced.
    pub fn place(&mut self, tile: Tile) -> Option<Tile> {
        self.grid.insert(tile.pos, tile)
    }

    pub fn place_offgrid(&mut self, tile: OffgridTile) {
        self.offgrid.push(tile);
    }

    pub fn clear(&mut self) {
        self.grid.clear();
        self.offgrid.clear();
    }

    /// Replaces the whole map from a level file. On error the current
    /// contents are left untouched.
    pub fn load(&mut self, path: &Path) -> Result<(), LevelError> {
        let level = read_level_file(path)?;
        self.tile_size = level.tile_size;
        self.grid = level
            .tiles
            .into_iter()
            .map(|tile| (tile.pos, tile))
            .collect();
        self.offgrid = level.offgrid;
        Ok(())
    }

    pub fn tiles_around(&self, world: Vec2) -> impl Iterator<Item = &Tile> {
        let center = GridPos::from_world(world, self.tile_size);
        NEIGHBOR_OFFSETS
            .iter()
            .filter_map(move |(dx, dy)| self.grid.get(&center.offset(*dx, *dy)))
    }

    /// Bounding rectangles of solid tiles in the 3x3 cells around `world`.
    pub fn physics_rects_around(&self, world: Vec2) -> Vec<Rect> {
        let size = f64::from(self.tile_size);
        self.tiles_around(world)
            .filter(|tile| self.rules.is_physics(&tile.kind))
            .map(|tile| Rect::from_pos_size(tile.pos.world_origin(self.tile_size), Vec2::new(size, size)))
            .collect()
    }

    /// Pulls every tile matching one of `id_pairs` out of the map (unless
    /// `keep`) and returns its world position. Off-grid matches come first,
    /// then grid matches in row-major order.
    pub fn extract(&mut self, id_pairs: &[(&str, u32)], keep: bool) -> Vec<SpawnMarker> {
        let matches = |kind: &str, variant: u32| {
            id_pairs
                .iter()
                .any(|(id_kind, id_variant)| *id_kind == kind && *id_variant == variant)
        };

        let mut markers = Vec::new();
        let mut kept_offgrid = Vec::with_capacity(self.offgrid.len());
        for tile in self.offgrid.drain(..) {
            if matches(&tile.kind, tile.variant) {
                markers.push(SpawnMarker {
                    kind: tile.kind.clone(),
                    part: tile.variant,
                    pos: tile.pos,
                });
                if keep {
                    kept_offgrid.push(tile);
                }
            } else {
                kept_offgrid.push(tile);
            }
        }
        self.offgrid = kept_offgrid;

        let mut grid_hits = self
            .grid
            .values()
            .filter(|tile| matches(&tile.kind, tile.variant))
            .map(|tile| tile.pos)
            .collect::<Vec<_>>();
        grid_hits.sort_by_key(|pos| (pos.y, pos.x));
        for pos in grid_hits {
            let tile = if keep {
                self.grid.get(&pos).cloned()
            } else {
                self.grid.remove(&pos)
            };
            if let Some(tile) = tile {
                markers.push(SpawnMarker {
                    kind: tile.kind,
                    part: tile.variant,
                    pos: pos.world_origin(self.tile_size),
                });
            }
        }
        markers
    }

    /// Neighbor-driven variant for autotile types, `None` when the tile is
    /// not autotiled or its neighborhood has no mapped variant.
    pub fn autotile_variant(&self, pos: GridPos) -> Option<u32> {
        let tile = self.grid.get(&pos)?;
        if !self.rules.is_autotile(&tile.kind) {
            return None;
        }
        let same_kind = |dx: i32, dy: i32| {
            self.grid
                .get(&pos.offset(dx, dy))
                .is_some_and(|neighbor| neighbor.kind == tile.kind)
        };
        let mut mask = 0u8;
        if same_kind(1, 0) {
            mask |= NEIGHBOR_RIGHT;
        }
        if same_kind(-1, 0) {
            mask |= NEIGHBOR_LEFT;
        }
        if same_kind(0, 1) {
            mask |= NEIGHBOR_DOWN;
        }
        if same_kind(0, -1) {
            mask |= NEIGHBOR_UP;
        }
        autotile_variant_for_mask(mask)
    }

    /// Variant to draw for `tile`: autotiled when possible, stored otherwise.
    pub fn render_variant(&self, tile: &Tile) -> u32 {
        self.autotile_variant(tile.pos).unwrap_or(tile.variant)
    }

    /// Placed tiles whose cells intersect `view`, row-major.
    pub fn tiles_in_view(&self, view: Rect) -> Vec<&Tile> {
        let min = GridPos::from_world(view.position(), self.tile_size);
        let max = GridPos::from_world(Vec2::new(view.right(), view.bottom()), self.tile_size);
        let mut visible = Vec::new();
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                if let Some(tile) = self.grid.get(&GridPos::new(x, y)) {
                    visible.push(tile);
                }
            }
        }
        visible
    }
}

/// Edge and corner pieces of a 3x3 tileset, indexed by which orthogonal
/// neighbors share the tile's type.
pub const fn autotile_variant_for_mask(mask: u8) -> Option<u32> {
    const R: u8 = NEIGHBOR_RIGHT;
    const L: u8 = NEIGHBOR_LEFT;
    const D: u8 = NEIGHBOR_DOWN;
    const U: u8 = NEIGHBOR_UP;
    match mask {
        m if m == R | D => Some(0),
        m if m == R | D | L => Some(1),
        m if m == L | D => Some(2),
        m if m == L | U | D => Some(3),
        m if m == L | U => Some(4),
        m if m == L | U | R => Some(5),
        m if m == R | U => Some(6),
        m if m == R | U | D => Some(7),
        m if m == R | L | U | D => Some(8),
        _ => None,
    }
}
