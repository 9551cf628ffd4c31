use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::world::{GridPos, OffgridTile, Tile, Vec2};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid level file {path} at '{json_path}': {source}")]
    Parse {
        path: PathBuf,
        json_path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("tile key '{key}' in {path} is not of the form 'x;y'")]
    InvalidKey { path: PathBuf, key: String },
    #[error("tile key '{key}' in {path} does not match its pos {pos}")]
    KeyMismatch {
        path: PathBuf,
        key: String,
        pos: GridPos,
    },
    #[error("level file {path} declares a tile size of zero")]
    ZeroTileSize { path: PathBuf },
}

#[derive(Debug, Deserialize)]
struct LevelFile {
    tile_size: u32,
    tilemap: BTreeMap<String, TileRecord>,
    #[serde(default)]
    offgrid: Vec<OffgridRecord>,
}

#[derive(Debug, Deserialize)]
struct TileRecord {
    #[serde(rename = "type")]
    kind: String,
    variant: u32,
    pos: [i32; 2],
}

#[derive(Debug, Deserialize)]
struct OffgridRecord {
    #[serde(rename = "type")]
    kind: String,
    variant: u32,
    pos: [f64; 2],
}

/// A validated level, ready to replace a tilemap's contents.
#[derive(Debug, Clone)]
pub struct LoadedLevel {
    pub tile_size: u32,
    pub tiles: Vec<Tile>,
    pub offgrid: Vec<OffgridTile>,
}

pub fn read_level_file(path: &Path) -> Result<LoadedLevel, LevelError> {
    let raw = fs::read_to_string(path).map_err(|source| LevelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_level(path, &raw)
}

pub fn parse_level(path: &Path, raw: &str) -> Result<LoadedLevel, LevelError> {
    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    let file: LevelFile = serde_path_to_error::deserialize(deserializer).map_err(|error| {
        LevelError::Parse {
            path: path.to_path_buf(),
            json_path: error.path().to_string(),
            source: error.into_inner(),
        }
    })?;

    if file.tile_size == 0 {
        return Err(LevelError::ZeroTileSize {
            path: path.to_path_buf(),
        });
    }

    let mut tiles = Vec::with_capacity(file.tilemap.len());
    for (key, record) in file.tilemap {
        let keyed = key.parse::<GridPos>().map_err(|_| LevelError::InvalidKey {
            path: path.to_path_buf(),
            key: key.clone(),
        })?;
        let pos = GridPos::new(record.pos[0], record.pos[1]);
        if keyed != pos {
            return Err(LevelError::KeyMismatch {
                path: path.to_path_buf(),
                key,
                pos,
            });
        }
        tiles.push(Tile::new(record.kind, record.variant, pos));
    }

    let offgrid = file
        .offgrid
        .into_iter()
        .map(|record| {
            OffgridTile::new(
                record.kind,
                record.variant,
                Vec2::new(record.pos[0], record.pos[1]),
            )
        })
        .collect();

    Ok(LoadedLevel {
        tile_size: file.tile_size,
        tiles,
        offgrid,
    })
}
