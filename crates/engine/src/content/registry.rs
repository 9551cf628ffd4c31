use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use thiserror::Error;

use crate::world::{AnimationClip, AnimationSet, FrameImage, TileRules};

pub const TAG_TILE: &str = "tile";
pub const TAG_PHYSICS: &str = "physics";
pub const TAG_AUTOTILE: &str = "autotile";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetLookupError {
    #[error("asset '{id}' is not registered")]
    NotFound { id: String },
    #[error("asset '{id}' is not {expected}")]
    WrongKind { id: String, expected: &'static str },
    #[error("entity '{entity}' has no registered animations")]
    NoAnimations { entity: String },
}

#[derive(Debug, Clone)]
pub enum AssetKind {
    Images(Vec<FrameImage>),
    Animation(Arc<AnimationClip>),
}

#[derive(Debug, Clone)]
pub struct AssetDef {
    pub id: String,
    pub tags: BTreeSet<String>,
    pub kind: AssetKind,
}

impl AssetDef {
    pub fn images<T>(id: impl Into<String>, tags: T, frames: Vec<FrameImage>) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            kind: AssetKind::Images(frames),
        }
    }

    pub fn animation<T>(id: impl Into<String>, tags: T, clip: AnimationClip) -> Self
    where
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            id: id.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            kind: AssetKind::Animation(Arc::new(clip)),
        }
    }
}

/// Read-only lookup of every compiled asset def by id.
#[derive(Debug, Clone, Default)]
pub struct AssetRegistry {
    defs: BTreeMap<String, AssetDef>,
}

impl AssetRegistry {
    /// Later defs with the same id replace earlier ones.
    pub fn from_defs(defs: impl IntoIterator<Item = AssetDef>) -> Self {
        Self {
            defs: defs.into_iter().map(|def| (def.id.clone(), def)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AssetDef> {
        self.defs.get(id)
    }

    pub fn has_tag(&self, id: &str, tag: &str) -> bool {
        self.defs.get(id).is_some_and(|def| def.tags.contains(tag))
    }

    pub fn ids_with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.defs
            .values()
            .filter(move |def| def.tags.contains(tag))
            .map(|def| def.id.as_str())
    }

    pub fn animation(&self, id: &str) -> Result<Arc<AnimationClip>, AssetLookupError> {
        match &self.lookup(id)?.kind {
            AssetKind::Animation(clip) => Ok(Arc::clone(clip)),
            AssetKind::Images(_) => Err(AssetLookupError::WrongKind {
                id: id.to_string(),
                expected: "an animation",
            }),
        }
    }

    pub fn images(&self, id: &str) -> Result<&[FrameImage], AssetLookupError> {
        match &self.lookup(id)?.kind {
            AssetKind::Images(frames) => Ok(frames),
            AssetKind::Animation(_) => Err(AssetLookupError::WrongKind {
                id: id.to_string(),
                expected: "an image set",
            }),
        }
    }

    /// Frame of tile type `kind` for `variant`, if both exist.
    pub fn tile_frame(&self, kind: &str, variant: u32) -> Option<&FrameImage> {
        self.images(kind).ok()?.get(variant as usize)
    }

    /// Every `<entity>@<action>` animation, keyed by action.
    pub fn animation_set(&self, entity: &str) -> Result<AnimationSet, AssetLookupError> {
        let prefix = format!("{entity}@");
        let mut set = AnimationSet::new(entity);
        for (id, def) in self.defs.range(prefix.clone()..) {
            let Some(action) = id.strip_prefix(&prefix) else {
                break;
            };
            if let AssetKind::Animation(clip) = &def.kind {
                set.insert(action, Arc::clone(clip));
            }
        }
        if set.actions().next().is_none() {
            return Err(AssetLookupError::NoAnimations {
                entity: entity.to_string(),
            });
        }
        Ok(set)
    }

    /// Collision and autotile sets for the tilemap, from tile tags.
    pub fn tile_rules(&self) -> TileRules {
        let tiles = self
            .defs
            .values()
            .filter(|def| def.tags.contains(TAG_TILE))
            .collect::<Vec<_>>();
        TileRules::new(
            tiles
                .iter()
                .filter(|def| def.tags.contains(TAG_PHYSICS))
                .map(|def| def.id.clone()),
            tiles
                .iter()
                .filter(|def| def.tags.contains(TAG_AUTOTILE))
                .map(|def| def.id.clone()),
        )
    }

    fn lookup(&self, id: &str) -> Result<&AssetDef, AssetLookupError> {
        self.defs.get(id).ok_or_else(|| AssetLookupError::NotFound {
            id: id.to_string(),
        })
    }
}
