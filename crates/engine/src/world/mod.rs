mod animation;
mod camera;
mod geometry;
mod physics;
mod tilemap;
mod transition;

pub use animation::{Animation, AnimationClip, AnimationError, AnimationSet, FrameImage};
pub use camera::{Camera2D, DEFAULT_CAMERA_SPEED};
pub use geometry::{Rect, Vec2};
pub use physics::{Collisions, PhysicsEntity, PhysicsTuning, DEFAULT_ACTION};
pub use tilemap::{
    autotile_variant_for_mask, GridKeyError, GridPos, OffgridTile, SpawnMarker, Tile, TileRules,
    Tilemap, DEFAULT_TILE_SIZE,
};
pub use transition::{
    TransitionEvent, TransitionRequest, TransitionSequencer, TransitionStage, WipeOverlay,
    WIPE_POINT_ALTITUDE,
};
